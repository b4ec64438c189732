use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use formgroup_core::{Event, FormError, Listener, NodeId, Properties, Result, StateRecord};

use crate::engine::Engine;
use crate::registry::{Instance, InstanceId};

/// Bound to an event type on an instance's node. Receives the event and the
/// instance; changes only persist through [`InstanceRef::set_state`].
pub type Handler = Rc<dyn Fn(&Event, &InstanceRef) -> Result<()>>;

/// Handle to a registered instance.
///
/// Holds the engine weakly: handles outliving the engine report
/// `FormError::EngineDropped`. Must not be used while the engine's document
/// is borrowed through [`crate::FormGroup::document`].
#[derive(Clone)]
pub struct InstanceRef {
    engine: Weak<RefCell<Engine>>,
    id: InstanceId,
}

impl fmt::Debug for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRef").field("id", &self.id).finish()
    }
}

impl InstanceRef {
    pub(crate) fn new(engine: Weak<RefCell<Engine>>, id: InstanceId) -> Self {
        Self { engine, id }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    fn engine(&self) -> Result<Rc<RefCell<Engine>>> {
        self.engine.upgrade().ok_or(FormError::EngineDropped)
    }

    fn read<R>(&self, f: impl FnOnce(&Instance) -> R) -> Result<R> {
        let engine = self.engine()?;
        let engine = engine.borrow();
        engine
            .registry
            .instance(self.id)
            .map(f)
            .ok_or(FormError::UnknownInstance)
    }

    pub fn state(&self) -> Result<StateRecord> {
        self.read(|inst| inst.state().clone())
    }

    pub fn properties(&self) -> Result<Properties> {
        self.read(|inst| inst.properties().clone())
    }

    pub fn node(&self) -> Result<NodeId> {
        self.read(Instance::node)
    }

    pub fn group_key(&self) -> Result<String> {
        self.read(|inst| inst.group_key().to_string())
    }

    /// Replaces the state and runs a full update cycle. Returns the state as
    /// read back from the store. On failure the previous state is kept.
    pub fn set_state(&self, state: impl Into<StateRecord>) -> Result<StateRecord> {
        let state = StateRecord::canonical(state.into().into_map());
        let engine = self.engine()?;
        let mut engine = engine.borrow_mut();
        engine.set_state(self.id, state)
    }
}

pub(crate) fn instance_listener(
    engine: Weak<RefCell<Engine>>,
    id: InstanceId,
    handler: Handler,
) -> Listener {
    Rc::new(move |event: &Event| {
        let instance = InstanceRef::new(engine.clone(), id);
        handler(event, &instance)
    })
}
