//! Groups whose inputs can be added and removed at runtime.
//!
//! Each instance sits in a component wrapper (input + remove button) inside
//! one container node. The container's child order and the registry's
//! sequence for the group are kept identical; removal locates the registry
//! entry from the wrapper's position in the container.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use formgroup_core::{
    BLUR, CLICK, ElementKind, Event, FormError, Listener, NodeId, Properties, Result, StateRecord,
};

use crate::engine::{Engine, FormGroup};
use crate::instance::InstanceRef;
use crate::options::{EventSpec, GroupOptions, normalize, removable_settings};
use crate::registry::InstanceId;

#[derive(Debug)]
pub(crate) struct RemovableGroup {
    group_key: String,
    root: NodeId,
    container: NodeId,
    add_button: NodeId,
    max: usize,
    /// Shape of the first initial state, every value blanked.
    template: StateRecord,
    properties: Option<Properties>,
    events: Option<EventSpec>,
    remove_button: Properties,
    component_class: Option<String>,
}

/// Nodes of a removable group, for hosts that drive it directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RemovableControls {
    pub root: NodeId,
    pub container: NodeId,
    pub add_button: NodeId,
    pub max: usize,
}

impl FormGroup {
    /// Builds a group of up to `max` (default 10) removable inputs. Initial
    /// states beyond `max` are dropped. Returns the group's root node.
    pub fn removable_inputs_group(&self, options: GroupOptions) -> Result<NodeId> {
        let settings = removable_settings(&options)?;
        let weak = self.weak();

        let (group, states) = {
            let mut engine = self.inner.borrow_mut();
            let opt = normalize(options, &mut engine.registry)?;
            engine.resolve_bindings(opt.events.first())?;
            let root = engine.group_wrapper(&opt.layout);
            let container = engine.document.create_element(ElementKind::Container);
            engine.document.append_child(root, container);
            let add_props = engine.input_properties(Some(&settings.add_new_button));
            let add_button = engine.input_node(&add_props);

            let template = opt.state.first().map(StateRecord::blanked).unwrap_or_default();
            let group = Rc::new(RemovableGroup {
                group_key: opt.group_key,
                root,
                container,
                add_button,
                max: settings.max,
                template,
                properties: opt.props.into_iter().next(),
                events: opt.events.into_iter().next(),
                remove_button: settings.remove_button,
                component_class: opt.layout.component_class,
            });
            engine
                .document
                .add_event_listener(add_button, CLICK, add_listener(weak.clone(), group.clone()));

            if opt.state.len() > group.max {
                log::warn!(
                    "group `{}`: {} initial states exceed max {}, keeping the first {}",
                    group.group_key,
                    opt.state.len(),
                    group.max,
                    group.max
                );
            }
            (group, opt.state)
        };

        for state in states.into_iter().take(group.max) {
            match create_component(&self.inner, &group, state) {
                Ok(wrapper) => self
                    .inner
                    .borrow_mut()
                    .document
                    .append_child(group.container, wrapper),
                Err(err) => {
                    let mut engine = self.inner.borrow_mut();
                    engine.document.remove_subtree(group.add_button);
                    engine.abandon_group(&group.group_key, group.root);
                    return Err(err);
                }
            }
        }

        let mut engine = self.inner.borrow_mut();
        refresh_add_control(&mut engine, &group);
        engine
            .removables
            .insert(group.group_key.clone(), group.clone());
        log::debug!(
            "built removable group `{}` with {} of max {}",
            group.group_key,
            engine.document.children(group.container).len(),
            group.max
        );
        Ok(group.root)
    }

    pub fn removable_controls(&self, group_key: &str) -> Option<RemovableControls> {
        let engine = self.inner.borrow();
        engine.removables.get(group_key).map(|g| RemovableControls {
            root: g.root,
            container: g.container,
            add_button: g.add_button,
            max: g.max,
        })
    }

    /// Same as clicking the group's add control. Returns the new instance, or
    /// `None` when the group is full.
    pub fn add_instance(&self, group_key: &str) -> Result<Option<InstanceRef>> {
        let group = self.removable(group_key)?;
        let added = add_component(&self.inner, &group)?;
        Ok(added.map(|id| InstanceRef::new(self.weak(), id)))
    }

    /// Same as clicking the remove control of the component at visual
    /// `position`.
    pub fn remove_instance(&self, group_key: &str, position: usize) -> Result<()> {
        let group = self.removable(group_key)?;
        let wrapper = self
            .inner
            .borrow()
            .document
            .children(group.container)
            .get(position)
            .copied()
            .ok_or(FormError::UnknownInstance)?;
        remove_component(&self.inner, &group, wrapper, None)?;
        refresh_add_control(&mut self.inner.borrow_mut(), &group);
        Ok(())
    }

    fn removable(&self, group_key: &str) -> Result<Rc<RemovableGroup>> {
        self.inner
            .borrow()
            .removables
            .get(group_key)
            .cloned()
            .ok_or_else(|| {
                FormError::ConfigShape(format!("`{group_key}` is not a removable group"))
            })
    }
}

/// Registers one instance and builds its wrapper. The wrapper is not yet
/// attached to the container.
fn create_component(
    engine: &Rc<RefCell<Engine>>,
    group: &Rc<RemovableGroup>,
    state: StateRecord,
) -> Result<NodeId> {
    let weak = Rc::downgrade(engine);
    let mut e = engine.borrow_mut();
    let wrapper = e.component_wrapper(group.component_class.as_deref());
    let props = e.input_properties(group.properties.as_ref());
    let input = e.input_node(&props);

    let id = match e.register_instance(
        &weak,
        &group.group_key,
        props,
        state,
        group.events.as_ref(),
        input,
    ) {
        Ok(id) => id,
        Err(err) => {
            e.document.remove_subtree(wrapper);
            e.document.remove_subtree(input);
            return Err(err);
        }
    };

    // after the instance's own handlers, so they see the blur first
    e.document
        .add_event_listener(input, BLUR, blur_listener(weak.clone(), group.clone(), wrapper));

    let button_props = e.input_properties(Some(&group.remove_button));
    let button = e.input_node(&button_props);
    e.document
        .add_event_listener(button, CLICK, remove_listener(weak, group.clone(), wrapper, id));

    e.document.append_child(wrapper, input);
    e.document.append_child(wrapper, button);
    Ok(wrapper)
}

fn add_component(
    engine: &Rc<RefCell<Engine>>,
    group: &Rc<RemovableGroup>,
) -> Result<Option<InstanceId>> {
    let count = engine.borrow().document.children(group.container).len();
    let mut added = None;
    if count < group.max {
        let wrapper = create_component(engine, group, group.template.clone())?;
        let mut e = engine.borrow_mut();
        e.document.append_child(group.container, wrapper);
        if let Some(input) = e.document.first_child(wrapper) {
            e.document.focus(input);
        }
        added = e
            .registry
            .group(&group.group_key)
            .and_then(|ids| ids.last())
            .copied();
    }
    refresh_add_control(&mut engine.borrow_mut(), group);
    Ok(added)
}

fn remove_component(
    engine: &Rc<RefCell<Engine>>,
    group: &RemovableGroup,
    wrapper: NodeId,
    expected: Option<InstanceId>,
) -> Result<()> {
    let mut e = engine.borrow_mut();
    let index = position_of(&e, group, wrapper)?;
    e.remove_at(&group.group_key, index, expected, group.container, wrapper)
}

fn position_of(engine: &Engine, group: &RemovableGroup, wrapper: NodeId) -> Result<usize> {
    engine
        .document
        .child_index(group.container, wrapper)
        .ok_or_else(|| {
            FormError::Inconsistent(format!(
                "component is no longer part of group `{}`",
                group.group_key
            ))
        })
}

/// Shows the add control while the group has room, hides it otherwise.
fn refresh_add_control(engine: &mut Engine, group: &RemovableGroup) {
    let count = engine.document.children(group.container).len();
    if count < group.max {
        engine.document.append_child(group.root, group.add_button);
    } else if engine.document.is_child(group.root, group.add_button) {
        engine.document.remove_child(group.root, group.add_button);
    }
}

fn upgrade(engine: &Weak<RefCell<Engine>>) -> Result<Rc<RefCell<Engine>>> {
    engine.upgrade().ok_or(FormError::EngineDropped)
}

fn add_listener(engine: Weak<RefCell<Engine>>, group: Rc<RemovableGroup>) -> Listener {
    Rc::new(move |_: &Event| {
        let engine = upgrade(&engine)?;
        add_component(&engine, &group).map(drop)
    })
}

fn remove_listener(
    engine: Weak<RefCell<Engine>>,
    group: Rc<RemovableGroup>,
    wrapper: NodeId,
    id: InstanceId,
) -> Listener {
    Rc::new(move |_: &Event| {
        let engine = upgrade(&engine)?;
        remove_component(&engine, &group, wrapper, Some(id))?;
        refresh_add_control(&mut engine.borrow_mut(), &group);
        Ok(())
    })
}

/// Losing focus with an empty value removes the component.
fn blur_listener(
    engine: Weak<RefCell<Engine>>,
    group: Rc<RemovableGroup>,
    wrapper: NodeId,
) -> Listener {
    Rc::new(move |_: &Event| {
        let engine = upgrade(&engine)?;
        let target = {
            let e = engine.borrow();
            let index = position_of(&e, &group, wrapper)?;
            let id = e
                .registry
                .group(&group.group_key)
                .and_then(|ids| ids.get(index))
                .copied()
                .ok_or_else(|| {
                    FormError::Inconsistent(format!(
                        "group `{}` has no instance at position {index}",
                        group.group_key
                    ))
                })?;
            e.registry
                .instance(id)
                .filter(|inst| inst.state().is_empty_value())
                .map(|_| id)
        };
        if let Some(id) = target {
            remove_component(&engine, &group, wrapper, Some(id))?;
        }
        refresh_add_control(&mut engine.borrow_mut(), &group);
        Ok(())
    })
}
