use std::cell::RefCell;
use std::rc::Weak;

use formgroup_core::{NodeId, Properties, Result, StateRecord};

use crate::engine::{Engine, FormGroup};
use crate::options::{EventSpec, GroupOptions, NormalizedOptions, normalize};

impl FormGroup {
    /// Builds a group holding one input. Only the first entry of `state`,
    /// `props` and `events` is used.
    pub fn input_group(&self, options: GroupOptions) -> Result<NodeId> {
        let weak = self.weak();
        let mut engine = self.inner.borrow_mut();
        let opt = normalize(options, &mut engine.registry)?;
        let root = engine.group_wrapper(&opt.layout);

        let state = opt.state.first().cloned().unwrap_or_default();
        match component(&mut engine, &weak, &opt, 0, state) {
            Ok(wrapper) => engine.document.append_child(root, wrapper),
            Err(err) => {
                engine.document.remove_subtree(root);
                return Err(err);
            }
        }
        log::debug!("built input group `{}`", opt.group_key);
        Ok(root)
    }

    /// Builds a group with one input per `state` or `props` entry, whichever
    /// is longer. Missing states start empty.
    ///
    /// Either every instance is registered or none is: when one fails, the
    /// instances before it are dropped again and the store rewritten.
    pub fn inputs_group(&self, options: GroupOptions) -> Result<NodeId> {
        let weak = self.weak();
        let mut engine = self.inner.borrow_mut();
        let opt = normalize(options, &mut engine.registry)?;
        let count = opt.state.len().max(opt.props.len());
        for index in 0..count {
            engine.resolve_bindings(opt.events.get(index))?;
        }

        let root = engine.group_wrapper(&opt.layout);
        for index in 0..count {
            let state = opt.state.get(index).cloned().unwrap_or_else(StateRecord::empty);
            match component(&mut engine, &weak, &opt, index, state) {
                Ok(wrapper) => engine.document.append_child(root, wrapper),
                Err(err) => {
                    engine.abandon_group(&opt.group_key, root);
                    return Err(err);
                }
            }
        }
        log::debug!("built inputs group `{}` with {count} inputs", opt.group_key);
        Ok(root)
    }
}

/// Wrapper plus input for entry `index` of a fixed group, registered under
/// the group key. Nodes are freed again if registration fails.
fn component(
    engine: &mut Engine,
    weak: &Weak<RefCell<Engine>>,
    opt: &NormalizedOptions,
    index: usize,
    state: StateRecord,
) -> Result<NodeId> {
    let props: Option<&Properties> = opt.props.get(index);
    let events: Option<&EventSpec> = opt.events.get(index);

    let wrapper = engine.component_wrapper(opt.layout.component_class.as_deref());
    let props = engine.input_properties(props);
    let input = engine.input_node(&props);
    if let Err(err) = engine.register_instance(weak, &opt.group_key, props, state, events, input) {
        engine.document.remove_subtree(input);
        engine.document.remove_subtree(wrapper);
        return Err(err);
    }
    engine.document.append_child(wrapper, input);
    Ok(wrapper)
}
