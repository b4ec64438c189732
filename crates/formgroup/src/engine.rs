use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::{Rc, Weak};

use formgroup_core::{
    BLUR, CLICK, CssHooks, Document, ElementKind, Event, FormError, INPUT, NodeId, Properties,
    RenderBackend, Result, Snapshot, StateRecord, attribute_text, class_string, json_type_name,
};
use formgroup_store::{SnapshotStore, StoreOptions};
use serde_json::Value;

use crate::instance::{Handler, InstanceRef, instance_listener};
use crate::options::{EventSpec, GroupLayout};
use crate::registry::{Instance, InstanceId, Registry};
use crate::removable::RemovableGroup;

pub(crate) struct Engine {
    pub(crate) store: SnapshotStore,
    pub(crate) registry: Registry,
    pub(crate) document: Document,
    pub(crate) css: CssHooks,
    pub(crate) handlers: HashMap<String, Handler>,
    pub(crate) removables: HashMap<String, Rc<RemovableGroup>>,
}

impl Engine {
    /// The update cycle: flush every instance state, read the file back, then
    /// overwrite and re-render every instance from what was read.
    ///
    /// Nothing is applied unless the reloaded snapshot covers every group.
    pub(crate) fn sync(&mut self) -> Result<()> {
        let snapshot = self.registry.snapshot();
        self.store.write_snapshot(&snapshot)?;
        let reloaded = self.store.read_snapshot()?;
        if let Some(gap) = self.registry.uncovered_by(&reloaded) {
            return Err(FormError::Inconsistent(gap));
        }

        let Engine {
            registry, document, ..
        } = self;
        registry.apply(&reloaded, |instance| render_instance(document, instance));
        log::debug!(
            "synced {} instances across {} groups",
            registry.len(),
            reloaded.len()
        );
        Ok(())
    }

    pub(crate) fn set_state(&mut self, id: InstanceId, state: StateRecord) -> Result<StateRecord> {
        let instance = self
            .registry
            .instance_mut(id)
            .ok_or(FormError::UnknownInstance)?;
        let previous = std::mem::replace(&mut instance.state, state);

        if let Err(err) = self.sync() {
            return Err(self.roll_back(err, |engine| {
                if let Some(instance) = engine.registry.instance_mut(id) {
                    instance.state = previous;
                }
            }));
        }
        self.registry
            .instance(id)
            .map(|inst| inst.state.clone())
            .ok_or(FormError::UnknownInstance)
    }

    /// Appends an instance owning `node` to `group_key`, binds its handlers
    /// and runs the update cycle. On failure the registry is left as it was;
    /// freeing `node` is up to the caller.
    pub(crate) fn register_instance(
        &mut self,
        engine: &Weak<RefCell<Engine>>,
        group_key: &str,
        properties: Properties,
        state: StateRecord,
        events: Option<&EventSpec>,
        node: NodeId,
    ) -> Result<InstanceId> {
        let bindings = self.resolve_bindings(events)?;
        let (id, created) = self.registry.push(group_key, properties, state, node);
        for (event, handler) in bindings {
            self.document
                .add_event_listener(node, event, instance_listener(engine.clone(), id, handler));
        }

        if let Err(err) = self.sync() {
            return Err(self.roll_back(err, |engine| {
                engine.registry.discard_push(id, created);
            }));
        }
        Ok(id)
    }

    /// Runs `undo` after a failed update cycle and writes the restored
    /// registry back. The write may have landed before the cycle failed.
    fn roll_back(&mut self, err: FormError, undo: impl FnOnce(&mut Self)) -> FormError {
        undo(self);
        self.restore_store();
        err
    }

    fn restore_store(&self) {
        if let Err(err) = self.store.write_snapshot(&self.registry.snapshot()) {
            log::warn!("store left as of the failed update: {err}");
        }
    }

    /// Drops a partly built group: its instances, the nodes under `root`
    /// and its entry in the store.
    pub(crate) fn abandon_group(&mut self, group_key: &str, root: NodeId) {
        let released = self.registry.remove_group(group_key);
        self.document.remove_subtree(root);
        if !released.is_empty() {
            self.restore_store();
        }
        log::debug!(
            "abandoned group `{group_key}` after {} registered instances",
            released.len()
        );
    }

    pub(crate) fn resolve_bindings(
        &self,
        events: Option<&EventSpec>,
    ) -> Result<Vec<(String, Handler)>> {
        let Some(events) = events else {
            return Ok(Vec::new());
        };
        events
            .iter()
            .map(|(event, binding)| {
                let handler = match binding {
                    Value::String(name) => self.handlers.get(name).cloned().ok_or_else(|| {
                        FormError::EventHandlerType {
                            event: event.clone(),
                            reason: format!("no handler named `{name}` is registered"),
                        }
                    })?,
                    other => {
                        return Err(FormError::EventHandlerType {
                            event: event.clone(),
                            reason: format!("expected a handler name, got {}", json_type_name(other)),
                        });
                    }
                };
                Ok((event.clone(), handler))
            })
            .collect()
    }

    /// Removes the instance at visual position `index` of `group_key`
    /// together with its component wrapper, then runs the update cycle.
    ///
    /// Registry order and the container's child order must match: the
    /// position alone decides which registry entry goes. When `expected` is
    /// given, the entry found there must be that instance.
    pub(crate) fn remove_at(
        &mut self,
        group_key: &str,
        index: usize,
        expected: Option<InstanceId>,
        container: NodeId,
        wrapper: NodeId,
    ) -> Result<()> {
        let id = self.registry.detach_at(group_key, index).ok_or_else(|| {
            FormError::Inconsistent(format!(
                "group `{group_key}` has no instance at position {index}"
            ))
        })?;
        if expected.is_some_and(|e| e != id) {
            self.registry.reattach_at(group_key, index, id);
            return Err(FormError::Inconsistent(format!(
                "position {index} of group `{group_key}` does not match registry order"
            )));
        }
        self.document.remove_child(container, wrapper);

        if let Err(err) = self.sync() {
            return Err(self.roll_back(err, |engine| {
                engine.registry.reattach_at(group_key, index, id);
                engine.document.insert_child(container, index, wrapper);
            }));
        }
        self.registry.release(id);
        self.document.remove_subtree(wrapper);
        Ok(())
    }

    pub(crate) fn group_wrapper(&mut self, layout: &GroupLayout) -> NodeId {
        let css = &self.css;
        let doc = &mut self.document;
        let root = doc.create_element(ElementKind::Container);
        set_class(doc, root, class_string(&css.form_group, layout.group_class.as_deref()));

        if let Some(heading) = non_empty(&layout.heading) {
            let node = doc.create_element(ElementKind::Heading);
            let class = class_string(&css.form_group_heading, layout.heading_class.as_deref());
            set_class(doc, node, class);
            doc.set_text(node, heading);
            doc.append_child(root, node);
        }
        if let Some(description) = non_empty(&layout.description) {
            let node = doc.create_element(ElementKind::Description);
            let class = class_string(
                &css.form_group_description,
                layout.description_class.as_deref(),
            );
            set_class(doc, node, class);
            doc.set_text(node, description);
            doc.append_child(root, node);
        }
        root
    }

    pub(crate) fn component_wrapper(&mut self, class: Option<&str>) -> NodeId {
        let node = self.document.create_element(ElementKind::Container);
        let class = class_string(&self.css.form_group_component, class);
        set_class(&mut self.document, node, class);
        node
    }

    /// Final attributes of an input: `type` defaults to `text` and `class`
    /// is always set, prefixed with the input CSS hook.
    pub(crate) fn input_properties(&self, props: Option<&Properties>) -> Properties {
        let mut props = props.cloned().unwrap_or_default();
        let has_type = props.get("type").is_some_and(|t| {
            !matches!(t, Value::Null | Value::Bool(false)) && !attribute_text(t).is_empty()
        });
        if !has_type {
            props.insert("type", "text");
        }
        let extra = props.get("class").map(attribute_text);
        props.insert(
            "class",
            class_string(&self.css.form_group_input, extra.as_deref()),
        );
        props
    }

    pub(crate) fn input_node(&mut self, props: &Properties) -> NodeId {
        let node = self.document.create_element(ElementKind::Input);
        for (name, value) in props.reflected() {
            self.document.set_attribute(node, name, attribute_text(value));
        }
        node
    }
}

fn set_class(document: &mut Document, node: NodeId, class: String) {
    if !class.is_empty() {
        document.set_attribute(node, "class", class);
    }
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.is_empty())
}

/// Reflects every state entry onto the instance's node.
pub(crate) fn render_instance(document: &mut Document, instance: &Instance) {
    for (name, value) in instance.state().iter() {
        document.set_attribute(instance.node(), name, attribute_text(value));
    }
    log::trace!(
        "rendered `{}` value={:?}",
        instance.group_key(),
        instance.state().value_text()
    );
}

/// A form whose groups are mirrored to one snapshot file.
///
/// Cloning yields another handle to the same form. Everything runs on the
/// calling thread; each state change blocks on the file round trip.
#[derive(Clone)]
pub struct FormGroup {
    pub(crate) inner: Rc<RefCell<Engine>>,
}

impl FormGroup {
    /// Opens the store at `path` (writing an empty snapshot to probe it) and
    /// returns an empty form.
    pub fn create(path: impl Into<PathBuf>, options: StoreOptions, css: CssHooks) -> Result<Self> {
        let store = SnapshotStore::open(path, options)?;
        log::info!("form store opened at {}", store.path().display());
        Ok(Self {
            inner: Rc::new(RefCell::new(Engine {
                store,
                registry: Registry::new(),
                document: Document::new(),
                css,
                handlers: HashMap::new(),
                removables: HashMap::new(),
            })),
        })
    }

    /// `create` with UTF-8, compact JSON, and no CSS hooks.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::create(path, StoreOptions::default(), CssHooks::default())
    }

    pub(crate) fn weak(&self) -> Weak<RefCell<Engine>> {
        Rc::downgrade(&self.inner)
    }

    pub fn store_path(&self) -> PathBuf {
        self.inner.borrow().store.path().to_path_buf()
    }

    /// Makes `handler` available to `events` bindings under `name`. Groups
    /// built earlier keep the handlers they resolved.
    pub fn register_handler(
        &self,
        name: impl Into<String>,
        handler: impl Fn(&Event, &InstanceRef) -> Result<()> + 'static,
    ) {
        self.inner
            .borrow_mut()
            .handlers
            .insert(name.into(), Rc::new(handler));
    }

    /// Every group as currently stored.
    pub fn get_data(&self) -> Result<Snapshot> {
        Ok(self.inner.borrow().store.read_snapshot()?)
    }

    /// One group as currently stored.
    pub fn get_group_data(&self, group_key: &str) -> Result<Option<Vec<StateRecord>>> {
        Ok(self.get_data()?.into_group(group_key))
    }

    pub fn instances(&self, group_key: &str) -> Vec<InstanceRef> {
        let engine = self.inner.borrow();
        engine
            .registry
            .group(group_key)
            .unwrap_or(&[])
            .iter()
            .map(|&id| InstanceRef::new(self.weak(), id))
            .collect()
    }

    pub fn instance_for_node(&self, node: NodeId) -> Option<InstanceRef> {
        let id = self.inner.borrow().registry.find_by_node(node)?;
        Some(InstanceRef::new(self.weak(), id))
    }

    /// Registry length of a group.
    pub fn group_len(&self, group_key: &str) -> Option<usize> {
        self.inner.borrow().registry.group(group_key).map(<[_]>::len)
    }

    pub fn group_keys(&self) -> Vec<String> {
        self.inner
            .borrow()
            .registry
            .groups()
            .map(|(k, _)| k.to_string())
            .collect()
    }

    /// Read access to the view nodes. Release the borrow before dispatching
    /// events or changing state.
    pub fn document(&self) -> Ref<'_, Document> {
        Ref::map(self.inner.borrow(), |e| &e.document)
    }

    pub fn render(&self, root: NodeId, backend: &mut impl RenderBackend) {
        backend.commit(&self.inner.borrow().document, root);
    }

    /// Runs the listeners bound to `event.kind` on `event.target`, in binding
    /// order. The first failing listener aborts the dispatch.
    pub fn dispatch(&self, event: Event) -> Result<()> {
        let listeners = self
            .inner
            .borrow()
            .document
            .listeners(event.target, &event.kind);
        for listener in listeners {
            listener(&event)?;
        }
        Ok(())
    }

    /// Sets the live value of `node` and fires `input`.
    pub fn input(&self, node: NodeId, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.inner
            .borrow_mut()
            .document
            .set_attribute(node, "value", text.clone());
        self.dispatch(Event::new(INPUT, node).with_value(text))
    }

    pub fn click(&self, node: NodeId) -> Result<()> {
        let event = self.event_with_value(CLICK, node);
        self.dispatch(event)
    }

    /// Moves focus away from `node` and fires `blur`.
    pub fn blur(&self, node: NodeId) -> Result<()> {
        self.inner.borrow_mut().document.blur(node);
        let event = self.event_with_value(BLUR, node);
        self.dispatch(event)
    }

    pub fn focus(&self, node: NodeId) {
        self.inner.borrow_mut().document.focus(node);
    }

    fn event_with_value(&self, kind: &str, node: NodeId) -> Event {
        let engine = self.inner.borrow();
        let event = Event::new(kind, node);
        match engine.document.attribute(node, "value") {
            Some(value) => event.with_value(value),
            None => event,
        }
    }
}

impl std::fmt::Debug for FormGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let engine = self.inner.borrow();
        f.debug_struct("FormGroup")
            .field("path", &engine.store.path())
            .field("groups", &engine.registry.groups().count())
            .field("instances", &engine.registry.len())
            .finish()
    }
}
