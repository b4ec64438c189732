use formgroup_core::{
    FormError, NodeId, Properties, Result, Snapshot, StateRecord, json_type_name,
};
use indexmap::IndexMap;
use serde_json::Value;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    pub struct InstanceId;
}

#[derive(Debug)]
pub struct Instance {
    pub(crate) group_key: String,
    pub(crate) properties: Properties,
    pub(crate) state: StateRecord,
    pub(crate) node: NodeId,
}

impl Instance {
    pub fn group_key(&self) -> &str {
        &self.group_key
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn state(&self) -> &StateRecord {
        &self.state
    }

    pub fn node(&self) -> NodeId {
        self.node
    }
}

/// Group key to its ordered instances.
///
/// Groups are created by their first instance and never destroyed; removing
/// every instance leaves an empty group behind. Default keys come from a
/// counter that only moves forward.
#[derive(Debug, Default)]
pub struct Registry {
    groups: IndexMap<String, Vec<InstanceId>>,
    instances: SlotMap<InstanceId, Instance>,
    next_group: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a caller-supplied key, or synthesizes `groupN` when none
    /// (or an empty string) is given.
    pub fn allocate_group_key(&mut self, requested: Option<&Value>) -> Result<String> {
        match requested {
            None | Some(Value::Null) => Ok(self.next_default_key()),
            Some(Value::String(key)) if key.is_empty() => Ok(self.next_default_key()),
            Some(Value::String(key)) if self.groups.contains_key(key) => {
                Err(FormError::DuplicateKey(key.clone()))
            }
            Some(Value::String(key)) => Ok(key.clone()),
            Some(other) => Err(FormError::TypeKey(json_type_name(other))),
        }
    }

    fn next_default_key(&mut self) -> String {
        loop {
            let key = format!("group{}", self.next_group);
            self.next_group += 1;
            // skip keys a caller already claimed explicitly
            if !self.groups.contains_key(&key) {
                return key;
            }
        }
    }

    pub fn contains_group(&self, group_key: &str) -> bool {
        self.groups.contains_key(group_key)
    }

    pub fn group(&self, group_key: &str) -> Option<&[InstanceId]> {
        self.groups.get(group_key).map(Vec::as_slice)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &[InstanceId])> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(id)
    }

    pub(crate) fn instance_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.instances.get_mut(id)
    }

    pub fn find_by_node(&self, node: NodeId) -> Option<InstanceId> {
        self.instances
            .iter()
            .find(|(_, inst)| inst.node == node)
            .map(|(id, _)| id)
    }

    /// Number of live instances across all groups.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Appends an instance to `group_key`, creating the group if needed.
    /// Returns whether the group was created.
    pub(crate) fn push(
        &mut self,
        group_key: &str,
        properties: Properties,
        state: StateRecord,
        node: NodeId,
    ) -> (InstanceId, bool) {
        let id = self.instances.insert(Instance {
            group_key: group_key.to_string(),
            properties,
            state,
            node,
        });
        let created = !self.groups.contains_key(group_key);
        self.groups.entry(group_key.to_string()).or_default().push(id);
        (id, created)
    }

    /// Undoes a `push`.
    pub(crate) fn discard_push(&mut self, id: InstanceId, created: bool) {
        let Some(instance) = self.instances.remove(id) else {
            return;
        };
        if created {
            self.groups.shift_remove(&instance.group_key);
        } else if let Some(ids) = self.groups.get_mut(&instance.group_key) {
            ids.retain(|&i| i != id);
        }
    }

    /// Takes the instance at `index` out of its group's sequence. The
    /// instance stays allocated until `release`.
    pub(crate) fn detach_at(&mut self, group_key: &str, index: usize) -> Option<InstanceId> {
        let ids = self.groups.get_mut(group_key)?;
        (index < ids.len()).then(|| ids.remove(index))
    }

    pub(crate) fn reattach_at(&mut self, group_key: &str, index: usize, id: InstanceId) {
        if let Some(ids) = self.groups.get_mut(group_key) {
            let index = index.min(ids.len());
            ids.insert(index, id);
        }
    }

    pub(crate) fn release(&mut self, id: InstanceId) -> Option<Instance> {
        self.instances.remove(id)
    }

    /// Drops a group and every instance in it. The key becomes free again.
    pub(crate) fn remove_group(&mut self, group_key: &str) -> Vec<Instance> {
        let ids = self.groups.shift_remove(group_key).unwrap_or_default();
        ids.into_iter()
            .filter_map(|id| self.instances.remove(id))
            .collect()
    }

    /// Copies every instance state, in registry order.
    pub fn snapshot(&self) -> Snapshot {
        self.groups
            .iter()
            .map(|(key, ids)| {
                let states = ids
                    .iter()
                    .filter_map(|&id| self.instances.get(id))
                    .map(|inst| inst.state.clone())
                    .collect();
                (key.clone(), states)
            })
            .collect()
    }

    /// Overwrites each instance state with its record from `snapshot` and
    /// hands the instance to `render`. Groups or positions absent from the
    /// snapshot are skipped; callers validate coverage first.
    pub(crate) fn apply(&mut self, snapshot: &Snapshot, mut render: impl FnMut(&Instance)) {
        for (key, ids) in &self.groups {
            let Some(records) = snapshot.group(key) else {
                continue;
            };
            for (&id, record) in ids.iter().zip(records) {
                if let Some(instance) = self.instances.get_mut(id) {
                    instance.state = record.clone();
                    render(instance);
                }
            }
        }
    }

    /// First group (in registry order) whose stored states cannot cover its
    /// instances.
    pub(crate) fn uncovered_by(&self, snapshot: &Snapshot) -> Option<String> {
        self.groups.iter().find_map(|(key, ids)| match snapshot.group(key) {
            None => Some(format!("group `{key}` is missing from the store")),
            Some(records) if records.len() < ids.len() => Some(format!(
                "group `{key}` has {} stored states for {} instances",
                records.len(),
                ids.len()
            )),
            Some(_) => None,
        })
    }
}
