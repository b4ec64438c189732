use crate::NodeId;

pub const INPUT: &str = "input";
pub const CLICK: &str = "click";
pub const BLUR: &str = "blur";

/// An interaction delivered to the listeners of one node.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub kind: String,
    pub target: NodeId,
    /// The target's live value when the event fired, if it has one.
    pub value: Option<String>,
}

impl Event {
    pub fn new(kind: impl Into<String>, target: NodeId) -> Self {
        Self {
            kind: kind.into(),
            target,
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn value(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}
