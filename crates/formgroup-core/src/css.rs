use serde::Deserialize;

/// Default class strings added to every node of the matching role.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CssHooks {
    pub form_group: String,
    pub form_group_heading: String,
    pub form_group_description: String,
    pub form_group_component: String,
    pub form_group_input: String,
}

impl CssHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form_group(mut self, class: impl Into<String>) -> Self {
        self.form_group = class.into();
        self
    }

    pub fn heading(mut self, class: impl Into<String>) -> Self {
        self.form_group_heading = class.into();
        self
    }

    pub fn description(mut self, class: impl Into<String>) -> Self {
        self.form_group_description = class.into();
        self
    }

    pub fn component(mut self, class: impl Into<String>) -> Self {
        self.form_group_component = class.into();
        self
    }

    pub fn input(mut self, class: impl Into<String>) -> Self {
        self.form_group_input = class.into();
        self
    }
}

/// Joins a default class string with a per-call override.
pub fn class_string(default: &str, extra: Option<&str>) -> String {
    match (default, extra.filter(|s| !s.is_empty())) {
        ("", None) => String::new(),
        ("", Some(b)) => b.to_string(),
        (a, None) => a.to_string(),
        (a, Some(b)) => format!("{a} {b}"),
    }
}
