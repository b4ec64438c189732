//! Caller options and their canonical form.
//!
//! Options are plain data (they deserialize from JSON). Fields whose shape
//! varies are carried as `serde_json::Value` and checked here, before
//! anything touches the registry.

use formgroup_core::{
    FormError, Properties, Result, StateRecord, VALUE_KEY, is_valid_value, json_type_name,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::registry::Registry;

pub const DEFAULT_MAX: usize = 10;
pub const ADD_NEW_LABEL: &str = "Add New";
pub const REMOVE_LABEL: &str = "x";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupOptions {
    pub group_key: Option<Value>,
    pub state: Option<Value>,
    pub props: Option<Value>,
    pub events: Option<Value>,
    pub heading: Option<String>,
    pub description: Option<String>,
    pub group_class: Option<String>,
    pub heading_class: Option<String>,
    pub description_class: Option<String>,
    pub component_class: Option<String>,
    /// Removable groups only.
    pub max: Option<Value>,
    pub add_new_button: Option<Value>,
    pub remove_button: Option<Value>,
}

impl GroupOptions {
    pub fn new(state: impl Into<Value>) -> Self {
        Self {
            state: Some(state.into()),
            ..Self::default()
        }
    }

    pub fn group_key(mut self, key: impl Into<Value>) -> Self {
        self.group_key = Some(key.into());
        self
    }

    pub fn props(mut self, props: impl Into<Value>) -> Self {
        self.props = Some(props.into());
        self
    }

    pub fn events(mut self, events: impl Into<Value>) -> Self {
        self.events = Some(events.into());
        self
    }

    pub fn heading(mut self, heading: impl Into<String>) -> Self {
        self.heading = Some(heading.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn group_class(mut self, class: impl Into<String>) -> Self {
        self.group_class = Some(class.into());
        self
    }

    pub fn heading_class(mut self, class: impl Into<String>) -> Self {
        self.heading_class = Some(class.into());
        self
    }

    pub fn description_class(mut self, class: impl Into<String>) -> Self {
        self.description_class = Some(class.into());
        self
    }

    pub fn component_class(mut self, class: impl Into<String>) -> Self {
        self.component_class = Some(class.into());
        self
    }

    pub fn max(mut self, max: impl Into<Value>) -> Self {
        self.max = Some(max.into());
        self
    }

    pub fn add_new_button(mut self, attrs: impl Into<Value>) -> Self {
        self.add_new_button = Some(attrs.into());
        self
    }

    pub fn remove_button(mut self, attrs: impl Into<Value>) -> Self {
        self.remove_button = Some(attrs.into());
        self
    }
}

/// Heading, description, and per-call class overrides of a group wrapper.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupLayout {
    pub heading: Option<String>,
    pub description: Option<String>,
    pub group_class: Option<String>,
    pub heading_class: Option<String>,
    pub description_class: Option<String>,
    pub component_class: Option<String>,
}

/// Event type to the name of a registered handler.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventSpec(Map<String, Value>);

impl EventSpec {
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct NormalizedOptions {
    pub group_key: String,
    /// Never empty.
    pub state: Vec<StateRecord>,
    pub props: Vec<Properties>,
    pub events: Vec<EventSpec>,
    pub layout: GroupLayout,
}

/// Validates `options` and allocates the group key. Shape errors are raised
/// before the key is allocated, so a rejected call leaves `registry`
/// untouched.
pub fn normalize(options: GroupOptions, registry: &mut Registry) -> Result<NormalizedOptions> {
    let GroupOptions {
        group_key,
        state,
        props,
        events,
        heading,
        description,
        group_class,
        heading_class,
        description_class,
        component_class,
        ..
    } = options;

    let state = normalize_state(state.as_ref())?;
    let props = normalize_records("props", props.as_ref())?
        .into_iter()
        .map(Properties::from_map)
        .collect();
    let events = normalize_records("events", events.as_ref())?
        .into_iter()
        .map(EventSpec)
        .collect();
    let group_key = registry.allocate_group_key(group_key.as_ref())?;

    Ok(NormalizedOptions {
        group_key,
        state,
        props,
        events,
        layout: GroupLayout {
            heading,
            description,
            group_class,
            heading_class,
            description_class,
            component_class,
        },
    })
}

/// Scalar, record, or a non-empty sequence of either, to a sequence of
/// `{ value, ... }` records.
///
/// A missing or top-level `null` state is `ConfigShape`. Inside a sequence,
/// `null` and booleans are coerced to `{ value: "" }`, as is a top-level
/// boolean.
pub fn normalize_state(state: Option<&Value>) -> Result<Vec<StateRecord>> {
    match state {
        None | Some(Value::Null) => Err(shape("`state` is required")),
        Some(Value::Array(items)) if items.is_empty() => Err(shape("`state` is an empty array")),
        Some(Value::Array(items)) => items.iter().map(state_entry).collect(),
        Some(other) => Ok(vec![state_entry(other)?]),
    }
}

fn state_entry(entry: &Value) -> Result<StateRecord> {
    match entry {
        Value::Object(map) => match map.get(VALUE_KEY) {
            None => Err(shape("`state` object must include a `value` key")),
            Some(value) if is_valid_value(value) => Ok(StateRecord::from_map(map.clone())),
            Some(_) => Ok(StateRecord::empty()),
        },
        Value::Array(_) => Err(shape("`state` entries cannot be arrays")),
        scalar if is_valid_value(scalar) => Ok(StateRecord::new(scalar.clone())),
        _ => Ok(StateRecord::empty()),
    }
}

/// A record or a non-empty sequence of records. Absent means none.
pub fn normalize_records(name: &str, value: Option<&Value>) -> Result<Vec<Map<String, Value>>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) if items.is_empty() => {
            Err(shape(format!("`{name}` is an empty array")))
        }
        Some(Value::Array(items)) => items.iter().map(|item| record(name, item)).collect(),
        Some(other) => Ok(vec![record(name, other)?]),
    }
}

fn record(name: &str, value: &Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map.clone()),
        other => Err(shape(format!(
            "`{name}` must be an object, got {}",
            json_type_name(other)
        ))),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemovableSettings {
    pub max: usize,
    pub add_new_button: Properties,
    pub remove_button: Properties,
}

pub fn removable_settings(options: &GroupOptions) -> Result<RemovableSettings> {
    Ok(RemovableSettings {
        max: parse_max(options.max.as_ref())?,
        add_new_button: button("addNewButton", options.add_new_button.as_ref(), ADD_NEW_LABEL)?,
        remove_button: button("removeButton", options.remove_button.as_ref(), REMOVE_LABEL)?,
    })
}

/// Integer prefix parse of a number or numeric string. `null`, `0` and `""`
/// select the default.
pub fn parse_max(max: Option<&Value>) -> Result<usize> {
    let parsed = match max {
        None | Some(Value::Null) => return Ok(DEFAULT_MAX),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(0) => return Ok(DEFAULT_MAX),
            Some(i) => i,
            None => match n.as_f64() {
                Some(f) if f == 0.0 => return Ok(DEFAULT_MAX),
                Some(f) => f.trunc() as i64,
                None => return Err(shape("`max` must be a number")),
            },
        },
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(DEFAULT_MAX),
        Some(Value::String(s)) => {
            integer_prefix(s).ok_or_else(|| shape(format!("`max` must be a number, got {s:?}")))?
        }
        Some(other) => {
            return Err(shape(format!(
                "`max` must be a number, got {}",
                json_type_name(other)
            )));
        }
    };
    usize::try_from(parsed)
        .ok()
        .filter(|&m| m >= 1)
        .ok_or_else(|| shape(format!("`max` must be at least 1, got {parsed}")))
}

fn integer_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

fn button(name: &str, attrs: Option<&Value>, label: &str) -> Result<Properties> {
    let mut props = match attrs {
        None | Some(Value::Null) => Properties::new(),
        Some(Value::Object(map)) => Properties::from_map(map.clone()),
        Some(other) => {
            return Err(shape(format!(
                "`{name}` must be an object, got {}",
                json_type_name(other)
            )));
        }
    };
    let has_label = props.get(VALUE_KEY).is_some_and(|v| match v {
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
        _ => false,
    });
    if !has_label {
        props.insert(VALUE_KEY, label);
    }
    props.insert("type", "button");
    Ok(props)
}

fn shape(msg: impl Into<String>) -> FormError {
    FormError::ConfigShape(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(states: &[StateRecord]) -> Vec<Value> {
        states.iter().map(|s| s.value().cloned().unwrap_or(Value::Null)).collect()
    }

    #[test]
    fn test_state_scalar_record_and_sequence() {
        let scalar = normalize_state(Some(&json!("hello"))).unwrap();
        assert_eq!(scalar, vec![StateRecord::new("hello")]);

        let record = normalize_state(Some(&json!({ "value": 3, "title": "t" }))).unwrap();
        assert_eq!(record.len(), 1);
        assert_eq!(record[0].get("title"), Some(&json!("t")));

        let seq = normalize_state(Some(&json!([1, "two", { "value": 3 }]))).unwrap();
        assert_eq!(values(&seq), vec![json!(1), json!("two"), json!(3)]);
    }

    #[test]
    fn test_state_invalid_values_become_empty() {
        let seq = normalize_state(Some(&json!([true, null, { "value": {}, "title": "dropped" }])))
            .unwrap();
        assert_eq!(seq, vec![StateRecord::empty(); 3]);

        assert_eq!(normalize_state(Some(&json!(false))).unwrap(), vec![StateRecord::empty()]);
    }

    #[test]
    fn test_state_shape_errors() {
        for bad in [
            None,
            Some(json!(null)),
            Some(json!([])),
            Some(json!({ "title": "no value" })),
            Some(json!([[1]])),
        ] {
            let err = normalize_state(bad.as_ref()).unwrap_err();
            assert!(matches!(err, FormError::ConfigShape(_)), "{bad:?}: {err}");
        }
    }

    #[test]
    fn test_null_rejected_only_at_top_level() {
        assert!(matches!(
            normalize_state(Some(&json!(null))),
            Err(FormError::ConfigShape(msg)) if msg.contains("required")
        ));
        assert_eq!(
            normalize_state(Some(&json!([null, "x"]))).unwrap(),
            vec![StateRecord::empty(), StateRecord::new("x")]
        );
    }

    #[test]
    fn test_zero_is_a_valid_state() {
        assert_eq!(normalize_state(Some(&json!(0))).unwrap(), vec![StateRecord::new(0)]);
        assert_eq!(normalize_state(Some(&json!(""))).unwrap(), vec![StateRecord::empty()]);
    }

    #[test]
    fn test_records() {
        assert!(normalize_records("props", None).unwrap().is_empty());
        assert_eq!(normalize_records("props", Some(&json!({ "a": 1 }))).unwrap().len(), 1);
        assert_eq!(
            normalize_records("props", Some(&json!([{ "a": 1 }, {}]))).unwrap().len(),
            2
        );
        assert!(matches!(
            normalize_records("props", Some(&json!([]))),
            Err(FormError::ConfigShape(msg)) if msg.contains("empty")
        ));
        assert!(matches!(
            normalize_records("events", Some(&json!([{}, "x"]))),
            Err(FormError::ConfigShape(msg)) if msg.contains("events")
        ));
    }

    #[test]
    fn test_normalize_allocates_key_after_validation() {
        let mut registry = Registry::new();
        let err = normalize(GroupOptions::new(json!([])), &mut registry).unwrap_err();
        assert!(matches!(err, FormError::ConfigShape(_)));

        let opt = normalize(GroupOptions::new("a").heading("H"), &mut registry).unwrap();
        assert_eq!(opt.group_key, "group0");
        assert_eq!(opt.layout.heading.as_deref(), Some("H"));
        assert!(opt.props.is_empty());
        assert!(opt.events.is_empty());
    }

    #[test]
    fn test_options_deserialize() {
        let opts: GroupOptions = serde_json::from_value(json!({
            "groupKey": "names",
            "state": [1, 2],
            "componentClass": "mb-1",
            "max": "4",
            "removeButton": { "value": "remove" }
        }))
        .unwrap();
        assert_eq!(opts.group_key, Some(json!("names")));
        assert_eq!(opts.component_class.as_deref(), Some("mb-1"));

        let settings = removable_settings(&opts).unwrap();
        assert_eq!(settings.max, 4);
        assert_eq!(settings.remove_button.get_str("value"), Some("remove"));
        assert_eq!(settings.remove_button.get_str("type"), Some("button"));
        assert_eq!(settings.add_new_button.get_str("value"), Some(ADD_NEW_LABEL));
    }

    #[test]
    fn test_parse_max() {
        assert_eq!(parse_max(None).unwrap(), DEFAULT_MAX);
        assert_eq!(parse_max(Some(&json!(0))).unwrap(), DEFAULT_MAX);
        assert_eq!(parse_max(Some(&json!(""))).unwrap(), DEFAULT_MAX);
        assert_eq!(parse_max(Some(&json!(3))).unwrap(), 3);
        assert_eq!(parse_max(Some(&json!(3.9))).unwrap(), 3);
        assert_eq!(parse_max(Some(&json!("7 items"))).unwrap(), 7);
        assert!(parse_max(Some(&json!("many"))).is_err());
        assert!(parse_max(Some(&json!(-2))).is_err());
        assert!(parse_max(Some(&json!(true))).is_err());
    }

    #[test]
    fn test_button_type_is_forced() {
        let opts = GroupOptions::new(1).add_new_button(json!({ "type": "submit", "class": "btn" }));
        let settings = removable_settings(&opts).unwrap();
        assert_eq!(settings.add_new_button.get_str("type"), Some("button"));
        assert_eq!(settings.add_new_button.get_str("class"), Some("btn"));
        assert_eq!(settings.remove_button.get_str("value"), Some(REMOVE_LABEL));
    }
}
