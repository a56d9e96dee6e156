use serde_yaml::{Mapping, Value};
use crate::errors::ReportError;

/// Deep-merge two contexts. `high` takes precedence over `low`.
///
/// Mappings present on both sides are merged recursively. Any other
/// combination keeps the `high` value whole: lists are replaced, never
/// concatenated, and a scalar can replace a mapping.
pub fn merge(high: Value, low: Value) -> Value {
    match (high, low) {
        (Value::Mapping(high), Value::Mapping(low)) => Value::Mapping(merge_mappings(high, low)),
        (high, _) => high,
    }
}

fn merge_mappings(high: Mapping, mut low: Mapping) -> Mapping {
    for (key, high_value) in high {
        match low.get_mut(&key) {
            Some(slot) => {
                let low_value = std::mem::take(slot);
                *slot = merge(high_value, low_value);
            }
            None => {
                low.insert(key, high_value);
            }
        }
    }
    low
}

/// Fold contexts given highest priority first into one.
pub fn merge_all<I>(contexts: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    contexts
        .into_iter()
        .fold(None, |acc: Option<Value>, next| match acc {
            Some(high) => Some(merge(high, next)),
            None => Some(next),
        })
        .unwrap_or_else(|| Value::Mapping(Mapping::new()))
}

/// Require a mapping at `key_path` (dot separated; empty for the root).
pub fn expect_mapping<'a>(value: &'a Value, key_path: &str) -> Result<&'a Mapping, ReportError> {
    let mut current = value;
    let mut walked = Vec::new();
    for part in key_path.split('.').filter(|p| !p.is_empty()) {
        walked.push(part);
        current = current
            .as_mapping()
            .and_then(|m| m.get(part))
            .ok_or_else(|| ReportError::content(walked.join("."), "missing", None))?;
    }
    current.as_mapping().ok_or_else(|| {
        let shown = if key_path.is_empty() { "<root>" } else { key_path };
        ReportError::content(shown, format!("expected a mapping, found {}", kind(current)), None)
    })
}

/// Mutable access to the root mapping of a context.
pub fn root_mapping_mut(value: &mut Value) -> Result<&mut Mapping, ReportError> {
    if value.is_null() {
        *value = Value::Mapping(Mapping::new());
    }
    let found = kind(value);
    value
        .as_mapping_mut()
        .ok_or_else(|| ReportError::content("<root>", format!("expected a mapping, found {}", found), None))
}

pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
