//! Persisted engine settings: bundled defaults overlaid with custom values.

use std::collections::HashMap;

use serde_json::Value;

use orrery_types::{SettingValue, SettingsCatalog};

use crate::platform::PreferenceStore;

/// Resolve every catalogue field to the value that should be applied.
///
/// `defaults_json` is a JSON object keyed by field name. Custom values in
/// `custom` win over defaults; booleans are stored as `0`/`1`. Values that do
/// not parse for the field's type are ignored, and a field with neither a
/// default nor a custom value is left out.
pub fn resolve_settings(
    defaults_json: &str,
    custom: &dyn PreferenceStore,
    catalog: &SettingsCatalog,
) -> Vec<(String, SettingValue)> {
    let defaults: HashMap<String, Value> = if defaults_json.trim().is_empty() {
        HashMap::new()
    } else {
        match serde_json::from_str(defaults_json) {
            Ok(map) => map,
            Err(e) => {
                log::warn!(target: "pipeline", "ignoring malformed setting defaults: {}", e);
                HashMap::new()
            }
        }
    };

    let mut resolved = Vec::new();

    for field in &catalog.bools {
        let default = defaults.get(field).and_then(Value::as_i64).and_then(int_to_bool);
        let custom = custom
            .get(field)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(int_to_bool);
        if let Some(value) = custom.or(default) {
            resolved.push((field.clone(), SettingValue::Bool(value)));
        }
    }

    for field in &catalog.ints {
        let default = defaults.get(field).and_then(Value::as_i64);
        let custom = custom.get(field).and_then(|v| v.trim().parse::<i64>().ok());
        if let Some(value) = custom.or(default) {
            resolved.push((field.clone(), SettingValue::Int(value)));
        }
    }

    for field in &catalog.doubles {
        let default = defaults.get(field).and_then(Value::as_f64);
        let custom = custom
            .get(field)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite());
        if let Some(value) = custom.or(default) {
            resolved.push((field.clone(), SettingValue::Double(value)));
        }
    }

    resolved
}

fn int_to_bool(value: i64) -> Option<bool> {
    match value {
        1 => Some(true),
        0 => Some(false),
        _ => None,
    }
}
