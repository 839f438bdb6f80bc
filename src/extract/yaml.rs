//! YAML to canonical JSON conversion

use crate::error::{Error, Result};
use serde_json::{Map, Number, Value};
use serde_yaml::Value as Yaml;

/// Parse a YAML document and re-encode it as compact JSON text.
pub fn yaml_to_json(src: &str) -> Result<String> {
    let yaml: Yaml = serde_yaml::from_str(src)?;
    let json = to_json_value(yaml)?;
    Ok(serde_json::to_string(&json)?)
}

/// Convert a loosely-typed YAML value into a JSON value.
///
/// Mapping keys that are numbers or booleans are stringified; any other
/// non-string key is rejected. Non-finite floats have no JSON form.
pub fn to_json_value(yaml: Yaml) -> Result<Value> {
    match yaml {
        Yaml::Null => Ok(Value::Null),
        Yaml::Bool(b) => Ok(Value::Bool(b)),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(i.into()))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(u.into()))
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| Error::Unrepresentable(n.to_string()))
            }
        }
        Yaml::String(s) => Ok(Value::String(s)),
        Yaml::Sequence(items) => items
            .into_iter()
            .map(to_json_value)
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Yaml::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                map.insert(key_to_string(key)?, to_json_value(value)?);
            }
            Ok(Value::Object(map))
        }
        Yaml::Tagged(tagged) => to_json_value(tagged.value),
    }
}

fn key_to_string(key: Yaml) -> Result<String> {
    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_string()),
        other => Err(Error::Unrepresentable(format!("mapping key {:?}", other))),
    }
}
