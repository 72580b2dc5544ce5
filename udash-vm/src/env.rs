#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use miette::Diagnostic;
use thiserror::Error;

use crate::Value;

#[derive(Debug, Error, Diagnostic)]
pub enum EnvError {
    #[error("environment is not valid JSON")]
    #[diagnostic(code(udash::env::json))]
    Json(#[from] serde_json::Error),

    #[error("environment must be a JSON object")]
    #[diagnostic(code(udash::env::not_an_object))]
    NotAnObject,

    #[error("environment entry `{name}` is not a number, string or array")]
    #[diagnostic(code(udash::env::unsupported))]
    Unsupported { name: String },
}

/// Read-only `name -> value` snapshot of host-provided channels.
///
/// Environment entries are data: naming one pushes its value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Environment {
    values: BTreeMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parses one JSON object, the format the live-channel feed emits per line.
    pub fn from_json(text: &str) -> Result<Self, EnvError> {
        Self::from_json_value(serde_json::from_str(text)?)
    }

    pub fn from_json_value(json: serde_json::Value) -> Result<Self, EnvError> {
        let serde_json::Value::Object(map) = json else {
            return Err(EnvError::NotAnObject);
        };
        let mut env = Self::new();
        for (name, value) in map {
            let Some(value) = convert(&value) else {
                return Err(EnvError::Unsupported { name });
            };
            env.values.insert(name, value);
        }
        Ok(env)
    }

    /// Overlays `other` on top of `self`; later channels win.
    pub fn merge(&mut self, other: Environment) {
        self.values.extend(other.values);
    }
}

fn convert(json: &serde_json::Value) -> Option<Value> {
    match json {
        serde_json::Value::Number(n) => n.as_f64().map(Value::Number),
        serde_json::Value::String(s) => Some(Value::String(s.clone())),
        serde_json::Value::Array(items) => items.iter().map(convert).collect::<Option<Vec<_>>>().map(Value::List),
        _ => None,
    }
}

impl FromIterator<(String, Value)> for Environment {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_numbers_strings_and_arrays() {
        let env = Environment::from_json(r#"{"t": 1.5, "mode": "fast", "xs": [1, [2, "a"]]}"#).unwrap();
        assert_eq!(env.get("t"), Some(&Value::Number(1.5)));
        assert_eq!(env.get("mode"), Some(&Value::from("fast")));
        assert_eq!(
            env.get("xs"),
            Some(&Value::List(vec![
                Value::Number(1.0),
                Value::List(vec![Value::Number(2.0), Value::from("a")]),
            ]))
        );
    }

    #[test]
    fn rejects_non_objects_and_unsupported_values() {
        assert!(matches!(Environment::from_json("[1, 2]"), Err(EnvError::NotAnObject)));
        assert!(matches!(
            Environment::from_json(r#"{"flag": true}"#),
            Err(EnvError::Unsupported { name }) if name == "flag"
        ));
        assert!(matches!(Environment::from_json("{"), Err(EnvError::Json(_))));
    }

    #[test]
    fn merge_overrides() {
        let mut env = Environment::new().with("a", 1.0).with("b", 2.0);
        env.merge(Environment::new().with("b", 3.0));
        assert_eq!(env.get("b"), Some(&Value::Number(3.0)));
        assert_eq!(env.len(), 2);
    }
}
