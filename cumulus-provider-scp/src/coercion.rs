//! Attribute coercion
//!
//! Typed reads out of the host's attribute bag, and conversions between bag
//! values and JSON for engine specific request fields. Integers the remote
//! declares as int32 never widen; strings are passed through untouched.

use std::collections::{BTreeMap, HashMap};

use cumulus_core::diagnostic::AttributePath;
use cumulus_core::resource::Value;

use crate::error::{ScpError, ScpResult};

/// Read-only view of an attribute bag, or of one nested object inside it
#[derive(Debug, Clone, Copy)]
pub struct Bag<'a> {
    attributes: &'a HashMap<String, Value>,
    path: Option<&'a AttributePath>,
}

/// Nested object of a bag together with its owned path
#[derive(Debug, Clone)]
pub struct Nested<'a> {
    attributes: &'a HashMap<String, Value>,
    path: AttributePath,
}

impl<'a> Nested<'a> {
    pub fn bag(&self) -> Bag<'_> {
        Bag {
            attributes: self.attributes,
            path: Some(&self.path),
        }
    }

    pub fn path(&self) -> &AttributePath {
        &self.path
    }
}

impl<'a> Bag<'a> {
    pub fn new(attributes: &'a HashMap<String, Value>) -> Self {
        Self {
            attributes,
            path: None,
        }
    }

    pub fn path(&self, name: &str) -> AttributePath {
        match self.path {
            Some(parent) => parent.clone().attribute(name),
            None => AttributePath::root(name),
        }
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.attributes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    fn mismatch(&self, name: &str, expected: &str, got: &Value) -> ScpError {
        ScpError::invalid(
            self.path(name),
            format!("expected {}, got {}", expected, got.type_name()),
        )
    }

    fn missing(&self, name: &str) -> ScpError {
        ScpError::invalid(self.path(name), format!("{} is required", name))
    }

    pub fn opt_str(&self, name: &str) -> ScpResult<Option<String>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.mismatch(name, "a string", other)),
        }
    }

    pub fn str(&self, name: &str) -> ScpResult<String> {
        self.opt_str(name)?.ok_or_else(|| self.missing(name))
    }

    pub fn str_or(&self, name: &str, default: &str) -> ScpResult<String> {
        Ok(self.opt_str(name)?.unwrap_or_else(|| default.to_string()))
    }

    pub fn opt_i32(&self, name: &str) -> ScpResult<Option<i32>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Int(n)) => i32::try_from(*n).map(Some).map_err(|_| {
                ScpError::invalid(
                    self.path(name),
                    format!("{} does not fit in a 32-bit integer", n),
                )
            }),
            Some(other) => Err(self.mismatch(name, "an integer", other)),
        }
    }

    pub fn i32(&self, name: &str) -> ScpResult<i32> {
        self.opt_i32(name)?.ok_or_else(|| self.missing(name))
    }

    pub fn opt_bool(&self, name: &str) -> ScpResult<Option<bool>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.mismatch(name, "a bool", other)),
        }
    }

    pub fn bool_or(&self, name: &str, default: bool) -> ScpResult<bool> {
        Ok(self.opt_bool(name)?.unwrap_or(default))
    }

    /// Strings of a list or set attribute, in stored order; absent is empty
    pub fn strings(&self, name: &str) -> ScpResult<Vec<String>> {
        let Some(value) = self.get(name) else {
            return Ok(Vec::new());
        };
        let items = value
            .as_items()
            .ok_or_else(|| self.mismatch(name, "a list", value))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(ScpError::invalid(
                    self.path(name).index(i),
                    format!("expected a string, got {}", other.type_name()),
                )),
            })
            .collect()
    }

    /// String map attribute such as `tags`; absent is empty
    pub fn string_map(&self, name: &str) -> ScpResult<BTreeMap<String, String>> {
        let Some(value) = self.get(name) else {
            return Ok(BTreeMap::new());
        };
        let map = value
            .as_map()
            .ok_or_else(|| self.mismatch(name, "a map", value))?;
        map.iter()
            .map(|(k, v)| match v {
                Value::String(s) => Ok((k.clone(), s.clone())),
                other => Err(ScpError::invalid(
                    self.path(name).key(k.clone()),
                    format!("expected a string, got {}", other.type_name()),
                )),
            })
            .collect()
    }

    /// Elements of a list of nested objects
    pub fn objects(&self, name: &str) -> ScpResult<Vec<Nested<'a>>> {
        let Some(value) = self.get(name) else {
            return Ok(Vec::new());
        };
        let items = value
            .as_items()
            .ok_or_else(|| self.mismatch(name, "a list", value))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let path = self.path(name).index(i);
                match item {
                    Value::Map(map) => Ok(Nested {
                        attributes: map,
                        path,
                    }),
                    other => Err(ScpError::invalid(
                        path,
                        format!("expected an object, got {}", other.type_name()),
                    )),
                }
            })
            .collect()
    }

    /// The single element of a max-one nested block
    pub fn object(&self, name: &str) -> ScpResult<Option<Nested<'a>>> {
        Ok(self.objects(name)?.into_iter().next())
    }
}

/// Bag value to JSON for free-form request fields
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Int(n) => serde_json::Value::from(*n),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::List(items) | Value::Set(items) => {
            serde_json::Value::Array(items.iter().map(value_to_json).collect())
        }
        Value::Map(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
    }
}

/// JSON from a response to a bag value; `null` and fractional numbers have
/// no bag counterpart
pub fn json_to_value(json: &serde_json::Value) -> Option<Value> {
    match json {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
        serde_json::Value::Number(n) => n.as_i64().map(Value::Int),
        serde_json::Value::String(s) => Some(Value::String(s.clone())),
        serde_json::Value::Array(items) => {
            Some(Value::List(items.iter().filter_map(json_to_value).collect()))
        }
        serde_json::Value::Object(map) => Some(Value::Map(
            map.iter()
                .filter_map(|(k, v)| json_to_value(v).map(|v| (k.clone(), v)))
                .collect(),
        )),
    }
}

/// Set of strings for projection
pub fn string_set<S: Into<String>>(items: impl IntoIterator<Item = S>) -> Value {
    Value::Set(items.into_iter().map(|s| Value::String(s.into())).collect())
}

/// String map for projection
pub fn string_map_value(map: BTreeMap<String, String>) -> Value {
    Value::Map(
        map.into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect(),
    )
}

/// Nested object for projection
pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Value {
    Value::Map(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
}
