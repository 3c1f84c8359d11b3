//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource type. The schema is the wire
//! contract with the host engine: attribute types, required/optional/computed
//! flags, force-new, sensitivity, defaults and validators.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::diagnostic::{AttributePath, Diagnostic};
use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Order-preserving list
    List(Box<AttributeType>),
    /// Unordered set
    Set(Box<AttributeType>),
    /// Map with string keys
    Map(Box<AttributeType>),
    /// Nested object with its own attribute schemas
    Object(Box<ObjectSchema>),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::List(inner), Value::List(items))
            | (AttributeType::Set(inner), Value::Set(items))
            | (AttributeType::Set(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Object(object), Value::Map(map)) => {
                for (k, v) in map {
                    match object.attributes.get(k) {
                        Some(schema) => {
                            schema
                                .attr_type
                                .validate(v)
                                .map_err(|e| TypeError::MapValueError {
                                    key: k.clone(),
                                    inner: Box::new(e),
                                })?
                        }
                        None => return Err(TypeError::UnknownAttribute { name: k.clone() }),
                    }
                }
                Ok(())
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name().to_string(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Set(inner) => format!("Set<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Object(_) => "Object".to_string(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

/// Value check attached to an attribute; returns diagnostics located at `path`
pub type ValidateFn = dyn Fn(&Value, &AttributePath) -> Vec<Diagnostic> + Send + Sync;

/// Named validator
#[derive(Clone)]
pub struct Validator {
    pub name: String,
    check: Arc<ValidateFn>,
}

impl Validator {
    pub fn new(
        name: impl Into<String>,
        check: impl Fn(&Value, &AttributePath) -> Vec<Diagnostic> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn check(&self, value: &Value, path: &AttributePath) -> Vec<Diagnostic> {
        (self.check)(value, path)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").field("name", &self.name).finish()
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    pub computed: bool,
    /// A change requires destroy-and-recreate
    pub force_new: bool,
    /// Hidden in plan output
    pub sensitive: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    /// Maximum number of elements for list-like attributes
    pub max_items: Option<usize>,
    pub validators: Vec<Validator>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            computed: false,
            force_new: false,
            sensitive: false,
            default: None,
            description: None,
            max_items: None,
            validators: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    fn validate_value(&self, value: &Value, path: &AttributePath) -> Vec<Diagnostic> {
        if let Err(e) = self.attr_type.validate(value) {
            return vec![Diagnostic::error(e.to_string()).at(path.clone())];
        }

        let mut diagnostics = Vec::new();

        if let (Some(max), Some(items)) = (self.max_items, value.as_items())
            && items.len() > max
        {
            diagnostics.push(
                Diagnostic::error(format!(
                    "at most {} element(s) allowed, got {}",
                    max,
                    items.len()
                ))
                .at(path.clone()),
            );
        }

        for validator in &self.validators {
            diagnostics.extend(validator.check(value, path));
        }

        // Recurse into nested objects
        if let AttributeType::List(inner) | AttributeType::Set(inner) = &self.attr_type
            && let AttributeType::Object(object) = inner.as_ref()
            && let Some(items) = value.as_items()
        {
            for (i, item) in items.iter().enumerate() {
                if let Value::Map(map) = item {
                    diagnostics.extend(object.validate(map, &path.clone().index(i)));
                }
            }
        }
        if let (AttributeType::Object(object), Value::Map(map)) = (&self.attr_type, value) {
            diagnostics.extend(object.validate(map, path));
        }

        diagnostics
    }
}

/// Schema of a nested object
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    pub attributes: HashMap<String, AttributeSchema>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    /// Wrap into a list-of-objects attribute type
    pub fn into_list(self) -> AttributeType {
        AttributeType::List(Box::new(AttributeType::Object(Box::new(self))))
    }

    fn validate(&self, map: &HashMap<String, Value>, path: &AttributePath) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let mut names: Vec<&String> = self.attributes.keys().collect();
        names.sort();
        for name in names {
            let schema = &self.attributes[name];
            let child = path.clone().attribute(name.clone());
            match map.get(name) {
                Some(value) => diagnostics.extend(schema.validate_value(value, &child)),
                None if schema.required && schema.default.is_none() => diagnostics.push(
                    Diagnostic::error(TypeError::MissingRequired { name: name.clone() }.to_string())
                        .at(child),
                ),
                None => {}
            }
        }
        diagnostics
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.get(name)
    }

    /// Validate resource attributes, returning every problem found
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        let mut names: Vec<&String> = self.attributes.keys().collect();
        names.sort();

        // Check required attributes
        for name in &names {
            let schema = &self.attributes[*name];
            if schema.required && !attributes.contains_key(*name) && schema.default.is_none() {
                diagnostics.push(
                    Diagnostic::error(
                        TypeError::MissingRequired {
                            name: (*name).clone(),
                        }
                        .to_string(),
                    )
                    .at(name.as_str()),
                );
            }
        }

        // Type check each attribute in a stable order
        let mut given: Vec<&String> = attributes.keys().collect();
        given.sort();
        for name in given {
            let value = &attributes[name];
            match self.attributes.get(name) {
                Some(schema) => {
                    diagnostics.extend(schema.validate_value(value, &AttributePath::root(name)))
                }
                None => diagnostics.push(
                    Diagnostic::error(TypeError::UnknownAttribute { name: name.clone() }.to_string())
                        .at(name.as_str()),
                ),
            }
        }

        diagnostics
    }

    /// Fill defaults for attributes missing from the bag
    pub fn apply_defaults(&self, attributes: &mut HashMap<String, Value>) {
        for (name, schema) in &self.attributes {
            if let Some(default) = &schema.default
                && !attributes.contains_key(name)
            {
                attributes.insert(name.clone(), default.clone());
            }
        }
    }

    /// Attributes flagged force-new, sorted by name
    pub fn force_new_attributes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .attributes
            .values()
            .filter(|a| a.force_new)
            .map(|a| a.name.as_str())
            .collect();
        names.sort();
        names
    }

    pub fn is_sensitive(&self, name: &str) -> bool {
        self.attributes.get(name).is_some_and(|a| a.sensitive)
    }
}
