//! Differ - Compare desired state with current state
//!
//! Compares the desired attribute bag handed over by the host with the bag
//! observed from the remote, and reports which attributes changed. Computed
//! attributes the user left unset never count as changes, sets compare without
//! regard to order, and an empty collection is equivalent to an absent one.

use std::collections::{BTreeSet, HashMap};

use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::{AttributeSchema, AttributeType, ResourceSchema};

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
    /// Resource exists but not in desired state -> needs deletion
    Delete(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare desired state with current state to compute a Diff
pub fn diff(schema: Option<&ResourceSchema>, desired: &Resource, current: &State) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = find_changed_attributes(schema, &desired.attributes, &current.attributes);

    if changed.is_empty() {
        Diff::NoChange(desired.id.clone())
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Find changed attributes between desired and current state, sorted by name
pub fn find_changed_attributes(
    schema: Option<&ResourceSchema>,
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
) -> Vec<String> {
    let keys: BTreeSet<&String> = desired.keys().chain(current.keys()).collect();
    let mut changed = Vec::new();

    for key in keys {
        // Skip internal attributes (starting with _)
        if key.starts_with('_') {
            continue;
        }
        let attr = schema.and_then(|s| s.get(key));
        if !attribute_matches(attr, schema.is_some(), desired.get(key), current.get(key)) {
            changed.push(key.clone());
        }
    }

    changed
}

fn attribute_matches(
    attr: Option<&AttributeSchema>,
    schema_known: bool,
    desired: Option<&Value>,
    current: Option<&Value>,
) -> bool {
    match (desired, current) {
        (Some(d), Some(c)) => values_match(attr.map(|a| &a.attr_type), d, c),
        (Some(d), None) => is_empty(d),
        (None, Some(c)) => {
            // Unset computed attributes are owned by the remote, and an unset
            // attribute equals its default. Without a schema, attributes the
            // user never mentioned are not compared.
            !schema_known
                || attr.is_none_or(|a| a.computed || a.default.as_ref() == Some(c))
                || is_empty(c)
        }
        (None, None) => true,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::List(items) | Value::Set(items) => items.is_empty(),
        Value::Map(map) => map.is_empty(),
        _ => false,
    }
}

fn values_match(attr_type: Option<&AttributeType>, desired: &Value, current: &Value) -> bool {
    if let (Some(d), Some(c)) = (desired.as_items(), current.as_items()) {
        let unordered = matches!(desired, Value::Set(_)) || matches!(current, Value::Set(_));
        return match attr_type {
            Some(AttributeType::Set(inner)) => set_matches(Some(inner.as_ref()), d, c),
            Some(AttributeType::List(inner)) => list_matches(Some(inner.as_ref()), d, c),
            _ if unordered => set_matches(None, d, c),
            _ => list_matches(None, d, c),
        };
    }

    match (desired, current) {
        (Value::Map(d), Value::Map(c)) => match attr_type {
            Some(AttributeType::Object(object)) => {
                let keys: BTreeSet<&String> = d.keys().chain(c.keys()).collect();
                keys.into_iter().all(|k| {
                    let nested = object.attributes.get(k);
                    attribute_matches(nested, true, d.get(k), c.get(k))
                })
            }
            Some(AttributeType::Map(_)) => d == c,
            // Unknown shape: the desired keys must be a subset of the current ones
            _ => d
                .iter()
                .all(|(k, v)| c.get(k).is_some_and(|cv| values_match(None, v, cv))),
        },
        _ => desired == current,
    }
}

fn list_matches(inner: Option<&AttributeType>, desired: &[Value], current: &[Value]) -> bool {
    desired.len() == current.len()
        && desired
            .iter()
            .zip(current)
            .all(|(d, c)| values_match(inner, d, c))
}

fn set_matches(inner: Option<&AttributeType>, desired: &[Value], current: &[Value]) -> bool {
    if desired.len() != current.len() {
        return false;
    }
    let mut used = vec![false; current.len()];
    desired.iter().all(|d| {
        match current
            .iter()
            .enumerate()
            .find(|(i, c)| !used[*i] && values_match(inner, d, c))
        {
            Some((i, _)) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

/// Changes between a prior state and the desired state of a single resource
///
/// This is what an update step consults through `has_change` to decide which
/// sub-operations to run.
#[derive(Debug)]
pub struct ChangeSet<'a> {
    prior: &'a HashMap<String, Value>,
    desired: &'a HashMap<String, Value>,
    changed: Vec<String>,
}

impl<'a> ChangeSet<'a> {
    pub fn new(
        schema: Option<&ResourceSchema>,
        prior: &'a HashMap<String, Value>,
        desired: &'a HashMap<String, Value>,
    ) -> Self {
        let changed = find_changed_attributes(schema, desired, prior);
        Self {
            prior,
            desired,
            changed,
        }
    }

    pub fn has_change(&self, name: &str) -> bool {
        self.changed.iter().any(|c| c == name)
    }

    /// (old, new) values of an attribute
    pub fn get_change(&self, name: &str) -> (Option<&'a Value>, Option<&'a Value>) {
        (self.prior.get(name), self.desired.get(name))
    }

    pub fn changed_attributes(&self) -> &[String] {
        &self.changed
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }
}
