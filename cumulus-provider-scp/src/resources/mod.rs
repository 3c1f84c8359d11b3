//! Lifecycle drivers
//!
//! A driver turns one resource operation into remote calls: coerce the bag,
//! resolve catalog ids, submit, wait, and project the detail record back into
//! a bag. Drivers are cheap views over the shared API and waiter.

pub mod database;
pub mod engine;
pub mod virtual_server;

use std::collections::HashMap;

use cumulus_core::differ::ChangeSet;
use cumulus_core::resource::Value;
use cumulus_core::schema::ResourceSchema;

use crate::error::{ForbiddenChange, ScpError, ScpResult};
use crate::validation;

pub type Attributes = HashMap<String, Value>;

/// Validate a desired bag and fill in schema defaults
pub(crate) fn prepare(schema: &ResourceSchema, attributes: &Attributes) -> ScpResult<Attributes> {
    validation::into_result(schema.validate(attributes))?;
    let mut prepared = attributes.clone();
    schema.apply_defaults(&mut prepared);
    Ok(prepared)
}

/// Reject every changed attribute outside `allowed`, plus those `extra` flags
pub(crate) fn check_mutable(
    schema: &ResourceSchema,
    prior: &Attributes,
    desired: &Attributes,
    allowed: &[&str],
    extra: impl Fn(&str, Option<&Value>, Option<&Value>) -> bool,
) -> ScpResult<()> {
    let changes = ChangeSet::new(Some(schema), prior, desired);
    let forbidden: Vec<ForbiddenChange> = changes
        .changed_attributes()
        .iter()
        .filter(|name| {
            let (old, new) = changes.get_change(name);
            !allowed.contains(&name.as_str()) || extra(name, old, new)
        })
        .map(|name| {
            if schema.is_sensitive(name) {
                return ForbiddenChange::sensitive(name.as_str());
            }
            let (old, new) = changes.get_change(name);
            ForbiddenChange::new(name.as_str(), old, new)
        })
        .collect();
    if forbidden.is_empty() {
        Ok(())
    } else {
        Err(ScpError::Immutable(forbidden))
    }
}

/// A contract can be chosen once; after that only the next contract changes
pub(crate) fn contract_already_set(name: &str, old: Option<&Value>, _new: Option<&Value>) -> bool {
    name == "contract_period" && old.and_then(Value::as_str).is_some_and(|c| c != "None")
}

/// Write-only input copied from the prior bag
pub(crate) fn echo(attributes: &mut Attributes, prior: &Attributes, name: &str) {
    if let Some(value) = prior.get(name) {
        attributes.insert(name.to_string(), value.clone());
    }
}
