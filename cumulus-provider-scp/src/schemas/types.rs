//! Attribute types and nested blocks shared by SCP resources

use cumulus_core::resource::Value;
use cumulus_core::schema::{AttributeSchema, AttributeType, ObjectSchema};

use crate::backup;
use crate::validation::{self, BACKUP_FREQUENCIES, CLUSTER_STATES, CONTRACTS, DAYS_OF_WEEK};

pub const DISK_TYPES: &[&str] = &["SSD", "HDD"];

pub fn enum_of(values: &[&str]) -> AttributeType {
    AttributeType::Enum(values.iter().map(|v| v.to_string()).collect())
}

pub fn string_set() -> AttributeType {
    AttributeType::Set(Box::new(AttributeType::String))
}

pub fn string_map() -> AttributeType {
    AttributeType::Map(Box::new(AttributeType::String))
}

/// `None`, `1 Year` or `3 Year`, defaulting to `None`
pub fn contract(name: &str) -> AttributeSchema {
    AttributeSchema::new(name, enum_of(CONTRACTS))
        .with_default(Value::string("None"))
        .with_description("Contract period: None, 1 Year or 3 Year")
}

/// Desired power state, defaulting to RUNNING
pub fn power_state(name: &str) -> AttributeSchema {
    AttributeSchema::new(name, enum_of(CLUSTER_STATES))
        .with_default(Value::string("RUNNING"))
        .with_description("RUNNING or STOPPED")
}

pub fn tags() -> AttributeSchema {
    AttributeSchema::new("tags", string_map()).with_description("Tags as key/value pairs")
}

pub fn security_group_ids() -> AttributeSchema {
    AttributeSchema::new("security_group_ids", string_set())
        .required()
        .with_description("Security groups attached to the instance")
}

/// Required, immutable string
pub fn fixed(name: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::String)
        .required()
        .force_new()
}

/// Max-one backup block of a database cluster
pub fn backup() -> AttributeSchema {
    let block = ObjectSchema::new()
        .attribute(
            AttributeSchema::new(backup::OBJECT_STORAGE_ID, AttributeType::String)
                .with_description("Object storage bucket, only used when the backup is created"),
        )
        .attribute(
            AttributeSchema::new(backup::FREQUENCY, enum_of(BACKUP_FREQUENCIES))
                .required()
                .with_description("Archive backup frequency: 5M, 10M, 30M or 1H"),
        )
        .attribute(
            AttributeSchema::new(backup::RETENTION, AttributeType::String)
                .required()
                .with_validator(validation::retention()),
        )
        .attribute(
            AttributeSchema::new(backup::START_HOUR, AttributeType::Int)
                .required()
                .with_validator(validation::int_range(0, 23)),
        )
        .attribute(AttributeSchema::new(
            backup::FULL_BACKUP_DAY,
            enum_of(DAYS_OF_WEEK),
        ));
    AttributeSchema::new(backup::ATTRIBUTE, block.into_list())
        .with_max_items(1)
        .with_description("Backup schedule")
}

/// Max-one maintenance window block
pub fn maintenance() -> AttributeSchema {
    let block = ObjectSchema::new()
        .attribute(
            AttributeSchema::new("start_time", AttributeType::String)
                .required()
                .with_validator(validation::hhmm()),
        )
        .attribute(
            AttributeSchema::new("period", AttributeType::Int)
                .required()
                .with_validator(validation::int_range(1, 6))
                .with_description("Window length in hours"),
        )
        .attribute(AttributeSchema::new("day_of_week", enum_of(DAYS_OF_WEEK)));
    AttributeSchema::new("maintenance", block.into_list())
        .with_max_items(1)
        .force_new()
        .with_description("Maintenance window")
}
