//! Backup configuration of a database cluster
//!
//! A max-one nested block. Its presence before and after an update decides
//! whether the backup is created, modified or deleted. The object storage
//! bucket can only be chosen at creation and is never reported back.

use std::collections::HashMap;

use cumulus_core::resource::Value;

use crate::client::models::{BackupDetail, BackupRequest};
use crate::coercion::{Bag, object};
use crate::error::ScpResult;

pub const ATTRIBUTE: &str = "backup";
pub const OBJECT_STORAGE_ID: &str = "object_storage_id";
pub const FREQUENCY: &str = "archive_backup_schedule_frequency";
pub const RETENTION: &str = "backup_retention_period";
pub const START_HOUR: &str = "backup_start_hour";
pub const FULL_BACKUP_DAY: &str = "full_backup_day_of_week";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    pub object_storage_id: Option<String>,
    pub frequency: String,
    pub retention: String,
    pub start_hour: i32,
    pub full_backup_day: Option<String>,
}

impl BackupConfig {
    /// The `backup` block of a bag, if present
    pub fn from_bag(bag: Bag<'_>) -> ScpResult<Option<Self>> {
        let Some(nested) = bag.object(ATTRIBUTE)? else {
            return Ok(None);
        };
        let b = nested.bag();
        Ok(Some(Self {
            object_storage_id: b.opt_str(OBJECT_STORAGE_ID)?,
            frequency: b.str(FREQUENCY)?,
            retention: b.str(RETENTION)?,
            start_hour: b.i32(START_HOUR)?,
            full_backup_day: b.opt_str(FULL_BACKUP_DAY)?,
        }))
    }

    /// Request for creating the backup; carries the bucket
    pub fn create_request(&self) -> BackupRequest {
        BackupRequest {
            object_storage_id: self.object_storage_id.clone(),
            ..self.modify_request()
        }
    }

    /// Request for modifying the backup; the bucket is creation-only
    pub fn modify_request(&self) -> BackupRequest {
        BackupRequest {
            object_storage_id: None,
            archive_backup_schedule_frequency: self.frequency.clone(),
            backup_retention_period: self.retention.clone(),
            backup_start_hour: self.start_hour,
            full_backup_day_of_week: self.full_backup_day.clone(),
        }
    }

    fn same_schedule(&self, other: &Self) -> bool {
        self.modify_request() == other.modify_request()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackupAction {
    Keep,
    Create(BackupRequest),
    Modify(BackupRequest),
    Delete,
}

/// Transition between the old and new backup blocks
pub fn transition(old: Option<&BackupConfig>, new: Option<&BackupConfig>) -> BackupAction {
    match (old, new) {
        (None, None) => BackupAction::Keep,
        (None, Some(new)) => BackupAction::Create(new.create_request()),
        (Some(_), None) => BackupAction::Delete,
        (Some(old), Some(new)) if old.same_schedule(new) => BackupAction::Keep,
        (Some(_), Some(new)) => BackupAction::Modify(new.modify_request()),
    }
}

/// Project the remote backup into the bag; the bucket id comes from `prior`
pub fn project(detail: Option<&BackupDetail>, prior: &HashMap<String, Value>) -> Value {
    let Some(detail) = detail else {
        return Value::List(Vec::new());
    };
    let mut fields = vec![
        (
            FREQUENCY,
            Value::string(detail.archive_backup_schedule_frequency.clone()),
        ),
        (
            RETENTION,
            Value::string(detail.backup_retention_period.clone()),
        ),
        (START_HOUR, Value::Int(detail.backup_start_hour as i64)),
    ];
    if let Some(day) = &detail.full_backup_day_of_week {
        fields.push((FULL_BACKUP_DAY, Value::string(day.clone())));
    }
    let bucket = prior
        .get(ATTRIBUTE)
        .and_then(Value::as_items)
        .and_then(|items| items.first())
        .and_then(Value::as_map)
        .and_then(|m| m.get(OBJECT_STORAGE_ID))
        .cloned();
    if let Some(bucket) = bucket {
        fields.push((OBJECT_STORAGE_ID, bucket));
    }
    Value::List(vec![object(fields)])
}
