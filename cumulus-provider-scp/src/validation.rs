//! Validation kit
//!
//! Reusable attribute validators attached to schemas, plus the cross-field
//! checks that a per-attribute validator cannot express (admin account rules
//! depend on the OS type).

use cumulus_core::diagnostic::{AttributePath, Diagnostic};
use cumulus_core::resource::Value;
use cumulus_core::schema::Validator;
use regex::Regex;

use crate::error::{ScpError, ScpResult};

pub const BACKUP_FREQUENCIES: &[&str] = &["5M", "10M", "30M", "1H"];
pub const DAYS_OF_WEEK: &[&str] = &["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];
pub const CONTRACTS: &[&str] = &["None", "1 Year", "3 Year"];
pub const CLUSTER_STATES: &[&str] = &["RUNNING", "STOPPED"];

const LINUX_ADMIN: &str = "root";
const RETENTION_PATTERN: &str = "^(7|8|9|[1-2][0-9]|3[0-5])D$";
const HHMM_PATTERN: &str = "^([01][0-9]|2[0-3])[0-5][0-9]$";

/// Turn collected diagnostics into a validation error
pub fn into_result(diagnostics: Vec<Diagnostic>) -> ScpResult<()> {
    if diagnostics.iter().any(Diagnostic::is_error) {
        Err(ScpError::Validation(diagnostics))
    } else {
        Ok(())
    }
}

fn on_string(
    name: &str,
    check: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
) -> Validator {
    Validator::new(name, move |value, path| match value {
        Value::String(s) => check(s)
            .map(|summary| vec![Diagnostic::error(summary).at(path.clone())])
            .unwrap_or_default(),
        _ => Vec::new(),
    })
}

/// Length in characters within `min..=max`
pub fn string_length(min: usize, max: usize) -> Validator {
    on_string("string_length", move |s| {
        let len = s.chars().count();
        (!(min..=max).contains(&len)).then(|| {
            format!(
                "must be between {} and {} characters, got {}",
                min, max, len
            )
        })
    })
}

/// Full match against `pattern`; `message` describes the expected format
pub fn matches(pattern: &str, message: &'static str) -> Validator {
    let regex = Regex::new(pattern).map_err(|e| e.to_string());
    on_string("matches", move |s| match &regex {
        Ok(re) => (!re.is_match(s)).then(|| format!("{}, got {:?}", message, s)),
        Err(e) => Some(format!("invalid validation pattern: {}", e)),
    })
}

pub fn int_range(min: i64, max: i64) -> Validator {
    Validator::new("int_range", move |value, path| match value {
        Value::Int(n) if !(min..=max).contains(n) => vec![
            Diagnostic::error(format!("must be between {} and {}, got {}", min, max, n))
                .at(path.clone()),
        ],
        _ => Vec::new(),
    })
}

/// 8 to 30 characters mixing letters, digits and special characters
pub fn password() -> Validator {
    on_string("password", |s| {
        let len = s.chars().count();
        if !(8..=30).contains(&len) {
            return Some(format!("must be between 8 and 30 characters, got {}", len));
        }
        let letter = s.chars().any(|c| c.is_ascii_alphabetic());
        let digit = s.chars().any(|c| c.is_ascii_digit());
        let special = s.chars().any(|c| c.is_ascii_punctuation());
        (!(letter && digit && special))
            .then(|| "must contain letters, digits and special characters".to_string())
    })
}

/// Cluster and server names: a leading letter, then letters, digits or hyphens
pub fn resource_name(min: usize, max: usize) -> Validator {
    let pattern = format!("^[a-zA-Z][a-zA-Z0-9-]{{{},{}}}$", min - 1, max - 1);
    let regex = Regex::new(&pattern).map_err(|e| e.to_string());
    on_string("resource_name", move |s| match &regex {
        Ok(re) => (!re.is_match(s)).then(|| {
            format!(
                "must be {} to {} characters starting with a letter and containing only letters, digits and hyphens, got {:?}",
                min, max, s
            )
        }),
        Err(e) => Some(format!("invalid validation pattern: {}", e)),
    })
}

/// `HHMM` time of day
pub fn hhmm() -> Validator {
    matches(HHMM_PATTERN, "must be a time of day in HHMM format")
}

/// Backup retention between 7 and 35 days, written like `14D`
pub fn retention() -> Validator {
    matches(RETENTION_PATTERN, "must be a number of days between 7D and 35D")
}

/// Check the admin account against the OS rules and return the account to send
///
/// Linux images always get `root`, whatever was asked for. Windows
/// requires an account of 5 to 20 characters other than `administrator`.
pub fn resolve_admin_account(os_type: &str, account: Option<&str>) -> ScpResult<String> {
    let path = AttributePath::root("admin_account");
    match os_type {
        "WINDOWS" => {
            let Some(account) = account else {
                return Err(ScpError::invalid(
                    path,
                    "admin_account is required for Windows images",
                ));
            };
            if account.eq_ignore_ascii_case("administrator") {
                return Err(ScpError::invalid(
                    path,
                    "\"administrator\" cannot be used as admin account",
                ));
            }
            let len = account.chars().count();
            if !(5..=20).contains(&len) {
                return Err(ScpError::invalid(
                    path,
                    format!("admin_account must be between 5 and 20 characters, got {}", len),
                ));
            }
            Ok(account.to_string())
        }
        _ => {
            if let Some(other) = account.filter(|a| *a != LINUX_ADMIN) {
                log::warn!(
                    "admin_account {:?} is replaced by {:?} on Linux images",
                    other,
                    LINUX_ADMIN
                );
            }
            Ok(LINUX_ADMIN.to_string())
        }
    }
}
