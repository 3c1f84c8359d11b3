//! Errors of the SCP driver and their mapping onto provider errors

use cumulus_core::context::Cancelled;
use cumulus_core::diagnostic::{AttributePath, Diagnostic};
use cumulus_core::provider::{ErrorKind, ProviderError};
use cumulus_core::resource::Value;

use crate::client::ApiError;

/// An in-place change the resource does not support
#[derive(Debug, Clone, PartialEq)]
pub struct ForbiddenChange {
    pub attribute: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
    /// Values of sensitive attributes are never kept
    pub sensitive: bool,
}

impl ForbiddenChange {
    pub fn new(attribute: impl Into<String>, old: Option<&Value>, new: Option<&Value>) -> Self {
        Self {
            attribute: attribute.into(),
            old: old.cloned(),
            new: new.cloned(),
            sensitive: false,
        }
    }

    /// Change of a secret, recorded without its values
    pub fn sensitive(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            old: None,
            new: None,
            sensitive: true,
        }
    }
}

impl std::fmt::Display for ForbiddenChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.sensitive {
            return write!(f, "{} (sensitive)", self.attribute);
        }
        let show = |v: &Option<Value>| match v {
            Some(v) => v.to_string(),
            None => "null".to_string(),
        };
        write!(
            f,
            "{} ({} -> {})",
            self.attribute,
            show(&self.old),
            show(&self.new)
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScpError {
    #[error("{}", join(.0))]
    Validation(Vec<Diagnostic>),

    #[error("no {what} matches {wanted} in service zone {service_zone_id}")]
    CatalogMiss {
        what: &'static str,
        wanted: String,
        service_zone_id: String,
    },

    #[error("cannot change in place: {}", .0.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", "))]
    Immutable(Vec<ForbiddenChange>),

    /// A change that breaks an ordering or growth rule of nested elements
    #[error("{}", join(.0))]
    InvalidChange(Vec<Diagnostic>),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("timed out waiting for {what} to become {target}, last state {last_state}")]
    Timeout {
        what: String,
        target: String,
        last_state: String,
    },

    #[error("{what} reached unexpected state {state}, expected {target}")]
    UnexpectedState {
        what: String,
        state: String,
        target: String,
    },

    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error("{0}")]
    Internal(String),
}

fn join(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type ScpResult<T> = Result<T, ScpError>;

impl ScpError {
    /// Single validation problem at `path`
    pub fn invalid(path: impl Into<AttributePath>, summary: impl Into<String>) -> Self {
        ScpError::Validation(vec![Diagnostic::error(summary).at(path)])
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ScpError::Validation(_) => ErrorKind::Validation,
            ScpError::CatalogMiss { .. } => ErrorKind::CatalogMiss,
            ScpError::Immutable(_) | ScpError::InvalidChange(_) => ErrorKind::Immutable,
            ScpError::Api(e) if e.is_not_found() => ErrorKind::NotFound,
            ScpError::Api(e) if e.is_transient() => ErrorKind::Transport,
            ScpError::Api(ApiError::Status { .. }) => ErrorKind::Remote,
            ScpError::Api(_) => ErrorKind::Transport,
            ScpError::NotFound { .. } => ErrorKind::NotFound,
            ScpError::Timeout { .. } => ErrorKind::Timeout,
            ScpError::UnexpectedState { .. } => ErrorKind::Remote,
            ScpError::Cancelled(_) => ErrorKind::Cancelled,
            ScpError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            ScpError::Validation(diags) | ScpError::InvalidChange(diags) => diags.clone(),
            ScpError::Immutable(changes) => changes
                .iter()
                .map(|c| {
                    Diagnostic::error(format!("{} cannot be changed in place", c.attribute))
                        .with_detail(c.to_string())
                        .at(c.attribute.as_str())
                })
                .collect(),
            ScpError::CatalogMiss { .. } => vec![
                Diagnostic::error(self.to_string())
                    .with_detail("check the values offered by the product catalog of the region"),
            ],
            other => vec![Diagnostic::error(other.to_string())],
        }
    }
}

impl From<ScpError> for ProviderError {
    fn from(e: ScpError) -> Self {
        let kind = e.kind();
        let diagnostics = e.diagnostics();
        let mut err = ProviderError::new(e.to_string()).with_kind(kind);
        for d in diagnostics {
            err = err.with_diagnostic(d);
        }
        err.with_cause(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Method;

    #[test]
    fn immutable_lists_every_change() {
        let err = ScpError::Immutable(vec![
            ForbiddenChange::new(
                "image_id",
                Some(&Value::string("img-1")),
                Some(&Value::string("img-2")),
            ),
            ForbiddenChange::new("database_port", Some(&Value::Int(3306)), Some(&Value::Int(3307))),
            ForbiddenChange::sensitive("database_user_password"),
        ]);
        assert_eq!(
            err.to_string(),
            "cannot change in place: image_id (\"img-1\" -> \"img-2\"), database_port (3306 -> 3307), database_user_password (sensitive)"
        );

        let provider_err = ProviderError::from(err);
        assert_eq!(provider_err.kind, ErrorKind::Immutable);
        assert_eq!(provider_err.diagnostics.len(), 3);
        assert_eq!(
            provider_err.diagnostics[1].attribute,
            Some(AttributePath::root("database_port"))
        );
    }

    #[test]
    fn api_errors_are_classified() {
        let gone = ScpError::from(ApiError::from_status(Method::Get, "/x", 404, ""));
        assert_eq!(gone.kind(), ErrorKind::NotFound);

        let rejected = ScpError::from(ApiError::from_status(
            Method::Post,
            "/x",
            400,
            r#"{"Code":"INVALID","Message":"bad subnet"}"#,
        ));
        assert_eq!(rejected.kind(), ErrorKind::Remote);
        assert!(rejected.to_string().contains("bad subnet"));

        let flaky = ScpError::from(ApiError::from_status(Method::Get, "/x", 502, ""));
        assert_eq!(flaky.kind(), ErrorKind::Transport);
    }

    #[test]
    fn cancelled_maps_to_cancelled_kind() {
        let err = ProviderError::from(ScpError::from(Cancelled));
        assert!(err.is_cancelled());
    }
}
