//! Provider - Trait abstracting resource operations
//!
//! A Provider defines operations for a specific cloud. The host engine calls
//! into it with desired and prior state; the provider converges the remote
//! and reports the observed state back.

use std::future::Future;
use std::pin::Pin;

use crate::context::{Cancelled, OperationContext};
use crate::diagnostic::Diagnostic;
use crate::resource::{Resource, ResourceId, State};
use crate::schema::ResourceSchema;

/// Classification of a provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Desired state failed validation; no remote call was made
    Validation,
    /// A desired attribute could not be mapped to a catalog identifier
    CatalogMiss,
    /// Update touched attributes that cannot change in place
    Immutable,
    /// Transport failure that persisted after retries
    Transport,
    /// The remote reported the resource as missing
    NotFound,
    /// The remote rejected the request with a message
    Remote,
    /// A wait did not reach its target state in time
    Timeout,
    /// The host cancelled the operation
    Cancelled,
    /// Anything else
    Internal,
}

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
    pub resource_id: Option<ResourceId>,
    pub diagnostics: Vec<Diagnostic>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}.{}] {}", id.resource_type, id.name, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into(),
            resource_id: None,
            diagnostics: Vec::new(),
            cause: None,
        }
    }

    /// Error made of validation diagnostics
    pub fn from_diagnostics(kind: ErrorKind, diagnostics: Vec<Diagnostic>) -> Self {
        let message = diagnostics
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            kind,
            message,
            resource_id: None,
            diagnostics,
            cause: None,
        }
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Diagnostics for the host; a bare error becomes a single diagnostic
    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        if self.diagnostics.is_empty() {
            vec![Diagnostic::error(self.to_string())]
        } else {
            self.diagnostics.clone()
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

impl From<Cancelled> for ProviderError {
    fn from(e: Cancelled) -> Self {
        ProviderError::new(e.to_string())
            .with_kind(ErrorKind::Cancelled)
            .with_cause(e)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "mariadb")
    fn name(&self) -> &'static str;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema;
}

/// Main Provider trait
///
/// All remote operations are async and involve side effects. The host never
/// re-enters the same resource instance concurrently.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "scp")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Validate a desired state before any remote call
    fn validate(&self, resource: &Resource) -> Vec<Diagnostic>;

    /// Pre-apply hook: reject changes that cannot be applied in place
    fn plan_update(&self, from: &State, to: &Resource) -> ProviderResult<()>;

    /// Get the current state of a resource
    ///
    /// `prior` is the last persisted state, used for write-only attributes the
    /// remote never returns. Returns `State::not_found()` if the resource is gone.
    fn read<'a>(
        &'a self,
        ctx: &'a OperationContext,
        id: &'a ResourceId,
        identifier: &'a str,
        prior: Option<&'a State>,
    ) -> BoxFuture<'a, ProviderResult<State>>;

    /// Create a resource
    ///
    /// Returns State with identifier set to the remote id
    fn create<'a>(
        &'a self,
        ctx: &'a OperationContext,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>>;

    /// Update a resource in place
    fn update<'a>(
        &'a self,
        ctx: &'a OperationContext,
        identifier: &'a str,
        from: &'a State,
        to: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>>;

    /// Delete a resource
    fn delete<'a>(
        &'a self,
        ctx: &'a OperationContext,
        id: &'a ResourceId,
        identifier: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn validate(&self, resource: &Resource) -> Vec<Diagnostic> {
        (**self).validate(resource)
    }

    fn plan_update(&self, from: &State, to: &Resource) -> ProviderResult<()> {
        (**self).plan_update(from, to)
    }

    fn read<'a>(
        &'a self,
        ctx: &'a OperationContext,
        id: &'a ResourceId,
        identifier: &'a str,
        prior: Option<&'a State>,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        (**self).read(ctx, id, identifier, prior)
    }

    fn create<'a>(
        &'a self,
        ctx: &'a OperationContext,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        (**self).create(ctx, resource)
    }

    fn update<'a>(
        &'a self,
        ctx: &'a OperationContext,
        identifier: &'a str,
        from: &'a State,
        to: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        (**self).update(ctx, identifier, from, to)
    }

    fn delete<'a>(
        &'a self,
        ctx: &'a OperationContext,
        id: &'a ResourceId,
        identifier: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        (**self).delete(ctx, id, identifier)
    }
}
