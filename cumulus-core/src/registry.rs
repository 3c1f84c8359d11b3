//! Registry - Resource type factories keyed by type name
//!
//! Populated once at startup and only read afterwards. The process-wide
//! instance is installed through `install` and never mutated again.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::provider::ResourceType;
use crate::schema::ResourceSchema;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("resource type '{0}' is already registered")]
    Duplicate(String),

    #[error("registry is already installed")]
    AlreadyInstalled,
}

/// Resource types known to the host, keyed by name
#[derive(Default)]
pub struct Registry {
    types: BTreeMap<&'static str, Box<dyn ResourceType>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, resource_type: Box<dyn ResourceType>) -> Result<(), RegistryError> {
        let name = resource_type.name();
        if self.types.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.types.insert(name, resource_type);
        Ok(())
    }

    /// Register every type in order, stopping at the first duplicate
    pub fn register_all(
        &mut self,
        types: impl IntoIterator<Item = Box<dyn ResourceType>>,
    ) -> Result<(), RegistryError> {
        for t in types {
            self.register(t)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn ResourceType> {
        self.types.get(name).map(|t| t.as_ref())
    }

    pub fn schema(&self, name: &str) -> Option<ResourceSchema> {
        self.get(name).map(|t| t.schema())
    }

    /// Registered type names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        self.types.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.names())
            .finish()
    }
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Install the process-wide registry. Only the first call succeeds.
pub fn install(registry: Registry) -> Result<&'static Registry, RegistryError> {
    GLOBAL
        .set(registry)
        .map_err(|_| RegistryError::AlreadyInstalled)?;
    GLOBAL.get().ok_or(RegistryError::AlreadyInstalled)
}

/// The installed registry, if any
pub fn installed() -> Option<&'static Registry> {
    GLOBAL.get()
}
