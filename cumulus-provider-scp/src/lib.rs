//! Cumulus SCP Provider
//!
//! Lifecycle driver for SCP database clusters (EPAS, MariaDB, MySQL, Redis,
//! Redis Cluster, SQL Server) and virtual servers.

pub mod backup;
pub mod block_storage;
pub mod case_convert;
pub mod catalog;
pub mod client;
pub mod coercion;
pub mod config;
pub mod error;
pub mod logging;
pub mod resources;
pub mod schemas;
pub mod security_group;
pub mod tags;
pub mod validation;
pub mod waiter;

#[cfg(test)]
mod testing;

use std::collections::HashMap;
use std::sync::Arc;

use cumulus_core::context::OperationContext;
use cumulus_core::diagnostic::Diagnostic;
use cumulus_core::provider::{BoxFuture, Provider, ProviderError, ProviderResult, ResourceType};
use cumulus_core::registry::{Registry, RegistryError};
use cumulus_core::resource::{Resource, ResourceId, State, Value};
use cumulus_core::schema::ResourceSchema;

use client::{HttpTransport, ScpApi, Transport};
use config::{ProviderConfig, WaitSettings};
use error::{ScpError, ScpResult};
use resources::database::ClusterDriver;
use resources::engine::{self, ENGINES, Engine};
use resources::virtual_server::ServerDriver;
use waiter::Waiter;

/// Database cluster resource type of one engine
pub struct DatabaseType(pub &'static Engine);

impl ResourceType for DatabaseType {
    fn name(&self) -> &'static str {
        self.0.resource_type
    }

    fn schema(&self) -> ResourceSchema {
        schemas::database::schema(self.0)
    }
}

/// Virtual server resource type
pub struct VirtualServerType;

impl ResourceType for VirtualServerType {
    fn name(&self) -> &'static str {
        schemas::virtual_server::RESOURCE_TYPE
    }

    fn schema(&self) -> ResourceSchema {
        schemas::virtual_server::schema()
    }
}

fn resource_types() -> Vec<Box<dyn ResourceType>> {
    let mut types: Vec<Box<dyn ResourceType>> = ENGINES
        .iter()
        .map(|e| Box::new(DatabaseType(e)) as Box<dyn ResourceType>)
        .collect();
    types.push(Box::new(VirtualServerType));
    types
}

/// Registry holding every SCP resource type
pub fn registry() -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();
    registry.register_all(resource_types())?;
    Ok(registry)
}

/// Driver selected by resource type name
enum Driver<'a> {
    Cluster(ClusterDriver<'a>),
    Server(ServerDriver<'a>),
}

/// SCP Provider
pub struct ScpProvider {
    api: ScpApi,
    waiter: Waiter,
}

impl ScpProvider {
    pub fn new(config: &ProviderConfig) -> ScpResult<Self> {
        let transport = HttpTransport::new(config)?;
        log::debug!("SCP provider for {}", config.endpoint);
        Ok(Self::with_transport(Arc::new(transport), config.wait.clone()))
    }

    /// Build from the host's provider block
    pub fn from_attributes(attributes: &HashMap<String, Value>) -> ScpResult<Self> {
        Self::new(&ProviderConfig::from_attributes(attributes)?)
    }

    pub fn with_transport(transport: Arc<dyn Transport>, settings: WaitSettings) -> Self {
        Self {
            api: ScpApi::new(transport),
            waiter: Waiter::new(settings),
        }
    }

    fn driver(&self, id: &ResourceId) -> ProviderResult<Driver<'_>> {
        let name = id.resource_type.as_str();
        if name == schemas::virtual_server::RESOURCE_TYPE {
            return Ok(Driver::Server(ServerDriver::new(&self.api, &self.waiter)));
        }
        match engine::by_resource_type(name) {
            Some(engine) => Ok(Driver::Cluster(ClusterDriver::new(
                &self.api,
                &self.waiter,
                engine,
            ))),
            None => Err(ProviderError::new(format!("Unknown resource type: {}", name))
                .for_resource(id.clone())),
        }
    }
}

fn for_resource(id: &ResourceId) -> impl Fn(ScpError) -> ProviderError + '_ {
    move |e| ProviderError::from(e).for_resource(id.clone())
}

impl Provider for ScpProvider {
    fn name(&self) -> &'static str {
        "scp"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    fn validate(&self, resource: &Resource) -> Vec<Diagnostic> {
        match self.driver(&resource.id) {
            Ok(Driver::Cluster(d)) => d.validate(&resource.attributes),
            Ok(Driver::Server(d)) => d.validate(&resource.attributes),
            Err(e) => e.to_diagnostics(),
        }
    }

    fn plan_update(&self, from: &State, to: &Resource) -> ProviderResult<()> {
        match self.driver(&to.id)? {
            Driver::Cluster(d) => d.plan_update(&from.attributes, &to.attributes),
            Driver::Server(d) => d.plan_update(&from.attributes, &to.attributes),
        }
        .map_err(for_resource(&to.id))
    }

    fn read<'a>(
        &'a self,
        ctx: &'a OperationContext,
        id: &'a ResourceId,
        identifier: &'a str,
        prior: Option<&'a State>,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        Box::pin(async move {
            let empty = HashMap::new();
            let prior = prior.map(|s| &s.attributes).unwrap_or(&empty);
            let attributes = match self.driver(id)? {
                Driver::Cluster(d) => d.read(ctx, identifier, prior).await,
                Driver::Server(d) => d.read(ctx, identifier, prior).await,
            }
            .map_err(for_resource(id))?;
            Ok(match attributes {
                Some(attributes) => {
                    State::existing(id.clone(), attributes).with_identifier(identifier)
                }
                None => State::not_found(id.clone()),
            })
        })
    }

    fn create<'a>(
        &'a self,
        ctx: &'a OperationContext,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        Box::pin(async move {
            let (identifier, attributes) = match self.driver(&resource.id)? {
                Driver::Cluster(d) => d.create(ctx, &resource.attributes).await,
                Driver::Server(d) => d.create(ctx, &resource.attributes).await,
            }
            .map_err(for_resource(&resource.id))?;
            Ok(State::existing(resource.id.clone(), attributes).with_identifier(identifier))
        })
    }

    fn update<'a>(
        &'a self,
        ctx: &'a OperationContext,
        identifier: &'a str,
        from: &'a State,
        to: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        Box::pin(async move {
            let attributes = match self.driver(&to.id)? {
                Driver::Cluster(d) => {
                    d.update(ctx, identifier, &from.attributes, &to.attributes)
                        .await
                }
                Driver::Server(d) => {
                    d.update(ctx, identifier, &from.attributes, &to.attributes)
                        .await
                }
            }
            .map_err(for_resource(&to.id))?;
            Ok(State::existing(to.id.clone(), attributes).with_identifier(identifier))
        })
    }

    fn delete<'a>(
        &'a self,
        ctx: &'a OperationContext,
        id: &'a ResourceId,
        identifier: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            match self.driver(id)? {
                Driver::Cluster(d) => d.delete(ctx, identifier).await,
                Driver::Server(d) => d.delete(ctx, identifier).await,
            }
            .map_err(for_resource(id))
        })
    }
}
