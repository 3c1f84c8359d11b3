//! Database cluster lifecycle, shared by every engine
//!
//! Cluster creation is ID-less: the remote accepts the request without
//! returning an identifier, so the cluster is discovered by name after a
//! delay. Between acceptance and discovery an interrupted run leaves a
//! cluster the host does not know about.

use async_trait::async_trait;
use cumulus_core::context::OperationContext;
use cumulus_core::diagnostic::Diagnostic;
use cumulus_core::resource::Value;
use cumulus_core::schema::ResourceSchema;
use tokio::time::Instant;

use super::engine::{Engine, SHARDS_COUNT, SHARDS_REPLICA_COUNT, Topology};
use super::{Attributes, check_mutable, contract_already_set, echo, prepare};
use crate::backup::{self, BackupAction, BackupConfig};
use crate::block_storage::{self, OS_VOLUME_OFFSET, Rules, StorageHost, Volume};
use crate::case_convert::{to_pascal_case, to_snake_case};
use crate::catalog::Catalog;
use crate::client::models::{
    BlockStorageRequest, ClusterDetail, CreateClusterRequest, MaintenanceSpec, ServerSpec,
};
use crate::client::{ApiError, ClusterApi, ScpApi};
use crate::coercion::{Bag, json_to_value, object, string_map_value, string_set, value_to_json};
use crate::config::Timeouts;
use crate::error::{ScpError, ScpResult};
use crate::schemas::database;
use crate::security_group::{self, SecurityGroupTarget};
use crate::tags::{self, Tags};
use crate::validation;
use crate::waiter::{self, Observation, RUNNING, STOPPED, WaitFor, Waiter, aggregate_state};

const BLOCK_STORAGES: &str = "block_storages";
const ROLE: &str = "block_storage_role_type";
const DISK_TYPE: &str = "block_storage_type";
const SIZE: &str = "block_storage_size";
const GROUP_ID: &str = "block_storage_group_id";
const SECURITY_GROUPS: &str = "security_group_ids";
const PASSWORD: &str = "database_user_password";
const NO_CONTRACT: &str = "None";

/// One poll of a cluster: the detail and its aggregated state
async fn observe(clusters: ClusterApi<'_>, id: &str) -> Result<Observation<ClusterDetail>, ApiError> {
    let detail = clusters.detail(id).await?;
    let state = aggregate_state(
        &detail.cluster_state,
        detail.servers.iter().map(|s| s.server_state.as_str()),
    )
    .to_string();
    Ok(Observation::new(detail, state))
}

fn volumes(bag: Bag<'_>) -> ScpResult<Vec<Volume>> {
    bag.objects(BLOCK_STORAGES)?
        .iter()
        .map(|n| {
            let b = n.bag();
            Ok(Volume {
                role: Some(b.str(ROLE)?),
                disk_type: b.str(DISK_TYPE)?,
                size_gb: b.i32(SIZE)?,
                name: None,
                encrypted: false,
            })
        })
        .collect()
}

pub struct ClusterDriver<'a> {
    api: &'a ScpApi,
    waiter: &'a Waiter,
    engine: &'static Engine,
}

impl<'a> ClusterDriver<'a> {
    pub fn new(api: &'a ScpApi, waiter: &'a Waiter, engine: &'static Engine) -> Self {
        Self {
            api,
            waiter,
            engine,
        }
    }

    pub fn schema(&self) -> ResourceSchema {
        database::schema(self.engine)
    }

    fn clusters(&self) -> ClusterApi<'a> {
        self.api
            .clusters(self.engine.base_path, self.engine.name_filter)
    }

    fn what(&self, id: &str) -> String {
        format!("{} cluster {}", self.engine.display, id)
    }

    fn rules(&self) -> Rules {
        Rules {
            attribute: BLOCK_STORAGES,
            max_count: self.engine.max_block_storages,
            removable: false,
            role_field: ROLE,
            type_field: DISK_TYPE,
            size_field: SIZE,
        }
    }

    async fn wait_for(
        &self,
        ctx: &OperationContext,
        id: &str,
        target: &str,
        deadline: Instant,
    ) -> ScpResult<ClusterDetail> {
        let clusters = self.clusters();
        let spec = WaitFor::state(self.what(id), target, deadline);
        self.waiter
            .wait(ctx, &spec, move || observe(clusters, id))
            .await?
            .ok_or_else(|| ScpError::NotFound { what: self.what(id) })
    }

    // ========== Validation ==========

    /// Server layout rules the schema cannot express
    fn topology(&self, attributes: &Attributes) -> Vec<Diagnostic> {
        let bag = Bag::new(attributes);
        let servers_attr = self.engine.servers_attr();
        // Type errors are reported by the schema
        let Ok(servers) = bag.objects(&servers_attr) else {
            return Vec::new();
        };
        let roles: Vec<String> = servers
            .iter()
            .filter_map(|n| n.bag().str("server_role_type").ok())
            .collect();
        let primary = self.engine.primary_role;
        let primaries = roles.iter().filter(|r| *r == primary).count();

        let mut diagnostics = Vec::new();
        match self.engine.topology {
            Topology::Replicated => {
                if servers.is_empty() || servers.len() > 2 {
                    diagnostics.push(
                        Diagnostic::error(format!(
                            "1 or 2 servers are required, got {}",
                            servers.len()
                        ))
                        .at(servers_attr.as_str()),
                    );
                } else if primaries != 1 {
                    diagnostics.push(
                        Diagnostic::error(format!("exactly one {} server is required", primary))
                            .at(servers_attr.as_str()),
                    );
                }
            }
            Topology::Sharded => {
                let (Ok(shards), Ok(replicas)) =
                    (bag.i32(SHARDS_COUNT), bag.i32(SHARDS_REPLICA_COUNT))
                else {
                    return diagnostics;
                };
                let expected = i64::from(shards) * (1 + i64::from(replicas));
                if i64::try_from(servers.len()).ok() != Some(expected) {
                    diagnostics.push(
                        Diagnostic::error(format!(
                            "{} shards with {} replicas need {} servers, got {}",
                            shards,
                            replicas,
                            expected,
                            servers.len()
                        ))
                        .at(servers_attr.as_str()),
                    );
                } else if i64::try_from(primaries).ok() != Some(i64::from(shards)) {
                    diagnostics.push(
                        Diagnostic::error(format!(
                            "every shard needs one {} server, got {}",
                            primary, primaries
                        ))
                        .at(servers_attr.as_str()),
                    );
                }
            }
        }
        diagnostics
    }

    pub fn validate(&self, attributes: &Attributes) -> Vec<Diagnostic> {
        let mut diagnostics = self.schema().validate(attributes);
        // Topology counts are only meaningful once they passed their ranges
        if !diagnostics.iter().any(Diagnostic::is_error) {
            diagnostics.extend(self.topology(attributes));
        }
        diagnostics
    }

    fn prepare(&self, schema: &ResourceSchema, attributes: &Attributes) -> ScpResult<Attributes> {
        let prepared = prepare(schema, attributes)?;
        validation::into_result(self.topology(&prepared))?;
        Ok(prepared)
    }

    fn check_update(
        &self,
        schema: &ResourceSchema,
        prior: &Attributes,
        desired: &Attributes,
    ) -> ScpResult<()> {
        let allowed = database::mutable_attributes(self.engine);
        let allowed: Vec<&str> = allowed.iter().map(String::as_str).collect();
        check_mutable(schema, prior, desired, &allowed, contract_already_set)?;
        block_storage::plan(
            &self.rules(),
            &volumes(Bag::new(prior))?,
            &volumes(Bag::new(desired))?,
        )?;
        Ok(())
    }

    /// Reject an update the remote cannot apply in place, before any call
    pub fn plan_update(&self, prior: &Attributes, desired: &Attributes) -> ScpResult<()> {
        let schema = self.schema();
        let desired = self.prepare(&schema, desired)?;
        self.check_update(&schema, prior, &desired)
    }

    // ========== Create ==========

    fn create_request(
        &self,
        attributes: &Attributes,
        catalog: &Catalog,
    ) -> ScpResult<CreateClusterRequest> {
        let bag = Bag::new(attributes);

        let servers = bag
            .objects(&self.engine.servers_attr())?
            .iter()
            .map(|n| {
                let s = n.bag();
                Ok(ServerSpec {
                    server_name: s.str("server_name")?,
                    server_role_type: s.str("server_role_type")?,
                    availability_zone_name: s.opt_str("availability_zone_name")?,
                })
            })
            .collect::<ScpResult<Vec<_>>>()?;

        let block_storages = volumes(bag)?
            .into_iter()
            .map(|v| {
                Ok(BlockStorageRequest {
                    product_id: catalog.disk_by_name(&v.disk_type)?.to_string(),
                    block_storage_role_type: v.role.unwrap_or_default(),
                    block_storage_size: v.size_gb,
                })
            })
            .collect::<ScpResult<Vec<_>>>()?;

        let maintenance = match bag.object("maintenance")? {
            Some(n) => {
                let m = n.bag();
                Some(MaintenanceSpec {
                    maintenance_start_time: m.str("start_time")?,
                    maintenance_period: m.i32("period")?,
                    maintenance_day_of_week: m.opt_str("day_of_week")?,
                })
            }
            None => None,
        };

        let mut extras = serde_json::Map::new();
        for extra in self.engine.extras {
            if let Some(value) = bag.get(extra.name) {
                extras.insert(to_pascal_case(extra.name), value_to_json(value));
            }
        }

        Ok(CreateClusterRequest {
            cluster_name: bag.str(&self.engine.cluster_name_attr())?,
            image_id: bag.str("image_id")?,
            service_zone_id: bag.str("service_zone_id")?,
            vpc_id: bag.str("vpc_id")?,
            subnet_id: bag.str("subnet_id")?,
            server_type_id: catalog.server_type_by_name(&bag.str("server_type")?)?.to_string(),
            contract_id: catalog
                .contract_by_name(&bag.str_or("contract_period", NO_CONTRACT)?)?
                .to_string(),
            security_group_ids: bag.strings(SECURITY_GROUPS)?,
            database_port: bag.i32("database_port")?,
            database_name: bag.opt_str("database_name")?,
            database_user_name: bag.opt_str("database_user_name")?,
            database_user_password: bag.str(PASSWORD)?,
            timezone: bag.opt_str("timezone")?,
            servers,
            block_storages,
            maintenance,
            tags: tags::to_wire(&bag.string_map("tags")?),
            extras,
        })
    }

    /// Create the cluster and wait until it and its servers run
    ///
    /// Returns the discovered cluster id and the projected attributes.
    pub async fn create(
        &self,
        ctx: &OperationContext,
        attributes: &Attributes,
    ) -> ScpResult<(String, Attributes)> {
        let schema = self.schema();
        let attributes = self.prepare(&schema, attributes)?;
        let deadline = ctx.deadline(Timeouts::DATABASE.create);
        let bag = Bag::new(&attributes);
        let name = bag.str(&self.engine.cluster_name_attr())?;

        let catalog = Catalog::fetch(
            self.api,
            ctx,
            self.engine.product_group,
            &bag.str("service_zone_id")?,
        )
        .await?;
        let request = self.create_request(&attributes, &catalog)?;

        ctx.check()?;
        let clusters = self.clusters();
        clusters.create(&request).await?;
        log::info!("submitted {} cluster {}", self.engine.display, name);

        ctx.sleep(self.waiter.settings().discovery_delay()).await?;
        let found = clusters.list_by_name(&name).await?;
        let id = found
            .contents
            .into_iter()
            .find(|c| c.cluster_name == name)
            .map(|c| c.cluster_id)
            .ok_or_else(|| ScpError::NotFound {
                what: format!("{} cluster named {}", self.engine.display, name),
            })?;
        log::info!("{} cluster {} has id {}", self.engine.display, name, id);

        self.wait_for(ctx, &id, RUNNING, deadline).await?;

        let next = bag.str_or("next_contract_period", NO_CONTRACT)?;
        if next != NO_CONTRACT {
            clusters
                .set_next_contract(&id, catalog.contract_by_name(&next)?)
                .await?;
            self.wait_for(ctx, &id, RUNNING, deadline).await?;
        }

        if let Some(config) = BackupConfig::from_bag(bag)? {
            log::info!("enabling backup of {}", self.what(&id));
            clusters.create_backup(&id, &config.create_request()).await?;
            self.wait_for(ctx, &id, RUNNING, deadline).await?;
        }

        if bag.str_or(&self.engine.cluster_state_attr(), RUNNING)? == STOPPED {
            clusters.stop(&id).await?;
            self.wait_for(ctx, &id, STOPPED, deadline).await?;
        }

        let projected = self.read_existing(ctx, &id, &attributes).await?;
        Ok((id, projected))
    }

    // ========== Read ==========

    fn project(&self, detail: ClusterDetail, tags: Tags, prior: &Attributes) -> Attributes {
        let engine = self.engine;

        let mut servers = detail.servers;
        // Stable: among equal roles the remote order is kept
        servers.sort_by_key(|s| s.server_role_type != engine.primary_role);
        let servers = servers
            .into_iter()
            .map(|s| {
                let mut fields = vec![
                    ("server_name", Value::string(s.server_name)),
                    ("server_role_type", Value::string(s.server_role_type)),
                ];
                if let Some(zone) = s.availability_zone_name {
                    fields.push(("availability_zone_name", Value::string(zone)));
                }
                object(fields)
            })
            .collect();

        let block_storages = detail
            .block_storages
            .into_iter()
            .skip(OS_VOLUME_OFFSET)
            .map(|b| {
                object([
                    (ROLE, Value::string(b.block_storage_role_type)),
                    (DISK_TYPE, Value::string(b.block_storage_type)),
                    (SIZE, Value::Int(b.block_storage_size as i64)),
                    (GROUP_ID, Value::string(b.block_storage_group_id)),
                ])
            })
            .collect();

        let maintenance = detail
            .maintenance
            .map(|m| {
                let mut fields = vec![
                    ("start_time", Value::string(m.maintenance_start_time)),
                    ("period", Value::Int(m.maintenance_period as i64)),
                ];
                if let Some(day) = m.maintenance_day_of_week {
                    fields.push(("day_of_week", Value::string(day)));
                }
                object(fields)
            })
            .into_iter()
            .collect();

        let mut attributes: Attributes = [
            (engine.cluster_name_attr(), Value::string(detail.cluster_name)),
            (engine.cluster_state_attr(), Value::string(detail.cluster_state)),
            ("image_id".to_string(), Value::string(detail.image_id)),
            ("service_zone_id".to_string(), Value::string(detail.service_zone_id)),
            ("vpc_id".to_string(), Value::string(detail.vpc_id)),
            ("subnet_id".to_string(), Value::string(detail.subnet_id)),
            ("server_type".to_string(), Value::string(detail.server_type)),
            (SECURITY_GROUPS.to_string(), string_set(detail.security_group_ids)),
            ("database_port".to_string(), Value::Int(detail.database_port as i64)),
            ("contract_period".to_string(), Value::string(detail.contract_period)),
            (
                "next_contract_period".to_string(),
                Value::string(detail.next_contract_period),
            ),
            (BLOCK_STORAGES.to_string(), Value::List(block_storages)),
            (engine.servers_attr(), Value::List(servers)),
            (
                backup::ATTRIBUTE.to_string(),
                backup::project(detail.backup.as_ref(), prior),
            ),
            ("maintenance".to_string(), Value::List(maintenance)),
            ("tags".to_string(), string_map_value(tags)),
            ("cluster_id".to_string(), Value::string(detail.cluster_id)),
        ]
        .into_iter()
        .collect();

        if let Some(timezone) = detail.timezone {
            attributes.insert("timezone".to_string(), Value::string(timezone));
        }
        if engine.has_database {
            if let Some(name) = detail.database_name {
                attributes.insert("database_name".to_string(), Value::string(name));
            }
            if let Some(user) = detail.database_user_name {
                attributes.insert("database_user_name".to_string(), Value::string(user));
            }
        }
        for (key, json) in &detail.extras {
            let name = to_snake_case(key);
            if let Some(extra) = engine.extra(&name)
                && let Some(value) = json_to_value(json)
            {
                attributes.insert(extra.name.to_string(), value);
            }
        }
        echo(&mut attributes, prior, PASSWORD);
        attributes
    }

    /// Current attributes, or `None` once the cluster is gone
    pub async fn read(
        &self,
        ctx: &OperationContext,
        id: &str,
        prior: &Attributes,
    ) -> ScpResult<Option<Attributes>> {
        ctx.check()?;
        let detail = match self.clusters().detail(id).await {
            Ok(detail) => detail,
            Err(e) if e.is_not_found() => {
                log::info!("{} no longer exists", self.what(id));
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        if waiter::is_gone(&detail.cluster_state) {
            log::info!("{} is {}", self.what(id), detail.cluster_state);
            return Ok(None);
        }
        let tags = tags::read(self.api, ctx, id).await?;
        Ok(Some(self.project(detail, tags, prior)))
    }

    async fn read_existing(
        &self,
        ctx: &OperationContext,
        id: &str,
        prior: &Attributes,
    ) -> ScpResult<Attributes> {
        self.read(ctx, id, prior)
            .await?
            .ok_or_else(|| ScpError::NotFound { what: self.what(id) })
    }

    // ========== Update ==========

    /// Apply the in-place changes from `prior` to `desired`
    ///
    /// Every call is followed by a wait for the cluster's resting state, which
    /// is the prior power state until the power state itself changes.
    pub async fn update(
        &self,
        ctx: &OperationContext,
        id: &str,
        prior: &Attributes,
        desired: &Attributes,
    ) -> ScpResult<Attributes> {
        let schema = self.schema();
        let desired = self.prepare(&schema, desired)?;
        self.check_update(&schema, prior, &desired)?;

        let changes = cumulus_core::differ::ChangeSet::new(Some(&schema), prior, &desired);
        if changes.is_empty() {
            return self.read_existing(ctx, id, &desired).await;
        }
        log::info!(
            "updating {}: {}",
            self.what(id),
            changes.changed_attributes().join(", ")
        );

        let deadline = ctx.deadline(Timeouts::DATABASE.update);
        let clusters = self.clusters();
        let old = Bag::new(prior);
        let new = Bag::new(&desired);
        let state_attr = self.engine.cluster_state_attr();
        let mut resting = old.str_or(&state_attr, RUNNING)?;

        let needs_catalog = [
            "server_type",
            BLOCK_STORAGES,
            "contract_period",
            "next_contract_period",
        ]
        .iter()
        .any(|name| changes.has_change(name));
        let catalog = if needs_catalog {
            Some(
                Catalog::fetch(
                    self.api,
                    ctx,
                    self.engine.product_group,
                    &new.str("service_zone_id")?,
                )
                .await?,
            )
        } else {
            None
        };

        if changes.has_change("server_type")
            && let Some(catalog) = &catalog
        {
            let server_type = catalog.server_type_by_name(&new.str("server_type")?)?;
            ctx.check()?;
            clusters.set_server_type(id, server_type).await?;
            self.wait_for(ctx, id, &resting, deadline).await?;
        }

        {
            let host = ClusterHost {
                driver: self,
                id,
                target: &resting,
                deadline,
                catalog: catalog.as_ref(),
            };
            if changes.has_change(BLOCK_STORAGES) {
                block_storage::reconcile(&host, ctx, &self.rules(), &volumes(old)?, &volumes(new)?)
                    .await?;
            }
            if changes.has_change(SECURITY_GROUPS) {
                security_group::reconcile(
                    &host,
                    ctx,
                    &old.strings(SECURITY_GROUPS)?,
                    &new.strings(SECURITY_GROUPS)?,
                )
                .await?;
            }
        }

        if changes.has_change(&state_attr) {
            let target = new.str_or(&state_attr, RUNNING)?;
            ctx.check()?;
            if target == STOPPED {
                clusters.stop(id).await?;
            } else {
                clusters.start(id).await?;
            }
            self.wait_for(ctx, id, &target, deadline).await?;
            resting = target;
        }

        if changes.has_change("contract_period")
            && let Some(catalog) = &catalog
        {
            let contract = catalog.contract_by_name(&new.str_or("contract_period", NO_CONTRACT)?)?;
            ctx.check()?;
            clusters.set_contract(id, contract).await?;
            self.wait_for(ctx, id, &resting, deadline).await?;
        }

        if changes.has_change("next_contract_period")
            && let Some(catalog) = &catalog
        {
            let next =
                catalog.contract_by_name(&new.str_or("next_contract_period", NO_CONTRACT)?)?;
            ctx.check()?;
            clusters.set_next_contract(id, next).await?;
            self.wait_for(ctx, id, &resting, deadline).await?;
        }

        if changes.has_change(backup::ATTRIBUTE) {
            let old_backup = BackupConfig::from_bag(old)?;
            let new_backup = BackupConfig::from_bag(new)?;
            let action = backup::transition(old_backup.as_ref(), new_backup.as_ref());
            ctx.check()?;
            let submitted = match &action {
                BackupAction::Keep => false,
                BackupAction::Create(request) => {
                    clusters.create_backup(id, request).await?;
                    true
                }
                BackupAction::Modify(request) => {
                    clusters.modify_backup(id, request).await?;
                    true
                }
                BackupAction::Delete => {
                    clusters.delete_backup(id).await?;
                    true
                }
            };
            if submitted {
                log::info!("backup of {}: {:?}", self.what(id), action);
                self.wait_for(ctx, id, &resting, deadline).await?;
            }
        }

        if changes.has_change("tags") {
            tags::apply(
                self.api,
                ctx,
                id,
                &old.string_map("tags")?,
                &new.string_map("tags")?,
            )
            .await?;
        }

        self.read_existing(ctx, id, &desired).await
    }

    // ========== Delete ==========

    pub async fn delete(&self, ctx: &OperationContext, id: &str) -> ScpResult<()> {
        ctx.check()?;
        let deadline = ctx.deadline(Timeouts::DATABASE.delete);
        let clusters = self.clusters();
        match clusters.delete(id).await {
            Ok(_) => log::info!("deleting {}", self.what(id)),
            Err(e) if e.is_not_found() => {
                log::warn!("{} was already deleted", self.what(id));
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
        let spec = WaitFor::deleted(self.what(id), deadline);
        self.waiter
            .wait(ctx, &spec, move || observe(clusters, id))
            .await?;
        Ok(())
    }
}

/// The cluster as seen by the storage and security group coordinators
struct ClusterHost<'d, 'a> {
    driver: &'d ClusterDriver<'a>,
    id: &'d str,
    target: &'d str,
    deadline: Instant,
    catalog: Option<&'d Catalog>,
}

#[async_trait]
impl StorageHost for ClusterHost<'_, '_> {
    async fn resize_volume(
        &self,
        ctx: &OperationContext,
        index: usize,
        size_gb: i32,
    ) -> ScpResult<()> {
        ctx.check()?;
        let clusters = self.driver.clusters();
        let detail = clusters.detail(self.id).await?;
        let group = detail
            .block_storages
            .get(index + OS_VOLUME_OFFSET)
            .ok_or_else(|| {
                ScpError::Internal(format!(
                    "{} has no block storage at position {}",
                    self.driver.what(self.id),
                    index
                ))
            })?;
        clusters
            .resize_block_storage(self.id, &group.block_storage_group_id, size_gb)
            .await?;
        Ok(())
    }

    async fn add_volume(&self, ctx: &OperationContext, volume: &Volume) -> ScpResult<()> {
        let catalog = self
            .catalog
            .ok_or_else(|| ScpError::Internal("product catalog was not loaded".to_string()))?;
        let request = BlockStorageRequest {
            block_storage_role_type: volume.role.clone().unwrap_or_default(),
            product_id: catalog.disk_by_name(&volume.disk_type)?.to_string(),
            block_storage_size: volume.size_gb,
        };
        ctx.check()?;
        self.driver
            .clusters()
            .add_block_storage(self.id, &request)
            .await?;
        Ok(())
    }

    async fn remove_volume(&self, _ctx: &OperationContext, index: usize) -> ScpResult<()> {
        Err(ScpError::Internal(format!(
            "block storage {} of {} cannot be removed",
            index,
            self.driver.what(self.id)
        )))
    }

    async fn wait_ready(&self, ctx: &OperationContext) -> ScpResult<()> {
        self.driver
            .wait_for(ctx, self.id, self.target, self.deadline)
            .await
            .map(drop)
    }
}

#[async_trait]
impl SecurityGroupTarget for ClusterHost<'_, '_> {
    async fn attach_security_group(&self, ctx: &OperationContext, id: &str) -> ScpResult<()> {
        ctx.check()?;
        self.driver
            .clusters()
            .attach_security_group(self.id, id)
            .await?;
        Ok(())
    }

    async fn detach_security_group(&self, ctx: &OperationContext, id: &str) -> ScpResult<()> {
        ctx.check()?;
        self.driver
            .clusters()
            .detach_security_group(self.id, id)
            .await?;
        Ok(())
    }

    async fn wait_running(&self, ctx: &OperationContext) -> ScpResult<()> {
        self.wait_ready(ctx).await
    }
}
