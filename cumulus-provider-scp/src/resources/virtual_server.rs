//! Virtual server lifecycle
//!
//! The create call returns the server id. Additional NICs, tags and the next
//! contract are applied by follow-up calls once the server runs. External
//! storage consists of standalone volumes attached to the server.

use async_trait::async_trait;
use cumulus_core::context::OperationContext;
use cumulus_core::diagnostic::{AttributePath, Diagnostic};
use cumulus_core::differ::ChangeSet;
use cumulus_core::resource::Value;
use cumulus_core::schema::ResourceSchema;
use tokio::time::Instant;

use super::{Attributes, check_mutable, contract_already_set, echo, prepare};
use crate::block_storage::{self, Rules, StorageHost, Volume};
use crate::catalog::Catalog;
use crate::client::models::{
    AttachNatRequest, AttachNicRequest, BlockStorageDetail, CreateBlockStorageRequest,
    CreateVirtualServerRequest, ExternalStorageRequest, OsStorageSpec, PrimaryNicSpec,
    VirtualServerDetail,
};
use crate::client::{ApiError, ScpApi};
use crate::coercion::{Bag, object, string_map_value, string_set};
use crate::config::Timeouts;
use crate::error::{ScpError, ScpResult};
use crate::schemas::virtual_server::{self, MUTABLE_ATTRIBUTES};
use crate::security_group::{self, SecurityGroupTarget};
use crate::tags::{self, Tags};
use crate::validation;
use crate::waiter::{self, Observation, RUNNING, STOPPED, WaitFor, Waiter};

pub const PRODUCT_GROUP: &str = "Virtual Server";

const EXTERNAL_STORAGE: &str = "external_storage";
const LOCAL_SUBNET: &str = "local_subnet";
const SECURITY_GROUPS: &str = "security_group_ids";
const STATE: &str = "virtual_server_state";
const NO_CONTRACT: &str = "None";
/// State of a standalone volume ready for the next call
const VOLUME_ACTIVE: &str = "ACTIVE";
/// Remote code of a NAT detach on a NIC without NAT
const NAT_NOT_EXIST: &str = "NIC_NAT_NOT_EXIST";

const STORAGE_RULES: Rules = Rules {
    attribute: EXTERNAL_STORAGE,
    max_count: 25,
    removable: true,
    role_field: "role",
    type_field: "product_name",
    size_field: "size_gb",
};

async fn observe(api: &ScpApi, id: &str) -> Result<Observation<VirtualServerDetail>, ApiError> {
    let detail = api.virtual_server(id).await?;
    let state = detail.virtual_server_state.clone();
    Ok(Observation::new(detail, state))
}

async fn observe_volume(
    api: &ScpApi,
    id: &str,
) -> Result<Observation<BlockStorageDetail>, ApiError> {
    let detail = api.block_storage(id).await?;
    let state = detail.block_storage_state.clone();
    Ok(Observation::new(detail, state))
}

fn external_volumes(bag: Bag<'_>) -> ScpResult<Vec<Volume>> {
    bag.objects(EXTERNAL_STORAGE)?
        .iter()
        .map(|n| {
            let b = n.bag();
            Ok(Volume {
                role: None,
                disk_type: b.str("product_name")?,
                size_gb: b.i32("size_gb")?,
                name: Some(b.str("name")?),
                encrypted: b.bool_or("encrypted", false)?,
            })
        })
        .collect()
}

/// (subnet id, requested ip, nic id) of each local subnet entry
fn local_subnets(bag: Bag<'_>) -> ScpResult<Vec<(String, Option<String>, Option<String>)>> {
    bag.objects(LOCAL_SUBNET)?
        .iter()
        .map(|n| {
            let b = n.bag();
            Ok((
                b.str("subnet_id")?,
                b.opt_str("internal_ip_address")?,
                b.opt_str("nic_id")?,
            ))
        })
        .collect()
}

/// An attached NIC keeps its address; only whole entries come and go
fn check_local_subnets(prior: Bag<'_>, desired: Bag<'_>) -> ScpResult<()> {
    let old = local_subnets(prior)?;
    let diagnostics: Vec<Diagnostic> = local_subnets(desired)?
        .iter()
        .enumerate()
        .filter_map(|(i, (subnet_id, wanted, _))| {
            let wanted = wanted.as_deref()?;
            let (_, current, _) = old.iter().find(|(s, _, _)| s == subnet_id)?;
            (current.as_deref() != Some(wanted)).then(|| {
                Diagnostic::error("changing the address of an attached local subnet is not allowed")
                    .with_detail(format!(
                        "{}: {} -> {}",
                        subnet_id,
                        current.as_deref().unwrap_or("null"),
                        wanted
                    ))
                    .at(AttributePath::root(LOCAL_SUBNET)
                        .index(i)
                        .attribute("internal_ip_address"))
            })
        })
        .collect();
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(ScpError::InvalidChange(diagnostics))
    }
}

fn admin_account(bag: Bag<'_>) -> ScpResult<String> {
    validation::resolve_admin_account(
        &bag.str_or("os_type", "LINUX")?,
        bag.opt_str("admin_account")?.as_deref(),
    )
}

pub struct ServerDriver<'a> {
    api: &'a ScpApi,
    waiter: &'a Waiter,
}

impl<'a> ServerDriver<'a> {
    pub fn new(api: &'a ScpApi, waiter: &'a Waiter) -> Self {
        Self { api, waiter }
    }

    pub fn schema(&self) -> ResourceSchema {
        virtual_server::schema()
    }

    fn what(id: &str) -> String {
        format!("virtual server {}", id)
    }

    async fn wait_for(
        &self,
        ctx: &OperationContext,
        id: &str,
        target: &str,
        deadline: Instant,
    ) -> ScpResult<VirtualServerDetail> {
        let api = self.api;
        let spec = WaitFor::state(Self::what(id), target, deadline);
        self.waiter
            .wait(ctx, &spec, move || observe(api, id))
            .await?
            .ok_or_else(|| ScpError::NotFound {
                what: Self::what(id),
            })
    }

    async fn wait_volume(
        &self,
        ctx: &OperationContext,
        spec: &WaitFor<'_>,
        volume_id: &str,
    ) -> ScpResult<()> {
        let api = self.api;
        self.waiter
            .wait(ctx, spec, move || observe_volume(api, volume_id))
            .await?;
        Ok(())
    }

    // ========== Validation ==========

    fn cross_field(&self, attributes: &Attributes) -> Vec<Diagnostic> {
        match admin_account(Bag::new(attributes)) {
            Err(ScpError::Validation(diagnostics)) => diagnostics,
            _ => Vec::new(),
        }
    }

    pub fn validate(&self, attributes: &Attributes) -> Vec<Diagnostic> {
        let mut diagnostics = self.schema().validate(attributes);
        diagnostics.extend(self.cross_field(attributes));
        diagnostics
    }

    fn prepare(&self, schema: &ResourceSchema, attributes: &Attributes) -> ScpResult<Attributes> {
        let mut prepared = prepare(schema, attributes)?;
        let account = admin_account(Bag::new(&prepared))?;
        prepared.insert("admin_account".to_string(), Value::string(account));
        Ok(prepared)
    }

    fn check_update(
        &self,
        schema: &ResourceSchema,
        prior: &Attributes,
        desired: &Attributes,
    ) -> ScpResult<()> {
        check_mutable(schema, prior, desired, MUTABLE_ATTRIBUTES, contract_already_set)?;
        check_local_subnets(Bag::new(prior), Bag::new(desired))?;
        block_storage::plan(
            &STORAGE_RULES,
            &external_volumes(Bag::new(prior))?,
            &external_volumes(Bag::new(desired))?,
        )?;
        Ok(())
    }

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
    ) -> ScpResult<CreateVirtualServerRequest> {
        let bag = Bag::new(attributes);
        let name = bag.str("virtual_server_name")?;
        let server_type = catalog.server_type_by_capacity(
            bag.i32("cpu_count")?,
            bag.i32("memory_size_gb")?,
        )?;

        let external_storages = external_volumes(bag)?
            .into_iter()
            .map(|v| {
                Ok(ExternalStorageRequest {
                    product_id: catalog.disk_by_name(&v.disk_type)?.to_string(),
                    block_storage_name: v.name.unwrap_or_default(),
                    block_storage_size_gb: v.size_gb,
                    encrypted: v.encrypted,
                })
            })
            .collect::<ScpResult<Vec<_>>>()?;

        let nat_enabled = bag.bool_or("nat_enabled", false)?;
        Ok(CreateVirtualServerRequest {
            image_id: bag.str("image_id")?,
            service_zone_id: bag.str("service_zone_id")?,
            server_type_id: server_type.product_id.clone(),
            contract_id: catalog
                .contract_by_name(&bag.str_or("contract_period", NO_CONTRACT)?)?
                .to_string(),
            os_storage: OsStorageSpec {
                block_storage_name: bag
                    .opt_str("os_storage_name")?
                    .unwrap_or_else(|| format!("{}-os", name)),
                block_storage_size_gb: bag.i32("os_storage_size_gb")?,
                encrypted: bag.bool_or("os_storage_encrypted", false)?,
            },
            external_storages,
            nic: PrimaryNicSpec {
                vpc_id: bag.str("vpc_id")?,
                subnet_id: bag.str("subnet_id")?,
                internal_ip_address: bag.opt_str("internal_ip_address")?,
                nat_enabled,
                public_ip_address_id: if nat_enabled {
                    bag.opt_str("nat_public_ip_id")?
                } else {
                    None
                },
            },
            security_group_ids: bag.strings(SECURITY_GROUPS)?,
            placement_group_id: bag.opt_str("placement_group_id")?,
            key_pair_id: bag.opt_str("key_pair_id")?,
            admin_account: admin_account(bag)?,
            admin_password: bag.opt_str("admin_password")?,
            initial_script_content: bag.opt_str("initial_script_content")?,
            virtual_server_name: name,
        })
    }

    pub async fn create(
        &self,
        ctx: &OperationContext,
        attributes: &Attributes,
    ) -> ScpResult<(String, Attributes)> {
        let schema = self.schema();
        let attributes = self.prepare(&schema, attributes)?;
        let deadline = ctx.deadline(Timeouts::VIRTUAL_SERVER.create);
        let bag = Bag::new(&attributes);

        let catalog =
            Catalog::fetch(self.api, ctx, PRODUCT_GROUP, &bag.str("service_zone_id")?).await?;
        let request = self.create_request(&attributes, &catalog)?;

        ctx.check()?;
        let response = self.api.create_virtual_server(&request).await?;
        let id = response.resource_id.ok_or_else(|| {
            ScpError::Internal(format!(
                "create of virtual server {} returned no id (request {})",
                request.virtual_server_name, response.request_id
            ))
        })?;
        log::info!("created virtual server {} as {}", request.virtual_server_name, id);

        self.wait_for(ctx, &id, RUNNING, deadline).await?;

        let subnets = local_subnets(bag)?;
        if !subnets.is_empty() {
            // NIC attachment is refused right after the first RUNNING report
            ctx.sleep(self.waiter.settings().settle_delay()).await?;
            for (subnet_id, internal_ip_address, _) in subnets {
                log::info!("attaching {} to {}", subnet_id, Self::what(&id));
                self.api
                    .attach_nic(
                        &id,
                        &AttachNicRequest {
                            subnet_id,
                            internal_ip_address,
                        },
                    )
                    .await?;
                self.wait_for(ctx, &id, RUNNING, deadline).await?;
            }
        }

        tags::apply(
            self.api,
            ctx,
            &id,
            &Tags::new(),
            &bag.string_map("tags")?,
        )
        .await?;

        let next = bag.str_or("next_contract_period", NO_CONTRACT)?;
        if next != NO_CONTRACT {
            self.api
                .set_virtual_server_next_contract(&id, catalog.contract_by_name(&next)?)
                .await?;
            self.wait_for(ctx, &id, RUNNING, deadline).await?;
        }

        if bag.str_or(STATE, RUNNING)? == STOPPED {
            self.api.stop_virtual_server(&id).await?;
            self.wait_for(ctx, &id, STOPPED, deadline).await?;
        }

        let projected = self.read_existing(ctx, &id, &attributes).await?;
        Ok((id, projected))
    }

    // ========== Read ==========

    fn project(
        &self,
        detail: VirtualServerDetail,
        catalog: &Catalog,
        tags: Tags,
        prior: &Attributes,
    ) -> Attributes {
        let mut attributes: Attributes = [
            ("virtual_server_name", Value::string(detail.virtual_server_name)),
            ("image_id", Value::string(detail.image_id)),
            ("service_zone_id", Value::string(detail.service_zone_id)),
            ("os_type", Value::string(detail.os_type)),
            (SECURITY_GROUPS, string_set(detail.security_group_ids)),
            ("contract_period", Value::string(detail.contract_period)),
            ("next_contract_period", Value::string(detail.next_contract_period)),
            (STATE, Value::string(detail.virtual_server_state)),
            ("tags", string_map_value(tags)),
            ("virtual_server_id", Value::string(detail.virtual_server_id.clone())),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        match catalog.capacity_of(&detail.server_type) {
            Some((cpu, memory)) => {
                attributes.insert("cpu_count".to_string(), Value::Int(cpu as i64));
                attributes.insert("memory_size_gb".to_string(), Value::Int(memory as i64));
            }
            None => {
                log::warn!(
                    "server type {} of {} is not in the catalog",
                    detail.server_type,
                    Self::what(&detail.virtual_server_id)
                );
                echo(&mut attributes, prior, "cpu_count");
                echo(&mut attributes, prior, "memory_size_gb");
            }
        }

        let mut local = Vec::new();
        for nic in detail.nics {
            if nic.is_primary {
                attributes.insert("vpc_id".to_string(), Value::string(nic.vpc_id));
                attributes.insert("subnet_id".to_string(), Value::string(nic.subnet_id));
                attributes.insert(
                    "internal_ip_address".to_string(),
                    Value::string(nic.ip_address),
                );
                attributes.insert("nat_enabled".to_string(), Value::Bool(nic.nat_enabled));
            } else {
                local.push(object([
                    ("subnet_id", Value::string(nic.subnet_id)),
                    ("internal_ip_address", Value::string(nic.ip_address)),
                    ("nic_id", Value::string(nic.nic_id)),
                ]));
            }
        }
        attributes.insert(LOCAL_SUBNET.to_string(), Value::List(local));

        let mut external = Vec::new();
        for volume in detail.block_storages {
            if volume.is_boot_disk {
                attributes.insert(
                    "os_storage_name".to_string(),
                    Value::string(volume.block_storage_name),
                );
                attributes.insert(
                    "os_storage_size_gb".to_string(),
                    Value::Int(volume.block_storage_size_gb as i64),
                );
                attributes.insert(
                    "os_storage_encrypted".to_string(),
                    Value::Bool(volume.encrypted),
                );
            } else {
                external.push(object([
                    ("name", Value::string(volume.block_storage_name)),
                    ("size_gb", Value::Int(volume.block_storage_size_gb as i64)),
                    ("product_name", Value::string(volume.disk_type)),
                    ("encrypted", Value::Bool(volume.encrypted)),
                    ("storage_id", Value::string(volume.block_storage_id)),
                ]));
            }
        }
        attributes.insert(EXTERNAL_STORAGE.to_string(), Value::List(external));

        if let Some(group) = detail.placement_group_id {
            attributes.insert("placement_group_id".to_string(), Value::string(group));
        }
        if let Some(key_pair) = detail.key_pair_id {
            attributes.insert("key_pair_id".to_string(), Value::string(key_pair));
        }
        match detail.admin_account {
            Some(account) => {
                attributes.insert("admin_account".to_string(), Value::string(account));
            }
            None => echo(&mut attributes, prior, "admin_account"),
        }
        for write_only in ["admin_password", "nat_public_ip_id", "initial_script_content"] {
            echo(&mut attributes, prior, write_only);
        }
        attributes
    }

    pub async fn read(
        &self,
        ctx: &OperationContext,
        id: &str,
        prior: &Attributes,
    ) -> ScpResult<Option<Attributes>> {
        ctx.check()?;
        let detail = match self.api.virtual_server(id).await {
            Ok(detail) => detail,
            Err(e) if e.is_not_found() => {
                log::info!("{} no longer exists", Self::what(id));
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        if waiter::is_gone(&detail.virtual_server_state) {
            log::info!("{} is {}", Self::what(id), detail.virtual_server_state);
            return Ok(None);
        }
        let catalog = Catalog::fetch(self.api, ctx, PRODUCT_GROUP, &detail.service_zone_id).await?;
        let tags = tags::read(self.api, ctx, id).await?;
        Ok(Some(self.project(detail, &catalog, tags, prior)))
    }

    async fn read_existing(
        &self,
        ctx: &OperationContext,
        id: &str,
        prior: &Attributes,
    ) -> ScpResult<Attributes> {
        self.read(ctx, id, prior)
            .await?
            .ok_or_else(|| ScpError::NotFound {
                what: Self::what(id),
            })
    }

    // ========== Update ==========

    async fn update_local_subnets(
        &self,
        ctx: &OperationContext,
        id: &str,
        old: Bag<'_>,
        new: Bag<'_>,
        resting: &str,
        deadline: Instant,
    ) -> ScpResult<()> {
        let old = local_subnets(old)?;
        let new = local_subnets(new)?;
        for (subnet_id, internal_ip_address, _) in &new {
            if old.iter().any(|(s, _, _)| s == subnet_id) {
                continue;
            }
            log::info!("attaching {} to {}", subnet_id, Self::what(id));
            ctx.check()?;
            self.api
                .attach_nic(
                    id,
                    &AttachNicRequest {
                        subnet_id: subnet_id.clone(),
                        internal_ip_address: internal_ip_address.clone(),
                    },
                )
                .await?;
            self.wait_for(ctx, id, resting, deadline).await?;
        }
        for (subnet_id, _, nic_id) in &old {
            if new.iter().any(|(s, _, _)| s == subnet_id) {
                continue;
            }
            let nic_id = nic_id.as_deref().ok_or_else(|| {
                ScpError::Internal(format!("local subnet {} has no nic id", subnet_id))
            })?;
            log::info!("detaching {} from {}", subnet_id, Self::what(id));
            ctx.check()?;
            self.api.detach_nic(id, nic_id).await?;
            self.wait_for(ctx, id, resting, deadline).await?;
        }
        Ok(())
    }

    async fn update_nat(
        &self,
        ctx: &OperationContext,
        id: &str,
        new: Bag<'_>,
        resting: &str,
        deadline: Instant,
    ) -> ScpResult<()> {
        let detail = self.api.virtual_server(id).await?;
        let nic_id = detail
            .nics
            .iter()
            .find(|n| n.is_primary)
            .map(|n| n.nic_id.clone())
            .ok_or_else(|| ScpError::Internal(format!("{} has no primary NIC", Self::what(id))))?;

        ctx.check()?;
        match self.api.detach_nat(id, &nic_id).await {
            Ok(_) => {
                self.wait_for(ctx, id, resting, deadline).await?;
            }
            Err(e) if e.code() == Some(NAT_NOT_EXIST) => {
                log::warn!("{} had no NAT to detach", Self::what(id));
            }
            Err(e) => return Err(e.into()),
        }

        if new.bool_or("nat_enabled", false)? {
            ctx.check()?;
            self.api
                .attach_nat(
                    id,
                    &nic_id,
                    &AttachNatRequest {
                        public_ip_address_id: new.opt_str("nat_public_ip_id")?,
                    },
                )
                .await?;
            self.wait_for(ctx, id, resting, deadline).await?;
        }
        Ok(())
    }

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

        let changes = ChangeSet::new(Some(&schema), prior, &desired);
        if changes.is_empty() {
            return self.read_existing(ctx, id, &desired).await;
        }
        log::info!(
            "updating {}: {}",
            Self::what(id),
            changes.changed_attributes().join(", ")
        );

        let deadline = ctx.deadline(Timeouts::VIRTUAL_SERVER.update);
        let old = Bag::new(prior);
        let new = Bag::new(&desired);
        let mut resting = old.str_or(STATE, RUNNING)?;

        let needs_catalog = [
            "cpu_count",
            "memory_size_gb",
            EXTERNAL_STORAGE,
            "contract_period",
            "next_contract_period",
        ]
        .iter()
        .any(|name| changes.has_change(name));
        let catalog = if needs_catalog {
            Some(Catalog::fetch(self.api, ctx, PRODUCT_GROUP, &new.str("service_zone_id")?).await?)
        } else {
            None
        };

        if (changes.has_change("cpu_count") || changes.has_change("memory_size_gb"))
            && let Some(catalog) = &catalog
        {
            let server_type =
                catalog.server_type_by_capacity(new.i32("cpu_count")?, new.i32("memory_size_gb")?)?;
            ctx.check()?;
            self.api
                .set_virtual_server_type(id, &server_type.product_id)
                .await?;
            self.wait_for(ctx, id, &resting, deadline).await?;
        }

        {
            let host = ServerHost {
                driver: self,
                id,
                target: &resting,
                deadline,
                catalog: catalog.as_ref(),
            };
            if changes.has_change(EXTERNAL_STORAGE) {
                block_storage::reconcile(
                    &host,
                    ctx,
                    &STORAGE_RULES,
                    &external_volumes(old)?,
                    &external_volumes(new)?,
                )
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

        if changes.has_change(LOCAL_SUBNET) {
            self.update_local_subnets(ctx, id, old, new, &resting, deadline)
                .await?;
        }

        if changes.has_change("nat_enabled") || changes.has_change("nat_public_ip_id") {
            self.update_nat(ctx, id, new, &resting, deadline).await?;
        }

        if changes.has_change(STATE) {
            let target = new.str_or(STATE, RUNNING)?;
            ctx.check()?;
            if target == STOPPED {
                self.api.stop_virtual_server(id).await?;
            } else {
                self.api.start_virtual_server(id).await?;
            }
            self.wait_for(ctx, id, &target, deadline).await?;
            resting = target;
        }

        if changes.has_change("contract_period")
            && let Some(catalog) = &catalog
        {
            let contract = catalog.contract_by_name(&new.str_or("contract_period", NO_CONTRACT)?)?;
            ctx.check()?;
            self.api.set_virtual_server_contract(id, contract).await?;
            self.wait_for(ctx, id, &resting, deadline).await?;
        }

        if changes.has_change("next_contract_period")
            && let Some(catalog) = &catalog
        {
            let next =
                catalog.contract_by_name(&new.str_or("next_contract_period", NO_CONTRACT)?)?;
            ctx.check()?;
            self.api.set_virtual_server_next_contract(id, next).await?;
            self.wait_for(ctx, id, &resting, deadline).await?;
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
        let deadline = ctx.deadline(Timeouts::VIRTUAL_SERVER.delete);
        match self.api.delete_virtual_server(id).await {
            Ok(_) => log::info!("deleting {}", Self::what(id)),
            Err(e) if e.is_not_found() => {
                log::warn!("{} was already deleted", Self::what(id));
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
        let api = self.api;
        let spec = WaitFor::deleted(Self::what(id), deadline);
        self.waiter
            .wait(ctx, &spec, move || observe(api, id))
            .await?;
        Ok(())
    }
}

/// The server as seen by the storage and security group coordinators
struct ServerHost<'d, 'a> {
    driver: &'d ServerDriver<'a>,
    id: &'d str,
    target: &'d str,
    deadline: Instant,
    catalog: Option<&'d Catalog>,
}

impl ServerHost<'_, '_> {
    /// Id of the external volume at `index`, in attachment order
    async fn volume_id(&self, index: usize) -> ScpResult<String> {
        let detail = self.driver.api.virtual_server(self.id).await?;
        detail
            .block_storages
            .into_iter()
            .filter(|v| !v.is_boot_disk)
            .nth(index)
            .map(|v| v.block_storage_id)
            .ok_or_else(|| {
                ScpError::Internal(format!(
                    "{} has no external storage at position {}",
                    ServerDriver::what(self.id),
                    index
                ))
            })
    }

    fn volume_ready(&self, volume_id: &str) -> WaitFor<'static> {
        WaitFor::state(format!("block storage {}", volume_id), VOLUME_ACTIVE, self.deadline)
    }
}

#[async_trait]
impl StorageHost for ServerHost<'_, '_> {
    async fn resize_volume(
        &self,
        ctx: &OperationContext,
        index: usize,
        size_gb: i32,
    ) -> ScpResult<()> {
        let volume_id = self.volume_id(index).await?;
        ctx.check()?;
        self.driver
            .api
            .resize_block_storage(&volume_id, size_gb)
            .await?;
        self.driver
            .wait_volume(ctx, &self.volume_ready(&volume_id), &volume_id)
            .await
    }

    async fn add_volume(&self, ctx: &OperationContext, volume: &Volume) -> ScpResult<()> {
        let catalog = self
            .catalog
            .ok_or_else(|| ScpError::Internal("product catalog was not loaded".to_string()))?;
        let request = CreateBlockStorageRequest {
            block_storage_name: volume.name.clone().unwrap_or_default(),
            block_storage_size_gb: volume.size_gb,
            product_id: catalog.disk_by_name(&volume.disk_type)?.to_string(),
            encrypted: volume.encrypted,
            virtual_server_id: self.id.to_string(),
        };
        ctx.check()?;
        let response = self.driver.api.create_block_storage(&request).await?;
        if let Some(volume_id) = response.resource_id {
            self.driver
                .wait_volume(ctx, &self.volume_ready(&volume_id), &volume_id)
                .await?;
        }
        Ok(())
    }

    async fn remove_volume(&self, ctx: &OperationContext, index: usize) -> ScpResult<()> {
        let volume_id = self.volume_id(index).await?;
        ctx.check()?;
        self.driver
            .api
            .detach_block_storage(&volume_id, self.id)
            .await?;
        self.driver
            .wait_volume(ctx, &self.volume_ready(&volume_id), &volume_id)
            .await?;

        ctx.check()?;
        self.driver.api.delete_block_storage(&volume_id).await?;
        let gone = WaitFor::deleted(format!("block storage {}", volume_id), self.deadline)
            .with_pending(VOLUME_ACTIVE);
        self.driver.wait_volume(ctx, &gone, &volume_id).await
    }

    async fn wait_ready(&self, ctx: &OperationContext) -> ScpResult<()> {
        self.driver
            .wait_for(ctx, self.id, self.target, self.deadline)
            .await
            .map(drop)
    }
}

#[async_trait]
impl SecurityGroupTarget for ServerHost<'_, '_> {
    async fn attach_security_group(&self, ctx: &OperationContext, id: &str) -> ScpResult<()> {
        ctx.check()?;
        self.driver
            .api
            .attach_virtual_server_security_group(self.id, id)
            .await?;
        Ok(())
    }

    async fn detach_security_group(&self, ctx: &OperationContext, id: &str) -> ScpResult<()> {
        ctx.check()?;
        self.driver
            .api
            .detach_virtual_server_security_group(self.id, id)
            .await?;
        Ok(())
    }

    async fn wait_running(&self, ctx: &OperationContext) -> ScpResult<()> {
        self.wait_ready(ctx).await
    }
}
