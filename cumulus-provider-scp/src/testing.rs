//! In-memory SCP control plane
//!
//! Objects move through transitional states one status poll at a time. Every
//! call is logged; a mutation that reaches an object still in transition is
//! recorded as a busy mutation, which the real remote would reject.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use tokio_util::sync::CancellationToken;

use crate::ScpProvider;
use crate::catalog::{CONTRACT, DISK, SERVER_TYPE};
use crate::client::models::{
    AsyncResponse, AttachedVolume, BackupDetail, BackupRequest, BlockStorageDetail,
    BlockStorageRequest, ClusterBlockStorage, ClusterDetail, ClusterServer, ClusterSummary,
    CreateBlockStorageRequest, CreateClusterRequest, CreateVirtualServerRequest, ListResponse, Nic,
    Product, ProductGroup, ProductItem, Tag, VirtualServerDetail,
};
use crate::client::{ApiError, ApiRequest, ApiResponse, Method, Transport};
use crate::config::WaitSettings;
use crate::resources::engine::ENGINES;
use crate::resources::virtual_server::PRODUCT_GROUP as SERVER_GROUP;
use crate::validation::CONTRACTS;

pub const ZONE: &str = "ZONE-1";
pub const OS_GROUP_ID: &str = "bsg-os";

const TAGS: &str = "/tag/v2/resources/";
const PRODUCT_GROUPS: &str = "/product/v2/product-groups";
const SERVERS: &str = "/virtual-server/v3/virtual-servers";
const VOLUMES: &str = "/block-storage/v2/block-storages";

pub fn product_id(name: &str) -> String {
    format!("PRODUCT-{}", name.replace(' ', "-"))
}

fn product_name(id: &str) -> String {
    id.trim_start_matches("PRODUCT-").replace('-', " ")
}

fn product(name: &str, product_type: &str, items: Vec<ProductItem>) -> Product {
    Product {
        product_id: product_id(name),
        product_name: name.to_string(),
        product_type: product_type.to_string(),
        items,
    }
}

fn item(name: &str, value: i32) -> ProductItem {
    ProductItem {
        item_name: name.to_string(),
        item_value: value.to_string(),
    }
}

/// Product group as offered in `ZONE`; other zones offer nothing
fn product_group(group: &str, zone: &str) -> ProductGroup {
    let mut products = Vec::new();
    if zone == ZONE {
        let server_types: &[(&str, i32, i32)] = if group == SERVER_GROUP {
            &[("s1v1m2", 1, 2), ("s1v2m4", 2, 4), ("s1v4m8", 4, 8)]
        } else {
            &[("db1v2m4", 2, 4), ("db1v4m8", 4, 8)]
        };
        for (name, cpu, memory) in server_types {
            products.push(product(
                name,
                SERVER_TYPE,
                vec![item("cpu", *cpu), item("memory", *memory)],
            ));
        }
        for disk in ["SSD", "HDD"] {
            products.push(product(disk, DISK, Vec::new()));
        }
        for contract in CONTRACTS {
            products.push(product(contract, CONTRACT, Vec::new()));
        }
    }
    ProductGroup {
        product_group_id: format!("PG-{}", group.replace(' ', "-")),
        product_group_name: group.to_string(),
        products,
    }
}

fn to_json<T: Serialize>(value: &T) -> Json {
    serde_json::to_value(value).unwrap()
}

fn ack(resource_id: Option<String>) -> Json {
    to_json(&AsyncResponse {
        request_id: "req-1".to_string(),
        resource_id,
    })
}

fn error(request: &ApiRequest, status: u16, code: &str) -> ApiError {
    ApiError::from_status(
        request.method,
        &request.path,
        status,
        &format!(r#"{{"Code":"{}","Message":"{} failed"}}"#, code, request.path),
    )
}

fn not_found(request: &ApiRequest) -> ApiError {
    error(request, 404, "NOT_FOUND")
}

fn body<T: DeserializeOwned>(request: &ApiRequest) -> Result<T, ApiError> {
    let json = request.body.clone().unwrap_or(Json::Null);
    serde_json::from_value(json).map_err(|_| error(request, 400, "INVALID_REQUEST"))
}

fn decoded(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

fn field(request: &ApiRequest, key: &str) -> Option<String> {
    request
        .body
        .as_ref()
        .and_then(|b| b.get(key))
        .and_then(|v| match v {
            Json::String(s) => Some(s.clone()),
            Json::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// Status of one remote object
#[derive(Debug, Clone)]
struct Lifecycle {
    state: String,
    /// Settled state (`None` when the object disappears) and polls left
    next: Option<(Option<String>, u32)>,
}

impl Lifecycle {
    fn new(transitional: &str, settled: &str, polls: u32) -> Self {
        Self {
            state: transitional.to_string(),
            next: Some((Some(settled.to_string()), polls)),
        }
    }

    fn is_busy(&self) -> bool {
        self.next.is_some()
    }

    /// State the object ends up in once the current transition is over
    fn resting(&self) -> String {
        match &self.next {
            Some((Some(state), _)) => state.clone(),
            _ => self.state.clone(),
        }
    }

    fn begin(&mut self, transitional: &str, settled: Option<String>, polls: u32) {
        self.state = transitional.to_string();
        self.next = Some((settled, polls));
    }

    fn edit(&mut self, polls: u32) {
        let resting = self.resting();
        self.begin("EDITING", Some(resting), polls);
    }

    /// One status poll; false once the object is gone
    fn poll(&mut self) -> bool {
        match self.next.take() {
            Some((settled, 0)) => match settled {
                Some(state) => {
                    self.state = state;
                    true
                }
                None => false,
            },
            Some((settled, left)) => {
                self.next = Some((settled, left - 1));
                true
            }
            None => true,
        }
    }
}

struct Cluster {
    base: &'static str,
    detail: ClusterDetail,
    life: Lifecycle,
}

impl Cluster {
    fn sync(&mut self) {
        self.detail.cluster_state = self.life.state.clone();
        for server in &mut self.detail.servers {
            server.server_state = self.life.state.clone();
        }
    }
}

struct Server {
    detail: VirtualServerDetail,
    boot: AttachedVolume,
    life: Lifecycle,
}

struct Volume {
    detail: BlockStorageDetail,
    disk_type: String,
    encrypted: bool,
    life: Lifecycle,
}

struct Fault {
    method: Method,
    fragment: String,
    status: u16,
    code: String,
    remaining: u32,
}

struct Trip {
    method: Method,
    fragment: String,
    token: CancellationToken,
}

#[derive(Default)]
struct Inner {
    clusters: BTreeMap<String, Cluster>,
    servers: BTreeMap<String, Server>,
    volumes: BTreeMap<String, Volume>,
    tags: HashMap<String, BTreeMap<String, String>>,
    calls: Vec<(Method, String)>,
    faults: Vec<Fault>,
    trips: Vec<Trip>,
    busy: Vec<String>,
    next_id: u32,
    settle_polls: u32,
}

impl Inner {
    fn new_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{:04}", prefix, self.next_id)
    }

    fn fault(&mut self, request: &ApiRequest) -> Option<ApiError> {
        let fault = self.faults.iter_mut().find(|f| {
            f.remaining > 0 && f.method == request.method && request.path.contains(&f.fragment)
        })?;
        fault.remaining -= 1;
        Some(error(request, fault.status, &fault.code))
    }

    fn trip(&mut self, request: &ApiRequest) {
        for trip in &self.trips {
            if trip.method == request.method && request.path.contains(&trip.fragment) {
                trip.token.cancel();
            }
        }
    }

    fn note_busy(busy: &mut Vec<String>, request: &ApiRequest, life: &Lifecycle) {
        if life.is_busy() {
            busy.push(format!("{} {}", request.method, request.path));
        }
    }

    fn route(&mut self, request: &ApiRequest) -> Result<Json, ApiError> {
        let path = request.path.clone();
        if let Some(engine) = ENGINES
            .iter()
            .find(|e| path == e.base_path || path.starts_with(&format!("{}/", e.base_path)))
        {
            let rest = &path[engine.base_path.len()..];
            return self.cluster_route(engine.base_path, engine.name_filter, request, rest);
        }
        if let Some(rest) = path.strip_prefix(TAGS) {
            return self.tag_route(request, rest);
        }
        if path == PRODUCT_GROUPS {
            let group = request.query_value("productGroupName").unwrap_or_default();
            let zone = request.query_value("serviceZoneId").unwrap_or_default();
            return Ok(to_json(&product_group(group, zone)));
        }
        if let Some(rest) = path.strip_prefix(SERVERS) {
            return self.server_route(request, rest);
        }
        if let Some(rest) = path.strip_prefix(VOLUMES) {
            return self.volume_route(request, rest);
        }
        Err(not_found(request))
    }

    // ========== Clusters ==========

    fn create_cluster(&mut self, base: &'static str, request: &ApiRequest) -> Result<Json, ApiError> {
        let create: CreateClusterRequest = body(request)?;
        let id = self.new_id("cluster");
        let polls = self.settle_polls;

        let mut block_storages = vec![ClusterBlockStorage {
            block_storage_group_id: OS_GROUP_ID.to_string(),
            block_storage_role_type: "OS".to_string(),
            block_storage_type: "SSD".to_string(),
            block_storage_size: 100,
        }];
        for storage in &create.block_storages {
            block_storages.push(ClusterBlockStorage {
                block_storage_group_id: self.new_id("bsg"),
                block_storage_role_type: storage.block_storage_role_type.clone(),
                block_storage_type: product_name(&storage.product_id),
                block_storage_size: storage.block_storage_size,
            });
        }

        let detail = ClusterDetail {
            cluster_id: id.clone(),
            cluster_name: create.cluster_name,
            cluster_state: "CREATING".to_string(),
            image_id: create.image_id,
            service_zone_id: create.service_zone_id,
            vpc_id: create.vpc_id,
            subnet_id: create.subnet_id,
            server_type: product_name(&create.server_type_id),
            security_group_ids: create.security_group_ids,
            database_port: create.database_port,
            database_name: create.database_name,
            database_user_name: create.database_user_name,
            timezone: Some(create.timezone.unwrap_or_else(|| "Asia/Seoul".to_string())),
            contract_period: product_name(&create.contract_id),
            next_contract_period: "None".to_string(),
            servers: create
                .servers
                .into_iter()
                .map(|s| ClusterServer {
                    server_name: s.server_name,
                    server_role_type: s.server_role_type,
                    server_state: "CREATING".to_string(),
                    availability_zone_name: Some(
                        s.availability_zone_name.unwrap_or_else(|| "AZ-1".to_string()),
                    ),
                })
                .collect(),
            block_storages,
            backup: None,
            maintenance: create.maintenance,
            extras: create.extras,
        };
        self.tags.insert(
            id.clone(),
            create
                .tags
                .into_iter()
                .map(|t| (t.tag_key, t.tag_value))
                .collect(),
        );
        self.clusters.insert(
            id,
            Cluster {
                base,
                detail,
                life: Lifecycle::new("CREATING", "RUNNING", polls),
            },
        );
        // The cluster id is not part of the acknowledgement
        Ok(ack(None))
    }

    fn cluster_route(
        &mut self,
        base: &'static str,
        name_filter: &str,
        request: &ApiRequest,
        rest: &str,
    ) -> Result<Json, ApiError> {
        let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
        let polls = self.settle_polls;

        match (request.method, segments.as_slice()) {
            (Method::Post, []) => return self.create_cluster(base, request),
            (Method::Get, []) => {
                let name = request.query_value(name_filter).unwrap_or_default();
                let contents: Vec<ClusterSummary> = self
                    .clusters
                    .values()
                    .filter(|c| c.base == base && c.detail.cluster_name == name)
                    .map(|c| ClusterSummary {
                        cluster_id: c.detail.cluster_id.clone(),
                        cluster_name: c.detail.cluster_name.clone(),
                        cluster_state: c.life.state.clone(),
                    })
                    .collect();
                let total_count = contents.len() as i64;
                return Ok(to_json(&ListResponse {
                    contents,
                    total_count,
                }));
            }
            (Method::Get, [id]) => {
                let cluster = self.clusters.get_mut(*id).ok_or_else(|| not_found(request))?;
                if !cluster.life.poll() {
                    self.clusters.remove(*id);
                    self.tags.remove(*id);
                    return Err(not_found(request));
                }
                cluster.sync();
                return Ok(to_json(&cluster.detail));
            }
            _ => {}
        }

        let Some(id) = segments.first() else {
            return Err(not_found(request));
        };
        let new_group = self.new_id("bsg");
        let Inner { clusters, busy, .. } = self;
        let cluster = clusters.get_mut(*id).ok_or_else(|| not_found(request))?;
        Self::note_busy(busy, request, &cluster.life);
        let detail = &mut cluster.detail;

        match (request.method, &segments[1..]) {
            (Method::Delete, []) => {
                cluster.life.begin("TERMINATING", None, polls);
                return Ok(ack(None));
            }
            (Method::Put, ["server-type"]) => {
                let type_id = field(request, "ServerTypeId").unwrap_or_default();
                detail.server_type = product_name(&type_id);
            }
            (Method::Post, ["block-storages"]) => {
                let storage: BlockStorageRequest = body(request)?;
                detail.block_storages.push(ClusterBlockStorage {
                    block_storage_group_id: new_group,
                    block_storage_role_type: storage.block_storage_role_type,
                    block_storage_type: product_name(&storage.product_id),
                    block_storage_size: storage.block_storage_size,
                });
            }
            (Method::Put, ["block-storages", group, "size"]) => {
                let size = field(request, "BlockStorageSize")
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| error(request, 400, "INVALID_REQUEST"))?;
                let storage = detail
                    .block_storages
                    .iter_mut()
                    .find(|b| b.block_storage_group_id == *group)
                    .ok_or_else(|| not_found(request))?;
                storage.block_storage_size = size;
            }
            (Method::Post, ["security-groups", sg]) => {
                if !detail.security_group_ids.iter().any(|s| s == sg) {
                    detail.security_group_ids.push(sg.to_string());
                }
            }
            (Method::Delete, ["security-groups", sg]) => {
                detail.security_group_ids.retain(|s| s != sg);
            }
            (Method::Post, ["start"]) => {
                cluster.life.begin("STARTING", Some("RUNNING".to_string()), polls);
                return Ok(ack(None));
            }
            (Method::Post, ["stop"]) => {
                cluster.life.begin("STOPPING", Some("STOPPED".to_string()), polls);
                return Ok(ack(None));
            }
            (Method::Put, ["contract"]) => {
                detail.contract_period = product_name(&field(request, "ContractId").unwrap_or_default());
            }
            (Method::Put, ["next-contract"]) => {
                detail.next_contract_period =
                    product_name(&field(request, "NextContractId").unwrap_or_default());
            }
            (Method::Post | Method::Put, ["backup"]) => {
                let backup: BackupRequest = body(request)?;
                detail.backup = Some(BackupDetail {
                    archive_backup_schedule_frequency: backup.archive_backup_schedule_frequency,
                    backup_retention_period: backup.backup_retention_period,
                    backup_start_hour: backup.backup_start_hour,
                    full_backup_day_of_week: backup.full_backup_day_of_week,
                });
            }
            (Method::Delete, ["backup"]) => {
                detail.backup = None;
            }
            _ => return Err(not_found(request)),
        }
        cluster.life.edit(polls);
        Ok(ack(None))
    }

    // ========== Tags ==========

    fn tag_route(&mut self, request: &ApiRequest, rest: &str) -> Result<Json, ApiError> {
        let segments: Vec<&str> = rest.split('/').collect();
        match (request.method, segments.as_slice()) {
            (Method::Get, [id, "tags"]) => {
                let page: usize = request
                    .query_value("page")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(0);
                let size: usize = request
                    .query_value("size")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(20);
                let all: Vec<Tag> = self
                    .tags
                    .get(*id)
                    .map(|tags| {
                        tags.iter()
                            .map(|(k, v)| Tag {
                                tag_key: k.clone(),
                                tag_value: v.clone(),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                let total_count = all.len() as i64;
                let contents = all.into_iter().skip(page * size).take(size).collect();
                Ok(to_json(&ListResponse {
                    contents,
                    total_count,
                }))
            }
            (Method::Post, [id, "tags"]) => {
                let tags: Vec<Tag> = request
                    .body
                    .as_ref()
                    .and_then(|b| b.get("Tags"))
                    .and_then(|t| serde_json::from_value(t.clone()).ok())
                    .ok_or_else(|| error(request, 400, "INVALID_REQUEST"))?;
                let entry = self.tags.entry(id.to_string()).or_default();
                for tag in tags {
                    entry.insert(tag.tag_key, tag.tag_value);
                }
                Ok(Json::Null)
            }
            (Method::Put, [id, "tags", key]) => {
                let value = field(request, "TagValue").unwrap_or_default();
                self.tags
                    .entry(id.to_string())
                    .or_default()
                    .insert(decoded(key), value);
                Ok(Json::Null)
            }
            (Method::Delete, [id, "tags", key]) => {
                if let Some(tags) = self.tags.get_mut(*id) {
                    tags.remove(&decoded(key));
                }
                Ok(Json::Null)
            }
            _ => Err(not_found(request)),
        }
    }

    // ========== Virtual servers ==========

    fn server_detail(&self, id: &str) -> Option<VirtualServerDetail> {
        let server = self.servers.get(id)?;
        let mut detail = server.detail.clone();
        detail.virtual_server_state = server.life.state.clone();
        detail.block_storages = std::iter::once(server.boot.clone())
            .chain(
                self.volumes
                    .values()
                    .filter(|v| v.detail.virtual_server_id.as_deref() == Some(id))
                    .map(|v| AttachedVolume {
                        block_storage_id: v.detail.block_storage_id.clone(),
                        block_storage_name: v.detail.block_storage_name.clone(),
                        block_storage_size_gb: v.detail.block_storage_size_gb,
                        disk_type: v.disk_type.clone(),
                        encrypted: v.encrypted,
                        is_boot_disk: false,
                    }),
            )
            .collect();
        Some(detail)
    }

    fn add_volume(
        &mut self,
        name: String,
        size_gb: i32,
        product: &str,
        encrypted: bool,
        server_id: &str,
        life: Lifecycle,
    ) -> String {
        let id = self.new_id("vol");
        self.volumes.insert(
            id.clone(),
            Volume {
                detail: BlockStorageDetail {
                    block_storage_id: id.clone(),
                    block_storage_name: name,
                    block_storage_size_gb: size_gb,
                    block_storage_state: life.state.clone(),
                    virtual_server_id: Some(server_id.to_string()),
                },
                disk_type: product_name(product),
                encrypted,
                life,
            },
        );
        id
    }

    fn create_server(&mut self, request: &ApiRequest) -> Result<Json, ApiError> {
        let create: CreateVirtualServerRequest = body(request)?;
        let id = self.new_id("vs");
        let nic_id = self.new_id("nic");
        let boot_id = self.new_id("vol");
        let polls = self.settle_polls;

        for storage in &create.external_storages {
            self.add_volume(
                storage.block_storage_name.clone(),
                storage.block_storage_size_gb,
                &storage.product_id,
                storage.encrypted,
                &id,
                Lifecycle {
                    state: "ACTIVE".to_string(),
                    next: None,
                },
            );
        }

        let os_type = if create.image_id.contains("WINDOWS") {
            "WINDOWS"
        } else {
            "LINUX"
        };
        let detail = VirtualServerDetail {
            virtual_server_id: id.clone(),
            virtual_server_name: create.virtual_server_name,
            virtual_server_state: "CREATING".to_string(),
            image_id: create.image_id.clone(),
            service_zone_id: create.service_zone_id,
            os_type: os_type.to_string(),
            server_type: product_name(&create.server_type_id),
            contract_period: product_name(&create.contract_id),
            next_contract_period: "None".to_string(),
            security_group_ids: create.security_group_ids,
            placement_group_id: create.placement_group_id,
            key_pair_id: create.key_pair_id,
            admin_account: Some(create.admin_account),
            nics: vec![Nic {
                nic_id,
                subnet_id: create.nic.subnet_id,
                vpc_id: create.nic.vpc_id,
                ip_address: create
                    .nic
                    .internal_ip_address
                    .unwrap_or_else(|| "192.168.0.10".to_string()),
                is_primary: true,
                nat_enabled: create.nic.nat_enabled,
                nic_state: "ACTIVE".to_string(),
            }],
            block_storages: Vec::new(),
        };
        let boot = AttachedVolume {
            block_storage_id: boot_id,
            block_storage_name: create.os_storage.block_storage_name,
            block_storage_size_gb: create.os_storage.block_storage_size_gb,
            disk_type: "SSD".to_string(),
            encrypted: create.os_storage.encrypted,
            is_boot_disk: true,
        };
        self.servers.insert(
            id.clone(),
            Server {
                detail,
                boot,
                life: Lifecycle::new("CREATING", "RUNNING", polls),
            },
        );
        Ok(ack(Some(id)))
    }

    fn server_route(&mut self, request: &ApiRequest, rest: &str) -> Result<Json, ApiError> {
        let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
        let polls = self.settle_polls;

        match (request.method, segments.as_slice()) {
            (Method::Post, []) => return self.create_server(request),
            (Method::Get, [id]) => {
                let server = self.servers.get_mut(*id).ok_or_else(|| not_found(request))?;
                if !server.life.poll() {
                    self.servers.remove(*id);
                    self.tags.remove(*id);
                    return Err(not_found(request));
                }
                return self
                    .server_detail(id)
                    .map(|d| to_json(&d))
                    .ok_or_else(|| not_found(request));
            }
            _ => {}
        }

        let Some(id) = segments.first() else {
            return Err(not_found(request));
        };
        let new_nic = self.new_id("nic");
        let Inner { servers, busy, .. } = self;
        let server = servers.get_mut(*id).ok_or_else(|| not_found(request))?;
        Self::note_busy(busy, request, &server.life);
        let detail = &mut server.detail;

        match (request.method, &segments[1..]) {
            (Method::Delete, []) => {
                server.life.begin("TERMINATING", None, polls);
                return Ok(ack(None));
            }
            (Method::Put, ["server-type"]) => {
                detail.server_type = product_name(&field(request, "ServerTypeId").unwrap_or_default());
            }
            (Method::Post, ["start"]) => {
                server.life.begin("STARTING", Some("RUNNING".to_string()), polls);
                return Ok(ack(None));
            }
            (Method::Post, ["stop"]) => {
                server.life.begin("STOPPING", Some("STOPPED".to_string()), polls);
                return Ok(ack(None));
            }
            (Method::Put, ["contract"]) => {
                detail.contract_period = product_name(&field(request, "ContractId").unwrap_or_default());
            }
            (Method::Put, ["next-contract"]) => {
                detail.next_contract_period =
                    product_name(&field(request, "NextContractId").unwrap_or_default());
            }
            (Method::Post, ["security-groups", sg]) => {
                if !detail.security_group_ids.iter().any(|s| s == sg) {
                    detail.security_group_ids.push(sg.to_string());
                }
            }
            (Method::Delete, ["security-groups", sg]) => {
                detail.security_group_ids.retain(|s| s != sg);
            }
            (Method::Post, ["nics"]) => {
                let subnet_id = field(request, "SubnetId").unwrap_or_default();
                let ip_address = field(request, "InternalIPAddress")
                    .unwrap_or_else(|| format!("10.1.0.{}", detail.nics.len() + 10));
                detail.nics.push(Nic {
                    nic_id: new_nic,
                    subnet_id,
                    vpc_id: String::new(),
                    ip_address,
                    is_primary: false,
                    nat_enabled: false,
                    nic_state: "ACTIVE".to_string(),
                });
            }
            (Method::Delete, ["nics", nic]) => {
                detail.nics.retain(|n| n.nic_id != *nic);
            }
            (Method::Post, ["nics", nic, "nat"]) => {
                let nic = detail
                    .nics
                    .iter_mut()
                    .find(|n| n.nic_id == *nic)
                    .ok_or_else(|| not_found(request))?;
                nic.nat_enabled = true;
            }
            (Method::Delete, ["nics", nic, "nat"]) => {
                let nic = detail
                    .nics
                    .iter_mut()
                    .find(|n| n.nic_id == *nic)
                    .ok_or_else(|| not_found(request))?;
                if !nic.nat_enabled {
                    return Err(error(request, 400, "NIC_NAT_NOT_EXIST"));
                }
                nic.nat_enabled = false;
            }
            _ => return Err(not_found(request)),
        }
        server.life.edit(polls);
        Ok(ack(None))
    }

    // ========== Standalone volumes ==========

    fn volume_route(&mut self, request: &ApiRequest, rest: &str) -> Result<Json, ApiError> {
        let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
        let polls = self.settle_polls;

        match (request.method, segments.as_slice()) {
            (Method::Post, []) => {
                let create: CreateBlockStorageRequest = body(request)?;
                let id = self.add_volume(
                    create.block_storage_name,
                    create.block_storage_size_gb,
                    &create.product_id,
                    create.encrypted,
                    &create.virtual_server_id,
                    Lifecycle::new("CREATING", "ACTIVE", polls),
                );
                Ok(ack(Some(id)))
            }
            (Method::Get, [id]) => {
                let volume = self.volumes.get_mut(*id).ok_or_else(|| not_found(request))?;
                if !volume.life.poll() {
                    self.volumes.remove(*id);
                    return Err(not_found(request));
                }
                volume.detail.block_storage_state = volume.life.state.clone();
                Ok(to_json(&volume.detail))
            }
            (method, [id, tail @ ..]) => {
                let Inner { volumes, busy, .. } = self;
                let volume = volumes.get_mut(*id).ok_or_else(|| not_found(request))?;
                Self::note_busy(busy, request, &volume.life);
                match (method, tail) {
                    (Method::Delete, []) => {
                        volume.life.begin("DELETING", None, polls);
                    }
                    (Method::Put, ["size"]) => {
                        volume.detail.block_storage_size_gb = field(request, "BlockStorageSizeGB")
                            .and_then(|s| s.parse().ok())
                            .ok_or_else(|| error(request, 400, "INVALID_REQUEST"))?;
                        volume.life.begin("EDITING", Some("ACTIVE".to_string()), polls);
                    }
                    (Method::Post, ["detach"]) => {
                        volume.detail.virtual_server_id = None;
                        volume.life.begin("DETACHING", Some("ACTIVE".to_string()), polls);
                    }
                    _ => return Err(not_found(request)),
                }
                Ok(ack(None))
            }
            _ => Err(not_found(request)),
        }
    }
}

/// Shared handle on the fake control plane
#[derive(Clone)]
pub struct FakeCloud {
    inner: Arc<Mutex<Inner>>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                settle_polls: 1,
                ..Inner::default()
            })),
        }
    }

    /// Number of transitional polls before an object settles
    pub fn settling_after(self, polls: u32) -> Self {
        self.inner.lock().unwrap().settle_polls = polls;
        self
    }

    pub fn provider(&self) -> ScpProvider {
        ScpProvider::with_transport(Arc::new(self.clone()), WaitSettings::default())
    }

    /// Answer the next `times` matching calls with `status`
    pub fn fail(&self, method: Method, fragment: &str, status: u16, times: u32) {
        self.fail_with_code(method, fragment, status, "INJECTED", times);
    }

    pub fn fail_with_code(&self, method: Method, fragment: &str, status: u16, code: &str, times: u32) {
        self.inner.lock().unwrap().faults.push(Fault {
            method,
            fragment: fragment.to_string(),
            status,
            code: code.to_string(),
            remaining: times,
        });
    }

    /// Cancel `token` once a matching call has been handled
    pub fn cancel_after(&self, method: Method, fragment: &str, token: CancellationToken) {
        self.inner.lock().unwrap().trips.push(Trip {
            method,
            fragment: fragment.to_string(),
            token,
        });
    }

    /// Number of calls with `method` whose path contains `fragment`
    pub fn calls(&self, method: Method, fragment: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(m, p)| *m == method && p.contains(fragment))
            .count()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().calls.len()
    }

    /// Non-GET calls in order, as `METHOD path`
    pub fn mutations(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(m, _)| *m != Method::Get)
            .map(|(m, p)| format!("{} {}", m, p))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    /// Mutations that reached an object still in transition
    pub fn busy_mutations(&self) -> Vec<String> {
        self.inner.lock().unwrap().busy.clone()
    }

    pub fn cluster_count(&self) -> usize {
        self.inner.lock().unwrap().clusters.len()
    }

    pub fn volume_count(&self) -> usize {
        self.inner.lock().unwrap().volumes.len()
    }

    pub fn tags_of(&self, id: &str) -> BTreeMap<String, String> {
        self.inner
            .lock()
            .unwrap()
            .tags
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Give `id` the tags `key-0000=value-0` .. `key-{n-1}`
    pub fn seed_tags(&self, id: &str, n: usize) {
        let tags = (0..n)
            .map(|i| (format!("key-{:04}", i), format!("value-{}", i)))
            .collect();
        self.inner.lock().unwrap().tags.insert(id.to_string(), tags);
    }

    /// Force a settled cluster state, as another client would
    pub fn set_cluster_state(&self, id: &str, state: &str) {
        if let Some(cluster) = self.inner.lock().unwrap().clusters.get_mut(id) {
            cluster.life = Lifecycle {
                state: state.to_string(),
                next: None,
            };
        }
    }

    /// Drop a cluster behind the driver's back
    pub fn forget_cluster(&self, id: &str) {
        self.inner.lock().unwrap().clusters.remove(id);
    }
}

#[async_trait]
impl Transport for FakeCloud {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push((request.method, request.path.clone()));
        if let Some(err) = inner.fault(&request) {
            return Err(err);
        }
        let body = inner.route(&request)?;
        inner.trip(&request);
        Ok(ApiResponse { status: 200, body })
    }
}
