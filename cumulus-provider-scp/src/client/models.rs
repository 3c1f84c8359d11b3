//! Wire records of the SCP control plane
//!
//! Field names are PascalCase on the wire. Fields holding an acronym carry an
//! explicit rename (`CPU`, `IP`, `NAT`, `NIC`).

use serde::{Deserialize, Serialize};

/// `{ "Code", "Message" }` body of a failed call
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
}

/// Acknowledgement of an asynchronous mutation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AsyncResponse {
    #[serde(default)]
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

/// One page of a list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub contents: Vec<T>,
    #[serde(default)]
    pub total_count: i64,
}

// ========== Database clusters ==========

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterSummary {
    pub cluster_id: String,
    pub cluster_name: String,
    #[serde(default)]
    pub cluster_state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerSpec {
    pub server_name: String,
    pub server_role_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_zone_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub tag_key: String,
    #[serde(default)]
    pub tag_value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MaintenanceSpec {
    pub maintenance_start_time: String,
    pub maintenance_period: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_day_of_week: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BackupRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_storage_id: Option<String>,
    pub archive_backup_schedule_frequency: String,
    pub backup_retention_period: String,
    pub backup_start_hour: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_backup_day_of_week: Option<String>,
}

/// Create request shared by every engine
///
/// Engine specific fields (character set, shard counts, ...) travel in `extras`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateClusterRequest {
    pub cluster_name: String,
    pub image_id: String,
    pub service_zone_id: String,
    pub vpc_id: String,
    pub subnet_id: String,
    pub server_type_id: String,
    pub contract_id: String,
    #[serde(default)]
    pub security_group_ids: Vec<String>,
    pub database_port: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_user_name: Option<String>,
    pub database_user_password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    pub servers: Vec<ServerSpec>,
    pub block_storages: Vec<BlockStorageRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<MaintenanceSpec>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(flatten)]
    pub extras: serde_json::Map<String, serde_json::Value>,
}

/// Block storage in a request: the disk type is a catalog product id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlockStorageRequest {
    pub block_storage_role_type: String,
    pub product_id: String,
    pub block_storage_size: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterServer {
    pub server_name: String,
    pub server_role_type: String,
    #[serde(default)]
    pub server_state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_zone_name: Option<String>,
}

/// Block storage as reported in a detail record; index 0 is the OS volume
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterBlockStorage {
    pub block_storage_group_id: String,
    pub block_storage_role_type: String,
    pub block_storage_type: String,
    pub block_storage_size: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BackupDetail {
    pub archive_backup_schedule_frequency: String,
    pub backup_retention_period: String,
    pub backup_start_hour: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_backup_day_of_week: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterDetail {
    pub cluster_id: String,
    pub cluster_name: String,
    pub cluster_state: String,
    #[serde(default)]
    pub image_id: String,
    #[serde(default)]
    pub service_zone_id: String,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub subnet_id: String,
    #[serde(default)]
    pub server_type: String,
    #[serde(default)]
    pub security_group_ids: Vec<String>,
    #[serde(default)]
    pub database_port: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default)]
    pub contract_period: String,
    #[serde(default)]
    pub next_contract_period: String,
    #[serde(default)]
    pub servers: Vec<ClusterServer>,
    #[serde(default)]
    pub block_storages: Vec<ClusterBlockStorage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<BackupDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<MaintenanceSpec>,
    #[serde(flatten)]
    pub extras: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerTypeRequest {
    pub server_type_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResizeRequest {
    pub block_storage_size: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContractRequest {
    pub contract_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NextContractRequest {
    pub next_contract_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagsRequest {
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagValueRequest {
    pub tag_value: String,
}

// ========== Product catalog ==========

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProductGroup {
    pub product_group_id: String,
    pub product_group_name: String,
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Product {
    pub product_id: String,
    pub product_name: String,
    pub product_type: String,
    #[serde(default)]
    pub items: Vec<ProductItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProductItem {
    pub item_name: String,
    pub item_value: String,
}

// ========== Virtual servers ==========

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OsStorageSpec {
    pub block_storage_name: String,
    #[serde(rename = "BlockStorageSizeGB")]
    pub block_storage_size_gb: i32,
    pub encrypted: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExternalStorageRequest {
    pub block_storage_name: String,
    #[serde(rename = "BlockStorageSizeGB")]
    pub block_storage_size_gb: i32,
    pub product_id: String,
    pub encrypted: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PrimaryNicSpec {
    pub vpc_id: String,
    pub subnet_id: String,
    #[serde(
        rename = "InternalIPAddress",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub internal_ip_address: Option<String>,
    #[serde(rename = "NATEnabled")]
    pub nat_enabled: bool,
    #[serde(
        rename = "PublicIPAddressId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub public_ip_address_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateVirtualServerRequest {
    pub virtual_server_name: String,
    pub image_id: String,
    pub service_zone_id: String,
    pub server_type_id: String,
    pub contract_id: String,
    pub os_storage: OsStorageSpec,
    #[serde(default)]
    pub external_storages: Vec<ExternalStorageRequest>,
    pub nic: PrimaryNicSpec,
    #[serde(default)]
    pub security_group_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_pair_id: Option<String>,
    pub admin_account: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_script_content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Nic {
    #[serde(rename = "NICId")]
    pub nic_id: String,
    pub subnet_id: String,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(rename = "IPAddress", default)]
    pub ip_address: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(rename = "NATEnabled", default)]
    pub nat_enabled: bool,
    #[serde(default)]
    pub nic_state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttachedVolume {
    pub block_storage_id: String,
    pub block_storage_name: String,
    #[serde(rename = "BlockStorageSizeGB")]
    pub block_storage_size_gb: i32,
    #[serde(default)]
    pub disk_type: String,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default)]
    pub is_boot_disk: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VirtualServerDetail {
    pub virtual_server_id: String,
    pub virtual_server_name: String,
    pub virtual_server_state: String,
    #[serde(default)]
    pub image_id: String,
    #[serde(default)]
    pub service_zone_id: String,
    #[serde(default)]
    pub os_type: String,
    #[serde(default)]
    pub server_type: String,
    #[serde(default)]
    pub contract_period: String,
    #[serde(default)]
    pub next_contract_period: String,
    #[serde(default)]
    pub security_group_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_pair_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_account: Option<String>,
    #[serde(rename = "NICs", default)]
    pub nics: Vec<Nic>,
    #[serde(default)]
    pub block_storages: Vec<AttachedVolume>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttachNicRequest {
    pub subnet_id: String,
    #[serde(
        rename = "InternalIPAddress",
        skip_serializing_if = "Option::is_none"
    )]
    pub internal_ip_address: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttachNatRequest {
    #[serde(rename = "PublicIPAddressId", skip_serializing_if = "Option::is_none")]
    pub public_ip_address_id: Option<String>,
}

// ========== Standalone block storage ==========

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateBlockStorageRequest {
    pub block_storage_name: String,
    #[serde(rename = "BlockStorageSizeGB")]
    pub block_storage_size_gb: i32,
    pub product_id: String,
    pub encrypted: bool,
    pub virtual_server_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlockStorageDetail {
    pub block_storage_id: String,
    pub block_storage_name: String,
    #[serde(rename = "BlockStorageSizeGB")]
    pub block_storage_size_gb: i32,
    pub block_storage_state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_server_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeResizeRequest {
    #[serde(rename = "BlockStorageSizeGB")]
    pub block_storage_size_gb: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetachRequest {
    pub virtual_server_id: String,
}
