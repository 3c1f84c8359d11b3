//! Typed facade: one method per remote operation

use std::borrow::Cow;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::models::*;
use super::{ApiError, ApiRequest, Method, Transport};

/// Largest page the list endpoints accept
pub const MAX_PAGE_SIZE: usize = 1000;

const TAG_BASE: &str = "/tag/v2/resources";
const PRODUCT_GROUPS: &str = "/product/v2/product-groups";
const VIRTUAL_SERVERS: &str = "/virtual-server/v3/virtual-servers";
const BLOCK_STORAGES: &str = "/block-storage/v2/block-storages";

/// Percent-encode a caller supplied path segment
fn segment(raw: &str) -> Cow<'_, str> {
    urlencoding::encode(raw)
}

/// Cheap to clone; the transport is shared
#[derive(Clone)]
pub struct ScpApi {
    transport: Arc<dyn Transport>,
}

impl ScpApi {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        let response = self.transport.send(request).await?;
        serde_json::from_value(response.body).map_err(|e| ApiError::Decode {
            path,
            message: e.to_string(),
        })
    }

    /// Call whose payload is not needed
    async fn call_unit(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.transport.send(request).await.map(|_| ())
    }

    fn with_body<B: Serialize>(request: ApiRequest, body: &B) -> Result<ApiRequest, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Decode {
            path: request.path.clone(),
            message: format!("failed to encode request: {}", e),
        })?;
        Ok(request.body(value))
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: String,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = Self::with_body(ApiRequest::new(Method::Post, path), body)?;
        self.call(request).await
    }

    async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: String,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = Self::with_body(ApiRequest::new(Method::Put, path), body)?;
        self.call(request).await
    }

    async fn delete(&self, path: String) -> Result<AsyncResponse, ApiError> {
        let response = self
            .transport
            .send(ApiRequest::new(Method::Delete, path.clone()))
            .await?;
        if response.body.is_null() {
            return Ok(AsyncResponse::default());
        }
        serde_json::from_value(response.body).map_err(|e| ApiError::Decode {
            path,
            message: e.to_string(),
        })
    }

    /// Cluster endpoints of one database engine
    pub fn clusters(&self, base: &'static str, name_filter: &'static str) -> ClusterApi<'_> {
        ClusterApi {
            api: self,
            base,
            name_filter,
        }
    }

    // ========== Tags ==========

    pub async fn list_tags(
        &self,
        resource_id: &str,
        page: usize,
        size: usize,
    ) -> Result<ListResponse<Tag>, ApiError> {
        self.call(
            ApiRequest::new(Method::Get, format!("{}/{}/tags", TAG_BASE, segment(resource_id)))
                .query("page", page)
                .query("size", size),
        )
        .await
    }

    pub async fn add_tags(&self, resource_id: &str, tags: Vec<Tag>) -> Result<(), ApiError> {
        let request = Self::with_body(
            ApiRequest::new(Method::Post, format!("{}/{}/tags", TAG_BASE, segment(resource_id))),
            &TagsRequest { tags },
        )?;
        self.call_unit(request).await
    }

    pub async fn modify_tag(
        &self,
        resource_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ApiError> {
        let request = Self::with_body(
            ApiRequest::new(
                Method::Put,
                format!("{}/{}/tags/{}", TAG_BASE, segment(resource_id), segment(key)),
            ),
            &TagValueRequest {
                tag_value: value.to_string(),
            },
        )?;
        self.call_unit(request).await
    }

    pub async fn remove_tag(&self, resource_id: &str, key: &str) -> Result<(), ApiError> {
        self.call_unit(ApiRequest::new(
            Method::Delete,
            format!("{}/{}/tags/{}", TAG_BASE, segment(resource_id), segment(key)),
        ))
        .await
    }

    // ========== Product catalog ==========

    pub async fn product_group(
        &self,
        group_name: &str,
        service_zone_id: &str,
    ) -> Result<ProductGroup, ApiError> {
        self.call(
            ApiRequest::new(Method::Get, PRODUCT_GROUPS)
                .query("productGroupName", group_name)
                .query("serviceZoneId", service_zone_id),
        )
        .await
    }

    // ========== Virtual servers ==========

    pub async fn create_virtual_server(
        &self,
        request: &CreateVirtualServerRequest,
    ) -> Result<AsyncResponse, ApiError> {
        self.post(VIRTUAL_SERVERS.to_string(), request).await
    }

    pub async fn virtual_server(&self, id: &str) -> Result<VirtualServerDetail, ApiError> {
        self.call(ApiRequest::new(
            Method::Get,
            format!("{}/{}", VIRTUAL_SERVERS, segment(id)),
        ))
        .await
    }

    pub async fn delete_virtual_server(&self, id: &str) -> Result<AsyncResponse, ApiError> {
        self.delete(format!("{}/{}", VIRTUAL_SERVERS, segment(id))).await
    }

    pub async fn set_virtual_server_type(
        &self,
        id: &str,
        server_type_id: &str,
    ) -> Result<AsyncResponse, ApiError> {
        self.put(
            format!("{}/{}/server-type", VIRTUAL_SERVERS, segment(id)),
            &ServerTypeRequest {
                server_type_id: server_type_id.to_string(),
            },
        )
        .await
    }

    pub async fn start_virtual_server(&self, id: &str) -> Result<AsyncResponse, ApiError> {
        self.post(format!("{}/{}/start", VIRTUAL_SERVERS, segment(id)), &serde_json::json!({}))
            .await
    }

    pub async fn stop_virtual_server(&self, id: &str) -> Result<AsyncResponse, ApiError> {
        self.post(format!("{}/{}/stop", VIRTUAL_SERVERS, segment(id)), &serde_json::json!({}))
            .await
    }

    pub async fn set_virtual_server_contract(
        &self,
        id: &str,
        contract_id: &str,
    ) -> Result<AsyncResponse, ApiError> {
        self.put(
            format!("{}/{}/contract", VIRTUAL_SERVERS, segment(id)),
            &ContractRequest {
                contract_id: contract_id.to_string(),
            },
        )
        .await
    }

    pub async fn set_virtual_server_next_contract(
        &self,
        id: &str,
        next_contract_id: &str,
    ) -> Result<AsyncResponse, ApiError> {
        self.put(
            format!("{}/{}/next-contract", VIRTUAL_SERVERS, segment(id)),
            &NextContractRequest {
                next_contract_id: next_contract_id.to_string(),
            },
        )
        .await
    }

    pub async fn attach_virtual_server_security_group(
        &self,
        id: &str,
        security_group_id: &str,
    ) -> Result<AsyncResponse, ApiError> {
        self.post(
            format!(
                "{}/{}/security-groups/{}",
                VIRTUAL_SERVERS, segment(id), segment(security_group_id)
            ),
            &serde_json::json!({}),
        )
        .await
    }

    pub async fn detach_virtual_server_security_group(
        &self,
        id: &str,
        security_group_id: &str,
    ) -> Result<AsyncResponse, ApiError> {
        self.delete(format!(
            "{}/{}/security-groups/{}",
            VIRTUAL_SERVERS, segment(id), segment(security_group_id)
        ))
        .await
    }

    pub async fn attach_nic(
        &self,
        id: &str,
        request: &AttachNicRequest,
    ) -> Result<AsyncResponse, ApiError> {
        self.post(format!("{}/{}/nics", VIRTUAL_SERVERS, segment(id)), request)
            .await
    }

    pub async fn detach_nic(&self, id: &str, nic_id: &str) -> Result<AsyncResponse, ApiError> {
        self.delete(format!("{}/{}/nics/{}", VIRTUAL_SERVERS, segment(id), segment(nic_id)))
            .await
    }

    pub async fn attach_nat(
        &self,
        id: &str,
        nic_id: &str,
        request: &AttachNatRequest,
    ) -> Result<AsyncResponse, ApiError> {
        self.post(
            format!("{}/{}/nics/{}/nat", VIRTUAL_SERVERS, segment(id), segment(nic_id)),
            request,
        )
        .await
    }

    pub async fn detach_nat(&self, id: &str, nic_id: &str) -> Result<AsyncResponse, ApiError> {
        self.delete(format!("{}/{}/nics/{}/nat", VIRTUAL_SERVERS, segment(id), segment(nic_id)))
            .await
    }

    // ========== Standalone block storage ==========

    pub async fn create_block_storage(
        &self,
        request: &CreateBlockStorageRequest,
    ) -> Result<AsyncResponse, ApiError> {
        self.post(BLOCK_STORAGES.to_string(), request).await
    }

    pub async fn block_storage(&self, id: &str) -> Result<BlockStorageDetail, ApiError> {
        self.call(ApiRequest::new(
            Method::Get,
            format!("{}/{}", BLOCK_STORAGES, segment(id)),
        ))
        .await
    }

    pub async fn resize_block_storage(
        &self,
        id: &str,
        size_gb: i32,
    ) -> Result<AsyncResponse, ApiError> {
        self.put(
            format!("{}/{}/size", BLOCK_STORAGES, segment(id)),
            &VolumeResizeRequest {
                block_storage_size_gb: size_gb,
            },
        )
        .await
    }

    pub async fn detach_block_storage(
        &self,
        id: &str,
        virtual_server_id: &str,
    ) -> Result<AsyncResponse, ApiError> {
        self.post(
            format!("{}/{}/detach", BLOCK_STORAGES, segment(id)),
            &DetachRequest {
                virtual_server_id: virtual_server_id.to_string(),
            },
        )
        .await
    }

    pub async fn delete_block_storage(&self, id: &str) -> Result<AsyncResponse, ApiError> {
        self.delete(format!("{}/{}", BLOCK_STORAGES, segment(id))).await
    }
}

/// Cluster endpoints under one engine's collection path
#[derive(Clone, Copy)]
pub struct ClusterApi<'a> {
    api: &'a ScpApi,
    base: &'static str,
    name_filter: &'static str,
}

impl ClusterApi<'_> {
    fn path(&self, id: &str, suffix: &str) -> String {
        format!("{}/{}{}", self.base, segment(id), suffix)
    }

    pub async fn create(&self, request: &CreateClusterRequest) -> Result<AsyncResponse, ApiError> {
        self.api.post(self.base.to_string(), request).await
    }

    /// First page of clusters whose name matches `name`
    pub async fn list_by_name(&self, name: &str) -> Result<ListResponse<ClusterSummary>, ApiError> {
        self.api
            .call(
                ApiRequest::new(Method::Get, self.base)
                    .query(self.name_filter, name)
                    .query("page", 0)
                    .query("size", MAX_PAGE_SIZE),
            )
            .await
    }

    pub async fn detail(&self, id: &str) -> Result<ClusterDetail, ApiError> {
        self.api
            .call(ApiRequest::new(Method::Get, self.path(id, "")))
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<AsyncResponse, ApiError> {
        self.api.delete(self.path(id, "")).await
    }

    pub async fn set_server_type(
        &self,
        id: &str,
        server_type_id: &str,
    ) -> Result<AsyncResponse, ApiError> {
        self.api
            .put(
                self.path(id, "/server-type"),
                &ServerTypeRequest {
                    server_type_id: server_type_id.to_string(),
                },
            )
            .await
    }

    pub async fn add_block_storage(
        &self,
        id: &str,
        request: &BlockStorageRequest,
    ) -> Result<AsyncResponse, ApiError> {
        self.api.post(self.path(id, "/block-storages"), request).await
    }

    pub async fn resize_block_storage(
        &self,
        id: &str,
        group_id: &str,
        size: i32,
    ) -> Result<AsyncResponse, ApiError> {
        self.api
            .put(
                self.path(id, &format!("/block-storages/{}/size", segment(group_id))),
                &ResizeRequest {
                    block_storage_size: size,
                },
            )
            .await
    }

    pub async fn attach_security_group(
        &self,
        id: &str,
        security_group_id: &str,
    ) -> Result<AsyncResponse, ApiError> {
        self.api
            .post(
                self.path(id, &format!("/security-groups/{}", segment(security_group_id))),
                &serde_json::json!({}),
            )
            .await
    }

    pub async fn detach_security_group(
        &self,
        id: &str,
        security_group_id: &str,
    ) -> Result<AsyncResponse, ApiError> {
        self.api
            .delete(self.path(id, &format!("/security-groups/{}", segment(security_group_id))))
            .await
    }

    pub async fn start(&self, id: &str) -> Result<AsyncResponse, ApiError> {
        self.api
            .post(self.path(id, "/start"), &serde_json::json!({}))
            .await
    }

    pub async fn stop(&self, id: &str) -> Result<AsyncResponse, ApiError> {
        self.api
            .post(self.path(id, "/stop"), &serde_json::json!({}))
            .await
    }

    pub async fn set_contract(
        &self,
        id: &str,
        contract_id: &str,
    ) -> Result<AsyncResponse, ApiError> {
        self.api
            .put(
                self.path(id, "/contract"),
                &ContractRequest {
                    contract_id: contract_id.to_string(),
                },
            )
            .await
    }

    pub async fn set_next_contract(
        &self,
        id: &str,
        next_contract_id: &str,
    ) -> Result<AsyncResponse, ApiError> {
        self.api
            .put(
                self.path(id, "/next-contract"),
                &NextContractRequest {
                    next_contract_id: next_contract_id.to_string(),
                },
            )
            .await
    }

    pub async fn create_backup(
        &self,
        id: &str,
        request: &BackupRequest,
    ) -> Result<AsyncResponse, ApiError> {
        self.api.post(self.path(id, "/backup"), request).await
    }

    pub async fn modify_backup(
        &self,
        id: &str,
        request: &BackupRequest,
    ) -> Result<AsyncResponse, ApiError> {
        self.api.put(self.path(id, "/backup"), request).await
    }

    pub async fn delete_backup(&self, id: &str) -> Result<AsyncResponse, ApiError> {
        self.api.delete(self.path(id, "/backup")).await
    }
}
