//! Product catalog resolver
//!
//! Maps human readable descriptors (server type names, cpu/memory pairs, disk
//! and contract names) to the opaque product ids the remote requires. The
//! catalog is fetched once per operation and never cached.

use cumulus_core::context::OperationContext;

use crate::client::ScpApi;
use crate::client::models::{Product, ProductGroup};
use crate::error::{ScpError, ScpResult};

pub const SERVER_TYPE: &str = "SCALE";
pub const DISK: &str = "DISK";
pub const CONTRACT: &str = "CONTRACT_DISCOUNT";

const CPU_ITEM: &str = "cpu";
const MEMORY_ITEM: &str = "memory";

/// Product group of one service zone
#[derive(Debug, Clone)]
pub struct Catalog {
    group: ProductGroup,
    service_zone_id: String,
}

impl Catalog {
    pub async fn fetch(
        api: &ScpApi,
        ctx: &OperationContext,
        group_name: &str,
        service_zone_id: &str,
    ) -> ScpResult<Self> {
        ctx.check()?;
        log::debug!("fetching product group {} of {}", group_name, service_zone_id);
        let group = api.product_group(group_name, service_zone_id).await?;
        Ok(Self::new(group, service_zone_id))
    }

    pub fn new(group: ProductGroup, service_zone_id: impl Into<String>) -> Self {
        Self {
            group,
            service_zone_id: service_zone_id.into(),
        }
    }

    fn products(&self, product_type: &str) -> impl Iterator<Item = &Product> {
        self.group
            .products
            .iter()
            .filter(move |p| p.product_type == product_type)
    }

    fn miss(&self, what: &'static str, wanted: impl Into<String>) -> ScpError {
        ScpError::CatalogMiss {
            what,
            wanted: wanted.into(),
            service_zone_id: self.service_zone_id.clone(),
        }
    }

    fn by_name(&self, product_type: &str, what: &'static str, name: &str) -> ScpResult<&str> {
        self.products(product_type)
            .find(|p| p.product_name == name)
            .map(|p| p.product_id.as_str())
            .ok_or_else(|| self.miss(what, format!("{:?}", name)))
    }

    pub fn server_type_by_name(&self, name: &str) -> ScpResult<&str> {
        self.by_name(SERVER_TYPE, "server type", name)
    }

    /// Server type whose items carry both `cpu == cpu` and `memory == memory_gb`
    pub fn server_type_by_capacity(&self, cpu: i32, memory_gb: i32) -> ScpResult<&Product> {
        self.products(SERVER_TYPE)
            .find(|p| capacity(p) == Some((cpu, memory_gb)))
            .ok_or_else(|| {
                self.miss(
                    "server type",
                    format!("cpu_count = {}, memory_size_gb = {}", cpu, memory_gb),
                )
            })
    }

    pub fn disk_by_name(&self, name: &str) -> ScpResult<&str> {
        self.by_name(DISK, "disk type", name)
    }

    pub fn contract_by_name(&self, name: &str) -> ScpResult<&str> {
        self.by_name(CONTRACT, "contract", name)
    }

    /// (cpu, memory) of a server type name reported by a detail call
    pub fn capacity_of(&self, server_type_name: &str) -> Option<(i32, i32)> {
        self.products(SERVER_TYPE)
            .find(|p| p.product_name == server_type_name)
            .and_then(capacity)
    }
}

fn capacity(product: &Product) -> Option<(i32, i32)> {
    let item = |name: &str| {
        product
            .items
            .iter()
            .find(|i| i.item_name == name)
            .and_then(|i| i.item_value.parse::<i32>().ok())
    };
    Some((item(CPU_ITEM)?, item(MEMORY_ITEM)?))
}
