//! Virtual server schema

use cumulus_core::resource::Value;
use cumulus_core::schema::{AttributeSchema, AttributeType, ObjectSchema, ResourceSchema};

use super::types::{self, DISK_TYPES, enum_of};
use crate::validation;

pub const RESOURCE_TYPE: &str = "virtual_server";
pub const OS_TYPES: &[&str] = &["LINUX", "WINDOWS"];

/// Attributes that can be changed without recreating the server
pub const MUTABLE_ATTRIBUTES: &[&str] = &[
    "cpu_count",
    "memory_size_gb",
    "external_storage",
    "security_group_ids",
    "local_subnet",
    "nat_enabled",
    "nat_public_ip_id",
    "virtual_server_state",
    "contract_period",
    "next_contract_period",
    "tags",
];

fn external_storage() -> AttributeSchema {
    let block = ObjectSchema::new()
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .with_validator(validation::resource_name(3, 28)),
        )
        .attribute(
            AttributeSchema::new("size_gb", AttributeType::Int)
                .required()
                .with_validator(validation::int_range(1, 16384)),
        )
        .attribute(AttributeSchema::new("product_name", enum_of(DISK_TYPES)).required())
        .attribute(
            AttributeSchema::new("encrypted", AttributeType::Bool)
                .with_default(Value::Bool(false)),
        )
        .attribute(AttributeSchema::new("storage_id", AttributeType::String).computed());
    AttributeSchema::new("external_storage", block.into_list())
        .with_max_items(25)
        .with_description("Standalone volumes attached to the server, in attachment order")
}

fn local_subnet() -> AttributeSchema {
    let block = ObjectSchema::new()
        .attribute(AttributeSchema::new("subnet_id", AttributeType::String).required())
        .attribute(AttributeSchema::new("internal_ip_address", AttributeType::String).computed())
        .attribute(AttributeSchema::new("nic_id", AttributeType::String).computed());
    AttributeSchema::new("local_subnet", block.into_list())
        .with_description("Additional NICs in local subnets")
}

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(RESOURCE_TYPE)
        .with_description("Virtual server")
        .attribute(
            types::fixed("virtual_server_name").with_validator(validation::resource_name(3, 20)),
        )
        .attribute(types::fixed("image_id"))
        .attribute(types::fixed("service_zone_id"))
        .attribute(
            AttributeSchema::new("os_type", enum_of(OS_TYPES))
                .with_default(Value::string("LINUX"))
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("cpu_count", AttributeType::Int)
                .required()
                .with_validator(validation::int_range(1, 128)),
        )
        .attribute(
            AttributeSchema::new("memory_size_gb", AttributeType::Int)
                .required()
                .with_validator(validation::int_range(1, 1024)),
        )
        .attribute(
            AttributeSchema::new("os_storage_name", AttributeType::String)
                .computed()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("os_storage_size_gb", AttributeType::Int)
                .required()
                .force_new()
                .with_validator(validation::int_range(100, 16384)),
        )
        .attribute(
            AttributeSchema::new("os_storage_encrypted", AttributeType::Bool)
                .with_default(Value::Bool(false))
                .force_new(),
        )
        .attribute(external_storage())
        .attribute(types::fixed("vpc_id"))
        .attribute(types::fixed("subnet_id"))
        .attribute(
            AttributeSchema::new("internal_ip_address", AttributeType::String)
                .computed()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("nat_enabled", AttributeType::Bool)
                .with_default(Value::Bool(false)),
        )
        .attribute(
            AttributeSchema::new("nat_public_ip_id", AttributeType::String)
                .with_description("Public IP for the NAT; an automatic address when unset"),
        )
        .attribute(local_subnet())
        .attribute(types::security_group_ids())
        .attribute(AttributeSchema::new("placement_group_id", AttributeType::String).force_new())
        .attribute(AttributeSchema::new("key_pair_id", AttributeType::String).force_new())
        .attribute(
            AttributeSchema::new("admin_account", AttributeType::String)
                .computed()
                .force_new()
                .with_description("root on Linux; 5 to 20 characters other than administrator on Windows"),
        )
        .attribute(
            AttributeSchema::new("admin_password", AttributeType::String)
                .sensitive()
                .force_new()
                .with_validator(validation::password()),
        )
        .attribute(
            AttributeSchema::new("initial_script_content", AttributeType::String)
                .force_new()
                .with_validator(validation::string_length(0, 45000)),
        )
        .attribute(types::contract("contract_period"))
        .attribute(types::contract("next_contract_period"))
        .attribute(types::power_state("virtual_server_state"))
        .attribute(types::tags())
        .attribute(AttributeSchema::new("virtual_server_id", AttributeType::String).computed())
}
