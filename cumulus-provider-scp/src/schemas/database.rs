//! Database cluster schemas, one per engine

use cumulus_core::schema::{AttributeSchema, AttributeType, ObjectSchema, ResourceSchema};

use super::types::{self, DISK_TYPES, enum_of};
use crate::resources::engine::{ENGINES, Engine, ExtraKind, Topology};
use crate::validation;

pub const BLOCK_STORAGE_ROLES: &[&str] = &["DATA", "ARCHIVE", "TEMP", "BACKUP"];

/// Attributes that can be changed without recreating the cluster
pub fn mutable_attributes(engine: &Engine) -> Vec<String> {
    vec![
        "server_type".to_string(),
        "block_storages".to_string(),
        "security_group_ids".to_string(),
        engine.cluster_state_attr(),
        "contract_period".to_string(),
        "next_contract_period".to_string(),
        "backup".to_string(),
        "tags".to_string(),
    ]
}

fn block_storages(engine: &Engine) -> AttributeSchema {
    let block = ObjectSchema::new()
        .attribute(
            AttributeSchema::new("block_storage_role_type", enum_of(BLOCK_STORAGE_ROLES))
                .required(),
        )
        .attribute(AttributeSchema::new("block_storage_type", enum_of(DISK_TYPES)).required())
        .attribute(
            AttributeSchema::new("block_storage_size", AttributeType::Int)
                .required()
                .with_validator(validation::int_range(10, 5120))
                .with_description("Size in GB"),
        )
        .attribute(
            AttributeSchema::new("block_storage_group_id", AttributeType::String).computed(),
        );
    AttributeSchema::new("block_storages", block.into_list())
        .required()
        .with_max_items(engine.max_block_storages)
        .with_description(
            "Additional block storages. Existing entries can only grow; new entries are appended",
        )
}

fn servers(engine: &Engine) -> AttributeSchema {
    let block = ObjectSchema::new()
        .attribute(
            AttributeSchema::new("server_name", AttributeType::String)
                .required()
                .with_validator(validation::resource_name(3, 20)),
        )
        .attribute(
            AttributeSchema::new("server_role_type", enum_of(&engine.roles())).required(),
        )
        .attribute(AttributeSchema::new("availability_zone_name", AttributeType::String).computed());
    let attr = AttributeSchema::new(engine.servers_attr(), block.into_list())
        .required()
        .force_new();
    match engine.topology {
        Topology::Replicated => attr.with_max_items(2),
        Topology::Sharded => attr,
    }
}

pub fn schema(engine: &Engine) -> ResourceSchema {
    let mut schema = ResourceSchema::new(engine.resource_type)
        .with_description(format!("{} cluster", engine.display))
        .attribute(
            types::fixed(&engine.cluster_name_attr())
                .with_validator(validation::resource_name(3, 20))
                .with_description("Cluster name, unique within the project"),
        )
        .attribute(types::power_state(&engine.cluster_state_attr()))
        .attribute(types::fixed("image_id"))
        .attribute(types::fixed("service_zone_id"))
        .attribute(types::fixed("vpc_id"))
        .attribute(types::fixed("subnet_id"))
        .attribute(
            AttributeSchema::new("server_type", AttributeType::String)
                .required()
                .with_description("Server type name from the product catalog, e.g. db1v2m4"),
        )
        .attribute(types::security_group_ids())
        .attribute(
            AttributeSchema::new("database_port", AttributeType::Int)
                .required()
                .force_new()
                .with_validator(validation::int_range(1024, 65535)),
        )
        .attribute(
            AttributeSchema::new("database_user_password", AttributeType::String)
                .required()
                .force_new()
                .sensitive()
                .with_validator(validation::password()),
        )
        .attribute(
            AttributeSchema::new("timezone", AttributeType::String)
                .computed()
                .force_new(),
        )
        .attribute(types::contract("contract_period"))
        .attribute(types::contract("next_contract_period"))
        .attribute(block_storages(engine))
        .attribute(servers(engine))
        .attribute(types::backup())
        .attribute(types::maintenance())
        .attribute(types::tags())
        .attribute(
            AttributeSchema::new("cluster_id", AttributeType::String)
                .computed()
                .with_description("Identifier assigned by the remote"),
        );

    if engine.has_database {
        schema = schema
            .attribute(
                types::fixed("database_name")
                    .with_validator(validation::matches(
                        "^[a-zA-Z][a-zA-Z0-9_]{1,19}$",
                        "must be 2 to 20 characters of letters, digits or underscores starting with a letter",
                    )),
            )
            .attribute(
                types::fixed("database_user_name")
                    .with_validator(validation::string_length(2, 20)),
            );
    }

    for extra in engine.extras {
        let attr_type = match extra.kind {
            ExtraKind::String => AttributeType::String,
            ExtraKind::Int => AttributeType::Int,
            ExtraKind::Bool => AttributeType::Bool,
        };
        let mut attr = AttributeSchema::new(extra.name, attr_type)
            .force_new()
            .with_description(extra.description);
        attr = if extra.required {
            attr.required()
        } else {
            attr.computed()
        };
        if let Some((min, max)) = extra.range {
            attr = attr.with_validator(validation::int_range(min, max));
        }
        schema = schema.attribute(attr);
    }

    schema
}

pub fn schemas() -> Vec<ResourceSchema> {
    ENGINES.iter().map(|engine| schema(engine)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cumulus_core::resource::Value;
    use crate::resources::engine::{MARIADB, REDIS, REDIS_CLUSTER};

    #[test]
    fn prefixed_attributes() {
        let schema = schema(&MARIADB);
        assert!(schema.get("mariadb_cluster_name").is_some_and(|a| a.force_new));
        assert!(schema.get("mariadb_servers").is_some());
        assert!(schema.get("database_character_set").is_some_and(|a| a.computed));
        assert!(schema.is_sensitive("database_user_password"));
    }

    #[test]
    fn redis_has_no_database_user() {
        let schema = schema(&REDIS);
        assert!(schema.get("database_name").is_none());
        assert!(schema.get("database_user_name").is_none());
        assert_eq!(schema.get("block_storages").and_then(|a| a.max_items), Some(1));
    }

    #[test]
    fn shard_counts_are_required_and_ranged() {
        let schema = schema(&REDIS_CLUSTER);
        let shards = schema.get("shards_count").unwrap();
        assert!(shards.required);
        assert_eq!(shards.validators.len(), 1);
    }

    #[test]
    fn mutable_set_is_prefixed() {
        assert!(mutable_attributes(&MARIADB).contains(&"mariadb_cluster_state".to_string()));
        let schema = schema(&MARIADB);
        assert_eq!(
            schema.get("mariadb_cluster_state").and_then(|a| a.default.clone()),
            Some(Value::string("RUNNING"))
        );
    }

    #[test]
    fn every_engine_has_a_schema() {
        assert_eq!(schemas().len(), 6);
    }
}
