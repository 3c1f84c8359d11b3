//! Database engine descriptors
//!
//! The six engines share one lifecycle driver; everything that differs between
//! them (paths, roles, limits, engine specific fields) is described here.

/// How the servers of a cluster are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// One primary and an optional standby
    Replicated,
    /// `shards_count` primaries, each with `shards_replica_count` replicas
    Sharded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraKind {
    String,
    Int,
    Bool,
}

/// Engine specific attribute, sent as a top-level request field
#[derive(Debug, Clone, Copy)]
pub struct Extra {
    pub name: &'static str,
    pub kind: ExtraKind,
    pub required: bool,
    pub range: Option<(i64, i64)>,
    pub description: &'static str,
}

impl Extra {
    const fn optional(name: &'static str, kind: ExtraKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            range: None,
            description,
        }
    }
}

#[derive(Debug)]
pub struct Engine {
    /// Resource type name, also the attribute prefix (`mariadb_cluster_name`)
    pub resource_type: &'static str,
    pub display: &'static str,
    /// Cluster collection path
    pub base_path: &'static str,
    /// Query parameter filtering the collection by cluster name
    pub name_filter: &'static str,
    pub product_group: &'static str,
    pub primary_role: &'static str,
    pub secondary_role: &'static str,
    pub max_block_storages: usize,
    pub topology: Topology,
    /// Has a database name and user
    pub has_database: bool,
    pub extras: &'static [Extra],
}

impl Engine {
    pub fn cluster_name_attr(&self) -> String {
        format!("{}_cluster_name", self.resource_type)
    }

    pub fn cluster_state_attr(&self) -> String {
        format!("{}_cluster_state", self.resource_type)
    }

    pub fn servers_attr(&self) -> String {
        format!("{}_servers", self.resource_type)
    }

    pub fn roles(&self) -> [&'static str; 2] {
        [self.primary_role, self.secondary_role]
    }

    pub fn extra(&self, name: &str) -> Option<&Extra> {
        self.extras.iter().find(|e| e.name == name)
    }
}

pub const SHARDS_COUNT: &str = "shards_count";
pub const SHARDS_REPLICA_COUNT: &str = "shards_replica_count";

pub static EPAS: Engine = Engine {
    resource_type: "epas",
    display: "EPAS",
    base_path: "/epas/v2/epas-clusters",
    name_filter: "epasClusterName",
    product_group: "EPAS",
    primary_role: "ACTIVE",
    secondary_role: "STANDBY",
    max_block_storages: 10,
    topology: Topology::Replicated,
    has_database: true,
    extras: &[
        Extra::optional("database_encoding", ExtraKind::String, "Database encoding, e.g. UTF8"),
        Extra::optional("database_locale", ExtraKind::String, "Database locale, e.g. C"),
    ],
};

pub static MARIADB: Engine = Engine {
    resource_type: "mariadb",
    display: "MariaDB",
    base_path: "/mariadb/v2/mariadb-clusters",
    name_filter: "mariadbClusterName",
    product_group: "MariaDB",
    primary_role: "ACTIVE",
    secondary_role: "STANDBY",
    max_block_storages: 10,
    topology: Topology::Replicated,
    has_database: true,
    extras: &[Extra::optional(
        "database_character_set",
        ExtraKind::String,
        "Character set, e.g. utf8",
    )],
};

pub static MYSQL: Engine = Engine {
    resource_type: "mysql",
    display: "MySQL",
    base_path: "/mysql/v2/mysql-clusters",
    name_filter: "mysqlClusterName",
    product_group: "MySQL",
    primary_role: "ACTIVE",
    secondary_role: "STANDBY",
    max_block_storages: 10,
    topology: Topology::Replicated,
    has_database: true,
    extras: &[
        Extra::optional(
            "database_character_set",
            ExtraKind::String,
            "Character set, e.g. utf8mb4",
        ),
        Extra::optional(
            "database_case_sensitive",
            ExtraKind::Bool,
            "Whether table names are case sensitive",
        ),
    ],
};

pub static REDIS: Engine = Engine {
    resource_type: "redis",
    display: "Redis",
    base_path: "/redis/v2/redis",
    name_filter: "redisName",
    product_group: "Redis",
    primary_role: "MASTER",
    secondary_role: "REPLICA",
    max_block_storages: 1,
    topology: Topology::Replicated,
    has_database: false,
    extras: &[],
};

pub static REDIS_CLUSTER: Engine = Engine {
    resource_type: "redis_cluster",
    display: "Redis Cluster",
    base_path: "/redis-cluster/v2/redis-clusters",
    name_filter: "redisClusterName",
    product_group: "Redis Cluster",
    primary_role: "MASTER",
    secondary_role: "REPLICA",
    max_block_storages: 1,
    topology: Topology::Sharded,
    has_database: false,
    extras: &[
        Extra {
            name: SHARDS_COUNT,
            kind: ExtraKind::Int,
            required: true,
            range: Some((3, 40)),
            description: "Number of shards",
        },
        Extra {
            name: SHARDS_REPLICA_COUNT,
            kind: ExtraKind::Int,
            required: true,
            range: Some((0, 3)),
            description: "Replicas per shard",
        },
    ],
};

pub static SQLSERVER: Engine = Engine {
    resource_type: "sqlserver",
    display: "SQL Server",
    base_path: "/sqlserver/v2/sqlserver-clusters",
    name_filter: "sqlserverClusterName",
    product_group: "Microsoft SQL Server",
    primary_role: "PRIMARY",
    secondary_role: "SECONDARY",
    max_block_storages: 10,
    topology: Topology::Replicated,
    has_database: true,
    extras: &[
        Extra::optional(
            "database_collation",
            ExtraKind::String,
            "Collation, e.g. SQL_Latin1_General_CP1_CI_AS",
        ),
        Extra::optional(
            "database_service_name",
            ExtraKind::String,
            "Service name of the instance",
        ),
    ],
};

pub static ENGINES: [&Engine; 6] = [&EPAS, &MARIADB, &MYSQL, &REDIS, &REDIS_CLUSTER, &SQLSERVER];

pub fn by_resource_type(name: &str) -> Option<&'static Engine> {
    ENGINES.iter().copied().find(|e| e.resource_type == name)
}
