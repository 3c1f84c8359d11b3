//! SCP resource schema definitions

pub mod database;
pub mod types;
pub mod virtual_server;

use cumulus_core::schema::ResourceSchema;

/// Returns all SCP schemas
pub fn all_schemas() -> Vec<ResourceSchema> {
    let mut schemas = database::schemas();
    schemas.push(virtual_server::schema());
    schemas
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn resource_types_are_unique() {
        let schemas = all_schemas();
        let names: HashSet<&str> = schemas.iter().map(|s| s.resource_type.as_str()).collect();
        assert_eq!(names.len(), 7);
        assert!(names.contains("virtual_server"));
    }
}
