// Database access layer for feature metadata
// This module handles PostgreSQL operations for feature definitions,
// entity types, and metadata management.

use sqlx::PgPool;

pub struct FeatureMetadataRepository {
    pool: PgPool,
}

impl FeatureMetadataRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // TODO: Implement methods:
    // - get_feature_metadata
    // - create_feature_definition
    // - update_feature_definition
    // - list_features_by_entity_type
    // - get_entity_type_schema
}

pub struct EntityTypeRepository {
    pool: PgPool,
}

impl EntityTypeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // TODO: Implement methods:
    // - get_entity_type
    // - create_entity_type
    // - list_entity_types
}
