// Near-line feature service - ClickHouse cold/warm storage
// Provides medium-latency access to historical and less frequently accessed features

use clickhouse::Client;
use sqlx::{PgPool, Row};
use tracing::{info, warn, error};
use anyhow::{Result, Context};
use std::collections::HashMap;
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::models::{Feature, FeatureValueData, FeatureDefinition, FeatureType};

pub struct NearLineFeatureService {
    clickhouse_client: Client,
    pg_pool: PgPool,
}

impl NearLineFeatureService {
    pub fn new(clickhouse_client: Client, pg_pool: PgPool) -> Self {
        Self {
            clickhouse_client,
            pg_pool,
        }
    }

    /// Get feature value from ClickHouse
    pub async fn get_feature(
        &self,
        entity_id: &str,
        entity_type: &str,
        feature_name: &str,
    ) -> Result<Option<FeatureValueData>> {
        // TODO: Implement ClickHouse query
        // Query structure:
        // SELECT feature_value, value_type, updated_at
        // FROM features
        // WHERE entity_type = ? AND entity_id = ? AND feature_name = ?
        // ORDER BY updated_at DESC
        // LIMIT 1

        warn!("ClickHouse feature retrieval not implemented yet");
        Ok(None)
    }

    /// Get multiple features for a single entity from ClickHouse
    pub async fn get_features(
        &self,
        entity_id: &str,
        entity_type: &str,
        feature_names: &[String],
    ) -> Result<HashMap<String, FeatureValueData>> {
        // TODO: Implement batch ClickHouse query
        // Use IN clause for feature_names

        warn!("ClickHouse batch feature retrieval not implemented yet");
        Ok(HashMap::new())
    }

    /// Batch get features for multiple entities from ClickHouse
    pub async fn batch_get_features(
        &self,
        entity_ids: &[String],
        entity_type: &str,
        feature_names: &[String],
    ) -> Result<HashMap<String, HashMap<String, FeatureValueData>>> {
        // TODO: Implement large batch ClickHouse query
        // Use IN clauses for both entity_ids and feature_names

        warn!("ClickHouse batch multi-entity feature retrieval not implemented yet");
        Ok(HashMap::new())
    }

    /// Sync feature from Redis to ClickHouse (called by background worker)
    pub async fn sync_feature(
        &self,
        entity_id: &str,
        entity_type: &str,
        feature_name: &str,
        value: FeatureValueData,
    ) -> Result<()> {
        // TODO: Implement ClickHouse insert
        // INSERT INTO features (entity_type, entity_id, feature_name, feature_value, value_type, updated_at)
        // VALUES (?, ?, ?, ?, ?, now())

        warn!("ClickHouse sync not implemented yet");
        Ok(())
    }

    /// Get feature metadata from PostgreSQL
    pub async fn get_feature_metadata(
        &self,
        entity_type: &str,
        feature_name: &str,
    ) -> Result<Option<FeatureDefinition>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, entity_type, feature_type,
                   description, default_ttl_seconds, created_at, updated_at
            FROM feature_definitions
            WHERE entity_type = $1 AND name = $2
            "#
        )
        .bind(entity_type)
        .bind(feature_name)
        .fetch_optional(&self.pg_pool)
        .await
        .context("Failed to fetch feature metadata")?;

        Ok(row.map(|r| {
            FeatureDefinition {
                id: r.get::<Uuid, _>("id"),
                name: r.get::<String, _>("name"),
                entity_type: r.get::<String, _>("entity_type"),
                feature_type: FeatureType::from(r.get::<i32, _>("feature_type")),
                description: r.get::<Option<String>, _>("description"),
                default_ttl_seconds: r.get::<i64, _>("default_ttl_seconds"),
                created_at: r.get::<DateTime<Utc>, _>("created_at"),
                updated_at: r.get::<DateTime<Utc>, _>("updated_at"),
            }
        }))
    }

    /// List all features for an entity type
    pub async fn list_features_by_entity_type(
        &self,
        entity_type: &str,
    ) -> Result<Vec<FeatureDefinition>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, entity_type, feature_type,
                   description, default_ttl_seconds, created_at, updated_at
            FROM feature_definitions
            WHERE entity_type = $1
            ORDER BY name
            "#
        )
        .bind(entity_type)
        .fetch_all(&self.pg_pool)
        .await
        .context("Failed to list features")?;

        let results = rows
            .into_iter()
            .map(|r| {
                FeatureDefinition {
                    id: r.get::<Uuid, _>("id"),
                    name: r.get::<String, _>("name"),
                    entity_type: r.get::<String, _>("entity_type"),
                    feature_type: FeatureType::from(r.get::<i32, _>("feature_type")),
                    description: r.get::<Option<String>, _>("description"),
                    default_ttl_seconds: r.get::<i64, _>("default_ttl_seconds"),
                    created_at: r.get::<DateTime<Utc>, _>("created_at"),
                    updated_at: r.get::<DateTime<Utc>, _>("updated_at"),
                }
            })
            .collect();

        Ok(results)
    }
}
