use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::Result;

/// Hot post entry in Redis cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotPost {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub likes: u32,
    pub comments: u32,
    pub shares: u32,
    pub score: f32,
}

/// Configuration for hot post generator job
#[derive(Debug, Clone)]
pub struct HotPostJobConfig {
    /// Refresh interval in seconds
    pub refresh_interval_secs: u64,
    /// Redis cache key prefix
    pub redis_key: String,
    /// Redis TTL in seconds (should be 2x refresh interval)
    pub redis_ttl_secs: usize,
    /// Number of top posts to cache
    pub top_posts_count: u32,
}

impl Default for HotPostJobConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 60,
            redis_key: "hot:posts:1h".to_string(),
            redis_ttl_secs: 120,
            top_posts_count: 200,
        }
    }
}

/// Background job for generating and caching hot posts
pub struct HotPostGenerator {
    config: HotPostJobConfig,
    clickhouse_client: Arc<ClickHouseClient>,
    redis_client: Arc<RedisClient>,
}

// Mock clients for now
pub struct ClickHouseClient;
pub struct RedisClient;

impl HotPostGenerator {
    pub fn new(
        config: HotPostJobConfig,
        clickhouse_client: Arc<ClickHouseClient>,
        redis_client: Arc<RedisClient>,
    ) -> Self {
        Self {
            config,
            clickhouse_client,
            redis_client,
        }
    }

    /// Start the background job
    /// Returns a JoinHandle that can be awaited or aborted
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(self.config.refresh_interval_secs));

            info!(
                "Starting hot post generator job (interval: {}s)",
                self.config.refresh_interval_secs
            );

            loop {
                interval.tick().await;

                if let Err(e) = self.refresh_hot_posts().await {
                    error!("Failed to refresh hot posts: {}", e);
                } else {
                    debug!("Successfully refreshed hot posts cache");
                }
            }
        })
    }

    /// Generate hot posts from ClickHouse and cache to Redis
    async fn refresh_hot_posts(&self) -> Result<()> {
        debug!("Refreshing hot posts from ClickHouse");

        // Step 1: Query ClickHouse for top posts by engagement in last 1 hour
        let hot_posts = self.fetch_hot_posts_from_clickhouse().await?;

        if hot_posts.is_empty() {
            warn!("No hot posts found in ClickHouse");
            return Ok(());
        }

        debug!("Fetched {} hot posts", hot_posts.len());

        // Step 2: Serialize and cache to Redis
        self.cache_hot_posts(&hot_posts).await?;

        info!(
            "Cached {} hot posts to Redis key: {}",
            hot_posts.len(),
            self.config.redis_key
        );

        Ok(())
    }

    /// Query ClickHouse for top posts by engagement (last 1 hour)
    /// Algorithm:
    /// 1. Calculate engagement score: likes + 2*comments + 3*shares
    /// 2. Normalize by impressions count
    /// 3. Apply freshness decay: exp(-Î» * age_hours)
    /// 4. Final score: 0.4 * engagement + 0.3 * freshness
    async fn fetch_hot_posts_from_clickhouse(&self) -> Result<Vec<HotPost>> {
        let _query = r#"
            SELECT
                post_id,
                author_id,
                likes_count as likes,
                comments_count as comments,
                shares_count as shares,
                round(0.40 * log1p((likes_count + 2.0*comments_count + 3.0*shares_count) /
                        greatest(impressions_count, 1)) +
                      0.30 * exp(-0.10 * dateDiff('hour', metric_hour, now())), 4) as score
            FROM post_metrics_1h
            WHERE metric_hour >= now() - INTERVAL 1 HOUR
              AND metric_hour < now()
            ORDER BY score DESC
            LIMIT ?
        "#;

        debug!("Executing ClickHouse query for hot posts");

        // TODO: Execute query with real clickhouse-rs client
        // Example:
        // let response = self.clickhouse_client
        //     .query(_query)
        //     .bind(self.config.top_posts_count)
        //     .fetch_all()
        //     .await?;
        // let posts: Vec<HotPost> = serde_json::from_slice(&response)?;
        // Ok(posts)

        // Placeholder implementation
        Ok(vec![])
    }

    /// Cache hot posts to Redis
    /// Cache key: hot:posts:1h
    /// Format: JSON array
    /// TTL: 120 seconds (2x refresh interval)
    async fn cache_hot_posts(&self, posts: &[HotPost]) -> Result<()> {
        let json_data = serde_json::to_string(posts)?;

        debug!(
            "Caching {} posts to Redis (key: {}, ttl: {}s)",
            posts.len(),
            self.config.redis_key,
            self.config.redis_ttl_secs
        );

        // TODO: Implement Redis SET with TTL
        // Example:
        // self.redis_client
        //     .set_ex(&self.config.redis_key, json_data, self.config.redis_ttl_secs)
        //     .await?;

        Ok(())
    }
}

/// Suggested users generator job
/// Background job for generating collaborative filtering recommendations
pub struct SuggestedUsersGenerator {
    config: SuggestedUsersJobConfig,
    clickhouse_client: Arc<ClickHouseClient>,
    redis_client: Arc<RedisClient>,
}

#[derive(Debug, Clone)]
pub struct SuggestedUsersJobConfig {
    /// Refresh interval in seconds
    pub refresh_interval_secs: u64,
    /// Redis cache key prefix (format: suggest:users:{user_id})
    pub redis_key_prefix: String,
    /// Redis TTL in seconds
    pub redis_ttl_secs: usize,
    /// Number of suggested users per recommendation
    pub suggestions_per_user: u32,
}

impl Default for SuggestedUsersJobConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 300, // 5 minutes
            redis_key_prefix: "suggest:users".to_string(),
            redis_ttl_secs: 600, // 10 minutes
            suggestions_per_user: 20,
        }
    }
}

impl SuggestedUsersGenerator {
    pub fn new(
        config: SuggestedUsersJobConfig,
        clickhouse_client: Arc<ClickHouseClient>,
        redis_client: Arc<RedisClient>,
    ) -> Self {
        Self {
            config,
            clickhouse_client,
            redis_client,
        }
    }

    /// Start the background job for periodic recommendations refresh
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(self.config.refresh_interval_secs));

            info!(
                "Starting suggested users generator job (interval: {}s)",
                self.config.refresh_interval_secs
            );

            loop {
                interval.tick().await;

                // For periodic refresh, could refresh a subset of active users
                // For now, recommendations are generated on-demand via API
                debug!("Suggested users job heartbeat");
            }
        })
    }

    /// Generate suggestions for a specific user
    /// Algorithm: Collaborative filtering
    /// 1. Find authors that target user interacted with (follows, likes, comments)
    /// 2. Find authors that similar users follow (shared interactions)
    /// 3. Rank by overlap score and recency
    /// 4. Exclude already-followed users
    /// 5. Cache result to Redis
    pub async fn generate_suggestions(&self, user_id: Uuid) -> Result<Vec<SuggestedUser>> {
        let cache_key = format!("{}:{}", self.config.redis_key_prefix, user_id);

        // Step 1: Check Redis cache
        if let Ok(cached) = self.get_cached_suggestions(&cache_key).await {
            debug!("Cache hit for suggestions of user {}", user_id);
            return Ok(cached);
        }

        debug!("Generating suggestions for user {} (cache miss)", user_id);

        // Step 2: Query ClickHouse for collaborative filtering
        let suggestions = self.query_collaborative_filtering(user_id).await?;

        // Step 3: Cache results
        if let Err(e) = self.cache_suggestions(&cache_key, &suggestions).await {
            warn!("Failed to cache suggestions for user {}: {}", user_id, e);
        }

        Ok(suggestions)
    }

    /// Query ClickHouse for suggested users using collaborative filtering
    /// SQL Strategy:
    /// 1. Find users with similar interaction patterns
    /// 2. Get authors they follow that target user doesn't
    /// 3. Rank by interaction frequency and recency
    async fn query_collaborative_filtering(&self, user_id: Uuid) -> Result<Vec<SuggestedUser>> {
        let _query = format!(
            r#"
            SELECT
                aa.author_id as suggested_user_id,
                count(distinct aa.user_id) as mutual_followers,
                sum(aa.interaction_count) as total_interactions,
                max(aa.last_interaction) as last_interaction,
                round(log1p(sum(aa.interaction_count)), 4) as affinity_score
            FROM user_author_90d aa
            INNER JOIN (
                -- Users with similar interaction history to target user
                SELECT distinct aa2.author_id
                FROM user_author_90d aa2
                WHERE aa2.user_id = '{}'
            ) similar_authors ON aa.author_id = similar_authors.author_id
            WHERE aa.user_id != '{}'
              AND aa.author_id NOT IN (
                SELECT following_id FROM follows_cdc
                WHERE follower_id = '{}' AND is_active = 1
              )
            GROUP BY aa.author_id
            ORDER BY affinity_score DESC, total_interactions DESC
            LIMIT {}
            "#,
            user_id, user_id, user_id, self.config.suggestions_per_user
        );

        debug!(
            "Executing collaborative filtering query for user {}",
            user_id
        );

        // TODO: Execute real ClickHouse query
        // Example:
        // let response = self.clickhouse_client.query(&_query).fetch_all().await?;
        // let suggestions: Vec<SuggestedUser> = serde_json::from_slice(&response)?;
        // Ok(suggestions)

        Ok(vec![])
    }

    /// Get cached suggestions from Redis
    async fn get_cached_suggestions(&self, _cache_key: &str) -> Result<Vec<SuggestedUser>> {
        // TODO: Implement Redis GET + deserialize
        Err(crate::error::AppError::NotFound("Cache miss".to_string()))
    }

    /// Cache suggestions to Redis
    async fn cache_suggestions(
        &self,
        cache_key: &str,
        suggestions: &[SuggestedUser],
    ) -> Result<()> {
        let json_data = serde_json::to_string(suggestions)?;
        // TODO: Implement Redis SET with TTL
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedUser {
    pub suggested_user_id: Uuid,
    pub mutual_followers: u32,
    pub total_interactions: u32,
    pub last_interaction: DateTime<Utc>,
    pub affinity_score: f32,
}

/// Feed cache warmer job
/// Pre-generates feeds for active users to reduce query latency
pub struct FeedCacheWarmer {
    config: FeedCacheWarmerConfig,
    clickhouse_client: Arc<ClickHouseClient>,
    redis_client: Arc<RedisClient>,
}

#[derive(Debug, Clone)]
pub struct FeedCacheWarmerConfig {
    /// Refresh interval in seconds
    pub refresh_interval_secs: u64,
    /// Number of top active users to warm cache for
    pub top_active_users: u32,
    /// Page size for feed cache
    pub page_size: u32,
}

impl Default for FeedCacheWarmerConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 120,
            top_active_users: 100,
            page_size: 20,
        }
    }
}

impl FeedCacheWarmer {
    pub fn new(
        config: FeedCacheWarmerConfig,
        clickhouse_client: Arc<ClickHouseClient>,
        redis_client: Arc<RedisClient>,
    ) -> Self {
        Self {
            config,
            clickhouse_client,
            redis_client,
        }
    }

    /// Start the background cache warming job
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(self.config.refresh_interval_secs));

            info!(
                "Starting feed cache warmer job (interval: {}s)",
                self.config.refresh_interval_secs
            );

            loop {
                interval.tick().await;

                if let Err(e) = self.warm_top_users_feeds().await {
                    warn!("Failed to warm feed cache: {}", e);
                }
            }
        })
    }

    /// Warm feed cache for top active users
    async fn warm_top_users_feeds(&self) -> Result<()> {
        debug!("Warming feed cache for top active users");

        // Step 1: Get top active users from event logs
        let active_users = self.get_top_active_users().await?;
        debug!("Found {} active users to warm", active_users.len());

        // Step 2: For each user, pre-generate and cache first page of feed
        for user_id in active_users {
            if let Err(e) = self.warm_user_feed(user_id).await {
                warn!("Failed to warm feed for user {}: {}", user_id, e);
            }
        }

        Ok(())
    }

    /// Get top active users from ClickHouse events
    async fn get_top_active_users(&self) -> Result<Vec<Uuid>> {
        let _query = format!(
            r#"
            SELECT distinct user_id
            FROM events_raw
            WHERE created_at > now() - INTERVAL 1 HOUR
            GROUP BY user_id
            ORDER BY count(*) DESC
            LIMIT {}
            "#,
            self.config.top_active_users
        );

        // TODO: Execute real query
        Ok(vec![])
    }

    /// Warm feed for a specific user
    async fn warm_user_feed(&self, user_id: Uuid) -> Result<()> {
        let _cache_key = format!("feed:v1:{}:0:{}", user_id, self.config.page_size);

        // TODO: Query ClickHouse for user's feed (similar to FeedService)
        // TODO: Cache to Redis with TTL

        debug!("Warmed feed cache for user {}", user_id);
        Ok(())
    }
}
