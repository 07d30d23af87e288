//! GraphQL Caching Tests (Quick Win #5)
//!
//! Tests for Redis-based GraphQL subscription caching
//!
//! Test Coverage:
//! - Cache hit/miss scenarios
//! - TTL expiration
//! - Concurrent access
//! - Memory bounds
//! - Invalidation on updates

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

// Mock Redis cache for testing (replace with actual implementation)
struct MockRedisCache {
    data: Arc<tokio::sync::RwLock<std::collections::HashMap<String, (String, std::time::Instant)>>>,
    ttl: Duration,
}

impl MockRedisCache {
    fn new(ttl_seconds: u64) -> Self {
        Self {
            data: Arc::new(tokio::sync::RwLock::new(std::collections::HashMap::new())),
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    async fn set(&self, key: String, value: String) {
        let mut data = self.data.write().await;
        data.insert(key, (value, std::time::Instant::now()));
    }

    async fn get(&self, key: &str) -> Option<String> {
        let mut data = self.data.write().await;
        if let Some((value, inserted_at)) = data.get(key) {
            if inserted_at.elapsed() < self.ttl {
                return Some(value.clone());
            } else {
                // Expired - remove it
                data.remove(key);
            }
        }
        None
    }

    async fn delete(&self, key: &str) {
        let mut data = self.data.write().await;
        data.remove(key);
    }

    async fn size(&self) -> usize {
        let data = self.data.read().await;
        data.len()
    }

    async fn clear_expired(&self) {
        let mut data = self.data.write().await;
        data.retain(|_, (_, inserted_at)| inserted_at.elapsed() < self.ttl);
    }
}

#[tokio::test]
async fn test_cache_hit_scenario() {
    // Test: Cache returns stored value on hit
    let cache = MockRedisCache::new(60);

    let key = "feed:user_123";
    let value = r#"{"id":"post_1","content":"Hello"}"#.to_string();

    // Store value
    cache.set(key.to_string(), value.clone()).await;

    // Retrieve value (should hit)
    let result = cache.get(key).await;

    assert!(result.is_some(), "Should find cached value");
    assert_eq!(result.unwrap(), value, "Should return exact value");
}

#[tokio::test]
async fn test_cache_miss_scenario() {
    // Test: Cache returns None on miss
    let cache = MockRedisCache::new(60);

    let result = cache.get("nonexistent_key").await;

    assert!(result.is_none(), "Should return None on cache miss");
}

#[tokio::test]
async fn test_ttl_expiration() {
    // Test: Cached values expire after TTL
    let cache = MockRedisCache::new(1); // 1 second TTL

    let key = "feed:user_123";
    let value = r#"{"id":"post_1"}"#.to_string();

    cache.set(key.to_string(), value.clone()).await;

    // Immediately should hit
    assert!(
        cache.get(key).await.is_some(),
        "Should hit before expiration"
    );

    // Wait for expiration
    sleep(Duration::from_secs(2)).await;

    // Should miss after TTL
    assert!(
        cache.get(key).await.is_none(),
        "Should miss after TTL expiration"
    );
}

#[tokio::test]
async fn test_concurrent_access_safety() {
    // Test: Cache handles concurrent read/write safely
    let cache = Arc::new(MockRedisCache::new(60));
    let mut handles = vec![];

    // Spawn 100 concurrent writers
    for i in 0..100 {
        let cache_clone = Arc::clone(&cache);
        let handle = tokio::spawn(async move {
            let key = format!("key_{}", i % 10); // 10 unique keys
            let value = format!("value_{}", i);
            cache_clone.set(key, value).await;
        });
        handles.push(handle);
    }

    // Spawn 100 concurrent readers
    for i in 0..100 {
        let cache_clone = Arc::clone(&cache);
        let handle = tokio::spawn(async move {
            let key = format!("key_{}", i % 10);
            let _ = cache_clone.get(&key).await;
        });
        handles.push(handle);
    }

    // Wait for all operations
    for handle in handles {
        handle.await.expect("Task should complete");
    }

    // Cache should have ~10 keys (some may have expired in race)
    let size = cache.size().await;
    assert!(size <= 10, "Should have at most 10 keys, got {}", size);
}

#[tokio::test]
async fn test_memory_bounds() {
    // Test: Cache doesn't grow unbounded
    let cache = MockRedisCache::new(60);
    let max_items = 1000;

    // Insert many items
    for i in 0..max_items {
        let key = format!("key_{}", i);
        let value = format!("value_{}", i);
        cache.set(key, value).await;
    }

    let size = cache.size().await;
    assert_eq!(size, max_items, "Should store all items");

    // In production, this would trigger eviction or memory limits
    // For now, verify we can track size
    assert!(size > 0, "Cache should have items");
}

#[tokio::test]
async fn test_invalidation_on_update() {
    // Test: Cache is invalidated when data updates
    let cache = MockRedisCache::new(60);

    let key = "feed:user_123";
    let old_value = r#"{"id":"post_1","likes":10}"#.to_string();
    let new_value = r#"{"id":"post_1","likes":11}"#.to_string();

    // Set initial value
    cache.set(key.to_string(), old_value.clone()).await;
    assert_eq!(cache.get(key).await, Some(old_value));

    // Invalidate (delete)
    cache.delete(key).await;
    assert!(cache.get(key).await.is_none(), "Should invalidate cache");

    // Set new value
    cache.set(key.to_string(), new_value.clone()).await;
    assert_eq!(
        cache.get(key).await,
        Some(new_value),
        "Should have new value"
    );
}

#[tokio::test]
async fn test_batch_operations() {
    // Test: Batch cache operations for DataLoader
    let cache = MockRedisCache::new(60);

    let items = vec![
        ("key_1", r#"{"id":"1"}"#),
        ("key_2", r#"{"id":"2"}"#),
        ("key_3", r#"{"id":"3"}"#),
    ];

    // Batch set
    for (key, value) in &items {
        cache.set(key.to_string(), value.to_string()).await;
    }

    // Batch get
    for (key, expected_value) in &items {
        let value = cache.get(key).await;
        assert_eq!(
            value,
            Some(expected_value.to_string()),
            "Should retrieve batched item"
        );
    }
}

#[tokio::test]
async fn test_cache_hit_rate_measurement() {
    // Test: Track cache hit/miss metrics
    let cache = MockRedisCache::new(60);

    let mut hits = 0;
    let mut misses = 0;

    // Set some values
    for i in 0..10 {
        let key = format!("key_{}", i);
        cache.set(key, format!("value_{}", i)).await;
    }

    // Mix of hits and misses
    for i in 0..20 {
        let key = format!("key_{}", i);
        if cache.get(&key).await.is_some() {
            hits += 1;
        } else {
            misses += 1;
        }
    }

    assert_eq!(hits, 10, "Should have 10 hits");
    assert_eq!(misses, 10, "Should have 10 misses");

    let hit_rate = hits as f64 / (hits + misses) as f64;
    assert_eq!(hit_rate, 0.5, "Hit rate should be 50%");
}

#[tokio::test]
async fn test_cache_eviction_on_ttl() {
    // Test: Expired entries are evicted
    let cache = MockRedisCache::new(1); // 1 second TTL

    // Add 5 items
    for i in 0..5 {
        cache
            .set(format!("key_{}", i), format!("value_{}", i))
            .await;
    }

    assert_eq!(cache.size().await, 5, "Should have 5 items");

    // Wait for expiration
    sleep(Duration::from_secs(2)).await;

    // Trigger cleanup
    cache.clear_expired().await;

    assert_eq!(cache.size().await, 0, "All items should be expired");
}

#[tokio::test]
async fn test_subscription_event_caching() {
    // Test: Cache subscription events for fast delivery
    let cache = MockRedisCache::new(60);

    let event = r#"{"type":"new_post","user_id":"user_123","post_id":"post_456"}"#;
    let key = "subscription:sub_789";

    cache.set(key.to_string(), event.to_string()).await;

    let cached_event = cache.get(key).await;
    assert!(cached_event.is_some(), "Should cache subscription event");
    assert_eq!(
        cached_event.unwrap(),
        event,
        "Should return exact event data"
    );
}

#[tokio::test]
async fn test_cache_pattern_deletion() {
    // Test: Delete cache entries by pattern
    let cache = MockRedisCache::new(60);

    // Add items with pattern
    for i in 0..5 {
        cache
            .set(format!("feed:user_123:{}", i), "value".to_string())
            .await;
        cache
            .set(format!("feed:user_456:{}", i), "value".to_string())
            .await;
    }

    // In real Redis, use KEYS pattern matching
    // For mock, manually delete matching keys
    for i in 0..5 {
        cache.delete(&format!("feed:user_123:{}", i)).await;
    }

    // Verify user_123 keys deleted, user_456 remain
    for i in 0..5 {
        assert!(
            cache.get(&format!("feed:user_123:{}", i)).await.is_none(),
            "user_123 keys should be deleted"
        );
        assert!(
            cache.get(&format!("feed:user_456:{}", i)).await.is_some(),
            "user_456 keys should remain"
        );
    }
}

#[tokio::test]
async fn test_notification_pub_sub_cache() {
    // Test: Cache notifications with pub/sub pattern
    let cache = MockRedisCache::new(60);

    let notification = r#"{"type":"like","actor":"user_456","post":"post_789"}"#;
    let key = "notification:user_123";

    // Cache notification
    cache.set(key.to_string(), notification.to_string()).await;

    // Retrieve for delivery
    let cached = cache.get(key).await;
    assert!(cached.is_some(), "Should cache notification");

    // In real implementation, also PUBLISH to subscribers
}

#[tokio::test]
async fn test_cache_performance_improvement() {
    // Test: Cache provides performance improvement over DB
    let cache = MockRedisCache::new(60);

    // Simulate DB query time
    let db_query_time = Duration::from_millis(50);

    // Without cache (DB query)
    let start = std::time::Instant::now();
    sleep(db_query_time).await; // Simulate DB query
    let without_cache = start.elapsed();

    // With cache (should be much faster)
    cache.set("key".to_string(), "value".to_string()).await;
    let start = std::time::Instant::now();
    let _ = cache.get("key").await;
    let with_cache = start.elapsed();

    // Cache should be at least 10x faster
    assert!(
        with_cache < without_cache / 10,
        "Cache should be significantly faster (cache: {:?}, db: {:?})",
        with_cache,
        without_cache
    );
}

#[tokio::test]
async fn test_cache_memory_limit_enforcement() {
    // Test: Cache respects memory limits
    let cache = MockRedisCache::new(60);

    // In production, Redis has maxmemory setting
    // For mock, track approximate memory usage
    let item_size_bytes = 100; // Approximate size per item
    let max_memory_bytes = 10_000; // 10KB limit
    let max_items = max_memory_bytes / item_size_bytes;

    // Fill cache to limit
    for i in 0..max_items {
        cache
            .set(format!("key_{}", i), "x".repeat(item_size_bytes))
            .await;
    }

    let size = cache.size().await;
    assert!(
        size <= max_items,
        "Should not exceed memory limit (got {} items)",
        size
    );
}
