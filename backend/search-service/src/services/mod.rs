pub mod clickhouse;
pub mod elasticsearch;
pub mod redis_cache;

pub use clickhouse::ClickHouseClient;
pub use elasticsearch::ElasticsearchClient;
pub use redis_cache::RedisCache;
