pub mod events;
pub mod grpc;
pub mod openapi;
pub mod search_suggestions;
pub mod services;

pub use services::{ClickHouseClient, ElasticsearchClient, RedisCache};
