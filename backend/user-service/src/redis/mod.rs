pub mod keys;
/// Redis utilities and operations
/// Centralizes all Redis interactions to eliminate duplication
pub mod operations;

pub use keys::{
    EmailVerificationKey, FeedCacheKey, PasswordResetKey, RedisKeyBuilder, TokenRevocationKey,
};
pub use operations::{
    redis_delete, redis_exists, redis_expire, redis_get, redis_incr, redis_set_ex,
};
