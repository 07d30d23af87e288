pub mod feed_cache;
pub mod user_cache;

pub use feed_cache::FeedCache;
pub use user_cache::{
    get_cached_user, set_cached_user, invalidate_user_cache,
    cache_search_results, get_cached_search_results, invalidate_search_cache,
    CachedUser,
};
