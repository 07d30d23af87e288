/// Content caching layer
///
/// This module provides:
/// - Redis-based caching for posts, comments, stories
/// - Cache invalidation strategies
/// - Cache warming utilities
///
/// TODO: Extract cache implementations from user-service

// Placeholder
pub struct ContentCache;
