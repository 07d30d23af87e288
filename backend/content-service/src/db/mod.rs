/// Database access layer
///
/// This module provides:
/// - Database connection pooling
/// - Repository implementations for posts, comments, stories
/// - Database migrations
///
/// TODO: Extract repository implementations from user-service

// Placeholder
pub struct PostRepository;
