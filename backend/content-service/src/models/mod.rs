/// Data models for content-service
///
/// This module defines structures for:
/// - Post: Social media posts with media attachments
/// - Comment: Comments on posts
/// - Story: Temporary visual content (similar to Instagram Stories)
///
/// TODO: Extract model definitions from user-service

// Placeholder
pub struct Post;
