//! Timeline-based feed sorting module
//! 
//! Provides simple time-based feed sorting algorithm with optional engagement scoring.
//! Part of MVP Feed System v1 (minimal viable product)

use chrono::{DateTime, Utc, Duration};
use serde::{Deserialize, Serialize};

/// Represents a post in the timeline feed
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimelinePost {
    pub id: i32,
    pub user_id: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub like_count: i32,
}

/// Sort posts by creation time (newest first) - Simple timeline sort
/// 
/// # Arguments
/// * `posts` - Vector of posts to sort
/// 
/// # Returns
/// Vector of posts sorted by creation timestamp descending
pub fn timeline_sort(mut posts: Vec<TimelinePost>) -> Vec<TimelinePost> {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    posts
}

/// Sort posts by engagement score with time decay
/// Combines like count with recency factor
/// 
/// # Arguments
/// * `posts` - Vector of posts to sort
/// 
/// # Returns
/// Vector of posts sorted by engagement score (higher score = better rank)
pub fn timeline_sort_with_engagement(mut posts: Vec<TimelinePost>) -> Vec<TimelinePost> {
    posts.sort_by(|a, b| {
        let a_score = calculate_engagement_score(&a);
        let b_score = calculate_engagement_score(&b);
        b_score.partial_cmp(&a_score).unwrap_or(std::cmp::Ordering::Equal)
    });
    posts
}

/// Calculate engagement score for a post
/// Score = like_count + time_decay_factor
/// Time decay: newer posts get higher multiplier
fn calculate_engagement_score(post: &TimelinePost) -> f64 {
    let like_score = post.like_count as f64;
    let time_factor = time_decay_factor(&post.created_at);
    
    // Weighted score: 70% likes, 30% recency
    (like_score * 0.7) + (time_factor * 100.0 * 0.3)
}

/// Calculate time-based decay factor
/// Newer posts get higher multiplier (closer to 1.0)
/// Posts older than 7 days get very low score
fn time_decay_factor(created_at: &DateTime<Utc>) -> f64 {
    let hours_old = (Utc::now() - *created_at).num_hours() as f64;
    
    // Exponential decay: e^(-hours/24) - decays over days
    // 0 hours old: 1.0 (100% multiplier)
    // 24 hours old: 0.37 (37% multiplier)
    // 168 hours (7 days) old: 0.001 (~0% multiplier)
    (-hours_old / 24.0).exp()
}
