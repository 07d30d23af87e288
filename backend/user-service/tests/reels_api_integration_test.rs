/// Integration tests for Reels API endpoints
/// Tests the full HTTP routing and response handling

use uuid::Uuid;

// Note: These tests require the actix-test framework
// Full integration tests would require:
// 1. A test HTTP server with all middleware
// 2. Mock ClickHouse and Redis connections
// 3. Proper JWT authentication setup

/// Test that reels handlers are properly structured
#[test]
fn test_feed_query_params_structure() {
    use user_service::handlers::reels::FeedQueryParams;

    let json = r#"{"limit": 40, "cursor": "test_cursor"}"#;
    let params: FeedQueryParams = serde_json::from_str(json).unwrap();

    assert_eq!(params.limit, 40);
    assert_eq!(params.cursor, Some("test_cursor".to_string()));
}

/// Test feed query params with default limit
#[test]
fn test_feed_query_params_default_limit() {
    use user_service::handlers::reels::FeedQueryParams;

    let json = r#"{"cursor": "cursor123"}"#;
    let params: FeedQueryParams = serde_json::from_str(json).unwrap();

    assert_eq!(params.limit, 40); // Default limit
    assert_eq!(params.cursor, Some("cursor123".to_string()));
}

/// Test trending query params
#[test]
fn test_trending_query_params_structure() {
    use user_service::handlers::reels::TrendingQueryParams;

    let json = r#"{"category": "music", "limit": 50}"#;
    let params: TrendingQueryParams = serde_json::from_str(json).unwrap();

    assert_eq!(params.category, Some("music".to_string()));
    assert_eq!(params.limit, 50);
}

/// Test trending query params with defaults
#[test]
fn test_trending_query_params_defaults() {
    use user_service::handlers::reels::TrendingQueryParams;

    let json = r#"{}"#;
    let params: TrendingQueryParams = serde_json::from_str(json).unwrap();

    assert_eq!(params.category, None);
    assert_eq!(params.limit, 100); // Default trending limit
}

/// Test search query params
#[test]
fn test_search_query_params_structure() {
    use user_service::handlers::reels::SearchQueryParams;

    let json = r#"{"q": "dance", "creator_id": "user123", "category": "trends", "limit": 25}"#;
    let params: SearchQueryParams = serde_json::from_str(json).unwrap();

    assert_eq!(params.q, "dance");
    assert_eq!(params.creator_id, Some("user123".to_string()));
    assert_eq!(params.category, Some("trends".to_string()));
    assert_eq!(params.limit, 25);
}

/// Test search query params with required field only
#[test]
fn test_search_query_params_required_only() {
    use user_service::handlers::reels::SearchQueryParams;

    let json = r#"{"q": "viral"}"#;
    let params: SearchQueryParams = serde_json::from_str(json).unwrap();

    assert_eq!(params.q, "viral");
    assert_eq!(params.creator_id, None);
    assert_eq!(params.category, None);
    assert_eq!(params.limit, 50); // Default search limit
}

/// Test engagement request payload
#[test]
fn test_engagement_request_with_completion() {
    use user_service::handlers::reels::EngagementRequest;

    let json = r#"{"completion_percent": 85}"#;
    let req: EngagementRequest = serde_json::from_str(json).unwrap();

    assert_eq!(req.completion_percent, Some(85));
}

/// Test engagement request without completion
#[test]
fn test_engagement_request_without_completion() {
    use user_service::handlers::reels::EngagementRequest;

    let json = r#"{}"#;
    let req: EngagementRequest = serde_json::from_str(json).unwrap();

    assert_eq!(req.completion_percent, None);
}

/// Test trending response structure
#[test]
fn test_trending_response_structure() {
    use user_service::handlers::reels::TrendingResponse;

    let response = TrendingResponse {
        id: "trending1".to_string(),
        name: "#DanceChallenge".to_string(),
        usage_count: 50000,
        rank: 1,
        video_samples: vec![
            "video1".to_string(),
            "video2".to_string(),
            "video3".to_string(),
        ],
    };

    assert_eq!(response.id, "trending1");
    assert_eq!(response.name, "#DanceChallenge");
    assert_eq!(response.usage_count, 50000);
    assert_eq!(response.rank, 1);
    assert_eq!(response.video_samples.len(), 3);
}

/// Test creator response structure
#[test]
fn test_creator_response_structure() {
    use user_service::handlers::reels::CreatorResponse;

    let response = CreatorResponse {
        creator_id: "creator123".to_string(),
        username: "viral_creator".to_string(),
        follower_count: 100000,
        follower_growth_rate: 0.15,
        preview_videos: vec![
            "vid1".to_string(),
            "vid2".to_string(),
        ],
    };

    assert_eq!(response.creator_id, "creator123");
    assert_eq!(response.username, "viral_creator");
    assert_eq!(response.follower_count, 100000);
    assert_eq!(response.follower_growth_rate, 0.15);
    assert_eq!(response.preview_videos.len(), 2);
}

/// Test search result structure
#[test]
fn test_search_result_structure() {
    use user_service::handlers::reels::SearchResult;

    let result = SearchResult {
        video_id: "video_uuid_123".to_string(),
        title: "Amazing Dance Moves".to_string(),
        creator_id: "creator_123".to_string(),
        duration_seconds: 30,
        relevance_score: 0.95,
        thumbnail_url: Some("https://example.com/thumb.jpg".to_string()),
    };

    assert_eq!(result.video_id, "video_uuid_123");
    assert_eq!(result.title, "Amazing Dance Moves");
    assert_eq!(result.duration_seconds, 30);
    assert_eq!(result.relevance_score, 0.95);
    assert!(result.thumbnail_url.is_some());
}

/// Test API response wrapper
#[test]
fn test_api_response_ok() {
    use user_service::handlers::reels::ApiResponse;

    let response = ApiResponse::ok("test_data");

    assert!(response.success);
    assert_eq!(response.data, "test_data");
    assert!(response.error.is_none());
}

/// Test API response serialization
#[test]
fn test_api_response_json_serialization() {
    use user_service::handlers::reels::ApiResponse;

    let response = ApiResponse::ok("test");
    let json = serde_json::to_string(&response).unwrap();

    assert!(json.contains("\"success\":true"));
    assert!(json.contains("\"test\""));
    assert!(!json.contains("\"error\""));
}

/// Test query parameter limits
#[test]
fn test_feed_query_params_boundary_values() {
    use user_service::handlers::reels::FeedQueryParams;

    // Test minimum limit
    let json_min = r#"{"limit": 0}"#;
    let params_min: FeedQueryParams = serde_json::from_str(json_min).unwrap();
    assert_eq!(params_min.limit, 0);

    // Test maximum reasonable limit
    let json_max = r#"{"limit": 1000}"#;
    let params_max: FeedQueryParams = serde_json::from_str(json_max).unwrap();
    assert_eq!(params_max.limit, 1000);
}

/// Test UUID parsing in paths
#[test]
fn test_uuid_path_parsing() {
    let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
    let uuid = Uuid::parse_str(uuid_str).unwrap();
    assert_eq!(uuid.to_string(), uuid_str);
}

/// Test various query parameter combinations
#[test]
fn test_search_params_various_combinations() {
    use user_service::handlers::reels::SearchQueryParams;

    // Test with all parameters
    let json_full = r#"{"q": "music", "creator_id": "user1", "category": "pop", "limit": 100}"#;
    let params_full: SearchQueryParams = serde_json::from_str(json_full).unwrap();
    assert_eq!(params_full.q, "music");
    assert_eq!(params_full.creator_id, Some("user1".to_string()));
    assert_eq!(params_full.category, Some("pop".to_string()));
    assert_eq!(params_full.limit, 100);

    // Test with only required + creator_id
    let json_partial = r#"{"q": "search", "creator_id": "user2"}"#;
    let params_partial: SearchQueryParams = serde_json::from_str(json_partial).unwrap();
    assert_eq!(params_partial.q, "search");
    assert_eq!(params_partial.creator_id, Some("user2".to_string()));
    assert_eq!(params_partial.category, None);
    assert_eq!(params_partial.limit, 50); // Default
}

/// Test special characters in search query
#[test]
fn test_search_query_special_characters() {
    use user_service::handlers::reels::SearchQueryParams;

    let json = r#"{"q": "dance #viral @creator 🎵"}"#;
    let params: SearchQueryParams = serde_json::from_str(json).unwrap();

    assert!(params.q.contains("dance"));
    assert!(params.q.contains("#viral"));
    assert!(params.q.contains("@creator"));
    assert!(params.q.contains("🎵"));
}

/// Test trending response with empty samples
#[test]
fn test_trending_response_empty_samples() {
    use user_service::handlers::reels::TrendingResponse;

    let response = TrendingResponse {
        id: "trending_empty".to_string(),
        name: "#EmptyTrend".to_string(),
        usage_count: 0,
        rank: 100,
        video_samples: vec![],
    };

    assert_eq!(response.video_samples.len(), 0);
}

/// Test creator response with various follower counts
#[test]
fn test_creator_response_follower_variations() {
    use user_service::handlers::reels::CreatorResponse;

    let micro_creator = CreatorResponse {
        creator_id: "micro".to_string(),
        username: "small_creator".to_string(),
        follower_count: 1000,
        follower_growth_rate: 0.25,
        preview_videos: vec![],
    };
    assert_eq!(micro_creator.follower_count, 1000);

    let macro_creator = CreatorResponse {
        creator_id: "macro".to_string(),
        username: "big_creator".to_string(),
        follower_count: 10_000_000,
        follower_growth_rate: 0.01,
        preview_videos: vec!["vid1".to_string()],
    };
    assert_eq!(macro_creator.follower_count, 10_000_000);
}

/// Test search result without thumbnail
#[test]
fn test_search_result_no_thumbnail() {
    use user_service::handlers::reels::SearchResult;

    let result = SearchResult {
        video_id: "video_no_thumb".to_string(),
        title: "No Thumbnail".to_string(),
        creator_id: "creator".to_string(),
        duration_seconds: 60,
        relevance_score: 0.5,
        thumbnail_url: None,
    };

    assert!(result.thumbnail_url.is_none());
}

/// Test relevance score boundary values
#[test]
fn test_search_result_relevance_score_bounds() {
    use user_service::handlers::reels::SearchResult;

    let perfect_match = SearchResult {
        video_id: "v1".to_string(),
        title: "Perfect".to_string(),
        creator_id: "c1".to_string(),
        duration_seconds: 60,
        relevance_score: 1.0,
        thumbnail_url: None,
    };
    assert_eq!(perfect_match.relevance_score, 1.0);

    let poor_match = SearchResult {
        video_id: "v2".to_string(),
        title: "Poor".to_string(),
        creator_id: "c2".to_string(),
        duration_seconds: 60,
        relevance_score: 0.0,
        thumbnail_url: None,
    };
    assert_eq!(poor_match.relevance_score, 0.0);
}
