/// Advanced integration tests for Events system
/// Tests complex scenarios, edge cases, and system interactions
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Re-implement EventRecord for testing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default)]
    pub ts: Option<i64>,
    pub user_id: Uuid,
    pub post_id: Uuid,
    #[serde(default)]
    pub author_id: Option<Uuid>,
    pub action: String,
    #[serde(default)]
    pub dwell_ms: Option<u32>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub app_ver: Option<String>,
}

/// Test event batching and aggregation
#[test]
fn test_event_batch_aggregation() {
    let user_id = Uuid::new_v4();
    let mut events = Vec::new();

    // Create sequence of events for same post
    for i in 0..10 {
        events.push(EventRecord {
            ts: Some((Utc::now().timestamp_millis()) + i as i64),
            user_id,
            post_id: Uuid::new_v4(),
            author_id: None,
            action: if i % 2 == 0 { "view" } else { "like" }.to_string(),
            dwell_ms: Some(1000 + (i as u32 * 100)),
            device: Some("mobile".to_string()),
            app_ver: Some("2.0.0".to_string()),
        });
    }

    assert_eq!(events.len(), 10);

    // Count event types
    let view_count = events.iter().filter(|e| e.action == "view").count();
    let like_count = events.iter().filter(|e| e.action == "like").count();

    assert_eq!(view_count, 5);
    assert_eq!(like_count, 5);
}

/// Test event ordering and temporal consistency
#[test]
fn test_event_temporal_ordering() {
    let base_time = Utc::now().timestamp_millis();
    let events: Vec<EventRecord> = (0..100)
        .map(|i| EventRecord {
            ts: Some(base_time + (i as i64 * 10)), // 10ms intervals
            user_id: Uuid::new_v4(),
            post_id: Uuid::new_v4(),
            author_id: None,
            action: "engagement".to_string(),
            dwell_ms: Some((i as u32) * 100),
            device: None,
            app_ver: None,
        })
        .collect();

    // Verify ordering
    for i in 1..events.len() {
        let prev_ts = events[i - 1].ts.unwrap();
        let curr_ts = events[i].ts.unwrap();
        assert!(curr_ts > prev_ts, "Events must be ordered chronologically");
    }
}

/// Test multi-user concurrent event generation
#[test]
fn test_multi_user_concurrent_events() {
    let num_users = 50;
    let events_per_user = 20;
    let mut user_event_map: std::collections::HashMap<Uuid, Vec<EventRecord>> =
        std::collections::HashMap::new();

    for user_idx in 0..num_users {
        let user_id = Uuid::new_v4();
        let mut user_events = Vec::new();

        for event_idx in 0..events_per_user {
            user_events.push(EventRecord {
                ts: Some(Utc::now().timestamp_millis() + event_idx as i64),
                user_id,
                post_id: Uuid::new_v4(),
                author_id: None,
                action: format!("action-{}", event_idx % 5),
                dwell_ms: Some((user_idx as u32 * 100) + (event_idx as u32)),
                device: if user_idx % 2 == 0 {
                    Some("web".to_string())
                } else {
                    Some("mobile".to_string())
                },
                app_ver: Some(format!("{}.0.0", user_idx % 3 + 1)),
            });
        }

        user_event_map.insert(user_id, user_events);
    }

    assert_eq!(user_event_map.len(), num_users);

    for events in user_event_map.values() {
        assert_eq!(events.len(), events_per_user);
    }
}

/// Test event filtering by device type
#[test]
fn test_event_filtering_by_device() {
    let devices = vec!["mobile", "web", "tablet", "desktop"];
    let mut all_events = Vec::new();

    for (idx, device) in devices.iter().enumerate() {
        for i in 0..25 {
            all_events.push(EventRecord {
                ts: Some(Utc::now().timestamp_millis()),
                user_id: Uuid::new_v4(),
                post_id: Uuid::new_v4(),
                author_id: None,
                action: "engagement".to_string(),
                dwell_ms: Some(500),
                device: Some(device.to_string()),
                app_ver: None,
            });
        }
    }

    // Filter by device
    for device in &devices {
        let device_events: Vec<_> = all_events
            .iter()
            .filter(|e| e.device.as_ref().map_or(false, |d| d == device))
            .collect();

        assert_eq!(device_events.len(), 25, "Each device should have 25 events");
    }
}

/// Test event deduplication at application level
#[test]
fn test_event_dedup_at_application_level() {
    let user_id = Uuid::new_v4();
    let post_id = Uuid::new_v4();

    // Create identical events (simulating duplicates)
    let event = EventRecord {
        ts: Some(1000000),
        user_id,
        post_id,
        author_id: None,
        action: "like".to_string(),
        dwell_ms: Some(5000),
        device: Some("mobile".to_string()),
        app_ver: Some("1.0.0".to_string()),
    };

    let mut events = vec![event.clone(), event.clone(), event.clone()];

    // Simulate deduplication by creating a set key
    let mut seen = std::collections::HashSet::new();
    let mut unique_events = Vec::new();

    for event in events {
        let key = format!("{}-{}-{}", event.user_id, event.post_id, event.action);
        if seen.insert(key) {
            unique_events.push(event);
        }
    }

    assert_eq!(unique_events.len(), 1, "Duplicates should be removed");
}

/// Test event validation with boundary conditions
#[test]
fn test_event_boundary_conditions() {
    let test_cases = vec![
        (Some(0i64), "Minimum timestamp (epoch)"),
        (Some(i64::MAX), "Maximum timestamp"),
        (Some(-1i64), "Negative timestamp"),
        (None, "No timestamp"),
    ];

    for (ts, description) in test_cases {
        let event = EventRecord {
            ts,
            user_id: Uuid::new_v4(),
            post_id: Uuid::new_v4(),
            author_id: None,
            action: "test".to_string(),
            dwell_ms: None,
            device: None,
            app_ver: None,
        };

        assert_eq!(event.ts, ts, "Failed for: {}", description);
    }
}

/// Test event enrichment with metadata
#[test]
fn test_event_enrichment() {
    let base_event = EventRecord {
        ts: Some(Utc::now().timestamp_millis()),
        user_id: Uuid::new_v4(),
        post_id: Uuid::new_v4(),
        author_id: None,
        action: "view".to_string(),
        dwell_ms: None,
        device: None,
        app_ver: None,
    };

    // Enrich event with additional metadata
    let mut enriched = base_event.clone();
    enriched.author_id = Some(Uuid::new_v4());
    enriched.dwell_ms = Some(2500);
    enriched.device = Some("mobile".to_string());
    enriched.app_ver = Some("1.5.0".to_string());

    assert!(enriched.author_id.is_some());
    assert!(enriched.dwell_ms.is_some());
    assert!(enriched.device.is_some());
    assert!(enriched.app_ver.is_some());
}

/// Test event type diversity
#[test]
fn test_event_type_diversity() {
    let action_types = vec![
        "view",
        "impression",
        "click",
        "like",
        "unlike",
        "share",
        "comment",
        "save",
        "report",
        "follow",
        "unfollow",
        "mute",
        "unmute",
        "block",
        "unblock",
    ];

    let events: Vec<EventRecord> = action_types
        .iter()
        .map(|action| EventRecord {
            ts: Some(Utc::now().timestamp_millis()),
            user_id: Uuid::new_v4(),
            post_id: Uuid::new_v4(),
            author_id: None,
            action: action.to_string(),
            dwell_ms: None,
            device: None,
            app_ver: None,
        })
        .collect();

    assert_eq!(events.len(), action_types.len());

    for (i, action) in action_types.iter().enumerate() {
        assert_eq!(events[i].action, *action);
    }
}

/// Test event version compatibility
#[test]
fn test_event_version_compatibility() {
    let versions = vec![
        Some("1.0.0".to_string()),
        Some("1.5.0".to_string()),
        Some("2.0.0-beta".to_string()),
        Some("2.0.0".to_string()),
        None, // Unknown version
    ];

    let events: Vec<EventRecord> = versions
        .iter()
        .map(|version| EventRecord {
            ts: Some(Utc::now().timestamp_millis()),
            user_id: Uuid::new_v4(),
            post_id: Uuid::new_v4(),
            author_id: None,
            action: "test".to_string(),
            dwell_ms: None,
            device: None,
            app_ver: version.clone(),
        })
        .collect();

    assert_eq!(events.len(), versions.len());
}

/// Test event statistical analysis
#[test]
fn test_event_statistical_analysis() {
    let mut dwell_times = Vec::new();

    for i in 0..1000 {
        let event = EventRecord {
            ts: Some(Utc::now().timestamp_millis()),
            user_id: Uuid::new_v4(),
            post_id: Uuid::new_v4(),
            author_id: None,
            action: "view".to_string(),
            dwell_ms: Some((i as u32) % 60000), // 0-60 seconds
            device: None,
            app_ver: None,
        };

        if let Some(dwell) = event.dwell_ms {
            dwell_times.push(dwell);
        }
    }

    // Calculate statistics
    dwell_times.sort();
    let min = dwell_times[0];
    let max = dwell_times[dwell_times.len() - 1];
    let avg: u32 = dwell_times.iter().sum::<u32>() / dwell_times.len() as u32;
    let median = dwell_times[dwell_times.len() / 2];

    assert!(min < max, "Min should be less than max");
    assert!(min <= avg, "Min should be <= average");
    assert!(avg <= max, "Average should be <= max");
    assert!(dwell_times.contains(&median), "Median should be in data");
}

/// Test event correlation analysis
#[test]
fn test_event_correlation_analysis() {
    let user_id = Uuid::new_v4();
    let mut events_for_user = Vec::new();

    // Generate sequence of events showing correlation
    for i in 0..100 {
        let action = if i < 30 {
            "view"
        } else if i < 60 {
            "like"
        } else {
            "share"
        };

        events_for_user.push(EventRecord {
            ts: Some(Utc::now().timestamp_millis() + (i as i64 * 1000)),
            user_id,
            post_id: Uuid::new_v4(),
            author_id: None,
            action: action.to_string(),
            dwell_ms: Some(2000 + (i as u32 * 10)),
            device: None,
            app_ver: None,
        });
    }

    // Analyze correlation: dwell time increases with engagement
    let views: Vec<_> = events_for_user
        .iter()
        .filter(|e| e.action == "view")
        .collect();
    let likes: Vec<_> = events_for_user
        .iter()
        .filter(|e| e.action == "like")
        .collect();

    let avg_dwell_view = views.iter().filter_map(|e| e.dwell_ms).sum::<u32>() / views.len() as u32;
    let avg_dwell_like = likes.iter().filter_map(|e| e.dwell_ms).sum::<u32>() / likes.len() as u32;

    // Likes should have higher average dwell time
    assert!(
        avg_dwell_like > avg_dwell_view,
        "Engagement events should have higher dwell"
    );
}

/// Test event serialization round-trip
#[test]
fn test_event_serialization_roundtrip() {
    let original = EventRecord {
        ts: Some(1697750400000),
        user_id: Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap(),
        post_id: Uuid::parse_str("660e8400-e29b-41d4-a716-446655440000").unwrap(),
        author_id: Some(Uuid::parse_str("770e8400-e29b-41d4-a716-446655440000").unwrap()),
        action: "like".to_string(),
        dwell_ms: Some(3500),
        device: Some("web".to_string()),
        app_ver: Some("2.1.0".to_string()),
    };

    // Serialize to JSON
    let json = serde_json::to_string(&original).unwrap();

    // Deserialize back
    let restored: EventRecord = serde_json::from_str(&json).unwrap();

    // Verify round-trip
    assert_eq!(original.ts, restored.ts);
    assert_eq!(original.user_id, restored.user_id);
    assert_eq!(original.post_id, restored.post_id);
    assert_eq!(original.author_id, restored.author_id);
    assert_eq!(original.action, restored.action);
    assert_eq!(original.dwell_ms, restored.dwell_ms);
    assert_eq!(original.device, restored.device);
    assert_eq!(original.app_ver, restored.app_ver);
}
