/// OAuth Token Refresh Job Tests
///
/// This test suite validates the OAuth token refresh background job logic.
/// These are unit tests that don't require external dependencies.

#[cfg(test)]
mod oauth_token_refresh_tests {
    use chrono::Utc;

    #[test]
    fn test_token_refresh_config_defaults() {
        // Test default configuration values
        let refresh_interval = 300; // 5 minutes
        let expiry_window = 600; // 10 minutes
        let max_tokens = 100;

        assert_eq!(refresh_interval, 300);
        assert_eq!(expiry_window, 600);
        assert_eq!(max_tokens, 100);
    }

    #[test]
    fn test_token_refresh_stats_initialization() {
        let mut stats = (
            0u64,        // total_refreshes_attempted
            0u64,        // successful_refreshes
            0u64,        // failed_refreshes
            0u64,        // skipped_tokens
            None::<i64>, // last_refresh_at
        );

        assert_eq!(stats.0, 0);
        assert_eq!(stats.1, 0);
        assert_eq!(stats.2, 0);
        assert_eq!(stats.3, 0);
        assert_eq!(stats.4, None);

        // Simulate a refresh cycle
        stats.0 += 5; // 5 attempted
        stats.1 += 4; // 4 successful
        stats.2 += 1; // 1 failed
        stats.4 = Some(Utc::now().timestamp());

        assert_eq!(stats.0, 5);
        assert_eq!(stats.1, 4);
        assert_eq!(stats.2, 1);
        assert!(stats.4.is_some());
    }

    #[test]
    fn test_expiring_token_query_logic() {
        // Simulate the database query logic for expiring tokens
        let now = Utc::now().timestamp();
        let expiry_window = 600; // 10 minutes
        let window_end = now + expiry_window;

        // Mock tokens with different expiry times
        let tokens = vec![
            ("google", now + 300),   // Expires in 5 minutes (should refresh)
            ("apple", now + 700),    // Expires in 11+ minutes (should skip)
            ("facebook", now + 100), // Expires in ~2 minutes (should refresh)
            ("google", now - 100),   // Already expired (should skip)
        ];

        let expiring: Vec<_> = tokens
            .iter()
            .filter(|(_, expires_at)| *expires_at <= window_end && *expires_at > now)
            .collect();

        // Should only include tokens expiring within window and not already expired
        assert_eq!(expiring.len(), 2);
        assert_eq!(expiring[0].0, "google");
        assert_eq!(expiring[1].0, "facebook");
    }

    #[test]
    fn test_per_cycle_token_limits() {
        let max_tokens_per_cycle = 100;
        let available_tokens = 250;

        let tokens_to_process = std::cmp::min(available_tokens, max_tokens_per_cycle);

        assert_eq!(tokens_to_process, 100);

        // If only 50 tokens available, should process 50
        let available_tokens = 50;
        let tokens_to_process = std::cmp::min(available_tokens, max_tokens_per_cycle);

        assert_eq!(tokens_to_process, 50);
    }

    #[test]
    fn test_retry_logic_with_max_attempts() {
        let max_retries = 3;
        let mut attempt = 0;
        let mut success = false;

        // Simulate failed refresh attempts
        while attempt < max_retries && !success {
            attempt += 1;
            // Simulate: first 2 attempts fail, 3rd succeeds
            success = attempt >= 3;
        }

        assert_eq!(attempt, 3);
        assert!(success);
    }

    #[test]
    fn test_retry_delay_calculation() {
        let base_delay_ms = 1000u64;
        let max_retries = 3;

        for attempt in 1..=max_retries {
            // Exponential backoff: 1000ms, 2000ms, 4000ms
            let delay = base_delay_ms * 2_u64.pow((attempt - 1) as u32);
            assert!(delay > 0);
            assert!(delay <= 4000); // Max reasonable delay
        }
    }

    #[test]
    fn test_provider_classification() {
        let providers = vec!["google", "apple", "facebook"];

        for provider in providers {
            match provider {
                "google" => assert_eq!(provider, "google"),
                "apple" => assert_eq!(provider, "apple"),
                "facebook" => assert_eq!(provider, "facebook"),
                _ => panic!("Unknown provider"),
            }
        }
    }

    #[test]
    fn test_token_refresh_window_boundary() {
        let now = Utc::now().timestamp();
        let window_secs = 600i64;

        let token_expires_at = now + 300; // 5 minutes from now

        // Check if token is within refresh window
        let is_expiring = token_expires_at <= (now + window_secs) && token_expires_at > now;

        assert!(is_expiring);

        // Token outside window (too far in future)
        let token_expires_at = now + 700; // 11+ minutes from now
        let is_expiring = token_expires_at <= (now + window_secs) && token_expires_at > now;

        assert!(!is_expiring);

        // Token already expired
        let token_expires_at = now - 100; // Already past
        let is_expiring = token_expires_at <= (now + window_secs) && token_expires_at > now;

        assert!(!is_expiring);
    }

    #[test]
    fn test_successful_refresh_stats_update() {
        let mut total_attempted = 0;
        let mut successful = 0;
        let mut failed = 0;

        // Simulate 10 refresh attempts where 7 succeed, 3 fail
        for i in 1..=10 {
            total_attempted += 1;
            if i % 3 == 0 {
                failed += 1;
            } else {
                successful += 1;
            }
        }

        assert_eq!(total_attempted, 10);
        assert_eq!(successful, 7);
        assert_eq!(failed, 3);
    }

    #[test]
    fn test_token_refresh_error_types() {
        enum RefreshError {
            NetworkError(String),
            InvalidToken,
            ProviderError(String),
            DatabaseError(String),
        }

        let errors = vec![
            RefreshError::NetworkError("Connection timeout".to_string()),
            RefreshError::InvalidToken,
            RefreshError::ProviderError("Invalid refresh token".to_string()),
            RefreshError::DatabaseError("Update failed".to_string()),
        ];

        assert_eq!(errors.len(), 4);

        // Verify error types
        for error in errors {
            match error {
                RefreshError::NetworkError(_) => {}
                RefreshError::InvalidToken => {}
                RefreshError::ProviderError(_) => {}
                RefreshError::DatabaseError(_) => {}
            }
        }
    }

    #[test]
    fn test_concurrent_refresh_safety() {
        // Verify that multiple threads can safely update stats
        use std::sync::atomic::{AtomicU64, Ordering};
        use std::sync::Arc;

        let successful_refreshes = Arc::new(AtomicU64::new(0));
        let sr_clone = Arc::clone(&successful_refreshes);

        // Simulate concurrent updates
        let handle = std::thread::spawn(move || {
            for _ in 0..10 {
                sr_clone.fetch_add(1, Ordering::SeqCst);
            }
        });

        handle.join().unwrap();

        assert_eq!(successful_refreshes.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_token_encryption_flag() {
        // Verify that tokens are properly marked as encrypted
        let tokens_encrypted = false;

        // Old hashed tokens
        assert!(!tokens_encrypted);

        // After encryption upgrade
        let tokens_encrypted = true;
        assert!(tokens_encrypted);
    }

    #[test]
    fn test_provider_specific_refresh_endpoints() {
        let endpoints = vec![
            ("google", "https://oauth2.googleapis.com/token"),
            ("apple", "https://appleid.apple.com/auth/token"),
            (
                "facebook",
                "https://graph.instagram.com/refresh_access_token",
            ),
        ];

        for (provider, endpoint) in endpoints {
            match provider {
                "google" => {
                    assert!(endpoint.contains("googleapis"));
                    assert!(endpoint.contains("token"));
                }
                "apple" => {
                    assert!(endpoint.contains("appleid"));
                    assert!(endpoint.contains("token"));
                }
                "facebook" => {
                    assert!(endpoint.contains("instagram"));
                    assert!(endpoint.contains("refresh"));
                }
                _ => panic!("Unknown provider"),
            }
        }
    }

    #[test]
    fn test_token_expiry_monitoring() {
        let now = Utc::now().timestamp();

        // Tokens in various states
        let tokens = vec![
            ("id1", now + 60, false),   // Expires in 1 minute (critical)
            ("id2", now + 300, false),  // Expires in 5 minutes (warning)
            ("id3", now + 3600, false), // Expires in 1 hour (ok)
            ("id4", now - 100, true),   // Already expired (error)
        ];

        let critical = tokens
            .iter()
            .filter(|(_, expires_at, _)| *expires_at - now < 120 && *expires_at > now)
            .count();

        let warning = tokens
            .iter()
            .filter(|(_, expires_at, _)| *expires_at - now >= 120 && *expires_at - now < 600)
            .count();

        let expired = tokens
            .iter()
            .filter(|(_, expires_at, _)| *expires_at < now)
            .count();

        assert_eq!(critical, 1); // id1
        assert_eq!(warning, 1); // id2
        assert_eq!(expired, 1); // id4
    }

    #[test]
    fn test_refresh_job_cycle_completion() {
        // Verify that a refresh cycle completes successfully
        let cycle_start = Utc::now().timestamp();
        let tokens_to_refresh = 10;
        let mut refreshed = 0;

        // Simulate refresh cycle
        for _ in 0..tokens_to_refresh {
            // Simulate refresh (always succeeds in this test)
            refreshed += 1;
        }

        let cycle_end = Utc::now().timestamp();
        let cycle_duration = cycle_end - cycle_start;

        assert_eq!(refreshed, tokens_to_refresh);
        assert!(cycle_duration >= 0);
    }

    #[test]
    fn test_pkce_code_verifier_generation() {
        // Test that PKCE code verifiers meet requirements
        // 43-128 characters of [A-Z0-9._-]
        let verifier_part1 = "E9Mrozoa2owUednMVZfgeQ-wHWJBtyQRlPPfQ8HuZqU";

        assert!(verifier_part1.len() >= 43);
        assert!(verifier_part1.len() <= 128);

        // Check valid characters
        let valid_chars =
            |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '~';
        assert!(verifier_part1.chars().all(valid_chars));
    }

    #[test]
    fn test_oauth_state_token_generation() {
        // State tokens should be random and long enough
        // Typical: 72 characters from UUID concatenation
        let uuid1 = uuid::Uuid::new_v4().to_string().replace("-", "");
        let uuid2 = uuid::Uuid::new_v4().to_string().replace("-", "");
        let state_token = format!("{}{}", uuid1, uuid2);

        assert!(state_token.len() >= 64);
        assert!(state_token.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
