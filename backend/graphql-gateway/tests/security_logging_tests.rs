//! Security tests for structured logging
//!
//! OWASP A09:2021 - Security Logging and Monitoring Failures
//! Focuses on preventing PII leakage in logs

use regex::Regex;

// =============================================================================
// P1-1: PII Detection in Logs
// =============================================================================

#[test]
fn test_email_pattern_detection() {
    let email_pattern = Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b").unwrap();

    // Should detect emails
    assert!(email_pattern.is_match("user@example.com"));
    assert!(email_pattern.is_match("test.user+tag@subdomain.example.co.uk"));

    // Should not match non-emails
    assert!(!email_pattern.is_match("not-an-email"));
    assert!(!email_pattern.is_match("@example.com"));
}

#[test]
fn test_logs_contain_no_email_addresses() {
    // Simulated log entries that SHOULD be safe
    let safe_logs = vec![
        r#"{"level":"INFO","user_id":"123","path":"/api/users","message":"Request processed"}"#,
        r#"{"level":"WARN","error":"User not found","user_id":"456"}"#,
        r#"{"level":"ERROR","error_type":"validation","field":"email"}"#,
    ];

    let email_pattern = Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b").unwrap();

    for log in safe_logs {
        assert!(!email_pattern.is_match(log), "Email found in log: {}", log);
    }
}

#[test]
fn test_logs_reject_unsafe_email_exposure() {
    // Simulated log entries that SHOULD NOT appear in production
    let unsafe_logs = vec![
        r#"{"level":"ERROR","error":"User user@example.com not found"}"#,
        r#"{"level":"INFO","message":"Processing request for victim@company.com"}"#,
    ];

    let email_pattern = Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b").unwrap();

    for log in unsafe_logs {
        assert!(
            email_pattern.is_match(log),
            "Expected to detect email in unsafe log: {}",
            log
        );
    }
}

// =============================================================================
// Password/Token Detection Tests
// =============================================================================

#[test]
fn test_password_pattern_detection() {
    let sensitive_patterns = vec![
        r#"password["']?\s*[:=]\s*["']?[\w!@#$%^&*()]+"#,
        r#"token["']?\s*[:=]\s*["']?[\w-]+"#,
        r#"secret["']?\s*[:=]\s*["']?[\w-]+"#,
        r#"api[_-]?key["']?\s*[:=]\s*["']?[\w-]+"#,
    ];

    let unsafe_log = r#"{"level":"DEBUG","password":"SecretPassword123","user":"test"}"#;

    for pattern_str in sensitive_patterns {
        let pattern = Regex::new(pattern_str).unwrap();
        if pattern.is_match(unsafe_log) {
            // Expected: Should detect password in log
            return;
        }
    }

    panic!("Failed to detect password in log: {}", unsafe_log);
}

#[test]
fn test_logs_contain_no_bearer_tokens() {
    let unsafe_logs = vec![
        r#"{"level":"ERROR","auth_header":"Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9..."}"#,
        r#"{"level":"DEBUG","token":"eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiIxMjM0In0..."}"#,
    ];

    let jwt_pattern = Regex::new(r"eyJ[A-Za-z0-9_-]+\.eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+").unwrap();

    for log in unsafe_logs {
        assert!(
            jwt_pattern.is_match(log),
            "Expected to detect JWT in log: {}",
            log
        );
    }
}

// =============================================================================
// Path Sanitization Tests
// =============================================================================

#[test]
fn test_sanitize_path_removes_query_parameters() {
    fn sanitize_path(path: &str) -> &str {
        path.split('?').next().unwrap_or(path)
    }

    assert_eq!(
        sanitize_path("/api/users?email=victim@example.com"),
        "/api/users"
    );

    assert_eq!(
        sanitize_path("/api/users?email=victim@example.com&token=secret123"),
        "/api/users"
    );

    assert_eq!(sanitize_path("/api/users"), "/api/users");
}

#[test]
fn test_path_sanitization_prevents_pii_leakage() {
    // Simulated request paths with PII in query params
    let dangerous_paths = vec![
        "/api/users?email=victim@example.com",
        "/api/reset-password?token=abc123xyz",
        "/graphql?query={user(email:\"attacker@evil.com\")}",
    ];

    for path in dangerous_paths {
        let sanitized = path.split('?').next().unwrap_or(path);

        // Sanitized path should not contain email or token
        assert!(!sanitized.contains("@"));
        assert!(!sanitized.contains("token="));
        assert!(!sanitized.contains("email"));
    }
}

// =============================================================================
// Structured Logging Format Tests
// =============================================================================

#[test]
fn test_structured_logs_are_valid_json() {
    let log_entries = vec![
        r#"{"level":"INFO","user_id":"123","message":"Test"}"#,
        r#"{"level":"ERROR","error":"Test error","trace_id":"abc"}"#,
    ];

    for entry in log_entries {
        let parsed: Result<serde_json::Value, _> = serde_json::from_str(entry);
        assert!(parsed.is_ok(), "Log entry is not valid JSON: {}", entry);
    }
}

#[test]
fn test_structured_logs_contain_required_fields() {
    let log_entry = r#"{"level":"INFO","user_id":"123","path":"/api/users","elapsed_ms":42,"message":"Request processed"}"#;

    let parsed: serde_json::Value = serde_json::from_str(log_entry).unwrap();

    // Required fields for security audit
    assert!(parsed.get("level").is_some(), "Missing 'level' field");
    assert!(parsed.get("user_id").is_some(), "Missing 'user_id' field");
    assert!(parsed.get("path").is_some(), "Missing 'path' field");
    assert!(
        parsed.get("elapsed_ms").is_some(),
        "Missing 'elapsed_ms' field"
    );
}

// =============================================================================
// IP Address Logging Tests
// =============================================================================

#[test]
fn test_ip_address_logging_allowed() {
    // IP addresses are OK to log (needed for security analysis)
    let log_with_ip =
        r#"{"level":"WARN","client_ip":"192.168.1.100","message":"Rate limit exceeded"}"#;

    let ip_pattern = Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").unwrap();

    assert!(
        ip_pattern.is_match(log_with_ip),
        "IP address should be logged for security"
    );
}

// =============================================================================
// Error Message Sanitization Tests
// =============================================================================

#[test]
fn test_database_errors_dont_leak_schema() {
    // BAD: Raw database error
    let bad_error = r#"{"error":"column 'secret_internal_field' does not exist"}"#;

    // GOOD: Sanitized error
    let good_error = r#"{"error":"Database query failed","error_code":"DB_QUERY_ERROR"}"#;

    // Check that internal column names are not exposed
    assert!(bad_error.contains("secret_internal_field"));
    assert!(!good_error.contains("secret_internal_field"));
}

#[test]
fn test_file_path_errors_dont_leak_structure() {
    // BAD: Exposes server file structure
    let bad_error = r#"{"error":"File not found: /var/app/secrets/api_keys.txt"}"#;

    // GOOD: Generic error
    let good_error = r#"{"error":"File not found","error_code":"FILE_NOT_FOUND"}"#;

    // Check that file paths are not exposed
    assert!(bad_error.contains("/var/app/secrets"));
    assert!(!good_error.contains("/var/app"));
}

// =============================================================================
// Log Level Security Tests
// =============================================================================

#[test]
fn test_sensitive_operations_logged_at_info_level() {
    // Authentication, authorization, and sensitive operations should be logged
    let important_events = vec![
        "user_login",
        "user_logout",
        "password_reset",
        "permission_denied",
        "authentication_failed",
    ];

    for event in important_events {
        // These should be INFO or WARN level, never DEBUG
        let log = format!(r#"{{"level":"INFO","event":"{}","user_id":"123"}}"#, event);
        assert!(log.contains("INFO") || log.contains("WARN"));
    }
}

// =============================================================================
// Correlation ID Tests
// =============================================================================

#[test]
fn test_logs_contain_correlation_id() {
    let log_entry =
        r#"{"level":"INFO","correlation_id":"req-abc-123","message":"Processing request"}"#;

    let parsed: serde_json::Value = serde_json::from_str(log_entry).unwrap();

    assert!(
        parsed.get("correlation_id").is_some(),
        "Logs should contain correlation_id for distributed tracing"
    );
}

#[test]
fn test_correlation_id_format() {
    let correlation_id = "req-abc-123-xyz";

    // Should be alphanumeric with hyphens
    let pattern = Regex::new(r"^[a-z]+-[a-z0-9-]+$").unwrap();
    assert!(
        pattern.is_match(correlation_id),
        "Correlation ID has invalid format: {}",
        correlation_id
    );
}

// =============================================================================
// Performance Logging Tests
// =============================================================================

#[test]
fn test_slow_query_logs_dont_expose_parameters() {
    // BAD: Exposes query parameters (potential PII)
    let _bad_log = r#"{"level":"WARN","query":"SELECT * FROM users WHERE email='victim@example.com'","duration_ms":5000}"#;

    // GOOD: Logs query structure without parameters
    let good_log = r#"{"level":"WARN","query_type":"SELECT","table":"users","duration_ms":5000}"#;

    assert!(!good_log.contains("victim@example.com"));
}

// =============================================================================
// Helper Functions for Testing
// =============================================================================

#[cfg(test)]
mod helpers {
    use super::*;

    /// Simulate capturing logs during a function execution
    #[allow(dead_code)]
    pub fn capture_logs_during<F>(f: F) -> String
    where
        F: Fn(),
    {
        // In a real implementation, this would intercept tracing output
        // For now, return empty string
        f();
        String::new()
    }

    /// Check if a string contains any PII patterns
    pub fn contains_pii(text: &str) -> bool {
        let patterns = vec![
            r#"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b"#, // Email
            r#"password["']?\s*[:=]\s*["']?[\w!@#$%^&*()]+"#,         // Password
            r#"eyJ[A-Za-z0-9_-]+\.eyJ[A-Za-z0-9_-]+"#,                // JWT
        ];

        for pattern_str in patterns {
            if let Ok(pattern) = Regex::new(pattern_str) {
                if pattern.is_match(text) {
                    return true;
                }
            }
        }

        false
    }

    #[test]
    fn test_pii_detector() {
        assert!(contains_pii("user@example.com"));
        assert!(contains_pii(r#"{"password":"secret123"}"#));
        assert!(contains_pii(
            "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.eyJzdWIiOiIxMjM0In0.abc"
        ));

        assert!(!contains_pii("user_id: 123"));
        assert!(!contains_pii("error: Database connection failed"));
    }
}
