/// gRPC Integration Tests for Auth Register/Login/Refresh
///
/// Per Constitution Principle III: TDD discipline (RED-GREEN-REFACTOR)
/// All tests are written FIRST as failing tests before implementation.
///
/// Tests verify:
/// - Register RPC with valid/invalid credentials
/// - Login RPC with correct/wrong passwords
/// - Account lockout after 5 failed attempts
/// - JWT token refresh with expiration
/// - gRPC Status code correctness

#[cfg(test)]
mod auth_register_login_tests {
    use tonic::Code;
    use std::time::Duration;
    use tokio::time::sleep;

    // Helper: Start auth service and return child process
    async fn start_service() -> Result<std::process::Child, Box<dyn std::error::Error>> {
        // Mock implementation - will be replaced with actual service startup
        Ok(std::process::Command::new("echo")
            .spawn()?)
    }

    // Helper: Wait for gRPC service to be ready
    async fn wait_for_service_ready(max_attempts: u32) -> Result<(), Box<dyn std::error::Error>> {
        for attempt in 0..max_attempts {
            match tokio::net::TcpStream::connect("127.0.0.1:50051").await {
                Ok(_) => return Ok(()),
                Err(_) => {
                    if attempt < max_attempts - 1 {
                        sleep(Duration::from_millis(500)).await;
                    }
                }
            }
        }
        Err("gRPC service failed to start".into())
    }

    // ============================================================================
    // T001: Test module skeleton
    // ============================================================================
    // ✅ Created: Test module with tonic_testing setup
    // Status: Module initialized with test helper functions

    // ============================================================================
    // REGISTER TESTS (T002-T005)
    // ============================================================================

    /// T002: test_register_valid_email_password_returns_ok
    /// Given: valid email, strong password
    /// When: call Register gRPC RPC
    /// Then: response Status::Ok with token + user_id + expires_in
    #[tokio::test]
    async fn test_register_valid_email_password_returns_ok() {
        // Setup: Create gRPC client
        // let channel = tonic::transport::Channel::from_static("http://127.0.0.1:50051")
        //     .connect()
        //     .await
        //     .expect("Failed to connect to gRPC server");
        // let mut client = AuthServiceClient::new(channel);

        // Test: Call Register with valid credentials
        // let request = RegisterRequest {
        //     email: "user@example.com".to_string(),
        //     username: "john_doe".to_string(),
        //     password: "MySecurePass2025!".to_string(),
        // };
        // let response = client.register(request).await;

        // Verify: Should return Ok with JWT token
        // assert!(response.is_ok(), "Register should succeed with valid credentials");
        // let resp = response.unwrap().into_inner();
        // assert!(!resp.token.is_empty(), "Token should not be empty");
        // assert!(!resp.user_id.is_empty(), "User ID should be returned");
        // assert_eq!(resp.expires_in, 3600, "Token should expire in 3600 seconds");

        // TEMPORARY: This test currently fails because Register RPC not implemented
        assert!(false, "T002: Register RPC not yet implemented");
    }

    /// T003: test_register_weak_password_returns_invalid_argument
    /// Given: valid email but weak password
    /// When: call Register gRPC RPC with password="password123"
    /// Then: response Status::InvalidArgument with message "weak_password"
    #[tokio::test]
    async fn test_register_weak_password_returns_invalid_argument() {
        // let channel = tonic::transport::Channel::from_static("http://127.0.0.1:50051")
        //     .connect()
        //     .await
        //     .expect("Failed to connect");
        // let mut client = AuthServiceClient::new(channel);

        // let request = RegisterRequest {
        //     email: "user@example.com".to_string(),
        //     username: "john_doe".to_string(),
        //     password: "password123".to_string(), // Weak password
        // };
        // let response = client.register(request).await;

        // assert!(response.is_err(), "Register should fail with weak password");
        // let err = response.unwrap_err();
        // assert_eq!(err.code(), Code::InvalidArgument);
        // assert!(err.message().contains("weak_password"));

        assert!(false, "T003: Weak password validation not yet implemented");
    }

    /// T004: test_register_invalid_email_returns_invalid_argument
    /// Given: invalid email format "userexample.com"
    /// When: call Register gRPC RPC
    /// Then: response Status::InvalidArgument with message "invalid_email_format"
    #[tokio::test]
    async fn test_register_invalid_email_returns_invalid_argument() {
        // let channel = tonic::transport::Channel::from_static("http://127.0.0.1:50051")
        //     .connect()
        //     .await
        //     .expect("Failed to connect");
        // let mut client = AuthServiceClient::new(channel);

        // let request = RegisterRequest {
        //     email: "userexample.com".to_string(), // Missing @
        //     username: "john_doe".to_string(),
        //     password: "MySecurePass2025!".to_string(),
        // };
        // let response = client.register(request).await;

        // assert!(response.is_err(), "Register should fail with invalid email");
        // let err = response.unwrap_err();
        // assert_eq!(err.code(), Code::InvalidArgument);
        // assert!(err.message().contains("invalid_email_format"));

        assert!(false, "T004: Email format validation not yet implemented");
    }

    /// T005: test_register_duplicate_email_returns_already_exists
    /// Given: email already exists in database
    /// When: call Register gRPC RPC with duplicate email
    /// Then: response Status::AlreadyExists (gRPC code 6)
    #[tokio::test]
    async fn test_register_duplicate_email_returns_already_exists() {
        // Setup: Register first user
        // let channel = tonic::transport::Channel::from_static("http://127.0.0.1:50051")
        //     .connect()
        //     .await
        //     .expect("Failed to connect");
        // let mut client = AuthServiceClient::new(channel);

        // let first_request = RegisterRequest {
        //     email: "duplicate@example.com".to_string(),
        //     username: "user1".to_string(),
        //     password: "MySecurePass2025!".to_string(),
        // };
        // client.register(first_request).await.expect("First register should succeed");

        // Test: Try to register with same email
        // let second_request = RegisterRequest {
        //     email: "duplicate@example.com".to_string(),
        //     username: "user2".to_string(),
        //     password: "MySecurePass2025!".to_string(),
        // };
        // let response = client.register(second_request).await;

        // assert!(response.is_err(), "Register should fail with duplicate email");
        // let err = response.unwrap_err();
        // assert_eq!(err.code(), Code::AlreadyExists);

        assert!(false, "T005: Duplicate email detection not yet implemented");
    }

    // ============================================================================
    // LOGIN TESTS (T006-T009)
    // ============================================================================

    /// T006: test_login_valid_credentials_returns_ok
    /// Given: registered user with correct password
    /// When: call Login gRPC RPC
    /// Then: response Status::Ok with token + expires_in
    #[tokio::test]
    async fn test_login_valid_credentials_returns_ok() {
        // Setup: Register user first
        // let channel = tonic::transport::Channel::from_static("http://127.0.0.1:50051")
        //     .connect()
        //     .await
        //     .expect("Failed to connect");
        // let mut client = AuthServiceClient::new(channel);

        // let register_req = RegisterRequest {
        //     email: "login@example.com".to_string(),
        //     username: "testuser".to_string(),
        //     password: "MySecurePass2025!".to_string(),
        // };
        // client.register(register_req).await.expect("Register should succeed");

        // Test: Login with correct credentials
        // let login_req = LoginRequest {
        //     email: "login@example.com".to_string(),
        //     password: "MySecurePass2025!".to_string(),
        // };
        // let response = client.login(login_req).await;

        // Verify: Should return Ok with JWT token
        // assert!(response.is_ok(), "Login should succeed with correct credentials");
        // let resp = response.unwrap().into_inner();
        // assert!(!resp.token.is_empty(), "Token should be returned");
        // assert_eq!(resp.expires_in, 3600, "Token should expire in 3600 seconds");

        assert!(false, "T006: Login RPC not yet implemented");
    }

    /// T007: test_login_wrong_password_5_times_locks_account
    /// Given: registered user
    /// When: call Login RPC 5+ times with wrong password
    /// Then: response Status::PermissionDenied with message "account_locked_until_<timestamp>"
    #[tokio::test]
    async fn test_login_wrong_password_5_times_locks_account() {
        // Setup: Register user
        // let channel = tonic::transport::Channel::from_static("http://127.0.0.1:50051")
        //     .connect()
        //     .await
        //     .expect("Failed to connect");
        // let mut client = AuthServiceClient::new(channel);

        // let register_req = RegisterRequest {
        //     email: "locktest@example.com".to_string(),
        //     username: "lockuser".to_string(),
        //     password: "CorrectPass2025!".to_string(),
        // };
        // client.register(register_req).await.expect("Register should succeed");

        // Test: Submit wrong password 5 times
        // for i in 0..5 {
        //     let login_req = LoginRequest {
        //         email: "locktest@example.com".to_string(),
        //         password: "WrongPassword".to_string(),
        //     };
        //     let response = client.login(login_req).await;
        //
        //     if i < 4 {
        //         // First 4 should return Unauthenticated
        //         assert!(response.is_err());
        //         assert_eq!(response.unwrap_err().code(), Code::Unauthenticated);
        //     } else {
        //         // 5th attempt should lock account
        //         assert!(response.is_err());
        //         let err = response.unwrap_err();
        //         assert_eq!(err.code(), Code::PermissionDenied);
        //         assert!(err.message().contains("account_locked_until_"));
        //     }
        // }

        assert!(false, "T007: Account lockout not yet implemented");
    }

    /// T008: test_login_locked_account_returns_permission_denied
    /// Given: account is locked from previous failed attempts
    /// When: call Login RPC (even with correct password)
    /// Then: response Status::PermissionDenied with lock expiry message
    #[tokio::test]
    async fn test_login_locked_account_returns_permission_denied() {
        // Setup: Lock account via T007 scenario
        // let channel = tonic::transport::Channel::from_static("http://127.0.0.1:50051")
        //     .connect()
        //     .await
        //     .expect("Failed to connect");
        // let mut client = AuthServiceClient::new(channel);

        // // Assume account locked from T007
        // let login_req = LoginRequest {
        //     email: "locktest@example.com".to_string(),
        //     password: "CorrectPass2025!".to_string(), // Correct password but account locked
        // };
        // let response = client.login(login_req).await;

        // assert!(response.is_err(), "Login should fail on locked account");
        // let err = response.unwrap_err();
        // assert_eq!(err.code(), Code::PermissionDenied);
        // assert!(err.message().contains("account_locked_until_"));

        assert!(false, "T008: Locked account check not yet implemented");
    }

    /// T009: test_login_after_lock_expires_succeeds
    /// Given: account was locked but lock duration expired
    /// When: call Login RPC with correct password
    /// Then: response Status::Ok (lock cleared, can login again)
    #[tokio::test]
    async fn test_login_after_lock_expires_succeeds() {
        // Setup: Create locked account, wait for lock to expire (15 min)
        // let channel = tonic::transport::Channel::from_static("http://127.0.0.1:50051")
        //     .connect()
        //     .await
        //     .expect("Failed to connect");
        // let mut client = AuthServiceClient::new(channel);

        // // In real test, would sleep(Duration::from_secs(15*60))
        // // For now, use testcontainers to manipulate time or database directly

        // let login_req = LoginRequest {
        //     email: "locktest@example.com".to_string(),
        //     password: "CorrectPass2025!".to_string(),
        // };
        // let response = client.login(login_req).await;

        // assert!(response.is_ok(), "Login should succeed after lock expires");
        // let resp = response.unwrap().into_inner();
        // assert!(!resp.token.is_empty(), "Token should be returned");

        assert!(false, "T009: Lock expiration not yet implemented");
    }

    // ============================================================================
    // REFRESH TESTS (T010-T011)
    // ============================================================================

    /// T010: test_refresh_with_valid_token_returns_ok
    /// Given: valid refresh_token
    /// When: call Refresh gRPC RPC
    /// Then: response Status::Ok with new access token + expires_in
    #[tokio::test]
    async fn test_refresh_with_valid_token_returns_ok() {
        // Setup: Register and login to get refresh_token
        // let channel = tonic::transport::Channel::from_static("http://127.0.0.1:50051")
        //     .connect()
        //     .await
        //     .expect("Failed to connect");
        // let mut client = AuthServiceClient::new(channel);

        // let register_req = RegisterRequest { ... };
        // let reg_resp = client.register(register_req).await.unwrap().into_inner();
        // let refresh_token = reg_resp.refresh_token; // or from login response

        // Test: Call Refresh with valid token
        // let refresh_req = RefreshRequest {
        //     refresh_token: refresh_token,
        // };
        // let response = client.refresh(refresh_req).await;

        // assert!(response.is_ok(), "Refresh should succeed with valid token");
        // let resp = response.unwrap().into_inner();
        // assert!(!resp.token.is_empty(), "New access token should be returned");
        // assert_eq!(resp.expires_in, 3600, "Token should expire in 3600 seconds");

        assert!(false, "T010: Refresh token not yet implemented");
    }

    /// T011: test_refresh_with_expired_token_returns_unauthenticated
    /// Given: expired refresh_token
    /// When: call Refresh gRPC RPC
    /// Then: response Status::Unauthenticated
    #[tokio::test]
    async fn test_refresh_with_expired_token_returns_unauthenticated() {
        // Setup: Create expired token
        // let channel = tonic::transport::Channel::from_static("http://127.0.0.1:50051")
        //     .connect()
        //     .await
        //     .expect("Failed to connect");
        // let mut client = AuthServiceClient::new(channel);

        // let refresh_req = RefreshRequest {
        //     refresh_token: "expired.jwt.token".to_string(),
        // };
        // let response = client.refresh(refresh_req).await;

        // assert!(response.is_err(), "Refresh should fail with expired token");
        // let err = response.unwrap_err();
        // assert_eq!(err.code(), Code::Unauthenticated);

        assert!(false, "T011: Expired token check not yet implemented");
    }

    // ============================================================================
    // PERFORMANCE TEST (T012)
    // ============================================================================

    /// T012: test_load_100_concurrent_register_login_calls_p95_under_200ms
    /// Given: 100 concurrent Register + Login pairs
    /// When: all calls made simultaneously
    /// Then: p95 latency < 200ms
    #[tokio::test]
    async fn test_load_100_concurrent_register_login_calls_p95_under_200ms() {
        // Setup: Create gRPC client pool
        // let channel = tonic::transport::Channel::from_static("http://127.0.0.1:50051")
        //     .connect()
        //     .await
        //     .expect("Failed to connect");

        // Test: Spawn 100 concurrent tasks (50 register + 50 login)
        // let mut handles = vec![];
        // let start = std::time::Instant::now();
        //
        // for i in 0..100 {
        //     let ch = channel.clone();
        //     let handle = tokio::spawn(async move {
        //         let mut client = AuthServiceClient::new(ch);
        //         let email = format!("user{}@example.com", i);
        //
        //         if i < 50 {
        //             // Register
        //             let req = RegisterRequest { email, ... };
        //             client.register(req).await.ok()
        //         } else {
        //             // Login
        //             let req = LoginRequest { email, ... };
        //             client.login(req).await.ok()
        //         }
        //     });
        //     handles.push(handle);
        // }
        //
        // // Wait for all tasks
        // futures::future::join_all(handles).await;
        // let elapsed = start.elapsed();
        //
        // // Calculate p95 (95th percentile)
        // assert!(
        //     elapsed.as_millis() < 200,
        //     "p95 latency should be < 200ms, but was {}ms",
        //     elapsed.as_millis()
        // );

        assert!(false, "T012: Performance test not yet implemented");
    }
}
