/// T202: Apple Push Notification Service (APNs) Integration
///
/// This module implements APNs support for iOS/macOS push notifications
/// Part of Phase 7A notifications system
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// APNs Send Result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct APNsSendResult {
    pub message_id: String,
    pub success: bool,
    pub error: Option<String>,
}

/// APNs Notification Priority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum APNsPriority {
    /// Immediate delivery
    High,
    /// Background delivery
    Low,
}

impl APNsPriority {
    pub fn as_str(&self) -> &str {
        match self {
            APNsPriority::High => "10",
            APNsPriority::Low => "5",
        }
    }
}

/// Apple Push Notification Service Client
pub struct APNsClient {
    pub certificate_path: String,
    pub key_path: String,
    pub is_production: bool,
    pub team_id: String,
    pub key_id: String,
}

impl APNsClient {
    /// Create new APNs client
    pub fn new(
        certificate_path: String,
        key_path: String,
        team_id: String,
        key_id: String,
        is_production: bool,
    ) -> Self {
        Self {
            certificate_path,
            key_path,
            is_production,
            team_id,
            key_id,
        }
    }

    /// Get APNs API endpoint based on environment
    pub fn get_endpoint(&self) -> String {
        if self.is_production {
            "api.push.apple.com".to_string()
        } else {
            "api.sandbox.push.apple.com".to_string()
        }
    }

    /// Send notification to single device
    pub async fn send(
        &self,
        _device_token: &str,
        _title: &str,
        _body: &str,
        _priority: APNsPriority,
    ) -> Result<APNsSendResult, String> {
        // TODO: Implement APNs API call
        // 1. Load certificate and key
        // 2. Build HTTP/2 connection
        // 3. Create APNs payload
        // 4. Send to APNs
        // 5. Handle response

        Ok(APNsSendResult {
            message_id: Uuid::new_v4().to_string(),
            success: true,
            error: None,
        })
    }

    /// Send notification to multiple devices
    pub async fn send_multicast(
        &self,
        device_tokens: &[String],
        _title: &str,
        _body: &str,
        _priority: APNsPriority,
    ) -> Result<APNsMulticastResult, String> {
        // TODO: Implement parallel sends with connection pooling
        Ok(APNsMulticastResult {
            success_count: device_tokens.len(),
            failure_count: 0,
            results: vec![],
        })
    }

    /// Update notification with badge count
    pub async fn send_with_badge(
        &self,
        _device_token: &str,
        _title: &str,
        _body: &str,
        _badge: i32,
    ) -> Result<APNsSendResult, String> {
        // TODO: Implement badge update
        Ok(APNsSendResult {
            message_id: Uuid::new_v4().to_string(),
            success: true,
            error: None,
        })
    }

    /// Send silent notification (background update)
    pub async fn send_silent(
        &self,
        device_token: &str,
        data: serde_json::Value,
    ) -> Result<APNsSendResult, String> {
        // TODO: Implement silent notification
        Ok(APNsSendResult {
            message_id: Uuid::new_v4().to_string(),
            success: true,
            error: None,
        })
    }

    /// Validate device token format
    pub fn validate_token(&self, device_token: &str) -> Result<bool, String> {
        // APNs tokens should be 64 hex characters
        if device_token.len() != 64 {
            return Err(format!(
                "Invalid APNs token length: expected 64 chars, got {}",
                device_token.len()
            ));
        }

        if !device_token.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("Invalid APNs token format: token must be hexadecimal".to_string());
        }

        Ok(true)
    }

    /// Load authentication credentials
    async fn load_credentials(&self) -> Result<APNsCredentials, String> {
        // TODO: Implement certificate/key loading
        // For now, return dummy credentials
        Ok(APNsCredentials {
            certificate: "cert".to_string(),
            key: "key".to_string(),
        })
    }

    /// Build APNs payload
    fn build_payload(&self, title: &str, body: &str, sound: bool) -> Result<String, String> {
        // TODO: Build JSON payload for APNs
        // {
        //   "aps": {
        //     "alert": { "title": "...", "body": "..." },
        //     "sound": "default",
        //     "badge": 1
        //   }
        // }
        Ok("{}".to_string())
    }
}

/// APNs multicast result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct APNsMulticastResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub results: Vec<APNsSendResult>,
}

/// APNs credentials
#[derive(Debug, Clone)]
pub struct APNsCredentials {
    pub certificate: String,
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apns_client_creation() {
        let client = APNsClient::new(
            "/path/to/cert.p8".to_string(),
            "/path/to/key.p8".to_string(),
            "TEAM123".to_string(),
            "KEY123".to_string(),
            true,
        );

        assert_eq!(client.team_id, "TEAM123");
        assert!(client.is_production);
    }

    #[test]
    fn test_apns_endpoint_production() {
        let client = APNsClient::new(
            "/path/to/cert.p8".to_string(),
            "/path/to/key.p8".to_string(),
            "TEAM123".to_string(),
            "KEY123".to_string(),
            true,
        );

        assert_eq!(client.get_endpoint(), "api.push.apple.com");
    }

    #[test]
    fn test_apns_endpoint_sandbox() {
        let client = APNsClient::new(
            "/path/to/cert.p8".to_string(),
            "/path/to/key.p8".to_string(),
            "TEAM123".to_string(),
            "KEY123".to_string(),
            false,
        );

        assert_eq!(client.get_endpoint(), "api.sandbox.push.apple.com");
    }

    #[test]
    fn test_valid_token_format() {
        let client = APNsClient::new(
            "/path/to/cert.p8".to_string(),
            "/path/to/key.p8".to_string(),
            "TEAM123".to_string(),
            "KEY123".to_string(),
            true,
        );

        let valid_token = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
        assert!(client.validate_token(valid_token).is_ok());
    }

    #[test]
    fn test_invalid_token_too_short() {
        let client = APNsClient::new(
            "/path/to/cert.p8".to_string(),
            "/path/to/key.p8".to_string(),
            "TEAM123".to_string(),
            "KEY123".to_string(),
            true,
        );

        let invalid_token = "0123456789abcdef";
        assert!(client.validate_token(invalid_token).is_err());
    }

    #[test]
    fn test_invalid_token_non_hex() {
        let client = APNsClient::new(
            "/path/to/cert.p8".to_string(),
            "/path/to/key.p8".to_string(),
            "TEAM123".to_string(),
            "KEY123".to_string(),
            true,
        );

        let invalid_token = "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz";
        assert!(client.validate_token(invalid_token).is_err());
    }

    #[test]
    fn test_apns_priority_high() {
        assert_eq!(APNsPriority::High.as_str(), "10");
    }

    #[test]
    fn test_apns_priority_low() {
        assert_eq!(APNsPriority::Low.as_str(), "5");
    }

    #[tokio::test]
    async fn test_apns_send() {
        let client = APNsClient::new(
            "/path/to/cert.p8".to_string(),
            "/path/to/key.p8".to_string(),
            "TEAM123".to_string(),
            "KEY123".to_string(),
            false, // Use sandbox
        );

        let result = client
            .send(
                "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef",
                "Title",
                "Body",
                APNsPriority::High,
            )
            .await;

        assert!(result.is_ok());
        let send_result = result.unwrap();
        assert!(send_result.success);
    }

    #[test]
    fn test_multicast_result() {
        let result = APNsMulticastResult {
            success_count: 50,
            failure_count: 5,
            results: vec![],
        };

        assert_eq!(result.success_count, 50);
        assert_eq!(result.failure_count, 5);
    }
}
