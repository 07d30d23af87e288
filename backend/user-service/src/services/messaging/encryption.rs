// Encryption Service: Placeholder for encryption-related utilities
// Phase 7B Feature 2: T213 - Message Encryption
//
// NOTE: Actual encryption/decryption happens on the CLIENT side.
// This module only provides server-side utilities for:
// - Public key validation
// - Nonce validation
// - Key storage/retrieval

use crate::error::AppError;
use base64::{engine::general_purpose, Engine as _};

pub struct EncryptionService;

impl EncryptionService {
    /// Validate a base64-encoded public key (32 bytes)
    pub fn validate_public_key(public_key: &str) -> Result<PublicKey, AppError> {
        let decoded = general_purpose::STANDARD
            .decode(public_key)
            .map_err(|_| AppError::BadRequest("Invalid base64 encoding".to_string()))?;

        if decoded.len() != 32 {
            return Err(AppError::BadRequest(
                "Public key must be 32 bytes".to_string(),
            ));
        }

        Ok(PublicKey(public_key.to_string()))
    }

    /// Validate a base64-encoded nonce (24 bytes)
    pub fn validate_nonce(nonce: &str) -> Result<Nonce, AppError> {
        let decoded = general_purpose::STANDARD
            .decode(nonce)
            .map_err(|_| AppError::BadRequest("Invalid base64 encoding".to_string()))?;

        if decoded.len() != 24 {
            return Err(AppError::BadRequest("Nonce must be 24 bytes".to_string()));
        }

        Ok(Nonce(nonce.to_string()))
    }

    /// Validate encrypted content is valid base64
    pub fn validate_encrypted_content(content: &str) -> Result<(), AppError> {
        general_purpose::STANDARD
            .decode(content)
            .map_err(|_| AppError::BadRequest("Invalid base64 encoding".to_string()))?;
        Ok(())
    }
}

// ============================================
// Type Wrappers
// ============================================

/// Validated public key (32 bytes, base64-encoded)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(pub String);

impl PublicKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validated nonce (24 bytes, base64-encoded)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce(pub String);

impl Nonce {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ============================================
// Client-Side Encryption Guide (Documentation)
// ============================================

/// CLIENT-SIDE ENCRYPTION GUIDE
///
/// This service does NOT perform encryption/decryption. It's done on the client.
///
/// ## 1. Key Generation (iOS/Client)
///
/// ```swift
/// import TweetNacl
///
/// // Generate user identity key pair (once per user)
/// let keyPair = NaclBox.keyPair()
/// let publicKey = keyPair.publicKey.base64EncodedString()  // 32 bytes -> base64
/// let secretKey = keyPair.secretKey  // Store in Keychain, NEVER upload
///
/// // Upload public key to server
/// POST /api/v1/users/me/public-key
/// { "public_key": "<base64-public-key>" }
/// ```
///
/// ## 2. Encrypting a Message (1:1 Conversation)
///
/// ```swift
/// // Get recipient's public key from server
/// let recipientPublicKey = getPublicKey(userId: recipientId)
///
/// // Compute shared secret (Diffie-Hellman)
/// let sharedSecret = NaclBox.before(
///     publicKey: recipientPublicKey,
///     secretKey: mySecretKey
/// )
///
/// // Generate unique nonce
/// let nonce = NaclBox.nonce()  // 24 random bytes
///
/// // Encrypt message
/// let plaintext = "Hello, World!".data(using: .utf8)!
/// let ciphertext = NaclBox.box(
///     message: plaintext,
///     nonce: nonce,
///     sharedSecret: sharedSecret
/// )
///
/// // Send to server
/// POST /api/v1/messages
/// {
///   "conversation_id": "<uuid>",
///   "encrypted_content": "<base64-ciphertext>",
///   "nonce": "<base64-nonce>"
/// }
/// ```
///
/// ## 3. Decrypting a Message
///
/// ```swift
/// // Receive message from server (via WebSocket or HTTP)
/// let ciphertext = Data(base64Encoded: message.encrypted_content)!
/// let nonce = Data(base64Encoded: message.nonce)!
///
/// // Compute shared secret with sender
/// let senderPublicKey = getPublicKey(userId: message.sender_id)
/// let sharedSecret = NaclBox.before(
///     publicKey: senderPublicKey,
///     secretKey: mySecretKey
/// )
///
/// // Decrypt
/// let plaintext = NaclBox.open(
///     ciphertext: ciphertext,
///     nonce: nonce,
///     sharedSecret: sharedSecret
/// )
///
/// let message = String(data: plaintext, encoding: .utf8)!
/// ```
///
/// ## 4. Group Encryption (Shared Secret)
///
/// ```swift
/// // Group creator generates shared key
/// let groupKey = NaclSecretBox.key()  // 32 random bytes
///
/// // Encrypt group key for each member
/// for member in members {
///     let memberPublicKey = getPublicKey(userId: member.id)
///     let nonce = NaclBox.nonce()
///     let encryptedGroupKey = NaclBox.box(
///         message: groupKey,
///         nonce: nonce,
///         publicKey: memberPublicKey,
///         secretKey: mySecretKey
///     )
///
///     // Send encrypted group key to member
///     POST /api/v1/conversations/{id}/keys
///     {
///       "user_id": member.id,
///       "encrypted_key": "<base64-encrypted-group-key>",
///       "nonce": "<base64-nonce>"
///     }
/// }
///
/// // Encrypt message with group key
/// let nonce = NaclSecretBox.nonce()
/// let ciphertext = NaclSecretBox.box(
///     message: plaintext,
///     nonce: nonce,
///     key: groupKey
/// )
/// ```
///
/// ## Security Considerations
///
/// 1. **Private keys NEVER leave the device**: Store in Keychain (iOS) / Keystore (Android)
/// 2. **Nonce must be unique**: Use `crypto_box_random_nonce()`, never reuse
/// 3. **Forward secrecy**: Regenerate group key when members change
/// 4. **No server-side decryption**: Server only routes ciphertext
/// 5. **Lost device = lost messages**: No recovery mechanism (by design)

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_public_key() {
        // Valid 32-byte key (base64-encoded)
        let valid_key = general_purpose::STANDARD.encode(&[0u8; 32]);
        assert!(EncryptionService::validate_public_key(&valid_key).is_ok());

        // Invalid: too short
        let short_key = general_purpose::STANDARD.encode(&[0u8; 16]);
        assert!(EncryptionService::validate_public_key(&short_key).is_err());

        // Invalid: not base64
        assert!(EncryptionService::validate_public_key("not-base64!!!").is_err());
    }

    #[test]
    fn test_validate_nonce() {
        // Valid 24-byte nonce (base64-encoded)
        let valid_nonce = general_purpose::STANDARD.encode(&[0u8; 24]);
        assert!(EncryptionService::validate_nonce(&valid_nonce).is_ok());

        // Invalid: too short
        let short_nonce = general_purpose::STANDARD.encode(&[0u8; 12]);
        assert!(EncryptionService::validate_nonce(&short_nonce).is_err());
    }
}
