//! Integration tests for E2E Encrypted Messaging (Phase 5 Feature 2)
//!
//! Tests the complete flow:
//! 1. User registration and public key registration
//! 2. Key exchange initiation and completion
//! 3. Encrypted message sending and receiving
//! 4. Message delivery and read status tracking
//! 5. Kafka event publishing
//! 6. WebSocket real-time delivery
//!
//! NOTE: These tests require PostgreSQL and Redis to be running.
//! Run with: `cargo test --test messaging_integration_test -- --test-threads=1 --nocapture`

// NOTE: Full integration tests skipped as they require:
// - PostgreSQL database with migrations
// - Redis instance
// - Kafka broker (optional for event publishing tests)
// - Running in serial due to shared database state

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    /// Test scenario: Alice sends an encrypted message to Bob
    ///
    /// Prerequisites:
    /// - Alice and Bob both have public keys registered
    /// - Key exchange completed between Alice and Bob
    #[test]
    #[ignore] // Requires database - run with: cargo test -- --ignored
    fn test_alice_sends_encrypted_message_to_bob() {
        // Setup:
        // 1. Create Alice and Bob users
        // 2. Alice registers her public key
        // 3. Bob registers his public key
        // 4. Alice initiates key exchange with Bob
        // 5. Bob completes key exchange
        // 6. Alice sends encrypted message
        // 7. Verify message stored in database
        // 8. Verify Kafka event published
        // 9. Verify WebSocket event published to Redis
        // 10. Bob retrieves message via API
        // 11. Verify message is encrypted
        // 12. Verify nonce is unique
        let _alice_id = Uuid::new_v4();
        let _bob_id = Uuid::new_v4();
        // Test would follow these steps...
    }

    /// Test scenario: Message delivery status tracking
    ///
    /// Prerequisites:
    /// - Message already sent from Alice to Bob
    #[test]
    #[ignore] // Requires database
    fn test_message_delivery_status_tracking() {
        // Verify:
        // 1. Message marked as "sent" initially
        // 2. Bob receives message via WebSocket
        // 3. Bob's client marks message as "delivered"
        // 4. Server updates message_delivered table
        // 5. Kafka delivered event published
        // 6. Alice receives real-time delivered notification via WebSocket
        // 7. Bob reads message
        // 8. Server updates read status
        // 9. Kafka read event published
        // 10. Alice receives real-time read notification
    }

    /// Test scenario: Key rotation and renewal
    ///
    /// Tests that key rotation happens correctly and old messages remain accessible
    #[test]
    #[ignore] // Requires database
    fn test_key_rotation_workflow() {
        // Verify:
        // 1. Alice's key has rotation_interval_days = 30
        // 2. System detects key needs rotation (next_rotation_at < now)
        // 3. Alice receives key rotation notification
        // 4. Alice registers new public key
        // 5. Kafka public_key_registered event published with is_rotation = true
        // 6. Old messages can still be decrypted (backward compatibility)
        // 7. New messages use new public key
    }

    /// Test scenario: Replay attack prevention
    ///
    /// Tests that the same nonce cannot be used twice in the same conversation
    #[test]
    #[ignore] // Requires database
    fn test_replay_attack_prevention() {
        // Verify:
        // 1. Alice sends message with nonce N1 to Bob
        // 2. System stores (conversation_pair, N1) in used_nonces
        // 3. Alice tries to send another message with same nonce N1
        // 4. System rejects with "Nonce already used in this conversation"
        // 5. Different conversation pair can use same nonce (not blocked)
        // 6. Old nonces cleaned up after 7 days (configurable)
    }

    /// Test scenario: Typing indicators
    ///
    /// Tests real-time typing indicator delivery via Redis
    #[test]
    #[ignore] // Requires Redis
    fn test_typing_indicator_delivery() {
        // Verify:
        // 1. Alice sends typing.start event
        // 2. System publishes to Redis channel
        // 3. Bob's WebSocket receives typing indicator
        // 4. Alice's typing status stored in Redis with 3s TTL
        // 5. After 3s, TTL expires and key is removed
        // 6. Alice sends typing.stop event
        // 7. System deletes key and publishes stop event
        // 8. Bob receives stop typing indicator
    }

    /// Test scenario: Read receipts
    ///
    /// Tests that read receipts are properly tracked and delivered
    #[test]
    #[ignore] // Requires database
    fn test_read_receipt_workflow() {
        // Verify:
        // 1. Alice sends message M1 to Bob
        // 2. Message initially: delivered=false, read=false
        // 3. Bob opens conversation (fetches messages)
        // 4. Bob's client marks M1 as delivered
        // 5. POST /api/v1/messages/{id}/delivered called
        // 6. Message updated: delivered=true, read=false
        // 7. Kafka delivered event published
        // 8. Alice receives real-time delivered notification
        // 9. Bob's client marks M1 as read
        // 10. POST /api/v1/messages/{id}/read called
        // 11. Message updated: delivered=true, read=true
        // 12. Kafka read event published
        // 13. Alice receives real-time read notification
    }

    /// Test scenario: Concurrent message sending
    ///
    /// Tests that concurrent messages don't cause nonce collisions
    #[test]
    #[ignore] // Requires database
    fn test_concurrent_message_sending() {
        // Verify:
        // 1. Alice sends 10 concurrent messages to Bob
        // 2. Each message has unique nonce
        // 3. All messages successfully stored
        // 4. No nonce collision errors
        // 5. All Kafka events published
        // 6. All WebSocket events delivered
        // 7. Bob can retrieve all 10 messages in order
    }

    /// Test scenario: Conversation history retrieval
    ///
    /// Tests paginated message retrieval for a conversation
    #[test]
    #[ignore] // Requires database
    fn test_conversation_history_retrieval() {
        // Verify:
        // 1. Alice and Bob have exchanged 100 messages
        // 2. GET /api/v1/conversations/{id}/messages?limit=20&offset=0
        // 3. Returns 20 most recent messages
        // 4. GET /api/v1/conversations/{id}/messages?limit=20&offset=20
        // 5. Returns next 20 messages
        // 6. All messages are encrypted
        // 7. All messages have valid nonces
        // 8. Messages are sorted by created_at descending
    }

    /// Test scenario: Authorization checks
    ///
    /// Tests that users can only access their own messages
    #[test]
    #[ignore] // Requires database
    fn test_authorization_checks() {
        // Verify:
        // 1. Alice sends message to Bob
        // 2. Alice can retrieve the message via GET /api/v1/messages/{id}
        // 3. Bob can retrieve the message via GET /api/v1/messages/{id}
        // 4. Charlie (unauthorized user) cannot retrieve the message
        // 5. Returns 403 Forbidden for unauthorized access
        // 6. Alice cannot mark Bob's message as read (returns 403)
        // 7. Bob cannot mark Alice's message as delivered (returns 403)
    }

    /// Test scenario: Event publishing order
    ///
    /// Tests that events are published in the correct order
    #[test]
    #[ignore] // Requires database + Kafka
    fn test_kafka_event_publishing_order() {
        // Verify:
        // 1. Alice initiates key exchange with Bob
        // 2. KeyExchangeInitiatedEvent published to Kafka
        // 3. Bob completes key exchange
        // 4. KeyExchangeCompletedEvent published to Kafka
        // 5. Alice sends message
        // 6. MessageSentEvent published to Kafka
        // 7. Bob receives and marks as delivered
        // 8. MessageDeliveredEvent published to Kafka
        // 9. Bob marks as read
        // 10. MessageReadEvent published to Kafka
        // 11. Events appear in order on Kafka topic with monotonic timestamps
    }

    /// Test scenario: WebSocket channel naming consistency
    ///
    /// Tests that WebSocket channels are named consistently regardless of user order
    #[test]
    fn test_websocket_channel_consistency() {
        // Verify:
        // 1. Conversation pair (Alice → Bob) produces channel X
        // 2. Conversation pair (Bob → Alice) produces same channel X
        // 3. Different user pairs produce different channels
        // 4. Channel naming uses UUIDs in sorted order for consistency
        let user_a = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let user_b = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap();

        let pair_ab = format!(
            "{}:{}",
            std::cmp::min(user_a, user_b),
            std::cmp::max(user_a, user_b)
        );
        let pair_ba = format!(
            "{}:{}",
            std::cmp::min(user_b, user_a),
            std::cmp::max(user_b, user_a)
        );

        assert_eq!(pair_ab, pair_ba);
    }

    /// Test scenario: Error handling - invalid nonce
    ///
    /// Tests that invalid nonces are rejected
    #[test]
    #[ignore] // Requires database
    fn test_error_handling_invalid_nonce() {
        // Verify:
        // 1. Alice sends message with invalid nonce (< 24 bytes)
        // 2. System rejects with "Invalid nonce" error
        // 3. Returns 400 Bad Request
        // 4. Message not stored in database
        // 5. Kafka event not published
    }

    /// Test scenario: Error handling - missing public key
    ///
    /// Tests that messages cannot be sent to users without registered keys
    #[test]
    #[ignore] // Requires database
    fn test_error_handling_missing_public_key() {
        // Verify:
        // 1. Alice tries to send message to Charlie (no public key registered)
        // 2. System rejects with "Recipient public key not found"
        // 3. Returns 404 Not Found
        // 4. Message not stored in database
    }

    /// Test scenario: Performance - message throughput
    ///
    /// Tests that the system can handle high message volume
    #[test]
    #[ignore] // Requires database + performance measurement
    fn test_performance_message_throughput() {
        // Verify:
        // 1. Send 1000 messages in rapid succession
        // 2. All messages stored successfully
        // 3. Average latency < 200ms per message (P95)
        // 4. No message loss or corruption
        // 5. All Kafka events published successfully
        // 6. Redis pub/sub handles load without overflow
    }
}

// Placeholder for helper functions that would be used in tests
#[cfg(test)]
mod helpers {
    // These would be implemented for actual integration tests:
    //
    // pub async fn create_user(name: &str) -> Uuid { ... }
    // pub async fn register_public_key(user_id: Uuid, key: &str) { ... }
    // pub async fn send_message(sender: Uuid, recipient: Uuid, content: &str) { ... }
    // pub async fn get_message(user_id: Uuid, msg_id: Uuid) { ... }
    // pub async fn mark_delivered(msg_id: Uuid) { ... }
    // pub async fn mark_read(msg_id: Uuid) { ... }
    // pub async fn verify_kafka_event_published(topic: &str, key: &str) { ... }
}
