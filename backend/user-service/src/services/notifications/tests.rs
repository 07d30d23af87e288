//! Integration tests for notification system

#[cfg(test)]
mod notification_integration_tests {
    use uuid::Uuid;

    #[test]
    fn test_notification_system_integration() {
        // TODO: Implement when Kafka consumer is available
        // This test will verify:
        // 1. Event consumption from Kafka
        // 2. Batch aggregation
        // 3. Delivery through multiple channels
        // 4. Delivery tracking in PostgreSQL
    }

    #[test]
    fn test_notification_preferences_flow() {
        // TODO: Implement when database layer is ready
        // This test will verify:
        // 1. User creates preferences
        // 2. Preferences are applied to outgoing notifications
        // 3. Quiet hours are respected
    }

    #[test]
    fn test_rate_limiting() {
        // TODO: Implement rate limiting
        // This test will verify:
        // 1. Users don't receive too many notifications in short time
        // 2. Rate limits are configurable per notification type
        // 3. Rate limit resets appropriately
    }
}
