pub mod email;
pub mod kafka_events;
/// Business logic services
pub mod oauth;
pub mod outbox;
pub mod two_fa;

pub use kafka_events::KafkaEventProducer;
