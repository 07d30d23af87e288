/// Business logic services
pub mod oauth;
pub mod email;
pub mod two_fa;
pub mod kafka_events;

pub use kafka_events::KafkaEventProducer;
