pub mod counters;
pub mod follow;
pub mod kafka_events;

#[allow(unused_imports)]
pub use counters::{CounterService, PostCounts};
pub use follow::FollowService;
pub use kafka_events::{KafkaEventProducerConfig, SocialEventProducer};
