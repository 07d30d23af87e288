pub mod apns_client;
pub mod fcm_client;
pub mod kafka_consumer;
pub mod notification_service;

pub use apns_client::*;
pub use fcm_client::*;
pub use kafka_consumer::*;
pub use notification_service::*;
