mod consumer;
mod models;

pub use consumer::{CdcConsumer, CdcConsumerConfig};
pub use models::{CdcMessage, CdcOperation, CdcPayload, CdcSource};
