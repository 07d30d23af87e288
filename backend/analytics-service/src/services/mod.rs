pub mod cdc;
pub mod dedup;
pub mod outbox;

pub use cdc::{CdcConsumer, CdcConsumerConfig};
pub use dedup::*;
pub use outbox::*;
