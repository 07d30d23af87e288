pub mod cdn_failover;
pub mod cdn_handler_integration;
pub mod cdn_service;
pub mod origin_shield;

pub use cdn_failover::*;
pub use cdn_handler_integration::*;
pub use cdn_service::*;
pub use origin_shield::*;
