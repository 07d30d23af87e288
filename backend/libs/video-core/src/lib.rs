//! Video service core models and types
//!
//! Shared data structures for video-service and related systems

pub mod constants;
pub mod models;

pub use models::*;
