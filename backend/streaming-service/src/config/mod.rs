//! Configuration module for Streaming Service
//!
//! This module contains all configuration structures needed for
//! the streaming service operation.

pub mod video_config;

pub use video_config::{CdnConfig, StreamingConfig};
