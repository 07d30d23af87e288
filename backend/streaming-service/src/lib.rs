pub mod config;
pub mod error;
pub mod grpc;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;

pub use error::{AppError, Result};
