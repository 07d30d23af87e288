pub mod config;
pub mod error;
pub mod grpc;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
pub use models::*;
pub use services::*;
