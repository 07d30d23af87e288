pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod handlers;
pub mod websocket;
pub mod metrics;
pub mod grpc;

pub use config::Config;
pub use error::{AppError, Result};
pub use services::*;
pub use handlers::*;
pub use websocket::{ConnectionManager, WebSocketMessage};
