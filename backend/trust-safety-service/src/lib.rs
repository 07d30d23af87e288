pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod grpc;
pub mod db;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, TrustSafetyError};
pub use models::{Appeal, AppealStatus, ContentType, ModerationLog, ModerationResult, RiskScore};
pub use services::{AppealService, NsfwDetector, SpamContext, SpamDetector, TextModerator};
