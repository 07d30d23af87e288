pub mod appeal_service;
pub mod nsfw_detector;
pub mod spam_detector;
pub mod text_moderator;

pub use appeal_service::AppealService;
pub use nsfw_detector::NsfwDetector;
pub use spam_detector::{SpamContext, SpamDetector};
pub use text_moderator::TextModerator;
