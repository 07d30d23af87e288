pub mod accounts;
pub mod devices;
pub mod invitations;
/// Database operations for identity service
pub mod oauth;
pub mod passkey;
pub mod password_reset;
pub mod sessions;
pub mod token_revocation;
pub mod user_channels;
pub mod user_settings;
pub mod users;
pub mod waitlist;

// Re-export commonly used types
pub use user_settings::{UpdateUserSettingsFields, UserSettingsRecord};
pub use users::{UpdateUserProfileFields, UserProfileRecord};
