pub mod oauth;
pub mod session;
pub mod token_revocation;
/// Data models for authentication
pub mod user;

pub use oauth::{OAuthConnection, OAuthProvider, OAuthUserInfo};
pub use session::Session;
pub use token_revocation::TokenRevocation;
pub use user::User;
