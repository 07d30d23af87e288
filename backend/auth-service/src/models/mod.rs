/// Data models for authentication
pub mod user;
pub mod oauth;
pub mod session;
pub mod token_revocation;

pub use user::User;
pub use oauth::{OAuthProvider, OAuthUserInfo, OAuthConnection};
pub use session::Session;
pub use token_revocation::TokenRevocation;
