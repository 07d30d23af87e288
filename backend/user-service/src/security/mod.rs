pub mod jwt;
/// Security utilities including password hashing and JWT handling
pub mod password;
pub mod totp;
pub mod token_revocation;

pub use password::{hash_password, verify_password};
pub use totp::TOTPGenerator;
pub use token_revocation::{
    revoke_token, revoke_all_user_tokens, is_token_revoked,
    check_user_token_revocation, RevocationError,
};
