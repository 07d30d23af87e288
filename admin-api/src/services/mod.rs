mod auth_service;
mod audit_service;

// Services are defined but not yet wired into API handlers
// Will be used when implementing real database operations
#[allow(unused_imports)]
pub use auth_service::*;
#[allow(unused_imports)]
pub use audit_service::*;
