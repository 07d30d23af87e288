pub mod circuit_breaker;
pub mod jwt_auth;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use jwt_auth::{JwtAuthMiddleware, UserId};
