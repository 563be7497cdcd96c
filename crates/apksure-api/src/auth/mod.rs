pub mod jwt;
pub mod limiter;
pub mod middleware;
pub mod models;
pub mod password;

pub use jwt::JwtService;
pub use limiter::SignInLimiter;
pub use models::{JwtClaims, SessionContext};
