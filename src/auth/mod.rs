pub mod jwt;
pub mod middleware;

pub use jwt::{JwtKeys, TokenVerifyResult};
pub use middleware::AuthMiddleware;
