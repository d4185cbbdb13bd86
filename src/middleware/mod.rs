pub mod auth;
pub mod security_headers;

pub use auth::IdentityMiddleware;
pub use security_headers::SecurityHeaders;
