pub mod jwt_auth;
pub mod secret_auth;

pub use jwt_auth::{jwt_auth_middleware, AuthUser};
pub use secret_auth::{verify_shared_secret, AUTOMATION_SECRET_HEADER};
