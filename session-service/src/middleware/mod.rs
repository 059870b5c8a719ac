pub mod auth;
pub mod internal;

pub use auth::{session_auth_middleware, CurrentSession, SESSION_COOKIE};
pub use internal::{internal_api_key_middleware, INTERNAL_API_KEY_HEADER};
