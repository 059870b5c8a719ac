//! Domain models for session-service.

pub mod actor;
pub mod session;

pub use actor::Actor;
pub use session::{Role, Session, SessionStatus};
