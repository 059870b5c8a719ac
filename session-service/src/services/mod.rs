//! Services layer for session-service.
//!
//! Store implementations, the session lifecycle, the read side, and the
//! revocation authority. Every component receives its store and clock at
//! construction.

pub mod clock;
mod database;
pub mod error;
pub mod fingerprint;
pub mod lifecycle;
mod memory;
pub mod metrics;
pub mod query;
pub mod reaper;
pub mod revocation;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use database::PgSessionStore;
pub use error::{InvalidReason, SessionError};
pub use fingerprint::{fingerprint, Fingerprint, RequestContext};
pub use lifecycle::{IssuedSession, SessionLifecycle, SessionPolicy};
pub use memory::InMemorySessionStore;
pub use query::{SessionQueryService, SessionSnapshot, SessionStats};
pub use revocation::{RevocationAuthority, RevocationKind, RevokeOutcome};
pub use store::SessionStore;
