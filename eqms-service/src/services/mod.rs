//! Services layer: database access, token codec, session issuing, and
//! the audit recorder.

pub mod audit;
pub mod database;
mod session;
mod tokens;

pub use audit::{AuditRecorder, AuditSink, MemoryAuditSink, PgAuditSink};
pub use database::Database;
pub use session::SessionService;
pub use tokens::{AuditorClaims, SessionClaims, TokenService};
