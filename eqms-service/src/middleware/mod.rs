pub mod audit_trail;
pub mod auth;
pub mod flexible;
pub mod roles;

pub use audit_trail::{audit_trail, AuditDescriptor, AuditHandled, AuditTrail, FieldRef};
pub use auth::{require_auth, CurrentUser};
pub use flexible::{flexible_auth, AuthScheme, CurrentPrincipal, FlexibleAuth, Principal};
pub use roles::authorize_roles;
