//! Authorization core.
//!
//! Identity flows through four pieces, in order:
//! - [`resolve_role`] maps an email to its effective [`Role`]
//!   (user store first, bootstrap allowlist as fallback, `reader` default)
//! - [`PermissionSet::for_role`] derives the capability set from the role
//! - [`authorize`] combines capabilities with ownership facts into an
//!   allow/deny decision
//! - the audit enforcer (see [`crate::audit`]) wraps the gate so every
//!   decision lands in the audit log exactly once

mod allowlist;
mod gate;
mod principal;
mod resolver;
mod role;

pub use allowlist::AdminAllowlist;
pub use gate::{authorize, Action, Decision, DenyReason};
pub use principal::Principal;
pub use resolver::resolve_role;
pub use role::{PermissionSet, Role};
