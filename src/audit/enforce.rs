use serde_json::Value;

use super::{ActionLog, AuditActor, AuditLogger, AuditTarget, Outcome, RequestContext};
use crate::authz::{authorize, Action, Decision, DenyReason, Principal};
use crate::errors::AppError;

/// Decorator around the authorization gate.
///
/// Every decision that passes through [`Enforcer::require`] produces exactly
/// one audit entry: denials are recorded immediately (before any side
/// effect), allowed actions hand back a [`Granted`] token the handler
/// finishes with [`Granted::success`] or [`Granted::error`] once the side
/// effect has run.
#[derive(Debug, Clone)]
pub struct Enforcer {
    audit: AuditLogger,
}

impl Enforcer {
    pub fn new(audit: AuditLogger) -> Self {
        Self { audit }
    }

    pub fn check(
        &self,
        principal: Option<&Principal>,
        action: &Action<'_>,
        target: AuditTarget,
        ctx: RequestContext,
    ) -> Result<Granted, AppError> {
        match authorize(principal, action) {
            Decision::Allow => Ok(Granted {
                audit: self.audit.clone(),
                action: action.tag(),
                actor: principal.map(AuditActor::from),
                target,
                ctx,
            }),
            Decision::Deny(reason) => {
                let entry = ActionLog::new(action.tag(), Outcome::Denied)
                    .actor(principal.map(AuditActor::from))
                    .target(target)
                    .context(&ctx)
                    .error_detail(reason.as_str());
                self.audit.record(entry);
                Err(deny_error(reason))
            }
        }
    }

    /// Gate an action and hand back the authenticated actor alongside the
    /// grant. Every gated action requires identity, so the second arm is
    /// unreachable after an allow; it exists to keep the types honest.
    pub fn require<'p>(
        &self,
        principal: Option<&'p Principal>,
        action: &Action<'_>,
        target: AuditTarget,
        ctx: RequestContext,
    ) -> Result<(Granted, &'p Principal), AppError> {
        let granted = self.check(principal, action, target, ctx)?;
        match principal {
            Some(actor) => Ok((granted, actor)),
            None => Err(AppError::unauthorized("login required")),
        }
    }
}

fn deny_error(reason: DenyReason) -> AppError {
    match reason {
        DenyReason::Unauthenticated => AppError::unauthorized("login required"),
        DenyReason::SelfTarget => AppError::forbidden("cannot target your own account"),
        DenyReason::InsufficientPermissions => AppError::forbidden("insufficient permissions"),
        DenyReason::Forbidden => AppError::forbidden("not allowed for this resource"),
    }
}

/// Proof that the gate allowed an action. Consume exactly once after the
/// side effect runs.
#[must_use]
pub struct Granted {
    audit: AuditLogger,
    action: &'static str,
    actor: Option<AuditActor>,
    target: AuditTarget,
    ctx: RequestContext,
}

impl Granted {
    pub fn success(self, meta: Option<Value>) {
        let mut entry = ActionLog::new(self.action, Outcome::Success)
            .actor(self.actor)
            .target(self.target)
            .context(&self.ctx);
        if let Some(meta) = meta {
            entry = entry.meta(meta);
        }
        self.audit.record(entry);
    }

    pub fn error(self, error: impl Into<String>) {
        let entry = ActionLog::new(self.action, Outcome::Error)
            .actor(self.actor)
            .target(self.target)
            .context(&self.ctx)
            .error_detail(error);
        self.audit.record(entry);
    }
}
