//! Audit pipeline.
//!
//! Every authorization decision produces exactly one [`ActionLog`] entry.
//! Entries travel over a broadcast channel so recording never blocks or fails
//! the guarded action; a listener task drains the channel into the
//! `audit_log` table, hash-chaining rows for tamper evidence.

mod enforce;

pub use enforce::{Enforcer, Granted};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::authz::Principal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Denied,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Denied => "denied",
            Outcome::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditActor {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: String,
}

impl From<&Principal> for AuditActor {
    fn from(principal: &Principal) -> Self {
        Self {
            email: principal.email.clone(),
            name: principal.name.clone(),
            role: principal.role.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditTarget {
    pub kind: String,
    pub id: String,
}

impl AuditTarget {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

/// Request context attached to audit entries (IP, User-Agent).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        let ip = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .map(String::from)
            });

        let user_agent = headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Self { ip, user_agent }
    }
}

/// One authorization decision and its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub id: Uuid,
    pub action: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<AuditActor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<AuditTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl ActionLog {
    pub fn new(action: &str, outcome: Outcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            action: action.to_string(),
            outcome,
            actor: None,
            target: None,
            ip: None,
            user_agent: None,
            meta: None,
            error: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn actor(mut self, actor: Option<AuditActor>) -> Self {
        self.actor = actor;
        self
    }

    pub fn target(mut self, target: AuditTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn context(mut self, ctx: &RequestContext) -> Self {
        self.ip = ctx.ip.clone();
        self.user_agent = ctx.user_agent.clone();
        self
    }

    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn error_detail(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Handle for emitting audit entries. Cloneable; shared through `AppState`.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    tx: broadcast::Sender<ActionLog>,
}

impl AuditLogger {
    /// Fire and forget. A closed or full channel must never fail the caller.
    pub fn record(&self, entry: ActionLog) {
        if let Err(err) = self.tx.send(entry) {
            tracing::debug!(error = %err, "audit entry dropped, no active listener");
        }
    }
}

pub fn init_audit_channel() -> (AuditLogger, broadcast::Receiver<ActionLog>) {
    let (tx, rx) = broadcast::channel(1024);
    (AuditLogger { tx }, rx)
}

pub async fn start_audit_listener(mut rx: broadcast::Receiver<ActionLog>, pool: SqlitePool) {
    tracing::info!("audit listener started");
    loop {
        match rx.recv().await {
            Ok(entry) => persist_entry(&pool, entry).await,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "audit listener lagged; entries lost");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    tracing::info!("audit listener stopped");
}

async fn persist_entry(pool: &SqlitePool, entry: ActionLog) {
    let payload = serde_json::to_string(&entry).unwrap_or_default();

    // Chain onto the most recent row; a sequential listener keeps this race-free.
    let prev_hash: Option<String> =
        sqlx::query_scalar("SELECT hash FROM audit_log ORDER BY rowid DESC LIMIT 1")
            .fetch_optional(pool)
            .await
            .ok()
            .flatten();

    let mut hasher = Sha256::new();
    if let Some(ref prev) = prev_hash {
        hasher.update(prev.as_bytes());
    }
    hasher.update(payload.as_bytes());
    let hash = hex::encode(hasher.finalize());

    let result = sqlx::query(
        "INSERT INTO audit_log \
           (id, action, outcome, actor_email, actor_name, actor_role, target_kind, target_id, \
            ip, user_agent, meta, error, occurred_at, prev_hash, hash) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(entry.id.to_string())
    .bind(&entry.action)
    .bind(entry.outcome.as_str())
    .bind(entry.actor.as_ref().map(|a| a.email.clone()))
    .bind(entry.actor.as_ref().and_then(|a| a.name.clone()))
    .bind(entry.actor.as_ref().map(|a| a.role.clone()))
    .bind(entry.target.as_ref().map(|t| t.kind.clone()))
    .bind(entry.target.as_ref().map(|t| t.id.clone()))
    .bind(&entry.ip)
    .bind(&entry.user_agent)
    .bind(entry.meta.as_ref().map(|m| m.to_string()))
    .bind(&entry.error)
    .bind(entry.occurred_at)
    .bind(&prev_hash)
    .bind(&hash)
    .execute(pool)
    .await;

    // Audit failures are logged and swallowed; they never surface to handlers.
    if let Err(err) = result {
        tracing::error!(error = %err, action = %entry.action, "failed to persist audit entry");
    }
}
