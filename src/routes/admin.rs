//! Admin console API: user management and the audit log viewer.
//!
//! Role changes and user deletions run through the authorization gate (which
//! rejects self-targeting before anything else); the read-only listings only
//! need the admin capability check.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::Row;
use utoipa::{IntoParams, ToSchema};

use crate::app::AppState;
use crate::audit::{AuditTarget, RequestContext};
use crate::authz::{Action, Principal};
use crate::errors::{AppError, AppResult};
use crate::models::user::{UpdateRoleRequest, User, UserListResponse};
use crate::routes::posts::MessageResponse;

fn ensure_admin(principal: &Principal) -> Result<(), AppError> {
    if principal.permissions.can_delete {
        Ok(())
    } else {
        Err(AppError::forbidden("admin privileges required"))
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersQuery {
    /// Include per-role counts in the response.
    pub stats: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "Admin",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "All user records", body = UserListResponse),
        (status = 403, description = "Admin privileges required")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<ListUsersQuery>,
) -> AppResult<Json<UserListResponse>> {
    ensure_admin(&principal)?;

    let users: Vec<User> = state.users.list().await?;
    let stats = if query.stats.unwrap_or(false) {
        Some(state.users.stats().await?)
    } else {
        None
    };

    Ok(Json(UserListResponse { users, stats }))
}

#[utoipa::path(
    put,
    path = "/admin/users",
    tag = "Admin",
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated; takes effect on the user's next request", body = User),
        (status = 403, description = "Not an admin, or targeting yourself"),
        (status = 404, description = "No user with that email")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_user_role(
    State(state): State<AppState>,
    principal: Option<Principal>,
    headers: HeaderMap,
    Json(payload): Json<UpdateRoleRequest>,
) -> AppResult<Json<User>> {
    let ctx = RequestContext::from_headers(&headers);
    let (granted, _actor) = state.enforcer.require(
        principal.as_ref(),
        &Action::ChangeRole { target: &payload.email },
        AuditTarget::new("user", payload.email.clone()),
        ctx,
    )?;

    match state.users.update_role(&payload.email, payload.role).await {
        Ok(user) => {
            granted.success(Some(json!({ "role": payload.role.as_str() })));
            Ok(Json(user))
        }
        Err(err) => {
            granted.error(err.to_string());
            Err(err)
        }
    }
}

#[utoipa::path(
    delete,
    path = "/admin/users/{email}",
    tag = "Admin",
    params(("email" = String, Path, description = "Email of the user to remove")),
    responses(
        (status = 200, description = "User removed; re-login recreates a fresh reader record", body = MessageResponse),
        (status = 403, description = "Not an admin, or targeting yourself"),
        (status = 404, description = "No user with that email")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    principal: Option<Principal>,
    headers: HeaderMap,
    Path(email): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let ctx = RequestContext::from_headers(&headers);
    let (granted, _actor) = state.enforcer.require(
        principal.as_ref(),
        &Action::DeleteUser { target: &email },
        AuditTarget::new("user", email.clone()),
        ctx,
    )?;

    match state.users.delete(&email).await {
        Ok(()) => {
            granted.success(None);
            Ok(Json(MessageResponse {
                message: "user deleted".to_string(),
            }))
        }
        Err(err) => {
            granted.error(err.to_string());
            Err(err)
        }
    }
}

#[derive(Debug, serde::Serialize, ToSchema)]
pub struct AuditEntry {
    pub id: String,
    pub action: String,
    pub outcome: String,
    pub actor_email: Option<String>,
    pub actor_name: Option<String>,
    pub actor_role: Option<String>,
    pub target_kind: Option<String>,
    pub target_id: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    #[schema(value_type = Object)]
    pub meta: Option<Value>,
    pub error: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AuditQuery {
    /// Filter by action tag, e.g. `post.delete`.
    pub action: Option<String>,
    /// Filter by outcome: `success`, `denied`, or `error`.
    pub outcome: Option<String>,
    /// Max rows, newest first. Defaults to 50, capped at 500.
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/admin/audit",
    tag = "Admin",
    params(AuditQuery),
    responses(
        (status = 200, description = "Recent audit entries, newest first", body = Vec<AuditEntry>),
        (status = 403, description = "Admin privileges required")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_audit_entries(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<AuditQuery>,
) -> AppResult<Json<Vec<AuditEntry>>> {
    ensure_admin(&principal)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    let mut sql = String::from(
        "SELECT id, action, outcome, actor_email, actor_name, actor_role, target_kind, target_id, \
         ip, user_agent, meta, error, occurred_at FROM audit_log",
    );
    let mut clauses: Vec<&str> = Vec::new();
    if query.action.is_some() {
        clauses.push("action = ?");
    }
    if query.outcome.is_some() {
        clauses.push("outcome = ?");
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY occurred_at DESC, rowid DESC LIMIT ?");

    let mut db_query = sqlx::query(&sql);
    if let Some(action) = &query.action {
        db_query = db_query.bind(action);
    }
    if let Some(outcome) = &query.outcome {
        db_query = db_query.bind(outcome);
    }
    db_query = db_query.bind(limit);

    let rows = db_query.fetch_all(&state.pool).await?;

    let entries = rows
        .iter()
        .map(|row| AuditEntry {
            id: row.get("id"),
            action: row.get("action"),
            outcome: row.get("outcome"),
            actor_email: row.get("actor_email"),
            actor_name: row.get("actor_name"),
            actor_role: row.get("actor_role"),
            target_kind: row.get("target_kind"),
            target_id: row.get("target_id"),
            ip: row.get("ip"),
            user_agent: row.get("user_agent"),
            meta: row
                .get::<Option<String>, _>("meta")
                .and_then(|raw| serde_json::from_str(&raw).ok()),
            error: row.get("error"),
            occurred_at: row.get("occurred_at"),
        })
        .collect();

    Ok(Json(entries))
}
