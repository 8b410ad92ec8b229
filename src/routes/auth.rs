use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::json;

use crate::app::AppState;
use crate::audit::{ActionLog, AuditActor, AuditTarget, Outcome, RequestContext};
use crate::authz::{PermissionSet, Principal};
use crate::errors::{AppError, AppResult};
use crate::models::user::{MeResponse, SessionRequest, SessionResponse};

/// Identity callback from the OAuth gateway. The gateway has already
/// verified the email; this endpoint only records the login and mints a
/// session token.
#[utoipa::path(
    post,
    path = "/auth/session",
    tag = "Auth",
    request_body = SessionRequest,
    responses(
        (status = 200, description = "Session established", body = SessionResponse),
        (status = 401, description = "Gateway secret missing or wrong")
    )
)]
pub async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SessionRequest>,
) -> AppResult<Json<SessionResponse>> {
    if let Some(expected) = &state.config.gateway_secret {
        let provided = headers.get("x-gateway-secret").and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            return Err(AppError::unauthorized("invalid gateway secret"));
        }
    }

    let email = payload.email.trim();
    if email.is_empty() {
        return Err(AppError::bad_request("email is required"));
    }

    let user = state
        .users
        .upsert_on_login(email, payload.name.as_deref(), payload.avatar_url.as_deref())
        .await?;

    let token = state.config.jwt.encode(&user.email, user.name.as_deref())?;
    let permissions = PermissionSet::for_role(user.role);

    let ctx = RequestContext::from_headers(&headers);
    state.audit.record(
        ActionLog::new("user.login", Outcome::Success)
            .actor(Some(AuditActor {
                email: user.email.clone(),
                name: user.name.clone(),
                role: user.role.as_str().to_string(),
            }))
            .target(AuditTarget::new("user", user.email.clone()))
            .context(&ctx)
            .meta(json!({ "role": user.role.as_str() })),
    );

    Ok(Json(SessionResponse { token, user, permissions }))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses((status = 200, description = "Current identity and permissions", body = MeResponse)),
    security(("bearerAuth" = []))
)]
pub async fn me(principal: Principal) -> AppResult<Json<MeResponse>> {
    Ok(Json(MeResponse {
        email: principal.email,
        name: principal.name,
        role: principal.role,
        permissions: principal.permissions,
    }))
}
