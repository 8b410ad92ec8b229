use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::role::{PermissionSet, Role};
use crate::app::AppState;
use crate::errors::AppError;
use crate::jwt::SessionUser;

/// Typed claims for the acting identity, resolved once per request.
///
/// Carries the effective role and the permission set derived from it; handlers
/// and the gate never reach into a raw session object.
#[derive(Debug, Clone)]
pub struct Principal {
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub permissions: PermissionSet,
}

impl Principal {
    pub fn assemble(email: String, name: Option<String>, role: Role) -> Self {
        Self {
            email,
            name,
            role,
            permissions: PermissionSet::for_role(role),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = SessionUser::from_request_parts(parts, state).await?;
        let role = state.users.resolve_role(Some(&session.email)).await;
        Ok(Principal::assemble(session.email, session.name, role))
    }
}
