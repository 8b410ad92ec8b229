use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::authz::{PermissionSet, Role};

/// A user record. Email is the sole identity key.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub last_login: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: String,
    pub last_login: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<DbUser> for User {
    fn from(value: DbUser) -> Self {
        User {
            email: value.email,
            name: value.name,
            avatar_url: value.avatar_url,
            role: Role::from_db(&value.role),
            last_login: value.last_login,
            created_at: value.created_at,
        }
    }
}

/// Verified identity payload delivered by the OAuth gateway after a
/// successful external login.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SessionRequest {
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "Ada Lovelace")]
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
    pub permissions: PermissionSet,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub permissions: PermissionSet,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    #[schema(example = "member@example.com")]
    pub email: String,
    #[schema(example = "writer")]
    pub role: Role,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct UserStats {
    pub total: usize,
    pub admins: usize,
    pub writers: usize,
    pub readers: usize,
    pub banned: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<UserStats>,
}
