use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_email: String,
    pub author_name: Option<String>,
    pub author_avatar: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbComment {
    pub id: String,
    pub post_id: String,
    pub author_email: String,
    pub author_name: Option<String>,
    pub author_avatar: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbComment> for Comment {
    type Error = AppError;

    fn try_from(value: DbComment) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&value.id)
            .map_err(|err| AppError::internal(format!("invalid comment id in store: {err}")))?;
        let post_id = Uuid::parse_str(&value.post_id)
            .map_err(|err| AppError::internal(format!("invalid post id in store: {err}")))?;
        Ok(Comment {
            id,
            post_id,
            author_email: value.author_email,
            author_name: value.author_name,
            author_avatar: value.author_avatar,
            content: value.content,
            created_at: value.created_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentCreateRequest {
    pub content: String,
}
