use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::audit::{AuditTarget, RequestContext};
use crate::authz::{Action, Principal};
use crate::errors::{AppError, AppResult};
use crate::models::comment::{Comment, CommentCreateRequest, DbComment};
use crate::routes::posts::{fetch_post, MessageResponse};

#[utoipa::path(
    get,
    path = "/posts/{id}/comments",
    tag = "Comments",
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 200, description = "Comments on the post, oldest first", body = Vec<Comment>),
        (status = 404, description = "No such post")
    )
)]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> AppResult<Json<Vec<Comment>>> {
    // 404 for a missing post, not an empty list.
    fetch_post(&state.pool, post_id).await?;

    let rows = sqlx::query_as::<_, DbComment>(
        "SELECT id, post_id, author_email, author_name, author_avatar, content, created_at \
         FROM comments WHERE post_id = ? ORDER BY created_at",
    )
    .bind(post_id.to_string())
    .fetch_all(&state.pool)
    .await?;

    let comments = rows
        .into_iter()
        .map(Comment::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(comments))
}

#[utoipa::path(
    post,
    path = "/posts/{id}/comments",
    tag = "Comments",
    params(("id" = Uuid, Path, description = "Post id")),
    request_body = CommentCreateRequest,
    responses(
        (status = 201, description = "Comment created", body = Comment),
        (status = 401, description = "No session"),
        (status = 403, description = "Commenting not permitted for this role"),
        (status = 404, description = "No such post")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_comment(
    State(state): State<AppState>,
    principal: Option<Principal>,
    headers: HeaderMap,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CommentCreateRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    if payload.content.trim().is_empty() {
        return Err(AppError::bad_request("comment content is required"));
    }

    fetch_post(&state.pool, post_id).await?;

    let ctx = RequestContext::from_headers(&headers);
    let (granted, actor) = state.enforcer.require(
        principal.as_ref(),
        &Action::CreateComment,
        AuditTarget::new("post", post_id.to_string()),
        ctx,
    )?;

    let avatar = match state.users.store().find_by_email(&actor.email).await {
        Ok(record) => record.and_then(|user| user.avatar_url),
        Err(_) => None,
    };

    let now = Utc::now();
    let id = Uuid::new_v4();
    let result = sqlx::query(
        "INSERT INTO comments (id, post_id, author_email, author_name, author_avatar, content, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(post_id.to_string())
    .bind(&actor.email)
    .bind(&actor.name)
    .bind(&avatar)
    .bind(&payload.content)
    .bind(now)
    .execute(&state.pool)
    .await;

    match result {
        Ok(_) => {
            granted.success(Some(json!({ "comment_id": id.to_string() })));
            let comment = Comment {
                id,
                post_id,
                author_email: actor.email.clone(),
                author_name: actor.name.clone(),
                author_avatar: avatar,
                content: payload.content,
                created_at: now,
            };
            Ok((StatusCode::CREATED, Json(comment)))
        }
        Err(err) => {
            granted.error(err.to_string());
            Err(err.into())
        }
    }
}

#[utoipa::path(
    delete,
    path = "/posts/{id}/comments/{comment_id}",
    tag = "Comments",
    params(
        ("id" = Uuid, Path, description = "Post id"),
        ("comment_id" = Uuid, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "Comment removed", body = MessageResponse),
        (status = 403, description = "Not the admin, the post author, or the comment author"),
        (status = 404, description = "No such post or comment")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    principal: Option<Principal>,
    headers: HeaderMap,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<MessageResponse>> {
    let post = fetch_post(&state.pool, post_id).await?;
    let comment = fetch_comment(&state.pool, post_id, comment_id).await?;

    let ctx = RequestContext::from_headers(&headers);
    let (granted, _actor) = state.enforcer.require(
        principal.as_ref(),
        &Action::DeleteComment {
            post_author: &post.author_email,
            comment_author: &comment.author_email,
        },
        AuditTarget::new("comment", comment_id.to_string()),
        ctx,
    )?;

    let result = sqlx::query("DELETE FROM comments WHERE id = ? AND post_id = ?")
        .bind(comment_id.to_string())
        .bind(post_id.to_string())
        .execute(&state.pool)
        .await;

    match result {
        Ok(_) => {
            granted.success(Some(json!({ "post_id": post_id.to_string() })));
            Ok(Json(MessageResponse {
                message: "comment deleted".to_string(),
            }))
        }
        Err(err) => {
            granted.error(err.to_string());
            Err(err.into())
        }
    }
}

async fn fetch_comment(pool: &SqlitePool, post_id: Uuid, comment_id: Uuid) -> Result<Comment, AppError> {
    let row = sqlx::query_as::<_, DbComment>(
        "SELECT id, post_id, author_email, author_name, author_avatar, content, created_at \
         FROM comments WHERE id = ? AND post_id = ?",
    )
    .bind(comment_id.to_string())
    .bind(post_id.to_string())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("no comment with that id"))?;

    Comment::try_from(row)
}
