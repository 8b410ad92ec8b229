use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::app::AppState;
use crate::audit::{AuditTarget, RequestContext};
use crate::authz::{Action, Principal};
use crate::errors::{AppError, AppResult};
use crate::models::post::{DbPost, Post, PostCreateRequest, PostUpdateRequest};

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/posts",
    tag = "Posts",
    responses((status = 200, description = "All posts, newest first", body = Vec<Post>))
)]
pub async fn list_posts(State(state): State<AppState>) -> AppResult<Json<Vec<Post>>> {
    let rows = sqlx::query_as::<_, DbPost>(
        "SELECT id, title, content, author_email, author_name, views, created_at, updated_at \
         FROM posts ORDER BY created_at DESC",
    )
    .fetch_all(&state.pool)
    .await?;

    let posts = rows
        .into_iter()
        .map(Post::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(posts))
}

#[utoipa::path(
    get,
    path = "/posts/{id}",
    tag = "Posts",
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 200, description = "The post; reading bumps the view counter", body = Post),
        (status = 404, description = "No such post")
    )
)]
pub async fn get_post(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Post>> {
    let mut post = fetch_post(&state.pool, id).await?;

    sqlx::query("UPDATE posts SET views = views + 1 WHERE id = ?")
        .bind(id.to_string())
        .execute(&state.pool)
        .await?;
    post.views += 1;

    Ok(Json(post))
}

#[utoipa::path(
    post,
    path = "/posts",
    tag = "Posts",
    request_body = PostCreateRequest,
    responses(
        (status = 201, description = "Post created", body = Post),
        (status = 401, description = "No session"),
        (status = 403, description = "Writing not permitted for this role")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_post(
    State(state): State<AppState>,
    principal: Option<Principal>,
    headers: HeaderMap,
    Json(payload): Json<PostCreateRequest>,
) -> AppResult<(StatusCode, Json<Post>)> {
    if payload.title.trim().is_empty() {
        return Err(AppError::bad_request("title is required"));
    }

    let ctx = RequestContext::from_headers(&headers);
    let (granted, actor) = state.enforcer.require(
        principal.as_ref(),
        &Action::CreatePost,
        AuditTarget::new("post", "new"),
        ctx,
    )?;

    let now = Utc::now();
    let id = Uuid::new_v4();
    let result = sqlx::query(
        "INSERT INTO posts (id, title, content, author_email, author_name, views, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 0, ?, ?)",
    )
    .bind(id.to_string())
    .bind(&payload.title)
    .bind(&payload.content)
    .bind(&actor.email)
    .bind(&actor.name)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await;

    match result {
        Ok(_) => {
            granted.success(Some(json!({ "title": payload.title })));
            let post = Post {
                id,
                title: payload.title,
                content: payload.content,
                author_email: actor.email.clone(),
                author_name: actor.name.clone(),
                views: 0,
                created_at: now,
                updated_at: now,
            };
            Ok((StatusCode::CREATED, Json(post)))
        }
        Err(err) => {
            granted.error(err.to_string());
            Err(err.into())
        }
    }
}

#[utoipa::path(
    put,
    path = "/posts/{id}",
    tag = "Posts",
    params(("id" = Uuid, Path, description = "Post id")),
    request_body = PostUpdateRequest,
    responses(
        (status = 200, description = "Post updated", body = Post),
        (status = 403, description = "Only the author or an admin may edit"),
        (status = 404, description = "No such post")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_post(
    State(state): State<AppState>,
    principal: Option<Principal>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostUpdateRequest>,
) -> AppResult<Json<Post>> {
    let mut post = fetch_post(&state.pool, id).await?;

    let ctx = RequestContext::from_headers(&headers);
    let (granted, _actor) = state.enforcer.require(
        principal.as_ref(),
        &Action::EditPost { post_author: &post.author_email },
        AuditTarget::new("post", id.to_string()),
        ctx,
    )?;

    if let Some(title) = payload.title {
        if title.trim().is_empty() {
            granted.error("title must not be empty");
            return Err(AppError::bad_request("title must not be empty"));
        }
        post.title = title;
    }
    if let Some(content) = payload.content {
        post.content = content;
    }
    post.updated_at = Utc::now();

    let result = sqlx::query("UPDATE posts SET title = ?, content = ?, updated_at = ? WHERE id = ?")
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.updated_at)
        .bind(id.to_string())
        .execute(&state.pool)
        .await;

    match result {
        Ok(_) => {
            granted.success(Some(json!({ "title": post.title })));
            Ok(Json(post))
        }
        Err(err) => {
            granted.error(err.to_string());
            Err(err.into())
        }
    }
}

#[utoipa::path(
    delete,
    path = "/posts/{id}",
    tag = "Posts",
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post and its comments removed", body = MessageResponse),
        (status = 403, description = "Only the author or an admin may delete"),
        (status = 404, description = "No such post")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_post(
    State(state): State<AppState>,
    principal: Option<Principal>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let post = fetch_post(&state.pool, id).await?;

    let ctx = RequestContext::from_headers(&headers);
    let (granted, _actor) = state.enforcer.require(
        principal.as_ref(),
        &Action::DeletePost { post_author: &post.author_email },
        AuditTarget::new("post", id.to_string()),
        ctx,
    )?;

    let result = async {
        sqlx::query("DELETE FROM comments WHERE post_id = ?")
            .bind(id.to_string())
            .execute(&state.pool)
            .await?;
        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id.to_string())
            .execute(&state.pool)
            .await
    }
    .await;

    match result {
        Ok(_) => {
            granted.success(Some(json!({ "title": post.title })));
            Ok(Json(MessageResponse {
                message: "post deleted".to_string(),
            }))
        }
        Err(err) => {
            granted.error(err.to_string());
            Err(err.into())
        }
    }
}

pub(crate) async fn fetch_post(pool: &SqlitePool, id: Uuid) -> Result<Post, AppError> {
    let row = sqlx::query_as::<_, DbPost>(
        "SELECT id, title, content, author_email, author_name, views, created_at, updated_at \
         FROM posts WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("no post with that id"))?;

    Post::try_from(row)
}
