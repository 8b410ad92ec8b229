use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::tempdir;
use tower::util::ServiceExt;

use parish_blog::authz::AdminAllowlist;
use parish_blog::jwt::JwtConfig;
use parish_blog::{create_app_with_config, AppConfig};

async fn setup_app() -> Result<(tempfile::TempDir, Router)> {
    let dir = tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test_admin.db");

    use sqlx::sqlite::SqliteConnectOptions;
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"),
    )
    .await?;
    migrator.run(&pool).await?;

    let config = AppConfig {
        jwt: JwtConfig {
            secret: Arc::new(b"test-secret".to_vec()),
            exp_hours: 24,
        },
        allowlist: AdminAllowlist::parse("boss@example.com"),
        gateway_secret: None,
    };
    let app = create_app_with_config(pool, config).await?;

    Ok((dir, app))
}

async fn send(app: &Router, req: Request<Body>) -> Result<Response> {
    Ok(app.clone().oneshot(req).await?)
}

async fn json_body(resp: Response) -> Result<Value> {
    let bytes = body::to_bytes(resp.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<Request<Body>> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let req = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))?,
        None => builder.body(Body::empty())?,
    };
    Ok(req)
}

async fn login(app: &Router, email: &str, name: &str) -> Result<String> {
    let resp = send(
        app,
        request(
            "POST",
            "/auth/session",
            None,
            Some(json!({ "email": email, "name": name })),
        )?,
    )
    .await?;
    anyhow::ensure!(resp.status() == StatusCode::OK, "login failed for {email}");
    let body = json_body(resp).await?;
    let token = body
        .get("token")
        .and_then(|v| v.as_str())
        .context("missing token")?;
    Ok(token.to_string())
}

#[tokio::test]
async fn user_listing_is_admin_only() -> Result<()> {
    let (_dir, app) = setup_app().await?;
    let admin = login(&app, "boss@example.com", "Boss").await?;
    let member = login(&app, "member@example.com", "Member").await?;

    let resp = send(&app, request("GET", "/admin/users", Some(&member), None)?).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = send(&app, request("GET", "/admin/users?stats=true", Some(&admin), None)?).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await?;
    let users = body.get("users").and_then(|v| v.as_array()).context("users")?;
    assert_eq!(users.len(), 2);
    let stats = body.get("stats").context("stats requested but missing")?;
    assert_eq!(stats.get("total").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(stats.get("admins").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(stats.get("readers").and_then(|v| v.as_u64()), Some(1));

    Ok(())
}

#[tokio::test]
async fn role_changes_apply_on_next_request() -> Result<()> {
    let (_dir, app) = setup_app().await?;
    let admin = login(&app, "boss@example.com", "Boss").await?;
    let member = login(&app, "member@example.com", "Member").await?;

    let resp = send(
        &app,
        request(
            "PUT",
            "/admin/users",
            Some(&admin),
            Some(json!({ "email": "member@example.com", "role": "writer" })),
        )?,
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    // The existing token picks up the new role because roles resolve per request.
    let resp = send(&app, request("GET", "/auth/me", Some(&member), None)?).await?;
    let body = json_body(resp).await?;
    assert_eq!(body.get("role").and_then(|v| v.as_str()), Some("writer"));
    assert_eq!(
        body.pointer("/permissions/can_write").and_then(|v| v.as_bool()),
        Some(true)
    );

    Ok(())
}

#[tokio::test]
async fn non_admins_cannot_manage_roles() -> Result<()> {
    let (_dir, app) = setup_app().await?;
    let _ = login(&app, "boss@example.com", "Boss").await?;
    let member = login(&app, "member@example.com", "Member").await?;
    let _ = login(&app, "victim@example.com", "Victim").await?;

    let resp = send(
        &app,
        request(
            "PUT",
            "/admin/users",
            Some(&member),
            Some(json!({ "email": "victim@example.com", "role": "banned" })),
        )?,
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = send(
        &app,
        request("DELETE", "/admin/users/victim@example.com", Some(&member), None)?,
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn self_targeting_is_rejected_even_for_admins() -> Result<()> {
    let (_dir, app) = setup_app().await?;
    let admin = login(&app, "boss@example.com", "Boss").await?;

    let resp = send(
        &app,
        request(
            "PUT",
            "/admin/users",
            Some(&admin),
            Some(json!({ "email": "boss@example.com", "role": "reader" })),
        )?,
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = send(
        &app,
        request("DELETE", "/admin/users/boss@example.com", Some(&admin), None)?,
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Still an admin afterwards.
    let resp = send(&app, request("GET", "/auth/me", Some(&admin), None)?).await?;
    let body = json_body(resp).await?;
    assert_eq!(body.get("role").and_then(|v| v.as_str()), Some("admin"));

    Ok(())
}

#[tokio::test]
async fn managing_unknown_users_is_not_found() -> Result<()> {
    let (_dir, app) = setup_app().await?;
    let admin = login(&app, "boss@example.com", "Boss").await?;

    let resp = send(
        &app,
        request(
            "PUT",
            "/admin/users",
            Some(&admin),
            Some(json!({ "email": "ghost@example.com", "role": "writer" })),
        )?,
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(
        &app,
        request("DELETE", "/admin/users/ghost@example.com", Some(&admin), None)?,
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn deleting_a_user_removes_the_record() -> Result<()> {
    let (_dir, app) = setup_app().await?;
    let admin = login(&app, "boss@example.com", "Boss").await?;
    let _ = login(&app, "member@example.com", "Member").await?;

    let resp = send(
        &app,
        request("DELETE", "/admin/users/member@example.com", Some(&admin), None)?,
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(&app, request("GET", "/admin/users", Some(&admin), None)?).await?;
    let body = json_body(resp).await?;
    let users = body.get("users").and_then(|v| v.as_array()).context("users")?;
    assert_eq!(users.len(), 1);
    assert_eq!(
        users[0].get("email").and_then(|v| v.as_str()),
        Some("boss@example.com")
    );

    Ok(())
}
