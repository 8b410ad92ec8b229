use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::audit::{init_audit_channel, start_audit_listener, AuditLogger, Enforcer};
use crate::authz::AdminAllowlist;
use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{admin, auth, comments, health, posts};
use crate::users::{SqliteUserStore, UserDirectory};

/// Startup configuration. Read from the environment exactly once; the
/// allowlist is never re-read or mutated afterwards.
#[derive(Clone)]
pub struct AppConfig {
    pub jwt: JwtConfig,
    pub allowlist: AdminAllowlist,
    pub gateway_secret: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            jwt: JwtConfig::from_env()?,
            allowlist: AdminAllowlist::from_env(),
            gateway_secret: std::env::var("SESSION_GATEWAY_SECRET")
                .ok()
                .filter(|secret| !secret.is_empty()),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<AppConfig>,
    pub users: UserDirectory,
    pub audit: AuditLogger,
    pub enforcer: Enforcer,
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let config = AppConfig::from_env()?;
    create_app_with_config(pool, config).await
}

pub async fn create_app_with_config(pool: SqlitePool, config: AppConfig) -> Result<Router, AppError> {
    if config.allowlist.is_empty() {
        tracing::warn!("ADMIN_EMAILS is empty; no bootstrap admins are configured");
    }
    if config.gateway_secret.is_none() {
        tracing::warn!("SESSION_GATEWAY_SECRET not set; /auth/session accepts any caller");
    }

    let (audit, audit_rx) = init_audit_channel();
    tokio::spawn(start_audit_listener(audit_rx, pool.clone()));

    let store = Arc::new(SqliteUserStore::new(pool.clone()));
    let users = UserDirectory::new(store, config.allowlist.clone());
    let enforcer = Enforcer::new(audit.clone());

    let state = AppState {
        pool,
        config: Arc::new(config),
        users,
        audit,
        enforcer,
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/session", post(auth::session))
        .route("/me", get(auth::me));

    let post_routes = Router::new()
        .route("/", get(posts::list_posts).post(posts::create_post))
        .route(
            "/:id",
            get(posts::get_post).put(posts::update_post).delete(posts::delete_post),
        )
        .route(
            "/:id/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/:id/comments/:comment_id", delete(comments::delete_comment));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).put(admin::update_user_role))
        .route("/users/:email", delete(admin::delete_user))
        .route("/audit", get(admin::list_audit_entries));

    let router = Router::new()
        .route("/api/health", get(health::health))
        .nest("/auth", auth_routes)
        .nest("/posts", post_routes)
        .nest("/admin", admin_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
