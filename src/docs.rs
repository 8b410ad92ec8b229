use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health,
        crate::routes::auth::session,
        crate::routes::auth::me,
        crate::routes::posts::list_posts,
        crate::routes::posts::get_post,
        crate::routes::posts::create_post,
        crate::routes::posts::update_post,
        crate::routes::posts::delete_post,
        crate::routes::comments::list_comments,
        crate::routes::comments::create_comment,
        crate::routes::comments::delete_comment,
        crate::routes::admin::list_users,
        crate::routes::admin::update_user_role,
        crate::routes::admin::delete_user,
        crate::routes::admin::list_audit_entries,
    ),
    components(
        schemas(
            crate::authz::Role,
            crate::authz::PermissionSet,
            crate::models::user::User,
            crate::models::user::SessionRequest,
            crate::models::user::SessionResponse,
            crate::models::user::MeResponse,
            crate::models::user::UpdateRoleRequest,
            crate::models::user::UserStats,
            crate::models::user::UserListResponse,
            crate::models::post::Post,
            crate::models::post::PostCreateRequest,
            crate::models::post::PostUpdateRequest,
            crate::models::comment::Comment,
            crate::models::comment::CommentCreateRequest,
            crate::routes::posts::MessageResponse,
            crate::routes::admin::AuditEntry,
            crate::routes::health::HealthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Auth", description = "Session establishment and identity"),
        (name = "Posts", description = "Blog posts"),
        (name = "Comments", description = "Comments on posts"),
        (name = "Admin", description = "User management and audit log")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_routes() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
