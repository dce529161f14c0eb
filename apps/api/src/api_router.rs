use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use medgate_core::AppError;
use tower_http::trace::TraceLayer;
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::PostgresStore;

use crate::state::AppState;
use crate::{auth, handlers, middleware};

mod cors;

pub fn build_router(
    app_state: AppState,
    frontend_url: &str,
    session_layer: SessionManagerLayer<PostgresStore>,
) -> Result<Router, AppError> {
    let protected_routes = Router::new()
        .route(
            "/api/security/permissions",
            get(handlers::security::list_permissions_handler),
        )
        .route(
            "/api/security/roles",
            get(handlers::security::list_roles_handler)
                .post(handlers::security::create_role_handler),
        )
        .route(
            "/api/security/roles/{role_id}",
            put(handlers::security::update_role_handler)
                .delete(handlers::security::delete_role_handler),
        )
        .route(
            "/api/security/users",
            get(handlers::security::list_users_handler),
        )
        .route(
            "/api/security/users/{user_id}/roles",
            put(handlers::security::set_user_roles_handler),
        )
        .route(
            "/api/security/temporary-access-codes",
            get(handlers::security::list_temp_codes_handler)
                .post(handlers::security::issue_temp_code_handler),
        )
        .route(
            "/api/security/temporary-access-codes/{code_id}/revoke",
            post(handlers::security::revoke_temp_code_handler),
        )
        .route(
            "/api/security/audit-log",
            get(handlers::security::list_audit_log_handler),
        )
        .route(
            "/api/access-codes/activate",
            post(handlers::access_codes::activate_code_handler),
        )
        .route(
            "/api/access-codes/mine",
            get(handlers::access_codes::list_my_codes_handler),
        )
        .route(
            "/api/access-requests",
            get(handlers::access_requests::list_access_requests_handler)
                .post(handlers::access_requests::submit_access_request_handler),
        )
        .route(
            "/api/access-requests/{request_id}/resolution",
            post(handlers::access_requests::resolve_access_request_handler),
        )
        .route(
            "/api/notifications/stream",
            get(handlers::notifications::notification_stream_handler),
        )
        .route(
            "/api/sensitive-data",
            get(handlers::sensitive_data::sensitive_data_handler),
        )
        .route("/auth/me", get(auth::me_handler))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_auth,
        ));

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route("/auth/bootstrap", post(auth::bootstrap_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .merge(protected_routes)
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_same_origin_for_mutations,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors::build_cors_layer(frontend_url)?)
        .layer(session_layer)
        .with_state(app_state))
}
