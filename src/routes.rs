//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::{
    auth::middleware::{authenticate, require_role, RequiredRoles},
    handlers,
    middleware::{request_tracking_middleware, AppState},
    models::Role,
};

/// 请求体上限（注册/登录请求都很小）
const MAX_BODY_BYTES: usize = 64 * 1024;

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/api", get(handlers::health::api_status));

    // 认证路由（无需登录）
    let auth_routes = Router::new()
        .route("/sign-up", post(handlers::auth::sign_up))
        .route("/sign-in", post(handlers::auth::sign_in))
        // 只检查 Cookie 是否存在
        .route("/sign-out", get(handlers::auth::sign_out));

    // 需要认证的路由
    let authenticated_routes = Router::new()
        .route("/profile", get(handlers::auth::profile))
        .merge(
            Router::new()
                .route("/admin", get(handlers::auth::admin))
                .route_layer(middleware::from_fn_with_state(
                    RequiredRoles::new([Role::Admin]),
                    require_role,
                )),
        )
        // 认证层在角色层外侧，先执行
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .merge(public_routes)
        .nest("/api/auth", auth_routes.merge(authenticated_routes))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::from_fn(request_tracking_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
