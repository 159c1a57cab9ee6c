//! 认证相关的 HTTP 处理器

use crate::{
    auth::middleware::CurrentUser,
    error::AppError,
    middleware::{AppState, JsonBody},
    models::auth::*,
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use validator::Validate;

/// 注册
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<SignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let req = req.normalized();
    req.validate()?;

    let user = state.auth_service.create_user(req.into()).await?;

    // 注册成功即登录
    let token = state.jwt_service.issue(&user)?;
    let mut headers = HeaderMap::new();
    state.session.write_token(&mut headers, &token);

    tracing::info!(user_id = %user.id, "User registered successfully");

    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse {
            message: "User registered".to_string(),
            user,
        }),
    ))
}

/// 登录
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<SignInRequest>,
) -> Result<impl IntoResponse, AppError> {
    let req = req.normalized();
    req.validate()?;

    let user = state.auth_service.authenticate_user(req.into()).await?;

    let token = state.jwt_service.issue(&user)?;
    let mut headers = HeaderMap::new();
    state.session.write_token(&mut headers, &token);

    tracing::info!(user_id = %user.id, "User signed in successfully");

    Ok((
        headers,
        Json(AuthResponse {
            message: "User signed in".to_string(),
            user,
        }),
    ))
}

/// 登出
///
/// 令牌是无状态的，服务端不做吊销，只通知客户端清除 Cookie。
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    request_headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if state.session.read_token(&request_headers).is_none() {
        return Err(AppError::BadRequest("No active session".to_string()));
    }

    let mut headers = HeaderMap::new();
    state.session.clear_token(&mut headers);

    tracing::info!("User signed out");

    Ok((headers, Json(MessageResponse::new("User signed out"))))
}

/// 获取当前用户信息
pub async fn profile(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(AuthResponse {
        message: "Profile retrieved".to_string(),
        user,
    })
}

/// 管理员专属端点
pub async fn admin(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(AuthResponse {
        message: format!("Welcome, {}", user.name),
        user,
    })
}
