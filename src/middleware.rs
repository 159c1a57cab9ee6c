//! HTTP 中间件
//! 应用状态与请求追踪

use crate::{
    auth::{
        cookie::{CookieTransport, SessionTransport},
        jwt::JwtService,
        password::PasswordHasher,
    },
    config::AppConfig,
    error::AppError,
    repository::UserStore,
    services::AuthService,
};
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// 应用状态
///
/// 请求之间只共享不可变配置和连接池，服务均以 Arc 包装。
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// 使用内存存储时为 None
    pub db: Option<PgPool>,
    pub auth_service: Arc<AuthService>,
    pub jwt_service: Arc<JwtService>,
    pub session: Arc<dyn SessionTransport>,
}

impl AppState {
    /// 根据配置组装所有服务
    pub fn new(
        config: AppConfig,
        store: Arc<dyn UserStore>,
        db: Option<PgPool>,
    ) -> Result<Self, AppError> {
        let hasher = PasswordHasher::from_config(&config.security)?;
        let jwt_service = Arc::new(JwtService::from_config(&config));
        let session: Arc<dyn SessionTransport> = Arc::new(CookieTransport::from_config(&config));

        Ok(Self {
            auth_service: Arc::new(AuthService::new(store, hasher)?),
            jwt_service,
            session,
            db,
            config,
        })
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    async move {
        let start = Instant::now();

        let mut response = next.run(req).await;

        let elapsed = start.elapsed();
        let status = response.status().as_u16();

        // 指标标签使用有限取值
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            _ => "OTHER",
        };
        let status_code = match status {
            200 => "200",
            201 => "201",
            400 => "400",
            401 => "401",
            403 => "403",
            404 => "404",
            409 => "409",
            413 => "413",
            500 => "500",
            _ => "other",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_code)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(status = status, elapsed_ms = elapsed.as_millis() as u64, "Request completed");

        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

// ==================== 请求体提取器 ====================

/// JSON 请求体提取器
/// 解析失败时返回统一的 400 校验错误，而不是 axum 默认的纯文本拒绝
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection, "Rejected request body");
                if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    return Err(AppError::PayloadTooLarge);
                }
                Err(AppError::validation("body", &rejection.body_text()))
            }
        }
    }
}
