//! 用户库连接与模式校验
//! 连接池、嵌入式迁移，以及确认 users 表和邮箱唯一约束存在的就绪检查

use crate::config::DatabaseConfig;
use secrecy::ExposeSecret;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::time::Duration;

/// 邮箱唯一性依赖的约束名，与迁移保持一致
pub const EMAIL_UNIQUE_CONSTRAINT: &str = "users_email_key";

/// 按配置建立连接池
///
/// 日志只记录主机与库名，连接串中的口令不会出现。
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, DbError> {
    let options: PgConnectOptions = config
        .url
        .expose_secret()
        .parse()
        .map_err(|e: sqlx::Error| DbError::InvalidUrl(e.to_string()))?;

    let host = options.get_host().to_string();
    let database = options.get_database().unwrap_or("postgres").to_string();

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .connect_with(options)
        .await
        .map_err(|e| {
            tracing::error!(host = %host, database = %database, "Failed to connect to user database: {}", e);
            DbError::ConnectionFailed(e.to_string())
        })?;

    tracing::info!(
        host = %host,
        database = %database,
        max_connections = config.max_connections,
        "Connected to user database"
    );

    Ok(pool)
}

/// 执行嵌入的迁移并确认用户表就绪
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await.map_err(|e| {
        tracing::error!("Migration failed: {}", e);
        DbError::MigrationFailed(e.to_string())
    })?;

    verify_schema(pool).await?;
    tracing::info!("User schema is up to date");
    Ok(())
}

/// 检查 users 表及其邮箱唯一约束
///
/// 约束缺失时并发注册无法保证邮箱唯一，此时视为未就绪。
pub async fn verify_schema(pool: &PgPool) -> Result<(), DbError> {
    let present: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM pg_constraint
            WHERE conname = $1
              AND contype = 'u'
              AND conrelid = to_regclass('users')
        )
        "#,
    )
    .bind(EMAIL_UNIQUE_CONSTRAINT)
    .fetch_one(pool)
    .await
    .map_err(|e| DbError::Unavailable(e.to_string()))?;

    if present {
        Ok(())
    } else {
        Err(DbError::SchemaMissing(EMAIL_UNIQUE_CONSTRAINT))
    }
}

/// 就绪探针使用的数据库检查
pub async fn health_check(pool: &PgPool) -> HealthStatus {
    metrics::gauge!("db.pool.size").set(pool.size() as f64);
    metrics::gauge!("db.pool.idle").set(pool.num_idle() as f64);

    match verify_schema(pool).await {
        Ok(()) => HealthStatus::Healthy,
        Err(e) => {
            tracing::warn!(error = %e, "User database not ready");
            HealthStatus::Unhealthy(e.to_string())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("users table or its {0} constraint is missing")]
    SchemaMissing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}
