//! User repository (数据库访问层)

use crate::{
    error::AppError,
    models::user::{NewUser, User},
};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// 存储层错误
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 邮箱已存在（唯一约束冲突）
    #[error("a user with this email already exists")]
    DuplicateEmail,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => AppError::EmailAlreadyExists,
            StoreError::Database(e) => AppError::Database(e),
        }
    }
}

/// 用户存储接口
///
/// 邮箱唯一性由存储层保证：并发插入同一邮箱时只有一个成功，
/// 其余返回 `StoreError::DuplicateEmail`。
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 根据邮箱查找用户
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// 根据 ID 查找用户
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// 创建用户
    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError>;
}

/// PostgreSQL 用户存储
#[derive(Clone)]
pub struct UserRepository {
    db: PgPool,
}

impl UserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password, role, created_at FROM users WHERE email = $1 LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password, role, created_at FROM users WHERE id = $1 LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password, role, created_at
            "#,
        )
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.role.as_str())
        .fetch_one(&self.db)
        .await
        .map_err(map_unique_violation)?;

        Ok(user)
    }
}

/// 唯一约束冲突映射为 DuplicateEmail
fn map_unique_violation(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            tracing::debug!(constraint = ?db_err.constraint(), "Unique constraint violated on insert");
            StoreError::DuplicateEmail
        }
        _ => StoreError::Database(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(AppError::from(StoreError::DuplicateEmail), AppError::EmailAlreadyExists));
        assert!(matches!(
            AppError::from(StoreError::Database(sqlx::Error::RowNotFound)),
            AppError::Database(_)
        ));
    }

    #[test]
    fn test_non_database_errors_are_not_duplicates() {
        assert!(matches!(
            map_unique_violation(sqlx::Error::PoolTimedOut),
            StoreError::Database(_)
        ));
    }
}
