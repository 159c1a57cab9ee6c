//! 认证服务：注册、登录校验、按 ID 查询用户

use crate::{
    auth::password::{PasswordError, PasswordHasher},
    error::AppError,
    models::{auth::*, user::*},
    repository::{StoreError, UserStore},
};
use std::sync::Arc;
use uuid::Uuid;

/// 邮箱不存在时用于校验的占位口令，其哈希在构造时生成
const DUMMY_PASSWORD: &str = "dummy-password-for-unknown-accounts";

pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    /// 与真实哈希同参数的 PHC 串，使未知邮箱与密码错误付出相同的校验开销
    dummy_hash: String,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher) -> Result<Self, PasswordError> {
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?;
        Ok(Self {
            store,
            hasher,
            dummy_hash,
        })
    }

    /// 注册新用户
    pub async fn create_user(&self, req: CreateUser) -> Result<UserResponse, AppError> {
        if !req.role.is_persistable() {
            return Err(AppError::validation("role", "Role must be one of: user, admin"));
        }

        // 预检查仅用于快速失败，唯一约束才是最终裁决
        let existing = self.store.find_by_email(&req.email).await.map_err(|e| {
            tracing::error!(email = %req.email, error = %e, "Failed to look up user by email");
            AppError::from(e)
        })?;

        if existing.is_some() {
            tracing::info!(email = %req.email, "Sign-up rejected, email already registered");
            return Err(AppError::EmailAlreadyExists);
        }

        let password_hash = self.hash_password(req.password).await?;

        let new_user = NewUser {
            name: req.name,
            email: req.email,
            password_hash,
            role: req.role,
        };

        let user = self.store.insert(new_user).await.map_err(|e| match e {
            StoreError::DuplicateEmail => {
                tracing::info!("Concurrent sign-up lost the race on the email unique constraint");
                AppError::EmailAlreadyExists
            }
            other => {
                tracing::error!(error = %other, "User creation in store failed");
                AppError::from(other)
            }
        })?;

        metrics::counter!("auth_signups_total").increment(1);
        tracing::info!(user_id = %user.id, email = %user.email, "User created successfully");

        Ok(UserResponse::from(user))
    }

    /// 校验邮箱和密码
    ///
    /// 邮箱不存在与密码错误返回同一个 `InvalidCredentials`，防止用户枚举。
    pub async fn authenticate_user(&self, credentials: Credentials) -> Result<UserResponse, AppError> {
        let user = self
            .store
            .find_by_email(&credentials.email)
            .await
            .map_err(|e| {
                tracing::error!(email = %credentials.email, error = %e, "Failed to look up user by email");
                AppError::from(e)
            })?;

        let user = match user {
            Some(user) => user,
            None => {
                // 结果丢弃，只为让耗时与密码错误一致
                let _ = self
                    .verify_password(credentials.password, self.dummy_hash.clone())
                    .await;
                metrics::counter!("auth_signins_total", "result" => "failure").increment(1);
                tracing::info!(email = %credentials.email, "Sign-in failed: unknown email");
                return Err(AppError::InvalidCredentials);
            }
        };

        let valid = self
            .verify_password(credentials.password, user.password_hash.clone())
            .await?;

        if !valid {
            metrics::counter!("auth_signins_total", "result" => "failure").increment(1);
            tracing::info!(user_id = %user.id, "Sign-in failed: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        metrics::counter!("auth_signins_total", "result" => "success").increment(1);
        tracing::info!(user_id = %user.id, email = %user.email, "User authenticated successfully");

        Ok(UserResponse::from(user))
    }

    /// 根据 ID 获取用户
    pub async fn get_user_by_id(&self, id: Uuid) -> Result<UserResponse, AppError> {
        let user = self.store.find_by_id(id).await.map_err(|e| {
            tracing::error!(user_id = %id, error = %e, "Get user by ID failed");
            AppError::from(e)
        })?;

        user.map(UserResponse::from).ok_or_else(|| {
            tracing::debug!(user_id = %id, "User not found");
            AppError::UserNotFound
        })
    }

    /// 哈希为 CPU 密集操作，放到阻塞线程池执行
    async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password)).await??;
        Ok(hash)
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool, AppError> {
        let hasher = self.hasher.clone();
        let valid = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await??;
        Ok(valid)
    }
}
