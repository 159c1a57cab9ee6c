//! 内存用户存储
//! 与 PostgreSQL 实现遵守同一唯一性约定，用于测试和本地开发

use super::user_repo::{StoreError, UserStore};
use crate::models::user::{NewUser, User};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    /// email -> id，相当于唯一索引
    email_index: HashMap<String, Uuid>,
}

#[derive(Default)]
pub struct MemoryUserStore {
    tables: RwLock<Tables>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 删除用户（仅供测试模拟令牌签发后用户被删除的情况）
    pub async fn remove(&self, id: Uuid) -> bool {
        let mut tables = self.tables.write().await;
        match tables.users.remove(&id) {
            Some(user) => {
                tables.email_index.remove(&user.email);
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.tables.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .email_index
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        // 检查与写入在同一把写锁内完成
        let mut tables = self.tables.write().await;
        if tables.email_index.contains_key(&new_user.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            role: new_user.role,
            created_at: Utc::now(),
        };

        tables.email_index.insert(user.email.clone(), user.id);
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }
}
