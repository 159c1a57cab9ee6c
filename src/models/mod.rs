//! 数据模型模块
//! 用户、角色、会话声明与请求/响应 DTO

pub mod auth;
pub mod user;

pub use auth::*;
pub use user::*;
