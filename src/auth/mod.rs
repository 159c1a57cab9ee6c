//! Authentication and authorization module

pub mod cookie;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use cookie::{CookieTransport, SameSite, SessionTransport};
pub use jwt::{JwtService, TokenError};
pub use middleware::{authenticate, check_role, require_role, CurrentUser, RequiredRoles};
pub use password::{PasswordError, PasswordHasher};
