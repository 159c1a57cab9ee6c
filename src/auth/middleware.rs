//! Session authentication and role authorization middleware
//!
//! Per request: token present -> token verified -> user resolved -> (role checked) -> handler.
//! Any failed step short-circuits with an error response.

use crate::{
    error::AppError,
    middleware::AppState,
    models::{Role, UserResponse},
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated user attached to the request extensions
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserResponse);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::Unauthenticated)
    }
}

/// Resolve the caller from the session token carried by the request
pub async fn resolve_current_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<UserResponse, AppError> {
    let token = state
        .session
        .read_token(headers)
        .ok_or(AppError::Unauthenticated)?;

    let claims = state.jwt_service.verify(&token)?;

    // Token outlives a deleted user; the lookup keeps role and profile current
    state.auth_service.get_user_by_id(claims.id).await
}

/// Authentication middleware - the session token is mandatory
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = resolve_current_user(&state, req.headers()).await.map_err(|e| {
        tracing::debug!(error = %e, "Authentication failed");
        e
    })?;

    tracing::debug!(user_id = %user.id, role = %user.role, "Request authenticated");
    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}

/// Allowed roles for [`require_role`]
#[derive(Debug, Clone)]
pub struct RequiredRoles(Arc<[Role]>);

impl RequiredRoles {
    pub fn new(roles: impl Into<Vec<Role>>) -> Self {
        let roles: Vec<Role> = roles.into();
        Self(roles.into())
    }

    pub fn allows(&self, role: Role) -> bool {
        self.0.contains(&role)
    }
}

/// Role check shared by the middleware and handlers
pub fn check_role(user: Option<&CurrentUser>, required: &RequiredRoles) -> Result<(), AppError> {
    let CurrentUser(user) = user.ok_or(AppError::Unauthenticated)?;

    if !required.allows(user.role) {
        tracing::warn!(user_id = %user.id, role = %user.role, "Role not permitted");
        return Err(AppError::Forbidden);
    }

    Ok(())
}

/// Authorization middleware, layered after [`authenticate`]
pub async fn require_role(
    State(required): State<RequiredRoles>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    check_role(req.extensions().get::<CurrentUser>(), &required)?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn current(role: Role) -> CurrentUser {
        CurrentUser(UserResponse {
            id: Uuid::new_v4(),
            name: "Ann".to_string(),
            email: "ann@x.com".to_string(),
            role,
            created_at: Utc::now(),
        })
    }

    #[test]
    fn test_check_role_allows() {
        let admins = RequiredRoles::new([Role::Admin]);
        assert!(check_role(Some(&current(Role::Admin)), &admins).is_ok());
    }

    #[test]
    fn test_check_role_forbidden() {
        let admins = RequiredRoles::new([Role::Admin]);
        let err = check_role(Some(&current(Role::User)), &admins).unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[test]
    fn test_check_role_without_user() {
        let anyone = RequiredRoles::new([Role::Admin, Role::User]);
        let err = check_role(None, &anyone).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[test]
    fn test_multiple_roles() {
        let members = RequiredRoles::new(vec![Role::Admin, Role::User]);
        assert!(members.allows(Role::User));
        assert!(members.allows(Role::Admin));
        assert!(!members.allows(Role::Guest));
    }
}
