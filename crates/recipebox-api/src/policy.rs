use uuid::Uuid;

use recipebox_types::models::Role;

use crate::error::ApiError;

/// The caller, as resolved by `require_auth` from the token and the current
/// user row.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

/// Access level a route group demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Admin,
}

/// The single authorization policy. Routing consults it; handlers never
/// check roles themselves.
pub fn authorize(required: Access, caller: Option<&AuthUser>) -> Result<(), ApiError> {
    match (required, caller) {
        (Access::Public, _) => Ok(()),
        (_, None) => Err(ApiError::Unauthorized("Not authorized, no token")),
        (Access::Authenticated, Some(_)) => Ok(()),
        (Access::Admin, Some(user)) if user.role == Role::Admin => Ok(()),
        (Access::Admin, Some(_)) => Err(ApiError::Forbidden("Not authorized as an admin")),
    }
}
