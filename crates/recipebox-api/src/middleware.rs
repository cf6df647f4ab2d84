use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode};

use recipebox_types::api::Claims;
use recipebox_types::models::Role;

use crate::error::ApiError;
use crate::policy::{Access, AuthUser, authorize};
use crate::state::{AppState, with_db};

/// Validate the bearer JWT, load the caller's current row and stash it as
/// `AuthUser` in the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(ApiError::Unauthorized("Not authorized, no token"))?;

    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized("Not authorized, token failed"))?;

    // Role and existence come from the database so that role changes and
    // deletions apply to tokens already issued.
    let user_id = token_data.claims.sub;
    let uid = user_id.to_string();
    let row = with_db(&state, move |db| db.get_user_by_id(&uid))
        .await?
        .ok_or(ApiError::Unauthorized("Not authorized, user not found"))?;
    let role: Role = row.role.parse().map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?;

    req.extensions_mut().insert(AuthUser {
        id: user_id,
        name: row.name,
        role,
    });
    Ok(next.run(req).await)
}

/// Must run after `require_auth`.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    authorize(Access::Admin, req.extensions().get::<AuthUser>())?;
    Ok(next.run(req).await)
}
