use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use tracing::info;

use recipebox_db::{ProfilePatch, ProfileUpdate};
use recipebox_types::api::{
    Notice, ProfileResponse, RoleResponse, UpdateProfileRequest, UpdateRoleRequest, UserListQuery,
    UserListResponse,
};
use recipebox_types::paging::PageRequest;

use crate::auth::{hash_password, normalize_email, validate_name, validate_password};
use crate::convert::{account_response, hydrate_recipes, recipe_summary, user_response};
use crate::error::{ApiError, JsonBody};
use crate::policy::AuthUser;
use crate::state::{AppState, with_db};

pub const DEFAULT_USER_PAGE_SIZE: u32 = 20;

const USER_NOT_FOUND: ApiError = ApiError::NotFound("User not found");

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = user.id.to_string();
    let (row, starred) = with_db(&state, move |db| {
        let Some(row) = db.get_user_by_id(&uid)? else {
            return Ok(None);
        };
        let starred = db.starred_recipes(&uid)?;
        Ok(Some((row, starred)))
    })
    .await?
    .ok_or(USER_NOT_FOUND)?;

    let starred_recipes = starred.iter().map(recipe_summary).collect();
    let user = user_response(row);
    Ok(Json(ProfileResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        avatar: user.avatar,
        starred_recipes,
        created_at: user.created_at,
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Empty strings mean "leave unchanged".
    let given = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

    let name = given(req.name).map(|n| validate_name(&n)).transpose()?;
    let email = given(req.email).map(|e| normalize_email(&e)).transpose()?;
    let avatar = given(req.avatar).map(|a| a.trim().to_string());
    let password_hash = match given(req.password) {
        Some(password) => {
            validate_password(&password)?;
            Some(hash_password(&password)?)
        }
        None => None,
    };

    let uid = user.id.to_string();
    let outcome = with_db(&state, move |db| {
        db.update_profile(
            &uid,
            &ProfilePatch {
                name: name.as_deref(),
                email: email.as_deref(),
                avatar: avatar.as_deref(),
                password_hash: password_hash.as_deref(),
            },
        )
    })
    .await?;

    match outcome {
        ProfileUpdate::Updated(row) => Ok(Json(account_response(row))),
        ProfileUpdate::EmailTaken => Err(ApiError::validation("Email already in use")),
        ProfileUpdate::NotFound => Err(USER_NOT_FOUND),
    }
}

pub async fn get_starred(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = user.id.to_string();
    let recipes = with_db(&state, move |db| {
        let rows = db.starred_recipes(&uid)?;
        hydrate_recipes(db, rows)
    })
    .await?;

    Ok(Json(recipes))
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let paging = PageRequest::parse(query.page.as_deref(), query.limit.as_deref(), DEFAULT_USER_PAGE_SIZE);

    let (rows, total) = with_db(&state, move |db| db.list_users(paging.limit, paging.offset())).await?;

    Ok(Json(UserListResponse {
        users: rows.into_iter().map(user_response).collect(),
        page: paging.page,
        pages: paging.page_count(total),
        total,
    }))
}

pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(admin): Extension<AuthUser>,
    JsonBody(req): JsonBody<UpdateRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let role = req.role;
    let uid = id.clone();
    let row = with_db(&state, move |db| match role {
        Some(role) => db.set_user_role(&uid, role),
        None => db.get_user_by_id(&uid),
    })
    .await?
    .ok_or(USER_NOT_FOUND)?;

    if let Some(role) = role {
        info!("{} set role of user {} to {}", admin.name, id, role);
    }

    let user = user_response(row);
    Ok(Json(RoleResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
    }))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(admin): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = id.clone();
    let exists = with_db(&state, move |db| Ok(db.get_user_by_id(&uid)?.is_some())).await?;
    if !exists {
        return Err(USER_NOT_FOUND);
    }
    if id == admin.id.to_string() {
        return Err(ApiError::validation("Cannot delete your own account"));
    }

    let uid = id.clone();
    if !with_db(&state, move |db| db.delete_user(&uid)).await? {
        return Err(USER_NOT_FOUND);
    }

    info!("{} deleted user {}", admin.name, id);
    Ok(Json(Notice::new("User removed successfully")))
}
