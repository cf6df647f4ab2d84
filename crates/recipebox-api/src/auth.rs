use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand_core::OsRng;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use recipebox_db::{Database, NewUser, UserRow};
use recipebox_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};
use recipebox_types::models::Role;

use crate::error::{ApiError, JsonBody};
use crate::state::{AppState, with_db};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_NAME_LEN: usize = 50;

pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = validate_name(&req.name)?;
    let email = normalize_email(&req.email)?;
    validate_password(&req.password)?;

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    let id = user_id.to_string();
    let row = with_db(&state, move |db| {
        db.create_user(&NewUser {
            id: &id,
            name: &name,
            email: &email,
            password_hash: &password_hash,
            role: Role::User,
            avatar: None,
        })
    })
    .await?
    .ok_or_else(|| ApiError::validation("User already exists"))?;

    info!("Registered user {}", row.email);
    let response = auth_response(&state, row)?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    const INVALID: ApiError = ApiError::Unauthorized("Invalid email or password");

    let email = req.email.trim().to_lowercase();
    let user = with_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or(INVALID)?;

    if !verify_password(&req.password, &user.password)? {
        return Err(INVALID);
    }

    Ok(Json(auth_response(&state, user)?))
}

fn auth_response(state: &AppState, row: UserRow) -> Result<AuthResponse, ApiError> {
    let id: Uuid = row.id.parse().map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?;
    let role: Role = row.role.parse().map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?;
    let token = create_token(&state.jwt_secret, id, role)?;

    Ok(AuthResponse {
        id,
        name: row.name,
        email: row.email,
        role,
        avatar: row.avatar,
        token,
    })
}

pub fn create_token(secret: &str, user_id: Uuid, role: Role) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        role,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Hash with Argon2id.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))
}

fn verify_password(password: &str, stored_hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored password hash unreadable: {}", e)))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

pub(crate) fn validate_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("Please add a name"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::validation(format!(
            "Name cannot exceed {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

pub(crate) fn normalize_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !valid {
        return Err(ApiError::validation("Please add a valid email"));
    }
    Ok(email)
}

pub(crate) fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Creates an admin account unless the email is already registered.
/// Returns whether an account was created.
pub fn bootstrap_admin(db: &Database, name: &str, email: &str, password: &str) -> anyhow::Result<bool> {
    let email = normalize_email(email).map_err(|e| anyhow::anyhow!("admin email: {}", e))?;
    validate_password(password).map_err(|e| anyhow::anyhow!("admin password: {}", e))?;

    if let Some(existing) = db.get_user_by_email(&email)? {
        info!("Admin bootstrap skipped: {} already exists (role {})", existing.email, existing.role);
        return Ok(false);
    }

    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!("{}", e))?;
    let id = Uuid::new_v4().to_string();
    let created = db.create_user(&NewUser {
        id: &id,
        name,
        email: &email,
        password_hash: &password_hash,
        role: Role::Admin,
        avatar: None,
    })?;

    if created.is_some() {
        info!("Admin user {} created", email);
    }
    Ok(created.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestApp;
    use axum::http::Method;
    use serde_json::json;

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Ana@Example.COM ").unwrap(), "ana@example.com");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("a@b@c.com").is_err());
        assert!(normalize_email("ana@").is_err());
        assert_eq!(normalize_email("Admin@LocalHost").unwrap(), "admin@localhost");
    }

    #[test]
    fn short_password_rejected() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn bootstrap_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        assert!(bootstrap_admin(&db, "Recipe Admin", "admin@recipes.test", "secret-pass").unwrap());
        assert!(!bootstrap_admin(&db, "Recipe Admin", "ADMIN@recipes.test", "secret-pass").unwrap());

        let row = db.get_user_by_email("admin@recipes.test").unwrap().unwrap();
        assert_eq!(row.role, "admin");

        assert!(bootstrap_admin(&db, "Local Admin", "admin@localhost", "secret-pass").unwrap());
    }

    #[tokio::test]
    async fn register_then_login() {
        let app = TestApp::new();
        let body = json!({ "name": "Ana", "email": "Ana@Example.com", "password": "hunter22" });

        let (status, created) = app.call(Method::POST, "/api/auth/register", None, Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["email"], "ana@example.com");
        assert_eq!(created["role"], "user");

        let (status, dup) = app.call(Method::POST, "/api/auth/register", None, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(dup["message"], "User already exists");

        let login = json!({ "email": "ana@example.com", "password": "hunter22" });
        let (status, session) = app.call(Method::POST, "/api/auth/login", None, Some(login)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["id"], created["id"]);

        let token = session["token"].as_str().unwrap();
        let (status, _) = app.call(Method::GET, "/api/users/profile", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);

        let wrong = json!({ "email": "ana@example.com", "password": "wrong-pass" });
        let (status, body) = app.call(Method::POST, "/api/auth/login", None, Some(wrong)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid email or password");
    }
}
