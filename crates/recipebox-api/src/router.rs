use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{StatusCode, Uri},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};

use recipebox_types::api::{HealthResponse, Notice};

use crate::middleware::{require_admin, require_auth};
use crate::policy::Access;
use crate::state::AppState;
use crate::uploads::MAX_IMAGE_SIZE;
use crate::{auth, messages, recipes, users};

/// Room for the form fields that travel alongside a recipe image.
const RECIPE_BODY_LIMIT: usize = MAX_IMAGE_SIZE + 1024 * 1024;

/// Every `/api` route, grouped by the access level it demands.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/recipes", get(recipes::list_recipes))
        .route("/api/recipes/{id}", get(recipes::get_recipe))
        .route("/api/recipes/{id}/reviews", get(recipes::get_reviews));

    let member_routes = Router::new()
        .route("/api/recipes/{id}/like", post(recipes::toggle_like))
        .route("/api/recipes/{id}/star", post(recipes::toggle_star))
        .route("/api/recipes/{id}/reviews", post(recipes::add_review))
        .route("/api/users/profile", get(users::get_profile).put(users::update_profile))
        .route("/api/users/starred", get(users::get_starred))
        .route("/api/messages", post(messages::send_message))
        .route("/api/messages/my-messages", get(messages::my_messages));

    let admin_routes = Router::new()
        .route("/api/recipes", post(recipes::create_recipe))
        .route(
            "/api/recipes/{id}",
            put(recipes::update_recipe).delete(recipes::delete_recipe),
        )
        .route("/api/users", get(users::list_users))
        .route("/api/users/{id}/role", put(users::update_role))
        .route("/api/users/{id}", delete(users::delete_user))
        .route("/api/messages", get(messages::all_messages))
        .route(
            "/api/messages/{id}",
            get(messages::get_message).delete(messages::delete_message),
        )
        .route("/api/messages/{id}/status", put(messages::update_status))
        .route("/api/messages/{id}/reply", post(messages::reply))
        .layer(DefaultBodyLimit::max(RECIPE_BODY_LIMIT));

    Router::new()
        .merge(guarded(&state, Access::Public, public_routes))
        .merge(guarded(&state, Access::Authenticated, member_routes))
        .merge(guarded(&state, Access::Admin, admin_routes))
        .fallback(not_found)
        .with_state(state)
}

/// Wraps a route group in the middleware its access level needs.
/// Layers run outside-in, so `require_auth` is added last.
fn guarded(state: &AppState, access: Access, routes: Router<AppState>) -> Router<AppState> {
    match access {
        Access::Public => routes,
        Access::Authenticated => {
            routes.layer(middleware::from_fn_with_state(state.clone(), require_auth))
        }
        Access::Admin => routes
            .layer(middleware::from_fn(require_admin))
            .layer(middleware::from_fn_with_state(state.clone(), require_auth)),
    }
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "OK",
        timestamp: chrono::Utc::now(),
        server: "Recipe API",
    })
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(Notice::new(format!("Not found - {}", uri.path()))),
    )
}
