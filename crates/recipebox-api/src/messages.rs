use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use recipebox_db::NewMessage;
use recipebox_types::api::{
    MessageResponse, Notice, ReplyRequest, SendMessageRequest, UpdateStatusRequest,
};

use crate::convert::message_response;
use crate::error::{ApiError, JsonBody};
use crate::policy::AuthUser;
use crate::state::{AppState, with_db};

pub const MAX_MESSAGE_TITLE_LEN: usize = 100;
pub const MAX_MESSAGE_CONTENT_LEN: usize = 1000;

const MESSAGE_NOT_FOUND: ApiError = ApiError::NotFound("Message not found");

pub async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

    let kind = req.kind.unwrap_or_default();
    let title = non_empty(req.title).unwrap_or_else(|| "No title".to_string());
    let content = non_empty(req.content).unwrap_or_else(|| "No content".to_string());
    let image = non_empty(req.image);

    if title.chars().count() > MAX_MESSAGE_TITLE_LEN {
        return Err(ApiError::validation("Title cannot exceed 100 characters"));
    }
    if content.chars().count() > MAX_MESSAGE_CONTENT_LEN {
        return Err(ApiError::validation("Content cannot exceed 1000 characters"));
    }

    let id = Uuid::new_v4().to_string();
    let uid = user.id.to_string();
    let recipe_id = req.recipe_id.map(|r| r.to_string());
    let row = with_db(&state, move |db| {
        db.insert_message(&NewMessage {
            id: &id,
            user_id: &uid,
            kind,
            title: &title,
            content: &content,
            recipe_id: recipe_id.as_deref(),
            image: image.as_deref(),
        })
    })
    .await?;

    Ok((StatusCode::CREATED, Json(message_response(row))))
}

pub async fn my_messages(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = user.id.to_string();
    let rows = with_db(&state, move |db| db.messages_for_user(&uid)).await?;
    Ok(Json(rows.into_iter().map(message_response).collect::<Vec<MessageResponse>>()))
}

pub async fn all_messages(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = with_db(&state, |db| db.all_messages()).await?;
    Ok(Json(rows.into_iter().map(message_response).collect::<Vec<MessageResponse>>()))
}

pub async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let row = with_db(&state, move |db| db.get_message(&id))
        .await?
        .ok_or(MESSAGE_NOT_FOUND)?;
    Ok(Json(message_response(row)))
}

/// Any status may be set from any status; an absent status leaves the
/// message as it is.
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = with_db(&state, move |db| match req.status {
        Some(status) => db.set_message_status(&id, status),
        None => db.get_message(&id),
    })
    .await?
    .ok_or(MESSAGE_NOT_FOUND)?;
    Ok(Json(message_response(row)))
}

pub async fn reply(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(admin): Extension<AuthUser>,
    JsonBody(req): JsonBody<ReplyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req
        .content
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::validation("Reply content is required"))?;
    if content.chars().count() > MAX_MESSAGE_CONTENT_LEN {
        return Err(ApiError::validation("Content cannot exceed 1000 characters"));
    }

    let mid = id.clone();
    let row = with_db(&state, move |db| db.reply_to_message(&mid, &content))
        .await?
        .ok_or(MESSAGE_NOT_FOUND)?;

    info!("{} replied to message {}", admin.name, id);
    Ok(Json(message_response(row)))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !with_db(&state, move |db| db.delete_message(&id)).await? {
        return Err(MESSAGE_NOT_FOUND);
    }
    Ok(Json(Notice::new("Message deleted successfully")))
}

#[cfg(test)]
mod tests {
    use crate::test_support::TestApp;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn send_applies_defaults() {
        let app = TestApp::new();
        let (ana, ana_id) = app.user("Ana");

        let (status, msg) = app.call(Method::POST, "/api/messages", Some(&ana), Some(json!({}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(msg["type"], "suggestion");
        assert_eq!(msg["title"], "No title");
        assert_eq!(msg["content"], "No content");
        assert_eq!(msg["status"], "pending");
        assert_eq!(msg["user"], ana_id.to_string());
        assert_eq!(msg["adminReply"], json!(null));

        let long = json!({ "title": "t".repeat(101) });
        let (status, _) = app.call(Method::POST, "/api/messages", Some(&ana), Some(long)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app.call(Method::POST, "/api/messages", Some(&ana), Some(json!({ "type": "rant" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn users_see_only_their_own_messages() {
        let app = TestApp::new();
        let (admin, _) = app.admin("Chef");
        let (ana, _) = app.user("Ana");
        let (ben, _) = app.user("Ben");

        for (token, title) in [(&ana, "first"), (&ben, "other"), (&ana, "second")] {
            app.call(Method::POST, "/api/messages", Some(token), Some(json!({ "title": title, "type": "question" })))
                .await;
        }

        let (_, mine) = app.call(Method::GET, "/api/messages/my-messages", Some(&ana), None).await;
        let titles: Vec<_> = mine.as_array().unwrap().iter().map(|m| m["title"].clone()).collect();
        assert_eq!(titles, [json!("second"), json!("first")]);

        let (status, _) = app.call(Method::GET, "/api/messages", Some(&ana), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, all) = app.call(Method::GET, "/api/messages", Some(&admin), None).await;
        assert_eq!(all.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn admin_lifecycle() {
        let app = TestApp::new();
        let (admin, _) = app.admin("Chef");
        let (ana, _) = app.user("Ana");

        let (_, msg) = app
            .call(Method::POST, "/api/messages", Some(&ana), Some(json!({ "title": "Salt?", "content": "How much?" })))
            .await;
        let uri = format!("/api/messages/{}", msg["id"].as_str().unwrap());

        let (status, read) = app
            .call(Method::PUT, &format!("{uri}/status"), Some(&admin), Some(json!({ "status": "read" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(read["status"], "read");

        let (status, _) = app
            .call(Method::PUT, &format!("{uri}/status"), Some(&admin), Some(json!({ "status": "done" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app.call(Method::POST, &format!("{uri}/reply"), Some(&admin), Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, replied) = app
            .call(Method::POST, &format!("{uri}/reply"), Some(&admin), Some(json!({ "content": "A pinch" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(replied["status"], "replied");
        assert_eq!(replied["adminReply"]["content"], "A pinch");
        assert!(replied["adminReply"]["repliedAt"].is_string());

        // Unconstrained: an admin can move a replied message back to pending.
        let (_, reset) = app
            .call(Method::PUT, &format!("{uri}/status"), Some(&admin), Some(json!({ "status": "pending" })))
            .await;
        assert_eq!(reset["status"], "pending");

        let (_, fetched) = app.call(Method::GET, &uri, Some(&admin), None).await;
        assert_eq!(fetched["title"], "Salt?");

        let (status, body) = app.call(Method::DELETE, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Message deleted successfully");

        let (status, body) = app.call(Method::GET, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Message not found");
    }
}
