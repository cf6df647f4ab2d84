use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Category, Difficulty, MessageKind, MessageStatus, Role};

// -- JWT Claims --

/// Bearer token payload. `role` is informational only; authorization always
/// re-reads the user's current role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize,
}

// -- Shared --

/// Plain `{ "message": ... }` body used for acknowledgements and errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// A referenced user resolved to the fields other users may see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub server: &'static str,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub token: String,
}

// -- Recipes --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub step: u32,
    pub text: String,
}

/// Instruction as submitted; a missing `step` is numbered by position.
#[derive(Debug, Clone, Deserialize)]
pub struct InstructionInput {
    pub step: Option<u32>,
    pub text: String,
}

/// Recipe fields accepted by create and update. Every field is optional here;
/// create enforces the required ones. Unknown keys such as `author` or
/// `averageRating` are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub instructions: Option<Vec<InstructionInput>>,
    pub prep_time: Option<u32>,
    pub cook_time: Option<u32>,
    pub servings: Option<u32>,
    pub difficulty: Option<Difficulty>,
    pub category: Option<Category>,
    pub tags: Option<Vec<String>>,
    pub image: Option<String>,
}

/// Raw listing query. Values are parsed leniently by the handler.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: Uuid,
    pub user: Option<Author>,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<Instruction>,
    pub prep_time: u32,
    pub cook_time: u32,
    pub servings: u32,
    pub difficulty: Difficulty,
    pub category: Category,
    pub tags: Vec<String>,
    pub image: String,
    pub author: Option<Author>,
    pub likes: Vec<Uuid>,
    pub stars: Vec<Uuid>,
    pub reviews: Vec<ReviewResponse>,
    pub average_rating: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeListResponse {
    pub recipes: Vec<RecipeResponse>,
    pub page: u32,
    pub pages: u64,
    pub total: u64,
}

/// Card-sized view of a recipe, embedded in a user's profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSummary {
    pub id: Uuid,
    pub title: String,
    pub image: String,
    pub prep_time: u32,
    pub cook_time: u32,
    pub difficulty: Difficulty,
    pub category: Category,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub likes: Vec<Uuid>,
    pub liked: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StarResponse {
    pub stars: Vec<Uuid>,
    pub starred: bool,
}

#[derive(Debug, Deserialize)]
pub struct AddReviewRequest {
    pub rating: i64,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddReviewResponse {
    pub message: String,
    pub average_rating: f64,
}

// -- Users --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub starred_recipes: Vec<RecipeSummary>,
    pub created_at: DateTime<Utc>,
}

/// Extra keys, such as a whole user object echoed back by a form, are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Option<Role>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoleResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub page: u32,
    pub pages: u64,
    pub total: u64,
}

// -- Messages --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(rename = "type")]
    pub kind: Option<MessageKind>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub recipe_id: Option<Uuid>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminReply {
    pub content: String,
    pub replied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: Uuid,
    pub user: Uuid,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub title: String,
    pub content: String,
    pub recipe: Option<Uuid>,
    pub image: Option<String>,
    pub status: MessageStatus,
    pub admin_reply: Option<AdminReply>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<MessageStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub content: Option<String>,
}
