//! Database row types. These map directly to SQLite rows and stay distinct from
//! the recipebox-types API models to keep the DB layer independent.

use recipebox_types::api::Instruction;
use recipebox_types::models::{Category, Difficulty, MessageKind, Role};

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub avatar: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct NewUser<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
    pub avatar: Option<&'a str>,
}

/// Profile fields to overwrite; `None` leaves the column unchanged.
#[derive(Default)]
pub struct ProfilePatch<'a> {
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub avatar: Option<&'a str>,
    pub password_hash: Option<&'a str>,
}

pub enum ProfileUpdate {
    Updated(UserRow),
    NotFound,
    EmailTaken,
}

/// A recipe joined with its author's public fields. JSON columns are still
/// encoded; the author columns are `None` once the author has been deleted.
pub struct RecipeRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub ingredients: String,
    pub instructions: String,
    pub tags: String,
    pub prep_time: i64,
    pub cook_time: i64,
    pub servings: i64,
    pub difficulty: String,
    pub category: String,
    pub image: String,
    pub author_id: String,
    pub author_name: Option<String>,
    pub author_avatar: Option<String>,
    pub average_rating: f64,
    pub created_at: String,
    pub updated_at: String,
}

pub struct NewRecipe {
    pub id: String,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<Instruction>,
    pub tags: Vec<String>,
    pub prep_time: u32,
    pub cook_time: u32,
    pub servings: u32,
    pub difficulty: Difficulty,
    pub category: Category,
    pub image: String,
    pub author_id: String,
}

/// Editable recipe content. Likes, stars, reviews, rating and author are not
/// reachable from here.
#[derive(Default)]
pub struct RecipePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub instructions: Option<Vec<Instruction>>,
    pub tags: Option<Vec<String>>,
    pub prep_time: Option<u32>,
    pub cook_time: Option<u32>,
    pub servings: Option<u32>,
    pub difficulty: Option<Difficulty>,
    pub category: Option<Category>,
    pub image: Option<String>,
}

/// A recipe after a successful update.
pub struct RecipeUpdate {
    pub row: RecipeRow,
    /// The previous image, set only when the patch replaced it.
    pub replaced_image: Option<String>,
}

#[derive(Default)]
pub struct RecipeFilter {
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
    pub search: Option<String>,
}

/// One entry of a likes or stars set.
pub struct MembershipRow {
    pub recipe_id: String,
    pub user_id: String,
}

pub struct ReviewRow {
    pub id: String,
    pub recipe_id: String,
    pub user_id: String,
    pub user_name: Option<String>,
    pub user_avatar: Option<String>,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: String,
}

/// Result of flipping a user's membership in a likes/stars set.
#[derive(Debug, PartialEq)]
pub struct ToggleOutcome {
    /// Member user ids after the toggle, in the order they joined.
    pub members: Vec<String>,
    /// Whether the user is a member after the toggle.
    pub active: bool,
}

#[derive(Debug, PartialEq)]
pub enum ReviewOutcome {
    Added { average_rating: f64 },
    Duplicate,
    RecipeNotFound,
}

pub struct MessageRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub content: String,
    pub recipe_id: Option<String>,
    pub image: Option<String>,
    pub status: String,
    pub reply_content: Option<String>,
    pub replied_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct NewMessage<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub kind: MessageKind,
    pub title: &'a str,
    pub content: &'a str,
    pub recipe_id: Option<&'a str>,
    pub image: Option<&'a str>,
}
