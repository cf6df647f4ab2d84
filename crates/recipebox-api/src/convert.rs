//! Row-to-response mapping. Stored values that fail to parse are logged and
//! replaced with defaults rather than failing the whole request.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tracing::warn;
use uuid::Uuid;

use recipebox_db::{Database, MessageRow, RecipeRow, ReviewRow, UserRow};
use recipebox_types::api::{
    AccountResponse, AdminReply, Author, MessageResponse, RecipeResponse, RecipeSummary,
    ReviewResponse, UserResponse,
};

pub(crate) fn parse_id(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub(crate) fn parse_time(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

fn parse_enum<T: FromStr + Default>(raw: &str) -> T
where
    T::Err: std::fmt::Display,
{
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt enum value: {}", e);
        T::default()
    })
}

fn parse_json_list<T: DeserializeOwned>(raw: &str, what: &str) -> Vec<T> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Corrupt {} column '{}': {}", what, raw, e);
        Vec::new()
    })
}

fn author(id: &str, name: Option<String>, avatar: Option<String>) -> Option<Author> {
    name.map(|name| Author {
        id: parse_id(id, "user id"),
        name,
        avatar,
    })
}

pub(crate) fn user_response(row: UserRow) -> UserResponse {
    UserResponse {
        id: parse_id(&row.id, "user id"),
        role: parse_enum(&row.role),
        created_at: parse_time(&row.created_at),
        name: row.name,
        email: row.email,
        avatar: row.avatar,
    }
}

pub(crate) fn account_response(row: UserRow) -> AccountResponse {
    let user = user_response(row);
    AccountResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        avatar: user.avatar,
    }
}

pub(crate) fn review_response(row: ReviewRow) -> ReviewResponse {
    ReviewResponse {
        id: parse_id(&row.id, "review id"),
        user: author(&row.user_id, row.user_name, row.user_avatar),
        rating: row.rating.clamp(1, 5) as u8,
        comment: row.comment,
        created_at: parse_time(&row.created_at),
    }
}

pub(crate) fn recipe_summary(row: &RecipeRow) -> RecipeSummary {
    RecipeSummary {
        id: parse_id(&row.id, "recipe id"),
        title: row.title.clone(),
        image: row.image.clone(),
        prep_time: row.prep_time.max(0) as u32,
        cook_time: row.cook_time.max(0) as u32,
        difficulty: parse_enum(&row.difficulty),
        category: parse_enum(&row.category),
    }
}

/// Builds full recipe responses, batch-loading likes, stars and reviews for
/// every row in three queries. Call from inside `with_db`.
pub(crate) fn hydrate_recipes(db: &Database, rows: Vec<RecipeRow>) -> anyhow::Result<Vec<RecipeResponse>> {
    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();

    let mut likes: HashMap<String, Vec<Uuid>> = HashMap::new();
    for m in db.likes_for_recipes(&ids)? {
        likes.entry(m.recipe_id).or_default().push(parse_id(&m.user_id, "user id"));
    }
    let mut stars: HashMap<String, Vec<Uuid>> = HashMap::new();
    for m in db.stars_for_recipes(&ids)? {
        stars.entry(m.recipe_id).or_default().push(parse_id(&m.user_id, "user id"));
    }
    let mut reviews: HashMap<String, Vec<ReviewResponse>> = HashMap::new();
    for r in db.reviews_for_recipes(&ids)? {
        reviews.entry(r.recipe_id.clone()).or_default().push(review_response(r));
    }

    Ok(rows
        .into_iter()
        .map(|row| RecipeResponse {
            id: parse_id(&row.id, "recipe id"),
            ingredients: parse_json_list(&row.ingredients, "ingredients"),
            instructions: parse_json_list(&row.instructions, "instructions"),
            tags: parse_json_list(&row.tags, "tags"),
            prep_time: row.prep_time.max(0) as u32,
            cook_time: row.cook_time.max(0) as u32,
            servings: row.servings.max(0) as u32,
            difficulty: parse_enum(&row.difficulty),
            category: parse_enum(&row.category),
            author: author(&row.author_id, row.author_name, row.author_avatar),
            likes: likes.remove(&row.id).unwrap_or_default(),
            stars: stars.remove(&row.id).unwrap_or_default(),
            reviews: reviews.remove(&row.id).unwrap_or_default(),
            average_rating: row.average_rating,
            created_at: parse_time(&row.created_at),
            updated_at: parse_time(&row.updated_at),
            title: row.title,
            description: row.description,
            image: row.image,
        })
        .collect())
}

pub(crate) fn hydrate_recipe(db: &Database, row: RecipeRow) -> anyhow::Result<RecipeResponse> {
    hydrate_recipes(db, vec![row])?
        .pop()
        .ok_or_else(|| anyhow::anyhow!("hydrating one recipe produced none"))
}

pub(crate) fn message_response(row: MessageRow) -> MessageResponse {
    let admin_reply = match (row.reply_content, row.replied_at) {
        (Some(content), Some(replied_at)) => Some(AdminReply {
            content,
            replied_at: parse_time(&replied_at),
        }),
        _ => None,
    };

    MessageResponse {
        id: parse_id(&row.id, "message id"),
        user: parse_id(&row.user_id, "user id"),
        kind: parse_enum(&row.kind),
        title: row.title,
        content: row.content,
        recipe: row.recipe_id.as_deref().map(|id| parse_id(id, "recipe id")),
        image: row.image,
        status: parse_enum(&row.status),
        admin_reply,
        created_at: parse_time(&row.created_at),
        updated_at: parse_time(&row.updated_at),
    }
}

pub(crate) fn ids(raw: Vec<String>) -> Vec<Uuid> {
    raw.iter().map(|id| parse_id(id, "user id")).collect()
}
