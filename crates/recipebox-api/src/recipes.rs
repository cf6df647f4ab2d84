use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use recipebox_db::{NewRecipe, RecipeFilter, RecipePatch, ReviewOutcome};
use recipebox_types::api::{
    AddReviewRequest, AddReviewResponse, Instruction, InstructionInput, LikeResponse, Notice,
    RecipeInput, RecipeListQuery, RecipeListResponse, StarResponse,
};
use recipebox_types::paging::PageRequest;

use crate::convert::{hydrate_recipe, hydrate_recipes, ids, review_response};
use crate::error::{ApiError, JsonBody};
use crate::policy::AuthUser;
use crate::state::{AppState, with_db};
use crate::uploads::{self, RecipeForm};

pub const DEFAULT_PAGE_SIZE: u32 = 12;
pub const DEFAULT_RECIPE_IMAGE: &str = "/uploads/recipe-placeholder.jpg";
pub const DEFAULT_SERVINGS: u32 = 4;

const MAX_TITLE_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 500;

const RECIPE_NOT_FOUND: ApiError = ApiError::NotFound("Recipe not found");

pub async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<RecipeListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let paging = PageRequest::parse(query.page.as_deref(), query.limit.as_deref(), DEFAULT_PAGE_SIZE);
    let filter = RecipeFilter {
        category: parse_filter(query.category.as_deref())?,
        difficulty: parse_filter(query.difficulty.as_deref())?,
        search: query.search.filter(|s| !s.trim().is_empty()),
    };

    let (recipes, total) = with_db(&state, move |db| {
        let (rows, total) = db.list_recipes(&filter, paging.limit, paging.offset())?;
        Ok((hydrate_recipes(db, rows)?, total))
    })
    .await?;

    Ok(Json(RecipeListResponse {
        recipes,
        page: paging.page,
        pages: paging.page_count(total),
        total,
    }))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let recipe = with_db(&state, move |db| {
        db.get_recipe(&id)?.map(|row| hydrate_recipe(db, row)).transpose()
    })
    .await?
    .ok_or(RECIPE_NOT_FOUND)?;

    Ok(Json(recipe))
}

pub async fn get_reviews(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let reviews = with_db(&state, move |db| {
        if db.get_recipe(&id)?.is_none() {
            return Ok(None);
        }
        Ok(Some(db.reviews_for_recipes(&[id])?))
    })
    .await?
    .ok_or(RECIPE_NOT_FOUND)?;

    Ok(Json(reviews.into_iter().map(review_response).collect::<Vec<_>>()))
}

pub async fn create_recipe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    form: RecipeForm,
) -> Result<impl IntoResponse, ApiError> {
    let mut recipe = new_recipe(form.input, user.id)?;

    let uploaded = match &form.image {
        Some(image) => Some(image.save(&state.upload_dir).await?),
        None => None,
    };
    if let Some(path) = &uploaded {
        recipe.image = path.clone();
    }

    let result = with_db(&state, move |db| {
        let row = db.insert_recipe(&recipe)?;
        hydrate_recipe(db, row)
    })
    .await;

    match result {
        Ok(created) => {
            info!("Recipe '{}' ({}) created by {}", created.title, created.id, user.name);
            Ok((StatusCode::CREATED, Json(created)))
        }
        Err(e) => {
            if let Some(path) = uploaded {
                uploads::discard(&state.upload_dir, &path).await;
            }
            Err(e)
        }
    }
}

pub async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    form: RecipeForm,
) -> Result<impl IntoResponse, ApiError> {
    let mut patch = recipe_patch(form.input)?;

    let uploaded = match &form.image {
        Some(image) => Some(image.save(&state.upload_dir).await?),
        None => None,
    };
    if let Some(path) = &uploaded {
        patch.image = Some(path.clone());
    }

    let result = with_db(&state, move |db| {
        let Some(update) = db.update_recipe(&id, &patch)? else {
            return Ok(None);
        };
        let stale = match update.replaced_image {
            Some(old) if !db.image_in_use(&old)? => Some(old),
            _ => None,
        };
        Ok(Some((hydrate_recipe(db, update.row)?, stale)))
    })
    .await;

    match result {
        Ok(Some((updated, stale))) => {
            if let Some(old) = stale {
                release_image(&state, &old).await;
            }
            Ok(Json(updated))
        }
        other => {
            if let Some(path) = uploaded {
                uploads::discard(&state.upload_dir, &path).await;
            }
            match other {
                Err(e) => Err(e),
                _ => Err(RECIPE_NOT_FOUND),
            }
        }
    }
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let rid = id.clone();
    let image = with_db(&state, move |db| {
        let Some(image) = db.delete_recipe(&rid)? else {
            return Ok(None);
        };
        let in_use = db.image_in_use(&image)?;
        Ok(Some((!in_use).then_some(image)))
    })
    .await?
    .ok_or(RECIPE_NOT_FOUND)?;

    if let Some(image) = image {
        release_image(&state, &image).await;
    }

    info!("Recipe {} deleted", id);
    Ok(Json(Notice::new("Recipe removed")))
}

/// Removes an uploaded image nothing points at any more. The shared
/// placeholder stays.
async fn release_image(state: &AppState, image: &str) {
    if image != DEFAULT_RECIPE_IMAGE {
        uploads::discard(&state.upload_dir, image).await;
    }
}

pub async fn toggle_like(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = user.id.to_string();
    let outcome = with_db(&state, move |db| db.toggle_like(&id, &uid))
        .await?
        .ok_or(RECIPE_NOT_FOUND)?;

    Ok(Json(LikeResponse {
        likes: ids(outcome.members),
        liked: outcome.active,
    }))
}

pub async fn toggle_star(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = user.id.to_string();
    let outcome = with_db(&state, move |db| db.toggle_star(&id, &uid))
        .await?
        .ok_or(RECIPE_NOT_FOUND)?;

    Ok(Json(StarResponse {
        stars: ids(outcome.members),
        starred: outcome.active,
    }))
}

pub async fn add_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<AddReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let rating = u8::try_from(req.rating)
        .ok()
        .filter(|r| (1..=5).contains(r))
        .ok_or_else(|| ApiError::validation("Rating must be a whole number between 1 and 5"))?;
    let comment = req.comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());

    let review_id = Uuid::new_v4().to_string();
    let uid = user.id.to_string();
    let outcome = with_db(&state, move |db| {
        db.add_review(&review_id, &id, &uid, rating, comment.as_deref())
    })
    .await?;

    match outcome {
        ReviewOutcome::Added { average_rating } => Ok((
            StatusCode::CREATED,
            Json(AddReviewResponse {
                message: "Review added successfully".into(),
                average_rating,
            }),
        )),
        ReviewOutcome::Duplicate => Err(ApiError::validation("You have already reviewed this recipe")),
        ReviewOutcome::RecipeNotFound => Err(RECIPE_NOT_FOUND),
    }
}

// -- Validation --

fn parse_filter<T>(raw: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => value.parse().map(Some).map_err(|e: T::Err| ApiError::validation(e.to_string())),
        None => Ok(None),
    }
}

fn new_recipe(input: RecipeInput, author: Uuid) -> Result<NewRecipe, ApiError> {
    let title = input.title.ok_or_else(|| ApiError::validation("Please add a recipe title"))?;
    let description = input
        .description
        .ok_or_else(|| ApiError::validation("Please add a description"))?;
    let prep_time = input.prep_time.ok_or_else(|| ApiError::validation("Please add a prep time"))?;
    let cook_time = input.cook_time.ok_or_else(|| ApiError::validation("Please add a cook time"))?;

    Ok(NewRecipe {
        id: Uuid::new_v4().to_string(),
        title: validate_title(&title)?,
        description: validate_description(&description)?,
        ingredients: validate_ingredients(input.ingredients.unwrap_or_default())?,
        instructions: number_instructions(input.instructions.unwrap_or_default())?,
        tags: clean_tags(input.tags.unwrap_or_default()),
        prep_time,
        cook_time,
        servings: validate_servings(input.servings.unwrap_or(DEFAULT_SERVINGS))?,
        difficulty: input.difficulty.unwrap_or_default(),
        category: input.category.unwrap_or_default(),
        image: validate_image(input.image)?.unwrap_or_else(|| DEFAULT_RECIPE_IMAGE.to_string()),
        author_id: author.to_string(),
    })
}

fn recipe_patch(input: RecipeInput) -> Result<RecipePatch, ApiError> {
    Ok(RecipePatch {
        title: input.title.as_deref().map(validate_title).transpose()?,
        description: input.description.as_deref().map(validate_description).transpose()?,
        ingredients: input.ingredients.map(validate_ingredients).transpose()?,
        instructions: input.instructions.map(number_instructions).transpose()?,
        tags: input.tags.map(clean_tags),
        prep_time: input.prep_time,
        cook_time: input.cook_time,
        servings: input.servings.map(validate_servings).transpose()?,
        difficulty: input.difficulty,
        category: input.category,
        image: validate_image(input.image)?,
    })
}

fn validate_title(title: &str) -> Result<String, ApiError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::validation("Please add a recipe title"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::validation("Title cannot exceed 100 characters"));
    }
    Ok(title.to_string())
}

fn validate_description(description: &str) -> Result<String, ApiError> {
    if description.trim().is_empty() {
        return Err(ApiError::validation("Please add a description"));
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ApiError::validation("Description cannot exceed 500 characters"));
    }
    Ok(description.to_string())
}

fn validate_ingredients(ingredients: Vec<String>) -> Result<Vec<String>, ApiError> {
    ingredients
        .into_iter()
        .map(|i| {
            let i = i.trim();
            if i.is_empty() {
                Err(ApiError::validation("Ingredients cannot be empty"))
            } else {
                Ok(i.to_string())
            }
        })
        .collect()
}

/// Steps without an explicit number take their 1-based position.
fn number_instructions(steps: Vec<InstructionInput>) -> Result<Vec<Instruction>, ApiError> {
    steps
        .into_iter()
        .enumerate()
        .map(|(i, s)| {
            let text = s.text.trim();
            if text.is_empty() {
                return Err(ApiError::validation("Instruction text cannot be empty"));
            }
            Ok(Instruction {
                step: s.step.unwrap_or(i as u32 + 1),
                text: text.to_string(),
            })
        })
        .collect()
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn validate_servings(servings: u32) -> Result<u32, ApiError> {
    if servings == 0 {
        return Err(ApiError::validation("Servings must be at least 1"));
    }
    Ok(servings)
}

fn validate_image(image: Option<String>) -> Result<Option<String>, ApiError> {
    match image.map(|i| i.trim().to_string()) {
        Some(i) if i.is_empty() => Ok(None),
        other => Ok(other),
    }
}
