use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{Connection, Row};

use crate::models::{
    MembershipRow, NewRecipe, RecipeFilter, RecipePatch, RecipeRow, RecipeUpdate, ReviewOutcome,
    ReviewRow, ToggleOutcome,
};
use crate::{Database, OptionalExt, now_timestamp, placeholders};

// JOIN users to fetch the author's public fields in a single query
const RECIPE_SELECT: &str = "SELECT r.id, r.title, r.description, r.ingredients, r.instructions, r.tags,
        r.prep_time, r.cook_time, r.servings, r.difficulty, r.category, r.image,
        r.author_id, u.name, u.avatar, r.average_rating, r.created_at, r.updated_at
     FROM recipes r
     LEFT JOIN users u ON r.author_id = u.id";

/// The two membership sets a user can toggle on a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Membership {
    Likes,
    Stars,
}

impl Membership {
    fn table(self) -> &'static str {
        match self {
            Membership::Likes => "recipe_likes",
            Membership::Stars => "recipe_stars",
        }
    }
}

impl Database {
    // -- Recipes --

    pub fn insert_recipe(&self, recipe: &NewRecipe) -> Result<RecipeRow> {
        let ingredients = serde_json::to_string(&recipe.ingredients)?;
        let instructions = serde_json::to_string(&recipe.instructions)?;
        let tags = serde_json::to_string(&recipe.tags)?;

        self.with_tx(|tx| {
            let now = now_timestamp();
            tx.execute(
                "INSERT INTO recipes (id, title, description, ingredients, instructions, tags,
                    prep_time, cook_time, servings, difficulty, category, image, author_id,
                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
                rusqlite::params![
                    recipe.id,
                    recipe.title,
                    recipe.description,
                    ingredients,
                    instructions,
                    tags,
                    recipe.prep_time,
                    recipe.cook_time,
                    recipe.servings,
                    recipe.difficulty.as_str(),
                    recipe.category.as_str(),
                    recipe.image,
                    recipe.author_id,
                    now,
                ],
            )?;
            query_recipe(tx, &recipe.id)?
                .ok_or_else(|| anyhow::anyhow!("Recipe {} vanished after insert", recipe.id))
        })
    }

    pub fn get_recipe(&self, id: &str) -> Result<Option<RecipeRow>> {
        self.with_conn(|conn| query_recipe(conn, id))
    }

    /// Overwrites the fields set in `patch` in a single UPDATE. Returns the
    /// updated row and any image it replaced, or `None` if the recipe does
    /// not exist.
    pub fn update_recipe(&self, id: &str, patch: &RecipePatch) -> Result<Option<RecipeUpdate>> {
        let ingredients = patch.ingredients.as_ref().map(serde_json::to_string).transpose()?;
        let instructions = patch.instructions.as_ref().map(serde_json::to_string).transpose()?;
        let tags = patch.tags.as_ref().map(serde_json::to_string).transpose()?;

        self.with_tx(|tx| {
            let Some(previous_image) = tx
                .query_row("SELECT image FROM recipes WHERE id = ?1", [id], |r| r.get::<_, String>(0))
                .optional()?
            else {
                return Ok(None);
            };

            tx.execute(
                "UPDATE recipes SET
                    title = COALESCE(?2, title),
                    description = COALESCE(?3, description),
                    ingredients = COALESCE(?4, ingredients),
                    instructions = COALESCE(?5, instructions),
                    tags = COALESCE(?6, tags),
                    prep_time = COALESCE(?7, prep_time),
                    cook_time = COALESCE(?8, cook_time),
                    servings = COALESCE(?9, servings),
                    difficulty = COALESCE(?10, difficulty),
                    category = COALESCE(?11, category),
                    image = COALESCE(?12, image),
                    updated_at = ?13
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    patch.title,
                    patch.description,
                    ingredients,
                    instructions,
                    tags,
                    patch.prep_time,
                    patch.cook_time,
                    patch.servings,
                    patch.difficulty.map(|d| d.as_str()),
                    patch.category.map(|c| c.as_str()),
                    patch.image,
                    now_timestamp(),
                ],
            )?;

            let row = query_recipe(tx, id)?
                .ok_or_else(|| anyhow::anyhow!("Recipe {} vanished during update", id))?;
            let replaced_image = (row.image != previous_image).then_some(previous_image);
            Ok(Some(RecipeUpdate { row, replaced_image }))
        })
    }

    /// Deletes the recipe together with its likes, stars and reviews.
    /// Returns the deleted recipe's image, or `None` if it did not exist.
    pub fn delete_recipe(&self, id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row("DELETE FROM recipes WHERE id = ?1 RETURNING image", [id], |r| r.get(0))
                .optional()
        })
    }

    /// Whether any recipe still points at `image`.
    pub fn image_in_use(&self, image: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let used: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM recipes WHERE image = ?1)",
                [image],
                |r| r.get(0),
            )?;
            Ok(used)
        })
    }

    /// Newest-first page of recipes matching every filter that is set, plus
    /// the total number of matches.
    pub fn list_recipes(
        &self,
        filter: &RecipeFilter,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<RecipeRow>, u64)> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(category) = filter.category {
            params.push(Value::Text(category.as_str().to_string()));
            clauses.push("r.category = ?");
        }
        if let Some(difficulty) = filter.difficulty {
            params.push(Value::Text(difficulty.as_str().to_string()));
            clauses.push("r.difficulty = ?");
        }
        if let Some(expr) = filter.search.as_deref().and_then(match_expression) {
            params.push(Value::Text(expr));
            clauses.push("r.id IN (SELECT recipe_id FROM recipe_search WHERE recipe_search MATCH ?)");
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM recipes r{where_sql}"),
                rusqlite::params_from_iter(params.iter()),
                |r| r.get(0),
            )?;

            let mut page_params = params.clone();
            page_params.push(Value::Integer(limit as i64));
            page_params.push(Value::Integer(offset as i64));

            let mut stmt = conn.prepare(&format!(
                "{RECIPE_SELECT}{where_sql} ORDER BY r.created_at DESC, r.rowid DESC LIMIT ? OFFSET ?"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(page_params.iter()), map_recipe)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((rows, total as u64))
        })
    }

    /// Recipes the user has starred, most recently starred first.
    pub fn starred_recipes(&self, user_id: &str) -> Result<Vec<RecipeRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{RECIPE_SELECT}
                 JOIN recipe_stars s ON s.recipe_id = r.id
                 WHERE s.user_id = ?1
                 ORDER BY s.created_at DESC, s.rowid DESC"
            ))?;
            let rows = stmt
                .query_map([user_id], map_recipe)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Likes / stars --

    /// Flips the user's like on a recipe. `None` if the recipe does not exist.
    pub fn toggle_like(&self, recipe_id: &str, user_id: &str) -> Result<Option<ToggleOutcome>> {
        self.toggle_membership(Membership::Likes, recipe_id, user_id)
    }

    /// Flips the user's star on a recipe. The same row backs the recipe's
    /// `stars` set and the user's starred list, so both change together.
    pub fn toggle_star(&self, recipe_id: &str, user_id: &str) -> Result<Option<ToggleOutcome>> {
        self.toggle_membership(Membership::Stars, recipe_id, user_id)
    }

    fn toggle_membership(
        &self,
        set: Membership,
        recipe_id: &str,
        user_id: &str,
    ) -> Result<Option<ToggleOutcome>> {
        let table = set.table();
        self.with_tx(|tx| {
            if !recipe_exists(tx, recipe_id)? {
                return Ok(None);
            }

            let removed = tx.execute(
                &format!("DELETE FROM {table} WHERE recipe_id = ?1 AND user_id = ?2"),
                [recipe_id, user_id],
            )?;
            if removed == 0 {
                tx.execute(
                    &format!("INSERT INTO {table} (recipe_id, user_id, created_at) VALUES (?1, ?2, ?3)"),
                    rusqlite::params![recipe_id, user_id, now_timestamp()],
                )?;
            }

            let members = query_members(tx, table, &[recipe_id.to_string()])?
                .into_iter()
                .map(|m| m.user_id)
                .collect();
            Ok(Some(ToggleOutcome {
                members,
                active: removed == 0,
            }))
        })
    }

    /// Batch-fetch likes for a set of recipe ids.
    pub fn likes_for_recipes(&self, recipe_ids: &[String]) -> Result<Vec<MembershipRow>> {
        self.with_conn(|conn| query_members(conn, Membership::Likes.table(), recipe_ids))
    }

    /// Batch-fetch stars for a set of recipe ids.
    pub fn stars_for_recipes(&self, recipe_ids: &[String]) -> Result<Vec<MembershipRow>> {
        self.with_conn(|conn| query_members(conn, Membership::Stars.table(), recipe_ids))
    }

    // -- Reviews --

    /// Adds the user's review and recomputes the recipe's average from every
    /// review it has, all in one transaction. A second review by the same user
    /// changes nothing.
    pub fn add_review(
        &self,
        id: &str,
        recipe_id: &str,
        user_id: &str,
        rating: u8,
        comment: Option<&str>,
    ) -> Result<ReviewOutcome> {
        self.with_tx(|tx| {
            if !recipe_exists(tx, recipe_id)? {
                return Ok(ReviewOutcome::RecipeNotFound);
            }

            let inserted = tx.execute(
                "INSERT INTO reviews (id, recipe_id, user_id, rating, comment, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (recipe_id, user_id) DO NOTHING",
                rusqlite::params![id, recipe_id, user_id, rating, comment, now_timestamp()],
            )?;
            if inserted == 0 {
                return Ok(ReviewOutcome::Duplicate);
            }

            let average_rating: f64 = tx.query_row(
                "SELECT COALESCE(AVG(rating), 0.0) FROM reviews WHERE recipe_id = ?1",
                [recipe_id],
                |r| r.get(0),
            )?;
            tx.execute(
                "UPDATE recipes SET average_rating = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![recipe_id, average_rating, now_timestamp()],
            )?;

            Ok(ReviewOutcome::Added { average_rating })
        })
    }

    /// Batch-fetch reviews (oldest first) with their authors for a set of recipe ids.
    pub fn reviews_for_recipes(&self, recipe_ids: &[String]) -> Result<Vec<ReviewRow>> {
        if recipe_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT v.id, v.recipe_id, v.user_id, u.name, u.avatar, v.rating, v.comment, v.created_at
                 FROM reviews v
                 LEFT JOIN users u ON v.user_id = u.id
                 WHERE v.recipe_id IN ({})
                 ORDER BY v.created_at, v.rowid",
                placeholders(recipe_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(recipe_ids.iter()), |row| {
                    Ok(ReviewRow {
                        id: row.get(0)?,
                        recipe_id: row.get(1)?,
                        user_id: row.get(2)?,
                        user_name: row.get(3)?,
                        user_avatar: row.get(4)?,
                        rating: row.get(5)?,
                        comment: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

/// Turns free text into an FTS5 query matching any of its words, the way a
/// document-store text search does. `None` when there is nothing to search for.
pub fn match_expression(search: &str) -> Option<String> {
    let terms: Vec<String> = search
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

fn recipe_exists(conn: &Connection, id: &str) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM recipes WHERE id = ?1", [id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn query_recipe(conn: &Connection, id: &str) -> Result<Option<RecipeRow>> {
    let mut stmt = conn.prepare(&format!("{RECIPE_SELECT} WHERE r.id = ?1"))?;
    stmt.query_row([id], map_recipe).optional()
}

fn query_members(conn: &Connection, table: &str, recipe_ids: &[String]) -> Result<Vec<MembershipRow>> {
    if recipe_ids.is_empty() {
        return Ok(vec![]);
    }

    let sql = format!(
        "SELECT recipe_id, user_id FROM {table} WHERE recipe_id IN ({}) ORDER BY created_at, rowid",
        placeholders(recipe_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(recipe_ids.iter()), |row| {
            Ok(MembershipRow {
                recipe_id: row.get(0)?,
                user_id: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_recipe(row: &Row<'_>) -> rusqlite::Result<RecipeRow> {
    Ok(RecipeRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        ingredients: row.get(3)?,
        instructions: row.get(4)?,
        tags: row.get(5)?,
        prep_time: row.get(6)?,
        cook_time: row.get(7)?,
        servings: row.get(8)?,
        difficulty: row.get(9)?,
        category: row.get(10)?,
        image: row.get(11)?,
        author_id: row.get(12)?,
        author_name: row.get(13)?,
        author_avatar: row.get(14)?,
        average_rating: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{db, user};
    use recipebox_types::api::Instruction;
    use recipebox_types::models::{Category, Difficulty};

    fn recipe(db: &Database, author: &str, title: &str, category: Category) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        db.insert_recipe(&NewRecipe {
            id: id.clone(),
            title: title.to_string(),
            description: format!("{title} for the whole family"),
            ingredients: vec!["salt".into()],
            instructions: vec![Instruction { step: 1, text: "Cook".into() }],
            tags: vec![],
            prep_time: 10,
            cook_time: 20,
            servings: 4,
            difficulty: Difficulty::Medium,
            category,
            image: "/placeholder.jpg".into(),
            author_id: author.to_string(),
        })
        .unwrap();
        id
    }

    fn review(db: &Database, recipe_id: &str, user_id: &str, rating: u8) -> ReviewOutcome {
        db.add_review(&uuid::Uuid::new_v4().to_string(), recipe_id, user_id, rating, None)
            .unwrap()
    }

    fn average(db: &Database, recipe_id: &str) -> f64 {
        db.get_recipe(recipe_id).unwrap().unwrap().average_rating
    }

    #[test]
    fn insert_resolves_author_and_encodes_lists() {
        let db = db();
        let author = user(&db, "chef");
        let id = recipe(&db, &author, "Pancakes", Category::Breakfast);

        let row = db.get_recipe(&id).unwrap().unwrap();
        assert_eq!(row.author_name.as_deref(), Some("chef"));
        assert_eq!(row.ingredients, r#"["salt"]"#);
        assert_eq!(row.average_rating, 0.0);
    }

    #[test]
    fn average_rating_follows_reviews() {
        let db = db();
        let author = user(&db, "chef");
        let ana = user(&db, "ana");
        let ben = user(&db, "ben");
        let id = recipe(&db, &author, "Soup", Category::Dinner);

        assert_eq!(average(&db, &id), 0.0);
        assert_eq!(review(&db, &id, &ana, 4), ReviewOutcome::Added { average_rating: 4.0 });
        assert_eq!(review(&db, &id, &ben, 2), ReviewOutcome::Added { average_rating: 3.0 });
        assert_eq!(review(&db, &id, &ana, 5), ReviewOutcome::Duplicate);
        assert_eq!(average(&db, &id), 3.0);
        assert_eq!(db.reviews_for_recipes(&[id.clone()]).unwrap().len(), 2);
    }

    #[test]
    fn review_on_missing_recipe() {
        let db = db();
        let ana = user(&db, "ana");
        assert_eq!(review(&db, "nope", &ana, 3), ReviewOutcome::RecipeNotFound);
    }

    #[test]
    fn like_toggle_twice_restores_set() {
        let db = db();
        let author = user(&db, "chef");
        let ana = user(&db, "ana");
        let ben = user(&db, "ben");
        let id = recipe(&db, &author, "Salad", Category::Lunch);

        let first = db.toggle_like(&id, &ben).unwrap().unwrap();
        assert_eq!(first.members, vec![ben.clone()]);

        let liked = db.toggle_like(&id, &ana).unwrap().unwrap();
        assert!(liked.active);
        assert_eq!(liked.members, vec![ben.clone(), ana.clone()]);

        let unliked = db.toggle_like(&id, &ana).unwrap().unwrap();
        assert!(!unliked.active);
        assert_eq!(unliked.members, first.members);

        assert!(db.toggle_like("missing", &ana).unwrap().is_none());
    }

    #[test]
    fn star_updates_users_starred_list_once() {
        let db = db();
        let author = user(&db, "chef");
        let ana = user(&db, "ana");
        let id = recipe(&db, &author, "Cake", Category::Dessert);

        let starred = db.toggle_star(&id, &ana).unwrap().unwrap();
        assert!(starred.active);
        assert_eq!(db.starred_recipes(&ana).unwrap().len(), 1);

        let unstarred = db.toggle_star(&id, &ana).unwrap().unwrap();
        assert!(!unstarred.active);
        assert!(unstarred.members.is_empty());
        assert!(db.starred_recipes(&ana).unwrap().is_empty());
    }

    #[test]
    fn deleting_user_drops_their_likes_and_stars() {
        let db = db();
        let author = user(&db, "chef");
        let ana = user(&db, "ana");
        let id = recipe(&db, &author, "Stew", Category::Dinner);
        db.toggle_like(&id, &ana).unwrap();
        db.toggle_star(&id, &ana).unwrap();
        review(&db, &id, &ana, 5);

        assert!(db.delete_user(&ana).unwrap());
        assert!(db.likes_for_recipes(&[id.clone()]).unwrap().is_empty());
        assert!(db.stars_for_recipes(&[id.clone()]).unwrap().is_empty());

        let reviews = db.reviews_for_recipes(&[id.clone()]).unwrap();
        assert_eq!(reviews.len(), 1);
        assert!(reviews[0].user_name.is_none());
        assert_eq!(average(&db, &id), 5.0);
    }

    #[test]
    fn concurrent_toggles_and_reviews_lose_nothing() {
        const COOKS: usize = 16;

        let db = std::sync::Arc::new(db());
        let author = user(&db, "chef");
        let id = recipe(&db, &author, "Stew", Category::Dinner);
        let cooks: Vec<(String, u8)> = (0..COOKS)
            .map(|i| (user(&db, &format!("cook{i}")), (i % 5) as u8 + 1))
            .collect();

        let handles: Vec<_> = cooks
            .iter()
            .cloned()
            .map(|(uid, rating)| {
                let db = std::sync::Arc::clone(&db);
                let id = id.clone();
                std::thread::spawn(move || {
                    assert!(db.toggle_like(&id, &uid).unwrap().unwrap().active);
                    assert!(db.toggle_star(&id, &uid).unwrap().unwrap().active);
                    review(&db, &id, &uid, rating)
                })
            })
            .collect();
        for handle in handles {
            assert!(matches!(handle.join().unwrap(), ReviewOutcome::Added { .. }));
        }

        let ids = [id.clone()];
        assert_eq!(db.likes_for_recipes(&ids).unwrap().len(), COOKS);
        assert_eq!(db.stars_for_recipes(&ids).unwrap().len(), COOKS);
        assert_eq!(db.reviews_for_recipes(&ids).unwrap().len(), COOKS);

        let expected = cooks.iter().map(|(_, r)| *r as f64).sum::<f64>() / COOKS as f64;
        assert!((average(&db, &id) - expected).abs() < 1e-9);
    }

    #[test]
    fn delete_recipe_cascades() {
        let db = db();
        let author = user(&db, "chef");
        let ana = user(&db, "ana");
        let id = recipe(&db, &author, "Pie", Category::Dessert);
        db.toggle_star(&id, &ana).unwrap();
        review(&db, &id, &ana, 4);

        assert_eq!(db.delete_recipe(&id).unwrap().as_deref(), Some("/placeholder.jpg"));
        assert!(db.delete_recipe(&id).unwrap().is_none());
        assert!(!db.image_in_use("/placeholder.jpg").unwrap());
        assert!(db.starred_recipes(&ana).unwrap().is_empty());
        assert!(db.reviews_for_recipes(&[id]).unwrap().is_empty());
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let db = db();
        let author = user(&db, "chef");
        let id = recipe(&db, &author, "Toast", Category::Breakfast);

        let patch = RecipePatch {
            title: Some("French Toast".into()),
            tags: Some(vec!["sweet".into()]),
            difficulty: Some(Difficulty::Easy),
            ..Default::default()
        };
        let update = db.update_recipe(&id, &patch).unwrap().unwrap();
        assert!(update.replaced_image.is_none());
        let row = update.row;
        assert_eq!(row.title, "French Toast");
        assert_eq!(row.tags, r#"["sweet"]"#);
        assert_eq!(row.difficulty, "Easy");
        assert_eq!(row.category, "Breakfast");
        assert_eq!(row.author_id, author);

        assert!(db.update_recipe("missing", &patch).unwrap().is_none());

        let new_image = RecipePatch { image: Some("/uploads/toast.png".into()), ..Default::default() };
        let update = db.update_recipe(&id, &new_image).unwrap().unwrap();
        assert_eq!(update.row.image, "/uploads/toast.png");
        assert_eq!(update.replaced_image.as_deref(), Some("/placeholder.jpg"));

        // Re-sending the current image is not a replacement.
        let update = db.update_recipe(&id, &new_image).unwrap().unwrap();
        assert!(update.replaced_image.is_none());
    }

    #[test]
    fn listing_filters_searches_and_pages() {
        let db = db();
        let author = user(&db, "chef");
        recipe(&db, &author, "Chocolate Cake", Category::Dessert);
        recipe(&db, &author, "Lemon Tart", Category::Dessert);
        recipe(&db, &author, "Beef Stew", Category::Dinner);

        let (all, total) = db.list_recipes(&RecipeFilter::default(), 2, 0).unwrap();
        assert_eq!(total, 3);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "Beef Stew");

        let (beyond, total) = db.list_recipes(&RecipeFilter::default(), 2, 4).unwrap();
        assert!(beyond.is_empty());
        assert_eq!(total, 3);

        let desserts = RecipeFilter { category: Some(Category::Dessert), ..Default::default() };
        let (rows, total) = db.list_recipes(&desserts, 12, 0).unwrap();
        assert_eq!(total, 2);
        assert!(rows.iter().all(|r| r.category == "Dessert"));

        let search = RecipeFilter {
            category: Some(Category::Dessert),
            search: Some("cakes".into()),
            ..Default::default()
        };
        let (rows, total) = db.list_recipes(&search, 12, 0).unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].title, "Chocolate Cake");

        let nothing = RecipeFilter { search: Some("pizza".into()), ..Default::default() };
        let (rows, total) = db.list_recipes(&nothing, 12, 0).unwrap();
        assert!(rows.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn search_index_follows_title_updates() {
        let db = db();
        let author = user(&db, "chef");
        let id = recipe(&db, &author, "Omelette", Category::Breakfast);

        let patch = RecipePatch {
            title: Some("Frittata".into()),
            description: Some("Baked eggs".into()),
            ..Default::default()
        };
        db.update_recipe(&id, &patch).unwrap();

        let by_new = RecipeFilter { search: Some("frittata".into()), ..Default::default() };
        assert_eq!(db.list_recipes(&by_new, 12, 0).unwrap().1, 1);
        let by_old = RecipeFilter { search: Some("omelette".into()), ..Default::default() };
        assert_eq!(db.list_recipes(&by_old, 12, 0).unwrap().1, 0);
    }

    #[test]
    fn match_expression_quotes_words() {
        assert_eq!(match_expression("beef stew").as_deref(), Some(r#""beef" OR "stew""#));
        assert_eq!(match_expression("\"quoted\" AND-NOT").as_deref(), Some(r#""quoted" OR "AND" OR "NOT""#));
        assert_eq!(match_expression("  ** "), None);
    }
}
