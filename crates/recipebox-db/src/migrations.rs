use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                role        TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
                avatar      TEXT,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            -- author_id has no foreign key: recipes outlive their
            -- author and resolve the author to null.
            CREATE TABLE recipes (
                id              TEXT PRIMARY KEY,
                title           TEXT NOT NULL,
                description     TEXT NOT NULL,
                ingredients     TEXT NOT NULL DEFAULT '[]',
                instructions    TEXT NOT NULL DEFAULT '[]',
                tags            TEXT NOT NULL DEFAULT '[]',
                prep_time       INTEGER NOT NULL,
                cook_time       INTEGER NOT NULL,
                servings        INTEGER NOT NULL DEFAULT 4,
                difficulty      TEXT NOT NULL DEFAULT 'Medium',
                category        TEXT NOT NULL DEFAULT 'Dinner',
                image           TEXT NOT NULL,
                author_id       TEXT NOT NULL,
                average_rating  REAL NOT NULL DEFAULT 0 CHECK (average_rating BETWEEN 0 AND 5),
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_recipes_created ON recipes(created_at);
            CREATE INDEX idx_recipes_category ON recipes(category, created_at);

            CREATE TABLE recipe_likes (
                recipe_id   TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (recipe_id, user_id)
            );

            -- One row is both the recipe's star and the user's starred entry.
            CREATE TABLE recipe_stars (
                recipe_id   TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (recipe_id, user_id)
            );

            CREATE INDEX idx_recipe_stars_user ON recipe_stars(user_id, created_at);

            CREATE TABLE reviews (
                id          TEXT PRIMARY KEY,
                recipe_id   TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL,
                rating      INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
                comment     TEXT,
                created_at  TEXT NOT NULL,
                UNIQUE (recipe_id, user_id)
            );

            CREATE TABLE messages (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL,
                kind            TEXT NOT NULL,
                title           TEXT NOT NULL,
                content         TEXT NOT NULL,
                recipe_id       TEXT,
                image           TEXT,
                status          TEXT NOT NULL DEFAULT 'pending',
                reply_content   TEXT,
                replied_at      TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_messages_user ON messages(user_id, created_at);

            CREATE VIRTUAL TABLE recipe_search USING fts5(
                recipe_id UNINDEXED,
                title,
                description,
                tokenize = 'porter unicode61'
            );

            CREATE TRIGGER recipes_search_insert AFTER INSERT ON recipes BEGIN
                INSERT INTO recipe_search (recipe_id, title, description)
                    VALUES (new.id, new.title, new.description);
            END;

            CREATE TRIGGER recipes_search_update AFTER UPDATE OF title, description ON recipes BEGIN
                UPDATE recipe_search SET title = new.title, description = new.description
                    WHERE recipe_id = old.id;
            END;

            CREATE TRIGGER recipes_search_delete AFTER DELETE ON recipes BEGIN
                DELETE FROM recipe_search WHERE recipe_id = old.id;
            END;

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
