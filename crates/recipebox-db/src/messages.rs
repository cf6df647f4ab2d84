use anyhow::Result;
use recipebox_types::models::MessageStatus;
use rusqlite::{Connection, Row};

use crate::models::{MessageRow, NewMessage};
use crate::{Database, OptionalExt, now_timestamp};

const MESSAGE_SELECT: &str = "SELECT id, user_id, kind, title, content, recipe_id, image, status,
        reply_content, replied_at, created_at, updated_at
     FROM messages";

impl Database {
    pub fn insert_message(&self, message: &NewMessage<'_>) -> Result<MessageRow> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO messages (id, user_id, kind, title, content, recipe_id, image, status,
                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                rusqlite::params![
                    message.id,
                    message.user_id,
                    message.kind.as_str(),
                    message.title,
                    message.content,
                    message.recipe_id,
                    message.image,
                    MessageStatus::Pending.as_str(),
                    now_timestamp(),
                ],
            )?;
            query_message(tx, message.id)?
                .ok_or_else(|| anyhow::anyhow!("Message {} vanished after insert", message.id))
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| query_message(conn, id))
    }

    /// Messages sent by one user, newest first.
    pub fn messages_for_user(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{MESSAGE_SELECT} WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt
                .query_map([user_id], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// The whole inbox, newest first.
    pub fn all_messages(&self) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("{MESSAGE_SELECT} ORDER BY created_at DESC, rowid DESC"))?;
            let rows = stmt
                .query_map([], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Sets the status without any transition check; every status is
    /// reachable from every other.
    pub fn set_message_status(&self, id: &str, status: MessageStatus) -> Result<Option<MessageRow>> {
        self.with_tx(|tx| {
            let updated = tx.execute(
                "UPDATE messages SET status = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![id, status.as_str(), now_timestamp()],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            query_message(tx, id)
        })
    }

    /// Attaches the admin reply and moves the message to `replied` in one
    /// statement.
    pub fn reply_to_message(&self, id: &str, content: &str) -> Result<Option<MessageRow>> {
        self.with_tx(|tx| {
            let now = now_timestamp();
            let updated = tx.execute(
                "UPDATE messages
                 SET reply_content = ?2, replied_at = ?3, status = ?4, updated_at = ?3
                 WHERE id = ?1",
                rusqlite::params![id, content, now, MessageStatus::Replied.as_str()],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            query_message(tx, id)
        })
    }

    pub fn delete_message(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }
}

fn query_message(conn: &Connection, id: &str) -> Result<Option<MessageRow>> {
    let mut stmt = conn.prepare(&format!("{MESSAGE_SELECT} WHERE id = ?1"))?;
    stmt.query_row([id], map_message).optional()
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        recipe_id: row.get(5)?,
        image: row.get(6)?,
        status: row.get(7)?,
        reply_content: row.get(8)?,
        replied_at: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{db, user};
    use recipebox_types::models::MessageKind;

    fn send(db: &Database, user_id: &str, title: &str) -> MessageRow {
        let id = uuid::Uuid::new_v4().to_string();
        db.insert_message(&NewMessage {
            id: &id,
            user_id,
            kind: MessageKind::Question,
            title,
            content: "How long do I rest the dough?",
            recipe_id: None,
            image: None,
        })
        .unwrap()
    }

    #[test]
    fn new_messages_are_pending() {
        let db = db();
        let ana = user(&db, "ana");
        let row = send(&db, &ana, "Dough");
        assert_eq!(row.status, "pending");
        assert_eq!(row.kind, "question");
        assert!(row.reply_content.is_none());
    }

    #[test]
    fn inbox_views_are_newest_first() {
        let db = db();
        let ana = user(&db, "ana");
        let ben = user(&db, "ben");
        send(&db, &ana, "one");
        send(&db, &ben, "two");
        send(&db, &ana, "three");

        let mine: Vec<_> = db.messages_for_user(&ana).unwrap().into_iter().map(|m| m.title).collect();
        assert_eq!(mine, ["three", "one"]);
        assert_eq!(db.all_messages().unwrap().len(), 3);
    }

    #[test]
    fn status_is_unconstrained() {
        let db = db();
        let ana = user(&db, "ana");
        let row = send(&db, &ana, "any");

        let archived = db.set_message_status(&row.id, MessageStatus::Archived).unwrap().unwrap();
        assert_eq!(archived.status, "archived");
        let back = db.set_message_status(&row.id, MessageStatus::Pending).unwrap().unwrap();
        assert_eq!(back.status, "pending");
        assert!(db.set_message_status("missing", MessageStatus::Read).unwrap().is_none());
    }

    #[test]
    fn reply_sets_content_time_and_status_together() {
        let db = db();
        let ana = user(&db, "ana");
        let row = send(&db, &ana, "help");

        let replied = db.reply_to_message(&row.id, "Thirty minutes").unwrap().unwrap();
        assert_eq!(replied.status, "replied");
        assert_eq!(replied.reply_content.as_deref(), Some("Thirty minutes"));
        assert_eq!(replied.replied_at.as_deref(), Some(replied.updated_at.as_str()));

        assert!(db.delete_message(&row.id).unwrap());
        assert!(db.get_message(&row.id).unwrap().is_none());
        assert!(db.reply_to_message(&row.id, "late").unwrap().is_none());
    }
}
