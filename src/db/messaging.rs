//! Messaging queries: conversations, participants, messages, read receipts.
//!
//! `messages.read_by` is a JSON array of profile ids. SQL-side membership
//! checks use `instr` against the quoted id, which is safe because ids are
//! uuid-derived and never contain quotes.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{DbConversation, DbError, DbMessage, SocialDb};
use crate::types::ConversationType;

fn map_conversation(row: &Row) -> rusqlite::Result<DbConversation> {
    Ok(DbConversation {
        id: row.get(0)?,
        conversation_type: ConversationType::from_str_lossy(&row.get::<_, String>(1)?),
        title: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn map_message(row: &Row) -> rusqlite::Result<DbMessage> {
    Ok(DbMessage {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_id: row.get(2)?,
        content: row.get(3)?,
        encryption_level: row.get(4)?,
        read_by: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender_id, content, encryption_level, read_by, created_at";

impl SocialDb {
    /// Create a conversation with its participant rows in one transaction.
    pub fn insert_conversation(
        &self,
        conversation_type: ConversationType,
        title: Option<&str>,
        participant_ids: &[&str],
    ) -> Result<DbConversation, DbError> {
        let conversation = DbConversation {
            id: format!("conv-{}", Uuid::new_v4()),
            conversation_type,
            title: title.map(|s| s.to_string()),
            created_at: Utc::now().to_rfc3339(),
        };
        self.with_transaction(|db| {
            db.conn.execute(
                "INSERT INTO conversations (id, conversation_type, title, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    conversation.id,
                    conversation.conversation_type.as_str(),
                    conversation.title,
                    conversation.created_at
                ],
            )?;
            for pid in participant_ids {
                db.conn.execute(
                    "INSERT INTO conversation_participants (conversation_id, profile_id, joined_at)
                     VALUES (?1, ?2, ?3)",
                    params![conversation.id, pid, conversation.created_at],
                )?;
            }
            Ok::<(), DbError>(())
        })?;
        Ok(conversation)
    }

    pub fn get_conversation(&self, id: &str) -> Result<Option<DbConversation>, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, conversation_type, title, created_at
                 FROM conversations WHERE id = ?1",
                [id],
                map_conversation,
            )
            .optional()?;
        Ok(row)
    }

    /// The existing direct conversation between exactly these two profiles,
    /// if any. Keeps `start_direct_conversation` idempotent per pair.
    pub fn find_direct_conversation(
        &self,
        a: &str,
        b: &str,
    ) -> Result<Option<DbConversation>, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT c.id, c.conversation_type, c.title, c.created_at
                 FROM conversations c
                 WHERE c.conversation_type = 'direct'
                   AND EXISTS (SELECT 1 FROM conversation_participants
                               WHERE conversation_id = c.id AND profile_id = ?1)
                   AND EXISTS (SELECT 1 FROM conversation_participants
                               WHERE conversation_id = c.id AND profile_id = ?2)
                 LIMIT 1",
                params![a, b],
                map_conversation,
            )
            .optional()?;
        Ok(row)
    }

    /// Conversations the user participates in, most recent activity first.
    pub fn conversations_for(&self, user_id: &str) -> Result<Vec<DbConversation>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.conversation_type, c.title, c.created_at
             FROM conversations c
             INNER JOIN conversation_participants cp ON cp.conversation_id = c.id
             WHERE cp.profile_id = ?1
             ORDER BY COALESCE(
                 (SELECT MAX(m.created_at) FROM messages m WHERE m.conversation_id = c.id),
                 c.created_at
             ) DESC",
        )?;
        let rows = stmt.query_map([user_id], map_conversation)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn conversation_participants(&self, conversation_id: &str) -> Result<Vec<String>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT profile_id FROM conversation_participants
             WHERE conversation_id = ?1 ORDER BY joined_at ASC",
        )?;
        let rows = stmt.query_map([conversation_id], |row| row.get(0))?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn is_participant(&self, conversation_id: &str, user_id: &str) -> Result<bool, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT 1 FROM conversation_participants
             WHERE conversation_id = ?1 AND profile_id = ?2",
        )?;
        Ok(stmt.exists(params![conversation_id, user_id])?)
    }

    /// Append a message. The sender has trivially read their own message.
    pub fn insert_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        content: &str,
        encryption_level: &str,
    ) -> Result<DbMessage, DbError> {
        let message = DbMessage {
            id: format!("msg-{}", Uuid::new_v4()),
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            content: content.to_string(),
            encryption_level: encryption_level.to_string(),
            read_by: serde_json::to_string(&[sender_id]).unwrap_or_else(|_| "[]".to_string()),
            created_at: Utc::now().to_rfc3339(),
        };
        self.conn.execute(
            "INSERT INTO messages
                (id, conversation_id, sender_id, content, encryption_level, read_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                message.id,
                message.conversation_id,
                message.sender_id,
                message.content,
                message.encryption_level,
                message.read_by,
                message.created_at
            ],
        )?;
        Ok(message)
    }

    /// One page of messages, oldest-first. `before` (an RFC 3339 timestamp)
    /// pages backward through history.
    pub fn messages_page(
        &self,
        conversation_id: &str,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<DbMessage>, DbError> {
        let cutoff = before.unwrap_or("\u{10FFFF}");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM (
                 SELECT {} FROM messages
                 WHERE conversation_id = ?1 AND created_at < ?2
                 ORDER BY created_at DESC LIMIT ?3
             ) ORDER BY created_at ASC",
            MESSAGE_COLUMNS, MESSAGE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![conversation_id, cutoff, limit as i64], map_message)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn last_message(&self, conversation_id: &str) -> Result<Option<DbMessage>, DbError> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM messages WHERE conversation_id = ?1
                     ORDER BY created_at DESC LIMIT 1",
                    MESSAGE_COLUMNS
                ),
                [conversation_id],
                map_message,
            )
            .optional()?;
        Ok(row)
    }

    /// Messages in the conversation the reader hasn't seen.
    pub fn unread_count(&self, conversation_id: &str, reader_id: &str) -> Result<i64, DbError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM messages
             WHERE conversation_id = ?1
               AND sender_id != ?2
               AND instr(read_by, '\"' || ?2 || '\"') = 0",
            params![conversation_id, reader_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Add the reader to `read_by` on every message they haven't read.
    /// Returns how many messages were marked.
    pub fn mark_messages_read(
        &self,
        conversation_id: &str,
        reader_id: &str,
    ) -> Result<usize, DbError> {
        let unread: Vec<(String, String)> = {
            let mut stmt = self.conn.prepare(
                "SELECT id, read_by FROM messages
                 WHERE conversation_id = ?1
                   AND sender_id != ?2
                   AND instr(read_by, '\"' || ?2 || '\"') = 0",
            )?;
            let mapped = stmt.query_map(params![conversation_id, reader_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            let mut items = Vec::new();
            for row in mapped {
                items.push(row?);
            }
            items
        };

        for (id, read_by) in &unread {
            let mut readers: Vec<String> = serde_json::from_str(read_by).unwrap_or_default();
            readers.push(reader_id.to_string());
            let updated =
                serde_json::to_string(&readers).unwrap_or_else(|_| read_by.to_string());
            self.conn.execute(
                "UPDATE messages SET read_by = ?2 WHERE id = ?1",
                params![id, updated],
            )?;
        }
        Ok(unread.len())
    }
}
