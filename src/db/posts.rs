//! Feed queries: posts, likes, comments.
//!
//! Denormalized counters (`likes_count`, `comments_count`, `shares_count`)
//! are maintained in the same transaction as the row that justifies them, so
//! a unique-violation on the like table can never leave the counter drifted.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{DbComment, DbError, DbPost, SocialDb};

fn map_post(row: &Row) -> rusqlite::Result<DbPost> {
    Ok(DbPost {
        id: row.get(0)?,
        author_id: row.get(1)?,
        content: row.get(2)?,
        image_url: row.get(3)?,
        likes_count: row.get(4)?,
        comments_count: row.get(5)?,
        shares_count: row.get(6)?,
        created_at: row.get(7)?,
    })
}

const POST_COLUMNS: &str =
    "id, author_id, content, image_url, likes_count, comments_count, shares_count, created_at";

impl SocialDb {
    pub fn insert_post(
        &self,
        author_id: &str,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<DbPost, DbError> {
        let post = DbPost {
            id: format!("post-{}", Uuid::new_v4()),
            author_id: author_id.to_string(),
            content: content.to_string(),
            image_url: image_url.map(|s| s.to_string()),
            likes_count: 0,
            comments_count: 0,
            shares_count: 0,
            created_at: Utc::now().to_rfc3339(),
        };
        self.conn.execute(
            "INSERT INTO posts (id, author_id, content, image_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                post.id,
                post.author_id,
                post.content,
                post.image_url,
                post.created_at
            ],
        )?;
        Ok(post)
    }

    pub fn get_post(&self, id: &str) -> Result<Option<DbPost>, DbError> {
        let post = self
            .conn
            .query_row(
                &format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS),
                [id],
                map_post,
            )
            .optional()?;
        Ok(post)
    }

    /// One page of the reverse-chronological feed. The caller appends pages;
    /// there is no windowing or cache eviction ("load more" semantics).
    pub fn feed_page(&self, page: usize, per_page: usize) -> Result<Vec<DbPost>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM posts ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
            POST_COLUMNS
        ))?;
        let rows = stmt.query_map(
            params![per_page as i64, (page * per_page) as i64],
            map_post,
        )?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn posts_by_author(&self, author_id: &str, limit: usize) -> Result<Vec<DbPost>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM posts WHERE author_id = ?1 ORDER BY created_at DESC LIMIT ?2",
            POST_COLUMNS
        ))?;
        let rows = stmt.query_map(params![author_id, limit as i64], map_post)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Record a like. Returns false if this profile already liked the post
    /// (the counter is untouched in that case).
    pub fn like_post(&self, post_id: &str, profile_id: &str) -> Result<bool, DbError> {
        self.with_transaction(|db| {
            let inserted = db.conn.execute(
                "INSERT OR IGNORE INTO post_likes (post_id, profile_id, created_at)
                 VALUES (?1, ?2, ?3)",
                params![post_id, profile_id, Utc::now().to_rfc3339()],
            )?;
            if inserted == 0 {
                return Ok(false);
            }
            db.conn.execute(
                "UPDATE posts SET likes_count = likes_count + 1 WHERE id = ?1",
                [post_id],
            )?;
            Ok(true)
        })
    }

    /// Remove a like. Returns false if there was nothing to remove.
    pub fn unlike_post(&self, post_id: &str, profile_id: &str) -> Result<bool, DbError> {
        self.with_transaction(|db| {
            let removed = db.conn.execute(
                "DELETE FROM post_likes WHERE post_id = ?1 AND profile_id = ?2",
                params![post_id, profile_id],
            )?;
            if removed == 0 {
                return Ok(false);
            }
            db.conn.execute(
                "UPDATE posts SET likes_count = MAX(likes_count - 1, 0) WHERE id = ?1",
                [post_id],
            )?;
            Ok(true)
        })
    }

    pub fn has_liked(&self, post_id: &str, profile_id: &str) -> Result<bool, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM post_likes WHERE post_id = ?1 AND profile_id = ?2")?;
        Ok(stmt.exists(params![post_id, profile_id])?)
    }

    pub fn insert_comment(
        &self,
        post_id: &str,
        author_id: &str,
        content: &str,
    ) -> Result<DbComment, DbError> {
        let comment = DbComment {
            id: format!("cmt-{}", Uuid::new_v4()),
            post_id: post_id.to_string(),
            author_id: author_id.to_string(),
            content: content.to_string(),
            created_at: Utc::now().to_rfc3339(),
        };
        self.with_transaction(|db| {
            db.conn.execute(
                "INSERT INTO post_comments (id, post_id, author_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    comment.id,
                    comment.post_id,
                    comment.author_id,
                    comment.content,
                    comment.created_at
                ],
            )?;
            db.conn.execute(
                "UPDATE posts SET comments_count = comments_count + 1 WHERE id = ?1",
                [post_id],
            )?;
            Ok::<(), DbError>(())
        })?;
        Ok(comment)
    }

    pub fn comments_for_post(&self, post_id: &str) -> Result<Vec<DbComment>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, post_id, author_id, content, created_at
             FROM post_comments WHERE post_id = ?1 ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map([post_id], |row| {
            Ok(DbComment {
                id: row.get(0)?,
                post_id: row.get(1)?,
                author_id: row.get(2)?,
                content: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Bump the share counter (share itself happens outside the store).
    pub fn increment_shares(&self, post_id: &str) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE posts SET shares_count = shares_count + 1 WHERE id = ?1",
            [post_id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_utils::{seed_profile, test_db};

    #[test]
    fn test_insert_and_page_feed() {
        let db = test_db();
        seed_profile(&db, "u1", "Dr. Asha Rao");

        for i in 0..5 {
            db.insert_post("u1", &format!("post {}", i), None)
                .expect("insert");
        }

        let first = db.feed_page(0, 2).expect("page 0");
        assert_eq!(first.len(), 2);
        let second = db.feed_page(1, 2).expect("page 1");
        assert_eq!(second.len(), 2);
        assert_ne!(first[0].id, second[0].id);

        let tail = db.feed_page(2, 2).expect("page 2");
        assert_eq!(tail.len(), 1);
    }

    #[test]
    fn test_like_is_unique_per_profile() {
        let db = test_db();
        seed_profile(&db, "u1", "Dr. Asha Rao");
        seed_profile(&db, "u2", "Dr. Ben Okafor");
        let post = db.insert_post("u1", "hello", None).expect("insert");

        assert!(db.like_post(&post.id, "u2").expect("like"));
        assert!(!db.like_post(&post.id, "u2").expect("double like is a no-op"));

        let reloaded = db.get_post(&post.id).expect("get").unwrap();
        assert_eq!(reloaded.likes_count, 1);
        assert!(db.has_liked(&post.id, "u2").expect("has_liked"));
    }

    #[test]
    fn test_unlike_never_goes_negative() {
        let db = test_db();
        seed_profile(&db, "u1", "Dr. Asha Rao");
        let post = db.insert_post("u1", "hello", None).expect("insert");

        assert!(!db.unlike_post(&post.id, "u1").expect("nothing to remove"));
        db.like_post(&post.id, "u1").expect("like");
        assert!(db.unlike_post(&post.id, "u1").expect("unlike"));

        let reloaded = db.get_post(&post.id).expect("get").unwrap();
        assert_eq!(reloaded.likes_count, 0);
    }

    #[test]
    fn test_comment_bumps_counter() {
        let db = test_db();
        seed_profile(&db, "u1", "Dr. Asha Rao");
        let post = db.insert_post("u1", "hello", None).expect("insert");

        db.insert_comment(&post.id, "u1", "first").expect("comment");
        db.insert_comment(&post.id, "u1", "second").expect("comment");

        let comments = db.comments_for_post(&post.id).expect("list");
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].content, "first");

        let reloaded = db.get_post(&post.id).expect("get").unwrap();
        assert_eq!(reloaded.comments_count, 2);
    }
}
