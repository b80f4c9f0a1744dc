//! Credential storage for local accounts.

use rusqlite::{params, OptionalExtension, Row};

use crate::db::{DbAuthUser, DbError, SocialDb};

fn map_auth_user(row: &Row) -> rusqlite::Result<DbAuthUser> {
    Ok(DbAuthUser {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        salt: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl SocialDb {
    pub fn insert_auth_user(&self, user: &DbAuthUser) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO auth_users (id, email, password_hash, salt, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id,
                user.email,
                user.password_hash,
                user.salt,
                user.created_at
            ],
        )?;
        Ok(())
    }

    /// Lookup is case-insensitive; the column collates NOCASE.
    pub fn get_auth_user_by_email(&self, email: &str) -> Result<Option<DbAuthUser>, DbError> {
        let user = self
            .conn
            .query_row(
                "SELECT id, email, password_hash, salt, created_at
                 FROM auth_users WHERE email = ?1",
                [email],
                map_auth_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn email_taken(&self, email: &str) -> Result<bool, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM auth_users WHERE email = ?1")?;
        Ok(stmt.exists([email])?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::db::test_utils::test_db;
    use crate::db::DbAuthUser;

    #[test]
    fn test_email_lookup_is_case_insensitive() {
        let db = test_db();
        db.insert_auth_user(&DbAuthUser {
            id: "u1".into(),
            email: "Asha@Example.org".into(),
            password_hash: "hash".into(),
            salt: "salt".into(),
            created_at: Utc::now().to_rfc3339(),
        })
        .expect("insert");

        let found = db
            .get_auth_user_by_email("asha@example.org")
            .expect("query")
            .expect("row");
        assert_eq!(found.id, "u1");
        assert!(db.email_taken("ASHA@EXAMPLE.ORG").expect("taken"));
        assert!(!db.email_taken("ben@example.org").expect("free"));
    }
}
