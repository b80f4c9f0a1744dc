//! Network graph queries: connections between individuals and follows
//! toward institutions.
//!
//! A connection row is unique per unordered profile pair; the canonical
//! (pair_low, pair_high) columns carry the constraint, and the write path
//! keeps them consistent with requester/recipient.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{DbConnection, DbError, DbInstitution, DbProfile, SocialDb};
use crate::types::{ConnectionStats, ConnectionStatus, FollowStatus};

fn map_connection(row: &Row) -> rusqlite::Result<DbConnection> {
    Ok(DbConnection {
        id: row.get(0)?,
        requester_id: row.get(1)?,
        recipient_id: row.get(2)?,
        status: ConnectionStatus::from_str_lossy(&row.get::<_, String>(3)?),
        created_at: row.get(4)?,
        responded_at: row.get(5)?,
    })
}

const CONNECTION_COLUMNS: &str =
    "id, requester_id, recipient_id, status, created_at, responded_at";

/// Canonical ordering for the unordered pair constraint.
fn pair_key<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl SocialDb {
    pub fn get_connection(&self, id: &str) -> Result<Option<DbConnection>, DbError> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM connections WHERE id = ?1",
                    CONNECTION_COLUMNS
                ),
                [id],
                map_connection,
            )
            .optional()?;
        Ok(row)
    }

    /// Fetch the connection row between two profiles, in either direction.
    pub fn get_connection_between(
        &self,
        a: &str,
        b: &str,
    ) -> Result<Option<DbConnection>, DbError> {
        let (low, high) = pair_key(a, b);
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM connections WHERE pair_low = ?1 AND pair_high = ?2",
                    CONNECTION_COLUMNS
                ),
                params![low, high],
                map_connection,
            )
            .optional()?;
        Ok(row)
    }

    /// Create a pending connection request. Fails on the pair constraint if
    /// any edge (any status, either direction) already exists — callers check
    /// first and surface a conflict error with better copy.
    pub fn insert_connection_request(
        &self,
        requester_id: &str,
        recipient_id: &str,
    ) -> Result<DbConnection, DbError> {
        let (low, high) = pair_key(requester_id, recipient_id);
        let connection = DbConnection {
            id: format!("conn-{}", Uuid::new_v4()),
            requester_id: requester_id.to_string(),
            recipient_id: recipient_id.to_string(),
            status: ConnectionStatus::Pending,
            created_at: Utc::now().to_rfc3339(),
            responded_at: None,
        };
        self.conn.execute(
            "INSERT INTO connections
                (id, requester_id, recipient_id, pair_low, pair_high, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
            params![
                connection.id,
                connection.requester_id,
                connection.recipient_id,
                low,
                high,
                connection.created_at
            ],
        )?;
        Ok(connection)
    }

    /// Transition a connection (accept/reject). Returns false when the row is
    /// missing or no longer pending.
    pub fn respond_to_connection(
        &self,
        connection_id: &str,
        status: ConnectionStatus,
    ) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE connections SET status = ?2, responded_at = ?3
             WHERE id = ?1 AND status = 'pending'",
            params![connection_id, status.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(changed > 0)
    }

    /// Drop the edge between two profiles entirely ("remove connection").
    pub fn delete_connection_between(&self, a: &str, b: &str) -> Result<bool, DbError> {
        let (low, high) = pair_key(a, b);
        let removed = self.conn.execute(
            "DELETE FROM connections WHERE pair_low = ?1 AND pair_high = ?2",
            params![low, high],
        )?;
        Ok(removed > 0)
    }

    /// The status of the edge between viewer and target, "none" if absent.
    pub fn connection_status_between(
        &self,
        viewer: &str,
        target: &str,
    ) -> Result<ConnectionStatus, DbError> {
        Ok(self
            .get_connection_between(viewer, target)?
            .map(|c| c.status)
            .unwrap_or(ConnectionStatus::None))
    }

    /// Profiles connected (accepted) to the given user.
    pub fn connected_profiles(&self, user_id: &str) -> Result<Vec<DbProfile>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.email, p.full_name, p.headline, p.bio, p.location,
                    p.avatar_url, p.banner_url, p.specializations, p.profile_type,
                    p.onboarding_completed, p.created_at, p.updated_at
             FROM connections c
             INNER JOIN profiles p
                ON p.id = CASE WHEN c.requester_id = ?1 THEN c.recipient_id
                               ELSE c.requester_id END
             WHERE (c.requester_id = ?1 OR c.recipient_id = ?1)
               AND c.status = 'connected'
             ORDER BY p.full_name ASC",
        )?;
        let rows = stmt.query_map([user_id], |row| {
            Ok(DbProfile {
                id: row.get(0)?,
                email: row.get(1)?,
                full_name: row.get(2)?,
                headline: row.get(3)?,
                bio: row.get(4)?,
                location: row.get(5)?,
                avatar_url: row.get(6)?,
                banner_url: row.get(7)?,
                specializations: row.get(8)?,
                profile_type: crate::types::ProfileType::from_str_lossy(
                    &row.get::<_, String>(9)?,
                ),
                onboarding_completed: row.get::<_, i64>(10)? != 0,
                created_at: row.get(11)?,
                updated_at: row.get(12)?,
            })
        })?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Pending requests addressed to this user.
    pub fn pending_incoming_connections(
        &self,
        user_id: &str,
    ) -> Result<Vec<DbConnection>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM connections
             WHERE recipient_id = ?1 AND status = 'pending'
             ORDER BY created_at DESC",
            CONNECTION_COLUMNS
        ))?;
        let rows = stmt.query_map([user_id], map_connection)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Read-only aggregate for the network page header.
    pub fn connection_stats(&self, user_id: &str) -> Result<ConnectionStats, DbError> {
        let connections: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM connections
             WHERE (requester_id = ?1 OR recipient_id = ?1) AND status = 'connected'",
            [user_id],
            |row| row.get(0),
        )?;
        let pending_incoming: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM connections
             WHERE recipient_id = ?1 AND status = 'pending'",
            [user_id],
            |row| row.get(0),
        )?;
        let following: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(ConnectionStats {
            connections,
            pending_incoming,
            following,
        })
    }

    /// Individuals with no edge to the viewer, for the "people you may know"
    /// rail. Plain recency ordering; no scoring.
    pub fn connection_suggestions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<DbProfile>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.email, p.full_name, p.headline, p.bio, p.location,
                    p.avatar_url, p.banner_url, p.specializations, p.profile_type,
                    p.onboarding_completed, p.created_at, p.updated_at
             FROM profiles p
             WHERE p.id != ?1
               AND p.profile_type = 'individual'
               AND NOT EXISTS (
                   SELECT 1 FROM connections c
                   WHERE (c.requester_id = ?1 AND c.recipient_id = p.id)
                      OR (c.recipient_id = ?1 AND c.requester_id = p.id)
               )
             ORDER BY p.created_at DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            Ok(DbProfile {
                id: row.get(0)?,
                email: row.get(1)?,
                full_name: row.get(2)?,
                headline: row.get(3)?,
                bio: row.get(4)?,
                location: row.get(5)?,
                avatar_url: row.get(6)?,
                banner_url: row.get(7)?,
                specializations: row.get(8)?,
                profile_type: crate::types::ProfileType::from_str_lossy(
                    &row.get::<_, String>(9)?,
                ),
                onboarding_completed: row.get::<_, i64>(10)? != 0,
                created_at: row.get(11)?,
                updated_at: row.get(12)?,
            })
        })?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Follows (individual → institution)
    // -----------------------------------------------------------------------

    /// Record a follow edge. Returns false if it already existed.
    pub fn insert_follow(&self, follower_id: &str, institution_id: &str) -> Result<bool, DbError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO follows (follower_id, institution_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![follower_id, institution_id, Utc::now().to_rfc3339()],
        )?;
        Ok(inserted > 0)
    }

    /// Remove a follow edge. Returns false if there was nothing to remove.
    pub fn delete_follow(&self, follower_id: &str, institution_id: &str) -> Result<bool, DbError> {
        let removed = self.conn.execute(
            "DELETE FROM follows WHERE follower_id = ?1 AND institution_id = ?2",
            params![follower_id, institution_id],
        )?;
        Ok(removed > 0)
    }

    pub fn follow_status_between(
        &self,
        follower_id: &str,
        institution_id: &str,
    ) -> Result<FollowStatus, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM follows WHERE follower_id = ?1 AND institution_id = ?2")?;
        if stmt.exists(params![follower_id, institution_id])? {
            Ok(FollowStatus::Following)
        } else {
            Ok(FollowStatus::None)
        }
    }

    pub fn followed_institutions(&self, user_id: &str) -> Result<Vec<DbInstitution>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT i.id, i.name, i.institution_type, i.website, i.contact_email,
                    i.contact_phone, i.location, i.logo_url, i.admin_profile_id, i.created_at
             FROM follows f
             INNER JOIN institutions i ON i.id = f.institution_id
             WHERE f.follower_id = ?1
             ORDER BY i.name ASC",
        )?;
        let rows = stmt.query_map([user_id], |row| {
            Ok(DbInstitution {
                id: row.get(0)?,
                name: row.get(1)?,
                institution_type: row.get(2)?,
                website: row.get(3)?,
                contact_email: row.get(4)?,
                contact_phone: row.get(5)?,
                location: row.get(6)?,
                logo_url: row.get(7)?,
                admin_profile_id: row.get(8)?,
                created_at: row.get(9)?,
            })
        })?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}
