//! Profile and institution queries, plus actor resolution.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{DbError, DbInstitution, DbProfile, SocialDb};
use crate::types::{Actor, ProfileType};

fn map_profile(row: &Row) -> rusqlite::Result<DbProfile> {
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
        profile_type: ProfileType::from_str_lossy(&row.get::<_, String>(9)?),
        onboarding_completed: row.get::<_, i64>(10)? != 0,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

const PROFILE_COLUMNS: &str = "id, email, full_name, headline, bio, location, avatar_url,
     banner_url, specializations, profile_type, onboarding_completed, created_at, updated_at";

fn map_institution(row: &Row) -> rusqlite::Result<DbInstitution> {
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
}

const INSTITUTION_COLUMNS: &str = "id, name, institution_type, website, contact_email,
     contact_phone, location, logo_url, admin_profile_id, created_at";

impl SocialDb {
    /// Create a bare profile row. Called from sign-up in the same transaction
    /// as the auth row (the hosted platform did this with a trigger).
    pub fn insert_profile(
        &self,
        id: &str,
        email: &str,
        full_name: &str,
        profile_type: ProfileType,
    ) -> Result<(), DbError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO profiles (id, email, full_name, profile_type, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![id, email, full_name, profile_type.as_str(), now],
        )?;
        Ok(())
    }

    pub fn get_profile(&self, id: &str) -> Result<Option<DbProfile>, DbError> {
        let profile = self
            .conn
            .query_row(
                &format!("SELECT {} FROM profiles WHERE id = ?1", PROFILE_COLUMNS),
                [id],
                map_profile,
            )
            .optional()?;
        Ok(profile)
    }

    /// Write back every mutable profile field. `updated_at` is set here.
    pub fn update_profile(&self, profile: &DbProfile) -> Result<(), DbError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE profiles SET
                full_name = ?2, headline = ?3, bio = ?4, location = ?5,
                avatar_url = ?6, banner_url = ?7, specializations = ?8,
                updated_at = ?9
             WHERE id = ?1",
            params![
                profile.id,
                profile.full_name,
                profile.headline,
                profile.bio,
                profile.location,
                profile.avatar_url,
                profile.banner_url,
                profile.specializations,
                now,
            ],
        )?;
        Ok(())
    }

    /// Flip the onboarding gate that controls the profile-completion prompt.
    pub fn set_onboarding_completed(&self, id: &str, completed: bool) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE profiles SET onboarding_completed = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, completed as i64, Utc::now().to_rfc3339()],
        )?;
        Ok(changed > 0)
    }

    /// Case-insensitive name/headline search for the network page.
    pub fn search_profiles(&self, query: &str, limit: usize) -> Result<Vec<DbProfile>, DbError> {
        let pattern = format!("%{}%", query.trim());
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM profiles
             WHERE full_name LIKE ?1 COLLATE NOCASE
                OR headline LIKE ?1 COLLATE NOCASE
             ORDER BY full_name ASC
             LIMIT ?2",
            PROFILE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![pattern, limit as i64], map_profile)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn insert_institution(
        &self,
        id: &str,
        name: &str,
        institution_type: Option<&str>,
        admin_profile_id: Option<&str>,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO institutions (id, name, institution_type, admin_profile_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                name,
                institution_type,
                admin_profile_id,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn get_institution(&self, id: &str) -> Result<Option<DbInstitution>, DbError> {
        let institution = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM institutions WHERE id = ?1",
                    INSTITUTION_COLUMNS
                ),
                [id],
                map_institution,
            )
            .optional()?;
        Ok(institution)
    }

    /// Write back every mutable institution field.
    pub fn update_institution(&self, institution: &DbInstitution) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE institutions SET
                name = ?2, institution_type = ?3, website = ?4, contact_email = ?5,
                contact_phone = ?6, location = ?7, logo_url = ?8
             WHERE id = ?1",
            params![
                institution.id,
                institution.name,
                institution.institution_type,
                institution.website,
                institution.contact_email,
                institution.contact_phone,
                institution.location,
                institution.logo_url,
            ],
        )?;
        Ok(())
    }

    pub fn list_institutions(&self, limit: usize) -> Result<Vec<DbInstitution>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM institutions ORDER BY name ASC LIMIT ?1",
            INSTITUTION_COLUMNS
        ))?;
        let rows = stmt.query_map([limit as i64], map_institution)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Resolve a profile id to a tagged actor. Institution-typed profiles come
    /// back as the institution variant so render sites never branch on field
    /// presence.
    pub fn actor_for_profile(&self, id: &str) -> Result<Option<Actor>, DbError> {
        let Some(profile) = self.get_profile(id)? else {
            return Ok(None);
        };
        let actor = match profile.profile_type {
            ProfileType::Individual => Actor::Individual {
                id: profile.id,
                full_name: profile.full_name,
                headline: profile.headline,
                avatar_url: profile.avatar_url,
            },
            ProfileType::Institution => Actor::Institution {
                id: profile.id,
                name: profile.full_name,
                institution_type: None,
                logo_url: profile.avatar_url,
            },
        };
        Ok(Some(actor))
    }

    /// Resolve an institution id to the institution actor variant.
    pub fn actor_for_institution(&self, id: &str) -> Result<Option<Actor>, DbError> {
        let Some(inst) = self.get_institution(id)? else {
            return Ok(None);
        };
        Ok(Some(Actor::Institution {
            id: inst.id,
            name: inst.name,
            institution_type: inst.institution_type,
            logo_url: inst.logo_url,
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_utils::{seed_institution, seed_profile, test_db};
    use crate::types::{Actor, ProfileType};

    #[test]
    fn test_insert_and_get_profile() {
        let db = test_db();
        seed_profile(&db, "u1", "Dr. Asha Rao");

        let profile = db.get_profile("u1").expect("query").expect("row exists");
        assert_eq!(profile.full_name, "Dr. Asha Rao");
        assert_eq!(profile.profile_type, ProfileType::Individual);
        assert!(!profile.onboarding_completed);
    }

    #[test]
    fn test_get_profile_not_found() {
        let db = test_db();
        assert!(db.get_profile("nope").expect("query").is_none());
    }

    #[test]
    fn test_update_profile_touches_updated_at() {
        let db = test_db();
        seed_profile(&db, "u1", "Dr. Asha Rao");

        let mut profile = db.get_profile("u1").expect("query").unwrap();
        let before = profile.updated_at.clone();
        profile.headline = Some("Cardiologist".to_string());
        profile.updated_at = "2020-01-01T00:00:00Z".to_string();
        db.update_profile(&profile).expect("update");

        let reloaded = db.get_profile("u1").expect("query").unwrap();
        assert_eq!(reloaded.headline.as_deref(), Some("Cardiologist"));
        assert!(reloaded.updated_at >= before, "updated_at is set on write");
    }

    #[test]
    fn test_onboarding_gate() {
        let db = test_db();
        seed_profile(&db, "u1", "Dr. Asha Rao");

        assert!(db.set_onboarding_completed("u1", true).expect("set"));
        let profile = db.get_profile("u1").expect("query").unwrap();
        assert!(profile.onboarding_completed);

        // Unknown id reports no match rather than erroring
        assert!(!db.set_onboarding_completed("nope", true).expect("set"));
    }

    #[test]
    fn test_search_profiles_matches_name_and_headline() {
        let db = test_db();
        seed_profile(&db, "u1", "Dr. Asha Rao");
        seed_profile(&db, "u2", "Dr. Ben Okafor");

        let mut p2 = db.get_profile("u2").expect("query").unwrap();
        p2.headline = Some("Pediatric cardiology".to_string());
        db.update_profile(&p2).expect("update");

        let by_name = db.search_profiles("asha", 10).expect("search");
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].id, "u1");

        let by_headline = db.search_profiles("cardiology", 10).expect("search");
        assert_eq!(by_headline.len(), 1);
        assert_eq!(by_headline[0].id, "u2");
    }

    #[test]
    fn test_actor_resolution_tags_variant() {
        let db = test_db();
        seed_profile(&db, "u1", "Dr. Asha Rao");
        seed_institution(&db, "i1", "Lakeside Clinic");

        match db.actor_for_profile("u1").expect("query").unwrap() {
            Actor::Individual { full_name, .. } => assert_eq!(full_name, "Dr. Asha Rao"),
            other => panic!("expected individual, got {:?}", other),
        }

        match db.actor_for_institution("i1").expect("query").unwrap() {
            Actor::Institution { name, .. } => assert_eq!(name, "Lakeside Clinic"),
            other => panic!("expected institution, got {:?}", other),
        }

        assert!(db.actor_for_profile("missing").expect("query").is_none());
    }
}
