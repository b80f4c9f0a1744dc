//! Profile and institution surfaces: fetch, edit, onboarding, media uploads.

use crate::db::{DbInstitution, DbProfile};
use crate::error::ServiceError;
use crate::state::AppState;
use crate::storage::Bucket;

pub fn get_profile(state: &AppState, id: &str) -> Result<DbProfile, ServiceError> {
    let db = state.db.lock();
    db.get_profile(id)?
        .ok_or_else(|| ServiceError::NotFound(format!("profile {}", id)))
}

pub fn update_profile(state: &AppState, profile: &DbProfile) -> Result<DbProfile, ServiceError> {
    if profile.full_name.trim().is_empty() {
        return Err(ServiceError::Validation("full name is required".into()));
    }
    if let Some(specs) = &profile.specializations {
        // Stored as JSON; reject garbage before it lands in the column
        if serde_json::from_str::<Vec<String>>(specs).is_err() {
            return Err(ServiceError::Validation(
                "specializations must be a list of strings".into(),
            ));
        }
    }
    let db = state.db.lock();
    if db.get_profile(&profile.id)?.is_none() {
        return Err(ServiceError::NotFound(format!("profile {}", profile.id)));
    }
    db.update_profile(profile)?;
    db.get_profile(&profile.id)?
        .ok_or_else(|| ServiceError::NotFound(format!("profile {}", profile.id)))
}

pub fn complete_onboarding(state: &AppState, user_id: &str) -> Result<(), ServiceError> {
    let db = state.db.lock();
    if !db.set_onboarding_completed(user_id, true)? {
        return Err(ServiceError::NotFound(format!("profile {}", user_id)));
    }
    Ok(())
}

pub fn search_profiles(
    state: &AppState,
    query: &str,
    limit: usize,
) -> Result<Vec<DbProfile>, ServiceError> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }
    let db = state.db.lock();
    Ok(db.search_profiles(query, limit)?)
}

pub fn get_institution(state: &AppState, id: &str) -> Result<DbInstitution, ServiceError> {
    let db = state.db.lock();
    db.get_institution(id)?
        .ok_or_else(|| ServiceError::NotFound(format!("institution {}", id)))
}

pub fn update_institution(
    state: &AppState,
    institution: &DbInstitution,
) -> Result<DbInstitution, ServiceError> {
    if institution.name.trim().is_empty() {
        return Err(ServiceError::Validation("institution name is required".into()));
    }
    let db = state.db.lock();
    if db.get_institution(&institution.id)?.is_none() {
        return Err(ServiceError::NotFound(format!(
            "institution {}",
            institution.id
        )));
    }
    db.update_institution(institution)?;
    db.get_institution(&institution.id)?
        .ok_or_else(|| ServiceError::NotFound(format!("institution {}", institution.id)))
}

pub fn list_institutions(
    state: &AppState,
    limit: usize,
) -> Result<Vec<DbInstitution>, ServiceError> {
    let db = state.db.lock();
    Ok(db.list_institutions(limit)?)
}

/// Store a new avatar and point the profile at it. The previous file is
/// removed once the pointer has moved.
pub fn upload_avatar(
    state: &AppState,
    user_id: &str,
    extension: &str,
    bytes: &[u8],
) -> Result<String, ServiceError> {
    upload_profile_media(state, user_id, Bucket::Avatars, extension, bytes)
}

pub fn upload_banner(
    state: &AppState,
    user_id: &str,
    extension: &str,
    bytes: &[u8],
) -> Result<String, ServiceError> {
    upload_profile_media(state, user_id, Bucket::Banners, extension, bytes)
}

fn upload_profile_media(
    state: &AppState,
    user_id: &str,
    bucket: Bucket,
    extension: &str,
    bytes: &[u8],
) -> Result<String, ServiceError> {
    let relative = state.storage.store(bucket, user_id, extension, bytes)?;
    let previous = {
        let db = state.db.lock();
        let mut profile = db
            .get_profile(user_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("profile {}", user_id)))?;
        let previous = match bucket {
            Bucket::Banners => profile.banner_url.replace(relative.clone()),
            _ => profile.avatar_url.replace(relative.clone()),
        };
        db.update_profile(&profile)?;
        previous
    };
    if let Some(old) = previous {
        state.storage.delete(&old)?;
    }
    Ok(relative)
}

/// Store a new institution logo and point the institution at it.
pub fn upload_logo(
    state: &AppState,
    institution_id: &str,
    extension: &str,
    bytes: &[u8],
) -> Result<String, ServiceError> {
    let relative = state
        .storage
        .store(Bucket::Logos, institution_id, extension, bytes)?;
    let previous = {
        let db = state.db.lock();
        let mut institution = db
            .get_institution(institution_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("institution {}", institution_id)))?;
        let previous = institution.logo_url.replace(relative.clone());
        db.update_institution(&institution)?;
        previous
    };
    if let Some(old) = previous {
        state.storage.delete(&old)?;
    }
    Ok(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{seed_institution, seed_profile};
    use crate::state::test_utils::test_state;

    #[test]
    fn test_update_profile_validates_specializations() {
        let state = test_state();
        {
            let db = state.db.lock();
            seed_profile(&db, "u1", "Dr. Asha Rao");
        }

        let mut profile = get_profile(&state, "u1").expect("get");
        profile.specializations = Some("not json".into());
        assert!(matches!(
            update_profile(&state, &profile),
            Err(ServiceError::Validation(_))
        ));

        profile.specializations = Some(r#"["cardiology","oncology"]"#.into());
        let updated = update_profile(&state, &profile).expect("update");
        assert!(updated.specializations.unwrap().contains("cardiology"));
    }

    #[test]
    fn test_onboarding_completion() {
        let state = test_state();
        {
            let db = state.db.lock();
            seed_profile(&db, "u1", "Dr. Asha Rao");
        }

        complete_onboarding(&state, "u1").expect("complete");
        assert!(get_profile(&state, "u1").expect("get").onboarding_completed);

        assert!(matches!(
            complete_onboarding(&state, "missing"),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn test_avatar_upload_replaces_previous_file() {
        let state = test_state();
        {
            let db = state.db.lock();
            seed_profile(&db, "u1", "Dr. Asha Rao");
        }

        let first = upload_avatar(&state, "u1", "png", b"first").expect("upload");
        let second = upload_avatar(&state, "u1", "png", b"second").expect("upload");
        assert_ne!(first, second);

        let profile = get_profile(&state, "u1").expect("get");
        assert_eq!(profile.avatar_url.as_deref(), Some(second.as_str()));
        assert!(!state.storage.resolve(&first).exists());
        assert!(state.storage.resolve(&second).exists());
    }

    #[test]
    fn test_logo_upload_updates_institution() {
        let state = test_state();
        {
            let db = state.db.lock();
            seed_institution(&db, "i1", "Lakeside Clinic");
        }

        let logo = upload_logo(&state, "i1", "png", b"logo bytes").expect("upload");
        let institution = get_institution(&state, "i1").expect("get");
        assert_eq!(institution.logo_url.as_deref(), Some(logo.as_str()));
    }

    #[test]
    fn test_empty_search_returns_nothing() {
        let state = test_state();
        assert!(search_profiles(&state, "   ", 10).expect("search").is_empty());
    }
}
