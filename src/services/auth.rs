//! Local account sign-up, sign-in, and sign-out.
//!
//! Passwords are stored salted and hashed; sessions are opaque in-memory
//! tokens that die with the process.

use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::DbAuthUser;
use crate::error::ServiceError;
use crate::state::AppState;
use crate::types::ProfileType;

const MIN_PASSWORD_LEN: usize = 8;

fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn validate_email(email: &str) -> Result<(), ServiceError> {
    let trimmed = email.trim();
    if trimmed.len() < 3 || !trimmed.contains('@') || trimmed.starts_with('@') {
        return Err(ServiceError::Validation(format!(
            "not a valid email address: {:?}",
            email
        )));
    }
    Ok(())
}

/// Outcome of a successful sign-up or sign-in.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: String,
}

/// Create the credential row and the profile row in one transaction, then
/// open a session. The hosted platform created the profile with a database
/// trigger; here it is an explicit write.
pub fn sign_up(
    state: &AppState,
    email: &str,
    password: &str,
    full_name: &str,
    profile_type: ProfileType,
) -> Result<Session, ServiceError> {
    validate_email(email)?;
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ServiceError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if full_name.trim().is_empty() {
        return Err(ServiceError::Validation("full name is required".into()));
    }

    let email = email.trim().to_string();
    let user_id = format!("usr-{}", Uuid::new_v4());
    let salt = Uuid::new_v4().to_string();
    let user = DbAuthUser {
        id: user_id.clone(),
        email: email.clone(),
        password_hash: hash_password(password, &salt),
        salt,
        created_at: Utc::now().to_rfc3339(),
    };

    {
        let db = state.db.lock();
        if db.email_taken(&email)? {
            return Err(ServiceError::Conflict(format!(
                "an account already exists for {}",
                email
            )));
        }
        db.with_transaction(|db| {
            db.insert_auth_user(&user)?;
            db.insert_profile(&user.id, &email, full_name.trim(), profile_type)?;
            Ok::<_, ServiceError>(())
        })?;
    }
    log::info!("signed up {}", user_id);

    let token = format!("sess-{}", Uuid::new_v4());
    state.insert_session(&token, &user_id);
    Ok(Session { token, user_id })
}

pub fn sign_in(state: &AppState, email: &str, password: &str) -> Result<Session, ServiceError> {
    let user = {
        let db = state.db.lock();
        db.get_auth_user_by_email(email.trim())?
    }
    // Same error for unknown email and wrong password
    .ok_or_else(|| ServiceError::Auth("invalid email or password".into()))?;

    if hash_password(password, &user.salt) != user.password_hash {
        return Err(ServiceError::Auth("invalid email or password".into()));
    }

    let token = format!("sess-{}", Uuid::new_v4());
    state.insert_session(&token, &user.id);
    log::debug!("signed in {}", user.id);
    Ok(Session {
        token,
        user_id: user.id,
    })
}

/// Resolve a session token to the signed-in profile.
pub fn current_profile(
    state: &AppState,
    token: &str,
) -> Result<crate::db::DbProfile, ServiceError> {
    let user_id = state.session_user(token)?;
    let db = state.db.lock();
    db.get_profile(&user_id)?
        .ok_or_else(|| ServiceError::NotFound(format!("profile {}", user_id)))
}

/// Drop the session and cold-start the status cache so the next viewer never
/// sees the previous viewer's relationships.
pub fn sign_out(state: &AppState, token: &str) -> Result<(), ServiceError> {
    if !state.remove_session(token) {
        return Err(ServiceError::Auth("invalid or expired session".into()));
    }
    state.status_cache.clear_all();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_utils::test_state;
    use crate::types::FollowStatus;

    #[test]
    fn test_sign_up_creates_profile_and_session() {
        let state = test_state();
        let session = sign_up(
            &state,
            "asha@example.org",
            "correct horse",
            "Dr. Asha Rao",
            ProfileType::Individual,
        )
        .expect("sign up");

        assert_eq!(
            state.session_user(&session.token).expect("session"),
            session.user_id
        );
        let db = state.db.lock();
        let profile = db
            .get_profile(&session.user_id)
            .expect("query")
            .expect("profile created alongside the account");
        assert_eq!(profile.full_name, "Dr. Asha Rao");
        assert_eq!(profile.email, "asha@example.org");
    }

    #[test]
    fn test_sign_up_rejects_bad_input() {
        let state = test_state();
        assert!(matches!(
            sign_up(&state, "no-at-sign", "longenough", "A", ProfileType::Individual),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            sign_up(&state, "a@b.org", "short", "A", ProfileType::Individual),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            sign_up(&state, "a@b.org", "longenough", "   ", ProfileType::Individual),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn test_duplicate_email_is_conflict() {
        let state = test_state();
        sign_up(
            &state,
            "asha@example.org",
            "correct horse",
            "Dr. Asha Rao",
            ProfileType::Individual,
        )
        .expect("first");

        assert!(matches!(
            sign_up(
                &state,
                "Asha@Example.org",
                "another pass",
                "Someone Else",
                ProfileType::Individual,
            ),
            Err(ServiceError::Conflict(_))
        ));
    }

    #[test]
    fn test_sign_in_wrong_password_fails_uniformly() {
        let state = test_state();
        sign_up(
            &state,
            "asha@example.org",
            "correct horse",
            "Dr. Asha Rao",
            ProfileType::Individual,
        )
        .expect("sign up");

        let wrong_pass = sign_in(&state, "asha@example.org", "wrong").expect_err("must fail");
        let wrong_email = sign_in(&state, "nobody@example.org", "whatever").expect_err("must fail");
        assert_eq!(wrong_pass.to_string(), wrong_email.to_string());

        sign_in(&state, "asha@example.org", "correct horse").expect("right password works");
    }

    #[test]
    fn test_current_profile_resolves_token() {
        let state = test_state();
        let session = sign_up(
            &state,
            "asha@example.org",
            "correct horse",
            "Dr. Asha Rao",
            ProfileType::Individual,
        )
        .expect("sign up");

        let profile = current_profile(&state, &session.token).expect("resolve");
        assert_eq!(profile.id, session.user_id);
        assert!(matches!(
            current_profile(&state, "sess-bogus"),
            Err(ServiceError::Auth(_))
        ));
    }

    #[test]
    fn test_sign_out_clears_session_and_cache() {
        let state = test_state();
        let session = sign_up(
            &state,
            "asha@example.org",
            "correct horse",
            "Dr. Asha Rao",
            ProfileType::Individual,
        )
        .expect("sign up");

        state
            .status_cache
            .update_follow_status("i1", FollowStatus::Following);

        sign_out(&state, &session.token).expect("sign out");
        assert!(state.session_user(&session.token).is_err());
        assert!(state.status_cache.is_empty());

        assert!(matches!(
            sign_out(&state, &session.token),
            Err(ServiceError::Auth(_))
        ));
    }
}
