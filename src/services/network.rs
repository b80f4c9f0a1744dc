//! Network surface: connection requests between individuals, follows toward
//! institutions, and the cached status reads the profile cards render from.
//!
//! Writes go through the database first, then update the status cache and
//! announce the change on the bus, so every card showing the same target
//! flips together without refetching.

use crate::db::{DbConnection, DbInstitution, DbProfile, SocialDb};
use crate::error::ServiceError;
use crate::events::AppEvent;
use crate::services::notifications;
use crate::state::AppState;
use crate::types::{ConnectionStats, ConnectionStatus, FollowStatus, NotificationKind};

/// Cached connection status toward `target_id`, falling back to the database
/// when the entry is missing or expired. The fresh read is written back.
pub fn connection_status(
    state: &AppState,
    viewer_id: &str,
    target_id: &str,
) -> Result<ConnectionStatus, ServiceError> {
    if !state.status_cache.is_stale(target_id) {
        let cached = state.status_cache.connection_status(target_id);
        if cached != ConnectionStatus::None {
            return Ok(cached);
        }
    }
    refresh_user_status(state, viewer_id, target_id)
        .map(|(_, connection)| connection)
}

/// Cached follow status toward `target_id`, with the same fallback.
pub fn follow_status(
    state: &AppState,
    viewer_id: &str,
    target_id: &str,
) -> Result<FollowStatus, ServiceError> {
    if !state.status_cache.is_stale(target_id) {
        let cached = state.status_cache.follow_status(target_id);
        if cached != FollowStatus::None {
            return Ok(cached);
        }
    }
    refresh_user_status(state, viewer_id, target_id).map(|(follow, _)| follow)
}

/// Read both statuses from the database and overwrite the cache entry.
pub fn refresh_user_status(
    state: &AppState,
    viewer_id: &str,
    target_id: &str,
) -> Result<(FollowStatus, ConnectionStatus), ServiceError> {
    let (follow, connection) = {
        let db = state.db.lock();
        (
            db.follow_status_between(viewer_id, target_id)?,
            db.connection_status_between(viewer_id, target_id)?,
        )
    };
    state.status_cache.refresh(target_id, follow, connection);
    Ok((follow, connection))
}

/// Send a connection request. Any existing edge, in either direction and in
/// any state, makes this a conflict.
pub fn send_connection_request(
    state: &AppState,
    requester_id: &str,
    recipient_id: &str,
) -> Result<DbConnection, ServiceError> {
    if requester_id == recipient_id {
        return Err(ServiceError::Validation(
            "cannot connect with yourself".into(),
        ));
    }
    let db = state.db.lock();
    let recipient = db
        .get_profile(recipient_id)?
        .ok_or_else(|| ServiceError::NotFound(format!("profile {}", recipient_id)))?;
    if let Some(existing) = db.get_connection_between(requester_id, recipient_id)? {
        return Err(ServiceError::Conflict(format!(
            "a connection between these profiles already exists ({})",
            existing.status.as_str()
        )));
    }

    let connection = db.insert_connection_request(requester_id, recipient_id)?;
    let requester = display_name_of(&db, requester_id);
    notifications::push(
        state,
        &db,
        &recipient.id,
        NotificationKind::ConnectionRequest,
        &format!("{} wants to connect", requester),
        None,
    )?;
    drop(db);

    state
        .status_cache
        .update_connection_status(recipient_id, ConnectionStatus::Pending);
    state.event_bus.emit(AppEvent::ConnectionStatusChanged {
        target_id: recipient_id.to_string(),
        status: ConnectionStatus::Pending,
    });
    Ok(connection)
}

/// Accept a pending request addressed to `user_id`.
pub fn accept_connection(
    state: &AppState,
    user_id: &str,
    connection_id: &str,
) -> Result<(), ServiceError> {
    respond(state, user_id, connection_id, ConnectionStatus::Connected)
}

/// Reject a pending request addressed to `user_id`. The requester is not
/// notified of rejections.
pub fn reject_connection(
    state: &AppState,
    user_id: &str,
    connection_id: &str,
) -> Result<(), ServiceError> {
    respond(state, user_id, connection_id, ConnectionStatus::Rejected)
}

fn respond(
    state: &AppState,
    user_id: &str,
    connection_id: &str,
    status: ConnectionStatus,
) -> Result<(), ServiceError> {
    let requester_id = {
        let db = state.db.lock();
        let connection = db
            .get_connection(connection_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("connection {}", connection_id)))?;
        if connection.recipient_id != user_id {
            return Err(ServiceError::Auth(
                "only the recipient can respond to a request".into(),
            ));
        }
        if !db.respond_to_connection(connection_id, status)? {
            return Err(ServiceError::Conflict(format!(
                "request is no longer pending (currently {})",
                connection.status.as_str()
            )));
        }
        let requester_id = connection.requester_id;
        if status == ConnectionStatus::Connected {
            let recipient = display_name_of(&db, user_id);
            notifications::push(
                state,
                &db,
                &requester_id,
                NotificationKind::ConnectionAccepted,
                &format!("{} accepted your connection request", recipient),
                None,
            )?;
        }
        requester_id
    };

    state
        .status_cache
        .update_connection_status(&requester_id, status);
    state.event_bus.emit(AppEvent::ConnectionStatusChanged {
        target_id: requester_id,
        status,
    });
    Ok(())
}

/// Remove an existing edge entirely, whatever its state.
pub fn remove_connection(
    state: &AppState,
    user_id: &str,
    other_id: &str,
) -> Result<(), ServiceError> {
    {
        let db = state.db.lock();
        if !db.delete_connection_between(user_id, other_id)? {
            return Err(ServiceError::NotFound(format!(
                "no connection with {}",
                other_id
            )));
        }
    }
    state
        .status_cache
        .update_connection_status(other_id, ConnectionStatus::None);
    state.event_bus.emit(AppEvent::ConnectionStatusChanged {
        target_id: other_id.to_string(),
        status: ConnectionStatus::None,
    });
    Ok(())
}

/// Follow an institution. Already-following is a quiet success.
pub fn follow_institution(
    state: &AppState,
    user_id: &str,
    institution_id: &str,
) -> Result<(), ServiceError> {
    {
        let db = state.db.lock();
        if db.get_institution(institution_id)?.is_none() {
            return Err(ServiceError::NotFound(format!(
                "institution {}",
                institution_id
            )));
        }
        db.insert_follow(user_id, institution_id)?;
    }
    state
        .status_cache
        .update_follow_status(institution_id, FollowStatus::Following);
    state.event_bus.emit(AppEvent::FollowStatusChanged {
        target_id: institution_id.to_string(),
        status: FollowStatus::Following,
    });
    Ok(())
}

pub fn unfollow_institution(
    state: &AppState,
    user_id: &str,
    institution_id: &str,
) -> Result<(), ServiceError> {
    {
        let db = state.db.lock();
        db.delete_follow(user_id, institution_id)?;
    }
    state
        .status_cache
        .update_follow_status(institution_id, FollowStatus::None);
    state.event_bus.emit(AppEvent::FollowStatusChanged {
        target_id: institution_id.to_string(),
        status: FollowStatus::None,
    });
    Ok(())
}

pub fn connection_stats(state: &AppState, user_id: &str) -> Result<ConnectionStats, ServiceError> {
    let db = state.db.lock();
    Ok(db.connection_stats(user_id)?)
}

pub fn connected_profiles(state: &AppState, user_id: &str) -> Result<Vec<DbProfile>, ServiceError> {
    let db = state.db.lock();
    Ok(db.connected_profiles(user_id)?)
}

pub fn pending_incoming(state: &AppState, user_id: &str) -> Result<Vec<DbConnection>, ServiceError> {
    let db = state.db.lock();
    Ok(db.pending_incoming_connections(user_id)?)
}

pub fn suggestions(
    state: &AppState,
    user_id: &str,
    limit: usize,
) -> Result<Vec<DbProfile>, ServiceError> {
    let db = state.db.lock();
    Ok(db.connection_suggestions(user_id, limit)?)
}

pub fn followed_institutions(
    state: &AppState,
    user_id: &str,
) -> Result<Vec<DbInstitution>, ServiceError> {
    let db = state.db.lock();
    Ok(db.followed_institutions(user_id)?)
}

fn display_name_of(db: &SocialDb, profile_id: &str) -> String {
    db.actor_for_profile(profile_id)
        .ok()
        .flatten()
        .map(|actor| actor.display_name().to_string())
        .unwrap_or_else(|| "Someone".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{seed_institution, seed_profile};
    use crate::state::test_utils::test_state;

    fn seed_pair(state: &AppState) {
        let db = state.db.lock();
        seed_profile(&db, "ua", "Dr. A");
        seed_profile(&db, "ub", "Dr. B");
    }

    #[test]
    fn test_request_accept_updates_cache_and_bus() {
        let state = test_state();
        seed_pair(&state);
        let mut rx = state.event_bus.subscribe();

        let conn = send_connection_request(&state, "ua", "ub").expect("request");
        assert_eq!(
            state.status_cache.connection_status("ub"),
            ConnectionStatus::Pending
        );
        assert_eq!(
            rx.try_recv().expect("event"),
            AppEvent::NotificationCreated {
                user_id: "ub".into()
            }
        );
        assert_eq!(
            rx.try_recv().expect("event"),
            AppEvent::ConnectionStatusChanged {
                target_id: "ub".into(),
                status: ConnectionStatus::Pending,
            }
        );

        accept_connection(&state, "ub", &conn.id).expect("accept");
        assert_eq!(
            state.status_cache.connection_status("ua"),
            ConnectionStatus::Connected
        );
        {
            let db = state.db.lock();
            assert_eq!(db.unread_notification_count("ua").expect("count"), 1);
        }
    }

    #[test]
    fn test_duplicate_request_is_conflict() {
        let state = test_state();
        seed_pair(&state);

        send_connection_request(&state, "ua", "ub").expect("first");
        assert!(matches!(
            send_connection_request(&state, "ub", "ua"),
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            send_connection_request(&state, "ua", "ua"),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn test_only_recipient_can_respond() {
        let state = test_state();
        seed_pair(&state);
        let conn = send_connection_request(&state, "ua", "ub").expect("request");

        assert!(matches!(
            accept_connection(&state, "ua", &conn.id),
            Err(ServiceError::Auth(_))
        ));
        reject_connection(&state, "ub", &conn.id).expect("reject");

        // Already answered
        assert!(matches!(
            accept_connection(&state, "ub", &conn.id),
            Err(ServiceError::Conflict(_))
        ));
    }

    #[test]
    fn test_status_reads_fall_back_to_database() {
        let state = test_state();
        seed_pair(&state);
        send_connection_request(&state, "ua", "ub").expect("request");

        // Simulate expiry: drop the cache, read must repopulate from the db
        state.status_cache.clear_all();
        assert_eq!(
            connection_status(&state, "ua", "ub").expect("status"),
            ConnectionStatus::Pending
        );
        assert_eq!(
            state.status_cache.connection_status("ub"),
            ConnectionStatus::Pending,
            "fresh read is written back to the cache"
        );
    }

    #[test]
    fn test_follow_unfollow_flow() {
        let state = test_state();
        {
            let db = state.db.lock();
            seed_profile(&db, "me", "Me");
            seed_institution(&db, "i1", "Lakeside Clinic");
        }
        let mut rx = state.event_bus.subscribe();

        follow_institution(&state, "me", "i1").expect("follow");
        assert_eq!(
            state.status_cache.follow_status("i1"),
            FollowStatus::Following
        );
        assert_eq!(
            rx.try_recv().expect("event"),
            AppEvent::FollowStatusChanged {
                target_id: "i1".into(),
                status: FollowStatus::Following,
            }
        );
        assert_eq!(follow_status(&state, "me", "i1").expect("status"), FollowStatus::Following);

        unfollow_institution(&state, "me", "i1").expect("unfollow");
        assert_eq!(state.status_cache.follow_status("i1"), FollowStatus::None);

        assert!(matches!(
            follow_institution(&state, "me", "nowhere"),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn test_remove_connection_resets_status() {
        let state = test_state();
        seed_pair(&state);
        let conn = send_connection_request(&state, "ua", "ub").expect("request");
        accept_connection(&state, "ub", &conn.id).expect("accept");

        remove_connection(&state, "ua", "ub").expect("remove");
        assert_eq!(
            connection_status(&state, "ua", "ub").expect("status"),
            ConnectionStatus::None
        );
        assert!(matches!(
            remove_connection(&state, "ua", "ub"),
            Err(ServiceError::NotFound(_))
        ));
    }
}
