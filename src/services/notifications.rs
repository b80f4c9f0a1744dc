//! Notification tray operations, plus the `push` helper other services call
//! when something notification-worthy happens.

use crate::db::DbNotification;
use crate::error::ServiceError;
use crate::events::AppEvent;
use crate::state::AppState;
use crate::types::NotificationKind;

/// Insert a notification and announce it on the bus. Callers pass the db
/// guard they already hold so the insert joins their transaction scope.
pub(crate) fn push(
    state: &AppState,
    db: &crate::db::SocialDb,
    user_id: &str,
    kind: NotificationKind,
    title: &str,
    body: Option<&str>,
) -> Result<(), ServiceError> {
    db.insert_notification(user_id, kind, title, body)?;
    state.event_bus.emit(AppEvent::NotificationCreated {
        user_id: user_id.to_string(),
    });
    Ok(())
}

pub fn list_notifications(
    state: &AppState,
    user_id: &str,
    limit: usize,
) -> Result<Vec<DbNotification>, ServiceError> {
    let db = state.db.lock();
    Ok(db.notifications_for_user(user_id, limit)?)
}

pub fn unread_count(state: &AppState, user_id: &str) -> Result<i64, ServiceError> {
    let db = state.db.lock();
    Ok(db.unread_notification_count(user_id)?)
}

pub fn mark_read(state: &AppState, notification_id: &str) -> Result<(), ServiceError> {
    let db = state.db.lock();
    if !db.mark_notification_read(notification_id)? {
        return Err(ServiceError::NotFound(format!(
            "notification {}",
            notification_id
        )));
    }
    Ok(())
}

pub fn mark_all_read(state: &AppState, user_id: &str) -> Result<usize, ServiceError> {
    let db = state.db.lock();
    Ok(db.mark_all_notifications_read(user_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::seed_profile;
    use crate::state::test_utils::test_state;

    #[test]
    fn test_push_emits_bus_event() {
        let state = test_state();
        let mut rx = state.event_bus.subscribe();
        {
            let db = state.db.lock();
            seed_profile(&db, "u1", "Dr. Asha Rao");
            push(
                &state,
                &db,
                "u1",
                NotificationKind::PostLike,
                "Your post was liked",
                None,
            )
            .expect("push");
        }

        assert_eq!(
            rx.try_recv().expect("event"),
            AppEvent::NotificationCreated {
                user_id: "u1".into()
            }
        );
        assert_eq!(unread_count(&state, "u1").expect("count"), 1);
    }

    #[test]
    fn test_mark_read_missing_is_not_found() {
        let state = test_state();
        assert!(matches!(
            mark_read(&state, "ntf-missing"),
            Err(ServiceError::NotFound(_))
        ));
    }
}
