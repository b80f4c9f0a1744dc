//! Events surface: creating events, listing them with clock-corrected
//! status, and attendee registration with a capacity check.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::{DbEvent, DbEventRegistration};
use crate::error::ServiceError;
use crate::events::AppEvent;
use crate::services::notifications;
use crate::state::AppState;
use crate::types::{
    Actor, EventStatus, EventWithOrganizer, NotificationKind, ProfileType, RegistrationStatus,
};

pub struct NewEvent<'a> {
    pub organizer_id: &'a str,
    pub organizer_type: ProfileType,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub start_time: &'a str,
    pub end_time: Option<&'a str>,
    pub venue: Option<&'a str>,
    pub is_virtual: bool,
    pub meeting_link: Option<&'a str>,
    pub max_attendees: Option<i64>,
    pub registration_fee: Option<f64>,
}

fn parse_time(label: &str, raw: &str) -> Result<DateTime<Utc>, ServiceError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ServiceError::Validation(format!("{} is not a valid timestamp: {}", label, e)))
}

pub fn create_event(state: &AppState, new_event: &NewEvent) -> Result<DbEvent, ServiceError> {
    if new_event.title.trim().is_empty() {
        return Err(ServiceError::Validation("event title is required".into()));
    }
    let start = parse_time("start time", new_event.start_time)?;
    if let Some(end_raw) = new_event.end_time {
        let end = parse_time("end time", end_raw)?;
        if end <= start {
            return Err(ServiceError::Validation(
                "event must end after it starts".into(),
            ));
        }
    }
    if new_event.is_virtual && new_event.meeting_link.is_none() {
        return Err(ServiceError::Validation(
            "virtual events need a meeting link".into(),
        ));
    }
    if let Some(cap) = new_event.max_attendees {
        if cap <= 0 {
            return Err(ServiceError::Validation(
                "attendee capacity must be positive".into(),
            ));
        }
    }

    let event = DbEvent {
        id: format!("evt-{}", Uuid::new_v4()),
        organizer_id: new_event.organizer_id.to_string(),
        organizer_type: new_event.organizer_type,
        title: new_event.title.trim().to_string(),
        description: new_event.description.map(|s| s.to_string()),
        start_time: new_event.start_time.to_string(),
        end_time: new_event.end_time.map(|s| s.to_string()),
        venue: new_event.venue.map(|s| s.to_string()),
        is_virtual: new_event.is_virtual,
        meeting_link: new_event.meeting_link.map(|s| s.to_string()),
        max_attendees: new_event.max_attendees,
        registration_fee: new_event.registration_fee,
        status: EventStatus::Upcoming,
        created_at: Utc::now().to_rfc3339(),
    };
    let db = state.db.lock();
    db.insert_event(&event)?;
    Ok(event)
}

fn resolve_organizer(
    db: &crate::db::SocialDb,
    event: &DbEvent,
) -> Result<Option<Actor>, ServiceError> {
    let organizer = match event.organizer_type {
        ProfileType::Institution => db.actor_for_institution(&event.organizer_id)?,
        ProfileType::Individual => db.actor_for_profile(&event.organizer_id)?,
    };
    Ok(organizer)
}

/// Soonest-first event listing with organizers resolved, clock-corrected
/// status, and live attendee counts.
pub fn list_events(state: &AppState, limit: usize) -> Result<Vec<EventWithOrganizer>, ServiceError> {
    let db = state.db.lock();
    let now = Utc::now();
    let events = db.list_events(limit)?;
    let mut results = Vec::with_capacity(events.len());
    for event in events {
        let Some(organizer) = resolve_organizer(&db, &event)? else {
            log::warn!("event {} has no resolvable organizer", event.id);
            continue;
        };
        let effective_status = event.effective_status(now);
        let attendee_count = db.active_registration_count(&event.id)?;
        results.push(EventWithOrganizer {
            event,
            organizer,
            effective_status,
            attendee_count,
        });
    }
    Ok(results)
}

pub fn get_event(state: &AppState, event_id: &str) -> Result<EventWithOrganizer, ServiceError> {
    let db = state.db.lock();
    let event = db
        .get_event(event_id)?
        .ok_or_else(|| ServiceError::NotFound(format!("event {}", event_id)))?;
    let organizer = resolve_organizer(&db, &event)?.unwrap_or(Actor::Individual {
        id: event.organizer_id.clone(),
        full_name: "Unknown organizer".to_string(),
        headline: None,
        avatar_url: None,
    });
    let effective_status = event.effective_status(Utc::now());
    let attendee_count = db.active_registration_count(&event.id)?;
    Ok(EventWithOrganizer {
        event,
        organizer,
        effective_status,
        attendee_count,
    })
}

pub fn cancel_event(state: &AppState, event_id: &str) -> Result<(), ServiceError> {
    let db = state.db.lock();
    if !db.set_event_status(event_id, EventStatus::Cancelled)? {
        return Err(ServiceError::NotFound(format!("event {}", event_id)));
    }
    Ok(())
}

/// Register an attendee. Cancelled and completed events refuse registration;
/// a full event refuses too. Re-registering after a cancellation revives the
/// original row.
pub fn register_for_event(
    state: &AppState,
    event_id: &str,
    attendee_id: &str,
) -> Result<DbEventRegistration, ServiceError> {
    let registration = {
        let db = state.db.lock();
        let event = db
            .get_event(event_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("event {}", event_id)))?;
        match event.effective_status(Utc::now()) {
            EventStatus::Cancelled => {
                return Err(ServiceError::Conflict("event was cancelled".into()))
            }
            EventStatus::Completed => {
                return Err(ServiceError::Conflict("event has already ended".into()))
            }
            EventStatus::Upcoming | EventStatus::Ongoing => {}
        }

        let existing = db.get_registration(event_id, attendee_id)?;
        if let Some(ref reg) = existing {
            if reg.status != RegistrationStatus::Cancelled {
                return Err(ServiceError::Conflict(
                    "you are already registered for this event".into(),
                ));
            }
        }

        if let Some(cap) = event.max_attendees {
            if db.active_registration_count(event_id)? >= cap {
                return Err(ServiceError::Conflict("event is full".into()));
            }
        }

        let registration = match existing {
            Some(mut reg) => {
                db.set_registration_status(&reg.id, RegistrationStatus::Registered)?;
                reg.status = RegistrationStatus::Registered;
                reg
            }
            None => db.insert_registration(event_id, attendee_id)?,
        };

        let attendee = db
            .actor_for_profile(attendee_id)?
            .map(|actor| actor.display_name().to_string())
            .unwrap_or_else(|| "Someone".to_string());
        if event.organizer_type == ProfileType::Individual && event.organizer_id != attendee_id {
            notifications::push(
                state,
                &db,
                &event.organizer_id,
                NotificationKind::EventRegistration,
                &format!("{} registered for {}", attendee, event.title),
                None,
            )?;
        }
        registration
    };

    state.event_bus.emit(AppEvent::EventRegistrationChanged {
        event_id: event_id.to_string(),
        attendee_id: attendee_id.to_string(),
    });
    Ok(registration)
}

pub fn cancel_registration(
    state: &AppState,
    event_id: &str,
    attendee_id: &str,
) -> Result<(), ServiceError> {
    {
        let db = state.db.lock();
        let registration = db
            .get_registration(event_id, attendee_id)?
            .ok_or_else(|| ServiceError::NotFound("no registration for this event".into()))?;
        if registration.status == RegistrationStatus::Cancelled {
            return Err(ServiceError::Conflict("registration already cancelled".into()));
        }
        db.set_registration_status(&registration.id, RegistrationStatus::Cancelled)?;
    }
    state.event_bus.emit(AppEvent::EventRegistrationChanged {
        event_id: event_id.to_string(),
        attendee_id: attendee_id.to_string(),
    });
    Ok(())
}

pub fn my_registrations(
    state: &AppState,
    attendee_id: &str,
) -> Result<Vec<DbEventRegistration>, ServiceError> {
    let db = state.db.lock();
    Ok(db.registrations_for_attendee(attendee_id)?)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::db::test_utils::seed_profile;
    use crate::state::test_utils::test_state;

    fn create_upcoming(state: &AppState, organizer: &str, cap: Option<i64>) -> DbEvent {
        let start = (Utc::now() + Duration::hours(4)).to_rfc3339();
        let end = (Utc::now() + Duration::hours(6)).to_rfc3339();
        create_event(
            state,
            &NewEvent {
                organizer_id: organizer,
                organizer_type: ProfileType::Individual,
                title: "Grand Rounds",
                description: None,
                start_time: &start,
                end_time: Some(&end),
                venue: None,
                is_virtual: true,
                meeting_link: Some("https://meet.example.org/rounds"),
                max_attendees: cap,
                registration_fee: None,
            },
        )
        .expect("create event")
    }

    #[test]
    fn test_create_event_validation() {
        let state = test_state();
        {
            let db = state.db.lock();
            seed_profile(&db, "u1", "Dr. Asha Rao");
        }
        let start = (Utc::now() + Duration::hours(1)).to_rfc3339();
        let earlier = Utc::now().to_rfc3339();

        let mut new_event = NewEvent {
            organizer_id: "u1",
            organizer_type: ProfileType::Individual,
            title: "Rounds",
            description: None,
            start_time: "not a time",
            end_time: None,
            venue: None,
            is_virtual: false,
            meeting_link: None,
            max_attendees: None,
            registration_fee: None,
        };
        assert!(matches!(
            create_event(&state, &new_event),
            Err(ServiceError::Validation(_))
        ));

        new_event.start_time = &start;
        new_event.end_time = Some(&earlier);
        assert!(matches!(
            create_event(&state, &new_event),
            Err(ServiceError::Validation(_))
        ));

        new_event.end_time = None;
        new_event.is_virtual = true;
        assert!(matches!(
            create_event(&state, &new_event),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn test_capacity_is_enforced() {
        let state = test_state();
        {
            let db = state.db.lock();
            seed_profile(&db, "org", "Dr. Organizer");
            seed_profile(&db, "u1", "Dr. A");
            seed_profile(&db, "u2", "Dr. B");
            seed_profile(&db, "u3", "Dr. C");
        }
        let event = create_upcoming(&state, "org", Some(2));

        register_for_event(&state, &event.id, "u1").expect("first seat");
        register_for_event(&state, &event.id, "u2").expect("second seat");
        assert!(matches!(
            register_for_event(&state, &event.id, "u3"),
            Err(ServiceError::Conflict(_))
        ));

        // A cancellation frees the seat
        cancel_registration(&state, &event.id, "u1").expect("cancel");
        register_for_event(&state, &event.id, "u3").expect("freed seat");
    }

    #[test]
    fn test_duplicate_registration_and_revival() {
        let state = test_state();
        {
            let db = state.db.lock();
            seed_profile(&db, "org", "Dr. Organizer");
            seed_profile(&db, "u1", "Dr. A");
        }
        let event = create_upcoming(&state, "org", None);

        let first = register_for_event(&state, &event.id, "u1").expect("register");
        assert!(matches!(
            register_for_event(&state, &event.id, "u1"),
            Err(ServiceError::Conflict(_))
        ));

        cancel_registration(&state, &event.id, "u1").expect("cancel");
        let revived = register_for_event(&state, &event.id, "u1").expect("re-register");
        assert_eq!(revived.id, first.id, "cancelled row is revived, not duplicated");
    }

    #[test]
    fn test_cancelled_event_refuses_registration() {
        let state = test_state();
        {
            let db = state.db.lock();
            seed_profile(&db, "org", "Dr. Organizer");
            seed_profile(&db, "u1", "Dr. A");
        }
        let event = create_upcoming(&state, "org", None);
        cancel_event(&state, &event.id).expect("cancel");

        assert!(matches!(
            register_for_event(&state, &event.id, "u1"),
            Err(ServiceError::Conflict(_))
        ));
    }

    #[test]
    fn test_registration_notifies_organizer_and_bus() {
        let state = test_state();
        {
            let db = state.db.lock();
            seed_profile(&db, "org", "Dr. Organizer");
            seed_profile(&db, "u1", "Dr. A");
        }
        let event = create_upcoming(&state, "org", None);
        let mut rx = state.event_bus.subscribe();

        register_for_event(&state, &event.id, "u1").expect("register");

        // Notification first, then the registration change
        assert!(matches!(
            rx.try_recv().expect("event"),
            AppEvent::NotificationCreated { .. }
        ));
        assert_eq!(
            rx.try_recv().expect("event"),
            AppEvent::EventRegistrationChanged {
                event_id: event.id.clone(),
                attendee_id: "u1".into(),
            }
        );

        let listed = list_events(&state, 10).expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].attendee_count, 1);
        assert_eq!(listed[0].effective_status, EventStatus::Upcoming);
    }
}
