//! Event queries: events and attendee registrations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{DbError, DbEvent, DbEventRegistration, SocialDb};
use crate::types::{EventStatus, ProfileType, RegistrationStatus};

fn map_event(row: &Row) -> rusqlite::Result<DbEvent> {
    Ok(DbEvent {
        id: row.get(0)?,
        organizer_id: row.get(1)?,
        organizer_type: ProfileType::from_str_lossy(&row.get::<_, String>(2)?),
        title: row.get(3)?,
        description: row.get(4)?,
        start_time: row.get(5)?,
        end_time: row.get(6)?,
        venue: row.get(7)?,
        is_virtual: row.get::<_, i64>(8)? != 0,
        meeting_link: row.get(9)?,
        max_attendees: row.get(10)?,
        registration_fee: row.get(11)?,
        status: EventStatus::from_str_lossy(&row.get::<_, String>(12)?),
        created_at: row.get(13)?,
    })
}

const EVENT_COLUMNS: &str = "id, organizer_id, organizer_type, title, description, start_time,
     end_time, venue, is_virtual, meeting_link, max_attendees, registration_fee, status, created_at";

impl DbEvent {
    /// Stored status corrected against the clock. Cancellation and an
    /// explicitly stored "completed" always win; otherwise the start/end
    /// times decide. An event with no end time stays ongoing once started.
    pub fn effective_status(&self, now: DateTime<Utc>) -> EventStatus {
        match self.status {
            EventStatus::Cancelled => return EventStatus::Cancelled,
            EventStatus::Completed => return EventStatus::Completed,
            _ => {}
        }
        let Ok(start) = DateTime::parse_from_rfc3339(&self.start_time) else {
            return self.status;
        };
        if now < start.with_timezone(&Utc) {
            return EventStatus::Upcoming;
        }
        if let Some(ref end) = self.end_time {
            if let Ok(end) = DateTime::parse_from_rfc3339(end) {
                if now > end.with_timezone(&Utc) {
                    return EventStatus::Completed;
                }
            }
        }
        EventStatus::Ongoing
    }
}

impl SocialDb {
    pub fn insert_event(&self, event: &DbEvent) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO events
                (id, organizer_id, organizer_type, title, description, start_time, end_time,
                 venue, is_virtual, meeting_link, max_attendees, registration_fee, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                event.id,
                event.organizer_id,
                event.organizer_type.as_str(),
                event.title,
                event.description,
                event.start_time,
                event.end_time,
                event.venue,
                event.is_virtual as i64,
                event.meeting_link,
                event.max_attendees,
                event.registration_fee,
                event.status.as_str(),
                event.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_event(&self, id: &str) -> Result<Option<DbEvent>, DbError> {
        let event = self
            .conn
            .query_row(
                &format!("SELECT {} FROM events WHERE id = ?1", EVENT_COLUMNS),
                [id],
                map_event,
            )
            .optional()?;
        Ok(event)
    }

    /// Soonest-first listing for the events page.
    pub fn list_events(&self, limit: usize) -> Result<Vec<DbEvent>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM events ORDER BY start_time ASC LIMIT ?1",
            EVENT_COLUMNS
        ))?;
        let rows = stmt.query_map([limit as i64], map_event)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn events_by_organizer(&self, organizer_id: &str) -> Result<Vec<DbEvent>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM events WHERE organizer_id = ?1 ORDER BY start_time ASC",
            EVENT_COLUMNS
        ))?;
        let rows = stmt.query_map([organizer_id], map_event)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn set_event_status(&self, event_id: &str, status: EventStatus) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE events SET status = ?2 WHERE id = ?1",
            params![event_id, status.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Registrations counted toward capacity (cancelled ones don't hold a
    /// seat).
    pub fn active_registration_count(&self, event_id: &str) -> Result<i64, DbError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM event_registrations
             WHERE event_id = ?1 AND status != 'cancelled'",
            [event_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Create a registration row. Fails on the (event, attendee) constraint
    /// for duplicates; capacity is the service layer's check.
    pub fn insert_registration(
        &self,
        event_id: &str,
        attendee_id: &str,
    ) -> Result<DbEventRegistration, DbError> {
        let registration = DbEventRegistration {
            id: format!("reg-{}", Uuid::new_v4()),
            event_id: event_id.to_string(),
            attendee_id: attendee_id.to_string(),
            status: RegistrationStatus::Registered,
            created_at: Utc::now().to_rfc3339(),
        };
        self.conn.execute(
            "INSERT INTO event_registrations (id, event_id, attendee_id, status, created_at)
             VALUES (?1, ?2, ?3, 'registered', ?4)",
            params![
                registration.id,
                registration.event_id,
                registration.attendee_id,
                registration.created_at
            ],
        )?;
        Ok(registration)
    }

    pub fn get_registration(
        &self,
        event_id: &str,
        attendee_id: &str,
    ) -> Result<Option<DbEventRegistration>, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, event_id, attendee_id, status, created_at
                 FROM event_registrations WHERE event_id = ?1 AND attendee_id = ?2",
                params![event_id, attendee_id],
                |row| {
                    Ok(DbEventRegistration {
                        id: row.get(0)?,
                        event_id: row.get(1)?,
                        attendee_id: row.get(2)?,
                        status: RegistrationStatus::from_str_lossy(&row.get::<_, String>(3)?),
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn set_registration_status(
        &self,
        registration_id: &str,
        status: RegistrationStatus,
    ) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE event_registrations SET status = ?2 WHERE id = ?1",
            params![registration_id, status.as_str()],
        )?;
        Ok(changed > 0)
    }

    pub fn registrations_for_attendee(
        &self,
        attendee_id: &str,
    ) -> Result<Vec<DbEventRegistration>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, event_id, attendee_id, status, created_at
             FROM event_registrations WHERE attendee_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([attendee_id], |row| {
            Ok(DbEventRegistration {
                id: row.get(0)?,
                event_id: row.get(1)?,
                attendee_id: row.get(2)?,
                status: RegistrationStatus::from_str_lossy(&row.get::<_, String>(3)?),
                created_at: row.get(4)?,
            })
        })?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}
