//! Shared type definitions for the database layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{
    ApplicationStatus, ConnectionStatus, ConversationType, EventStatus, JobStatus,
    NotificationKind, ProfileType, RegistrationStatus,
};

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),
}

/// A row from the `profiles` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbProfile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,
    /// JSON array of specializations, stored as TEXT.
    pub specializations: Option<String>,
    pub profile_type: ProfileType,
    pub onboarding_completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A row from the `institutions` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbInstitution {
    pub id: String,
    pub name: String,
    pub institution_type: Option<String>,
    pub website: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub location: Option<String>,
    pub logo_url: Option<String>,
    /// Owning profile.
    pub admin_profile_id: Option<String>,
    pub created_at: String,
}

/// A row from the `posts` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbPost {
    pub id: String,
    pub author_id: String,
    pub content: String,
    pub image_url: Option<String>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub shares_count: i64,
    pub created_at: String,
}

/// A row from the `post_comments` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbComment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub content: String,
    pub created_at: String,
}

/// A row from the `connections` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbConnection {
    pub id: String,
    pub requester_id: String,
    pub recipient_id: String,
    pub status: ConnectionStatus,
    pub created_at: String,
    pub responded_at: Option<String>,
}

/// A row from the `jobs` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbJob {
    pub id: String,
    pub company_id: String,
    pub title: String,
    pub description: Option<String>,
    pub job_type: Option<String>,
    pub experience_level: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    /// JSON array of specializations, stored as TEXT.
    pub specializations: Option<String>,
    pub applications_count: i64,
    pub status: JobStatus,
    pub created_at: String,
}

/// A row from the `job_applications` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbJobApplication {
    pub id: String,
    pub job_id: String,
    pub applicant_id: String,
    pub cover_letter: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: String,
}

/// A row from the `events` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbEvent {
    pub id: String,
    pub organizer_id: String,
    pub organizer_type: ProfileType,
    pub title: String,
    pub description: Option<String>,
    pub start_time: String,
    pub end_time: Option<String>,
    pub venue: Option<String>,
    pub is_virtual: bool,
    pub meeting_link: Option<String>,
    pub max_attendees: Option<i64>,
    pub registration_fee: Option<f64>,
    pub status: EventStatus,
    pub created_at: String,
}

/// A row from the `event_registrations` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbEventRegistration {
    pub id: String,
    pub event_id: String,
    pub attendee_id: String,
    pub status: RegistrationStatus,
    pub created_at: String,
}

/// A row from the `conversations` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbConversation {
    pub id: String,
    pub conversation_type: ConversationType,
    pub title: Option<String>,
    pub created_at: String,
}

/// A row from the `messages` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    /// Compliance tag carried on every message ("standard" or "clinical").
    pub encryption_level: String,
    /// JSON array of profile ids that have read this message.
    pub read_by: String,
    pub created_at: String,
}

impl DbMessage {
    /// Parse the `read_by` JSON column. Malformed data reads as unread.
    pub fn read_by_ids(&self) -> Vec<String> {
        serde_json::from_str(&self.read_by).unwrap_or_default()
    }
}

/// A row from the `notifications` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbNotification {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

/// A row from the `auth_users` table.
#[derive(Debug, Clone)]
pub struct DbAuthUser {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub salt: String,
    pub created_at: String,
}
