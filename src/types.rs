//! Shared domain types: status enums, the polymorphic actor, and the
//! view-models the service layer hands back to callers.

use serde::{Deserialize, Serialize};

use crate::db::{DbConversation, DbEvent, DbJob, DbMessage, DbPost};

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Whether a profile is an individual professional or an institution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileType {
    Individual,
    Institution,
}

impl ProfileType {
    /// String label for SQL storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileType::Individual => "individual",
            ProfileType::Institution => "institution",
        }
    }

    /// Parse from SQL string.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "institution" => ProfileType::Institution,
            _ => ProfileType::Individual,
        }
    }
}

/// One-directional edge from an individual toward an institution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowStatus {
    None,
    Following,
}

impl FollowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowStatus::None => "none",
            FollowStatus::Following => "following",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "following" => FollowStatus::Following,
            _ => FollowStatus::None,
        }
    }
}

/// Mutual networking edge between two individual profiles, as seen from one
/// side of the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    None,
    Pending,
    Connected,
    Rejected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::None => "none",
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Rejected => "rejected",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "pending" => ConnectionStatus::Pending,
            // Rows imported from the hosted store used "accepted".
            "connected" | "accepted" => ConnectionStatus::Connected,
            "rejected" => ConnectionStatus::Rejected,
            _ => ConnectionStatus::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Active,
    Closed,
    Draft,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Active => "active",
            JobStatus::Closed => "closed",
            JobStatus::Draft => "draft",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "closed" => JobStatus::Closed,
            "draft" => JobStatus::Draft,
            _ => JobStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Reviewed,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Reviewed => "reviewed",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "reviewed" => ApplicationStatus::Reviewed,
            "accepted" => ApplicationStatus::Accepted,
            "rejected" => ApplicationStatus::Rejected,
            _ => ApplicationStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "upcoming",
            EventStatus::Ongoing => "ongoing",
            EventStatus::Completed => "completed",
            EventStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "ongoing" => EventStatus::Ongoing,
            "completed" => EventStatus::Completed,
            "cancelled" => EventStatus::Cancelled,
            _ => EventStatus::Upcoming,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Registered,
    Attended,
    Cancelled,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Registered => "registered",
            RegistrationStatus::Attended => "attended",
            RegistrationStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "attended" => RegistrationStatus::Attended,
            "cancelled" => RegistrationStatus::Cancelled,
            _ => RegistrationStatus::Registered,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationType {
    Direct,
    Group,
    /// Compliance-tagged clinical thread.
    Clinical,
}

impl ConversationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationType::Direct => "direct",
            ConversationType::Group => "group",
            ConversationType::Clinical => "clinical",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "group" => ConversationType::Group,
            "clinical" => ConversationType::Clinical,
            _ => ConversationType::Direct,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ConnectionRequest,
    ConnectionAccepted,
    PostLike,
    PostComment,
    JobApplication,
    EventRegistration,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ConnectionRequest => "connection_request",
            NotificationKind::ConnectionAccepted => "connection_accepted",
            NotificationKind::PostLike => "post_like",
            NotificationKind::PostComment => "post_comment",
            NotificationKind::JobApplication => "job_application",
            NotificationKind::EventRegistration => "event_registration",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "connection_accepted" => NotificationKind::ConnectionAccepted,
            "post_like" => NotificationKind::PostLike,
            "post_comment" => NotificationKind::PostComment,
            "job_application" => NotificationKind::JobApplication,
            "event_registration" => NotificationKind::EventRegistration,
            _ => NotificationKind::ConnectionRequest,
        }
    }
}

// ---------------------------------------------------------------------------
// Actor — polymorphic author/organizer, tagged once in the query layer
// ---------------------------------------------------------------------------

/// An author or organizer, which is one of two shapes. The query layer tags
/// the variant when it attaches the actor, so no caller ever derives "is this
/// an institution" from field presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Actor {
    Individual {
        id: String,
        #[serde(rename = "fullName")]
        full_name: String,
        headline: Option<String>,
        #[serde(rename = "avatarUrl")]
        avatar_url: Option<String>,
    },
    Institution {
        id: String,
        name: String,
        #[serde(rename = "institutionType")]
        institution_type: Option<String>,
        #[serde(rename = "logoUrl")]
        logo_url: Option<String>,
    },
}

impl Actor {
    pub fn id(&self) -> &str {
        match self {
            Actor::Individual { id, .. } | Actor::Institution { id, .. } => id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Actor::Individual { full_name, .. } => full_name,
            Actor::Institution { name, .. } => name,
        }
    }

    pub fn avatar_url(&self) -> Option<&str> {
        match self {
            Actor::Individual { avatar_url, .. } => avatar_url.as_deref(),
            Actor::Institution { logo_url, .. } => logo_url.as_deref(),
        }
    }
}

// ---------------------------------------------------------------------------
// View-models
// ---------------------------------------------------------------------------

/// A feed post with its author resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostWithAuthor {
    #[serde(flatten)]
    pub post: DbPost,
    pub author: Actor,
    /// Whether the viewing profile has liked this post.
    pub liked_by_viewer: bool,
}

/// A job posting with its company resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobWithCompany {
    #[serde(flatten)]
    pub job: DbJob,
    pub company: Actor,
}

/// An event with its organizer resolved and the clock-derived status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWithOrganizer {
    #[serde(flatten)]
    pub event: DbEvent,
    pub organizer: Actor,
    /// Stored status corrected against start/end times.
    pub effective_status: EventStatus,
    pub attendee_count: i64,
}

/// A conversation as listed on the messaging surface: participants, last
/// message, and the viewer's unread count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: DbConversation,
    pub participant_ids: Vec<String>,
    pub last_message: Option<DbMessage>,
    pub unread_count: i64,
}

/// Read-only aggregate for the network page header.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStats {
    pub connections: i64,
    pub pending_incoming: i64,
    pub following: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_status_round_trip() {
        for s in [
            ConnectionStatus::None,
            ConnectionStatus::Pending,
            ConnectionStatus::Connected,
            ConnectionStatus::Rejected,
        ] {
            assert_eq!(ConnectionStatus::from_str_lossy(s.as_str()), s);
        }
    }

    #[test]
    fn test_connection_status_accepts_legacy_accepted() {
        assert_eq!(
            ConnectionStatus::from_str_lossy("accepted"),
            ConnectionStatus::Connected
        );
    }

    #[test]
    fn test_unknown_status_strings_fall_back() {
        assert_eq!(FollowStatus::from_str_lossy("???"), FollowStatus::None);
        assert_eq!(EventStatus::from_str_lossy(""), EventStatus::Upcoming);
        assert_eq!(JobStatus::from_str_lossy("junk"), JobStatus::Active);
    }

    #[test]
    fn test_actor_display_name() {
        let person = Actor::Individual {
            id: "p1".into(),
            full_name: "Dr. Asha Rao".into(),
            headline: Some("Cardiologist".into()),
            avatar_url: None,
        };
        let clinic = Actor::Institution {
            id: "i1".into(),
            name: "Lakeside Clinic".into(),
            institution_type: Some("hospital".into()),
            logo_url: Some("logos/i1.png".into()),
        };
        assert_eq!(person.display_name(), "Dr. Asha Rao");
        assert_eq!(clinic.display_name(), "Lakeside Clinic");
        assert_eq!(clinic.avatar_url(), Some("logos/i1.png"));
    }
}
