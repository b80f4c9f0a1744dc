//! Messaging surface: starting conversations, sending messages, read state.

use crate::db::{DbConversation, DbMessage, SocialDb};
use crate::error::ServiceError;
use crate::state::AppState;
use crate::types::{ConversationSummary, ConversationType};

const MAX_MESSAGE_LEN: usize = 5000;

/// Start (or return the existing) direct conversation between two profiles.
pub fn start_direct_conversation(
    state: &AppState,
    a: &str,
    b: &str,
) -> Result<DbConversation, ServiceError> {
    if a == b {
        return Err(ServiceError::Validation(
            "cannot message yourself".into(),
        ));
    }
    let db = state.db.lock();
    for id in [a, b] {
        if db.get_profile(id)?.is_none() {
            return Err(ServiceError::NotFound(format!("profile {}", id)));
        }
    }
    if let Some(existing) = db.find_direct_conversation(a, b)? {
        return Ok(existing);
    }
    Ok(db.insert_conversation(ConversationType::Direct, None, &[a, b])?)
}

/// Create a group or clinical thread with an explicit participant list.
pub fn create_group_conversation(
    state: &AppState,
    conversation_type: ConversationType,
    title: &str,
    participant_ids: &[&str],
) -> Result<DbConversation, ServiceError> {
    if conversation_type == ConversationType::Direct {
        return Err(ServiceError::Validation(
            "direct conversations are started per pair".into(),
        ));
    }
    if title.trim().is_empty() {
        return Err(ServiceError::Validation("a group needs a title".into()));
    }
    if participant_ids.len() < 2 {
        return Err(ServiceError::Validation(
            "a group needs at least two participants".into(),
        ));
    }
    let db = state.db.lock();
    for id in participant_ids {
        if db.get_profile(id)?.is_none() {
            return Err(ServiceError::NotFound(format!("profile {}", id)));
        }
    }
    Ok(db.insert_conversation(conversation_type, Some(title.trim()), participant_ids)?)
}

/// Send a message. Clinical threads stamp every message with the stricter
/// compliance tag; everything else is standard.
pub fn send_message(
    state: &AppState,
    conversation_id: &str,
    sender_id: &str,
    content: &str,
) -> Result<DbMessage, ServiceError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ServiceError::Validation("message is empty".into()));
    }
    if content.len() > MAX_MESSAGE_LEN {
        return Err(ServiceError::Validation(format!(
            "message exceeds {} characters",
            MAX_MESSAGE_LEN
        )));
    }
    let db = state.db.lock();
    let conversation = db
        .get_conversation(conversation_id)?
        .ok_or_else(|| ServiceError::NotFound(format!("conversation {}", conversation_id)))?;
    if !db.is_participant(conversation_id, sender_id)? {
        return Err(ServiceError::Auth(
            "sender is not part of this conversation".into(),
        ));
    }
    let encryption_level = match conversation.conversation_type {
        ConversationType::Clinical => "clinical",
        _ => "standard",
    };
    Ok(db.insert_message(conversation_id, sender_id, content, encryption_level)?)
}

fn summarize(
    db: &SocialDb,
    conversation: DbConversation,
    viewer_id: &str,
) -> Result<ConversationSummary, ServiceError> {
    let participant_ids = db.conversation_participants(&conversation.id)?;
    let last_message = db.last_message(&conversation.id)?;
    let unread_count = db.unread_count(&conversation.id, viewer_id)?;
    Ok(ConversationSummary {
        conversation,
        participant_ids,
        last_message,
        unread_count,
    })
}

/// The viewer's conversation list, most recent activity first.
pub fn list_conversations(
    state: &AppState,
    viewer_id: &str,
) -> Result<Vec<ConversationSummary>, ServiceError> {
    let db = state.db.lock();
    let conversations = db.conversations_for(viewer_id)?;
    let mut results = Vec::with_capacity(conversations.len());
    for conversation in conversations {
        results.push(summarize(&db, conversation, viewer_id)?);
    }
    Ok(results)
}

/// One page of history, oldest-first. Only participants may read.
pub fn get_messages(
    state: &AppState,
    conversation_id: &str,
    viewer_id: &str,
    before: Option<&str>,
    limit: usize,
) -> Result<Vec<DbMessage>, ServiceError> {
    let db = state.db.lock();
    if !db.is_participant(conversation_id, viewer_id)? {
        return Err(ServiceError::Auth(
            "viewer is not part of this conversation".into(),
        ));
    }
    Ok(db.messages_page(conversation_id, before, limit)?)
}

/// Mark everything in the conversation read for the viewer.
pub fn mark_conversation_read(
    state: &AppState,
    conversation_id: &str,
    viewer_id: &str,
) -> Result<usize, ServiceError> {
    let db = state.db.lock();
    if !db.is_participant(conversation_id, viewer_id)? {
        return Err(ServiceError::Auth(
            "viewer is not part of this conversation".into(),
        ));
    }
    Ok(db.mark_messages_read(conversation_id, viewer_id)?)
}
