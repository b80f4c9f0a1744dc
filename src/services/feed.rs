//! Feed surface: composing posts, paging the feed, likes, comments, shares.

use crate::db::{DbComment, DbPost, SocialDb};
use crate::error::ServiceError;
use crate::services::notifications;
use crate::state::AppState;
use crate::types::{NotificationKind, PostWithAuthor};

const MAX_POST_LEN: usize = 3000;
const MAX_COMMENT_LEN: usize = 1000;

pub fn create_post(
    state: &AppState,
    author_id: &str,
    content: &str,
    image_url: Option<&str>,
) -> Result<DbPost, ServiceError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ServiceError::Validation("post content is empty".into()));
    }
    if content.len() > MAX_POST_LEN {
        return Err(ServiceError::Validation(format!(
            "post exceeds {} characters",
            MAX_POST_LEN
        )));
    }
    let db = state.db.lock();
    if db.get_profile(author_id)?.is_none() {
        return Err(ServiceError::NotFound(format!("profile {}", author_id)));
    }
    Ok(db.insert_post(author_id, content, image_url)?)
}

fn attach_author(
    db: &SocialDb,
    post: DbPost,
    viewer_id: &str,
) -> Result<Option<PostWithAuthor>, ServiceError> {
    // Posts whose author vanished are dropped from the page rather than
    // failing the whole feed
    let Some(author) = db.actor_for_profile(&post.author_id)? else {
        log::warn!("post {} has no resolvable author", post.id);
        return Ok(None);
    };
    let liked_by_viewer = db.has_liked(&post.id, viewer_id)?;
    Ok(Some(PostWithAuthor {
        post,
        author,
        liked_by_viewer,
    }))
}

/// One page of the reverse-chronological feed with authors resolved and the
/// viewer's like state attached.
pub fn get_feed(
    state: &AppState,
    viewer_id: &str,
    page: usize,
) -> Result<Vec<PostWithAuthor>, ServiceError> {
    let db = state.db.lock();
    let posts = db.feed_page(page, state.config.feed_page_size)?;
    let mut results = Vec::with_capacity(posts.len());
    for post in posts {
        if let Some(with_author) = attach_author(&db, post, viewer_id)? {
            results.push(with_author);
        }
    }
    Ok(results)
}

pub fn posts_by_author(
    state: &AppState,
    viewer_id: &str,
    author_id: &str,
    limit: usize,
) -> Result<Vec<PostWithAuthor>, ServiceError> {
    let db = state.db.lock();
    let posts = db.posts_by_author(author_id, limit)?;
    let mut results = Vec::with_capacity(posts.len());
    for post in posts {
        if let Some(with_author) = attach_author(&db, post, viewer_id)? {
            results.push(with_author);
        }
    }
    Ok(results)
}

/// Like a post and notify its author. Liking twice is a no-op and sends no
/// second notification; liking your own post is never announced.
pub fn like_post(state: &AppState, post_id: &str, viewer_id: &str) -> Result<(), ServiceError> {
    let db = state.db.lock();
    let post = db
        .get_post(post_id)?
        .ok_or_else(|| ServiceError::NotFound(format!("post {}", post_id)))?;
    if !db.like_post(post_id, viewer_id)? {
        return Ok(());
    }
    if post.author_id != viewer_id {
        let liker = display_name_of(&db, viewer_id)?;
        notifications::push(
            state,
            &db,
            &post.author_id,
            NotificationKind::PostLike,
            &format!("{} liked your post", liker),
            None,
        )?;
    }
    Ok(())
}

pub fn unlike_post(state: &AppState, post_id: &str, viewer_id: &str) -> Result<(), ServiceError> {
    let db = state.db.lock();
    db.unlike_post(post_id, viewer_id)?;
    Ok(())
}

pub fn comment_on_post(
    state: &AppState,
    post_id: &str,
    author_id: &str,
    content: &str,
) -> Result<DbComment, ServiceError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ServiceError::Validation("comment is empty".into()));
    }
    if content.len() > MAX_COMMENT_LEN {
        return Err(ServiceError::Validation(format!(
            "comment exceeds {} characters",
            MAX_COMMENT_LEN
        )));
    }
    let db = state.db.lock();
    let post = db
        .get_post(post_id)?
        .ok_or_else(|| ServiceError::NotFound(format!("post {}", post_id)))?;
    let comment = db.insert_comment(post_id, author_id, content)?;
    if post.author_id != author_id {
        let commenter = display_name_of(&db, author_id)?;
        notifications::push(
            state,
            &db,
            &post.author_id,
            NotificationKind::PostComment,
            &format!("{} commented on your post", commenter),
            Some(content),
        )?;
    }
    Ok(comment)
}

pub fn comments_for_post(
    state: &AppState,
    post_id: &str,
) -> Result<Vec<DbComment>, ServiceError> {
    let db = state.db.lock();
    Ok(db.comments_for_post(post_id)?)
}

pub fn share_post(state: &AppState, post_id: &str) -> Result<(), ServiceError> {
    let db = state.db.lock();
    if db.get_post(post_id)?.is_none() {
        return Err(ServiceError::NotFound(format!("post {}", post_id)));
    }
    db.increment_shares(post_id)?;
    Ok(())
}

fn display_name_of(db: &SocialDb, profile_id: &str) -> Result<String, ServiceError> {
    Ok(db
        .actor_for_profile(profile_id)?
        .map(|actor| actor.display_name().to_string())
        .unwrap_or_else(|| "Someone".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{seed_institution, seed_profile};
    use crate::state::test_utils::test_state;
    use crate::types::Actor;

    #[test]
    fn test_feed_attaches_author_and_like_state() {
        let state = test_state();
        {
            let db = state.db.lock();
            seed_profile(&db, "u1", "Dr. Asha Rao");
            seed_profile(&db, "u2", "Dr. Ben Okafor");
        }

        let post = create_post(&state, "u1", "Interesting case today.", None).expect("post");
        like_post(&state, &post.id, "u2").expect("like");

        let feed = get_feed(&state, "u2", 0).expect("feed");
        assert_eq!(feed.len(), 1);
        assert!(feed[0].liked_by_viewer);
        match &feed[0].author {
            Actor::Individual { full_name, .. } => assert_eq!(full_name, "Dr. Asha Rao"),
            other => panic!("expected individual author, got {:?}", other),
        }

        let as_author = get_feed(&state, "u1", 0).expect("feed");
        assert!(!as_author[0].liked_by_viewer);
    }

    #[test]
    fn test_like_notifies_author_once() {
        let state = test_state();
        {
            let db = state.db.lock();
            seed_profile(&db, "u1", "Dr. Asha Rao");
            seed_profile(&db, "u2", "Dr. Ben Okafor");
        }
        let post = create_post(&state, "u1", "hello", None).expect("post");

        like_post(&state, &post.id, "u2").expect("like");
        like_post(&state, &post.id, "u2").expect("second like is a no-op");
        // Self-like is counted but never announced
        like_post(&state, &post.id, "u1").expect("self like");

        let db = state.db.lock();
        assert_eq!(db.unread_notification_count("u1").expect("count"), 1);
        assert_eq!(db.unread_notification_count("u2").expect("count"), 0);
    }

    #[test]
    fn test_comment_notification_carries_content() {
        let state = test_state();
        {
            let db = state.db.lock();
            seed_profile(&db, "u1", "Dr. Asha Rao");
            seed_profile(&db, "u2", "Dr. Ben Okafor");
        }
        let post = create_post(&state, "u1", "hello", None).expect("post");
        comment_on_post(&state, &post.id, "u2", "Great writeup").expect("comment");

        let db = state.db.lock();
        let tray = db.notifications_for_user("u1", 10).expect("list");
        assert_eq!(tray.len(), 1);
        assert_eq!(tray[0].body.as_deref(), Some("Great writeup"));
    }

    #[test]
    fn test_create_post_validation() {
        let state = test_state();
        {
            let db = state.db.lock();
            seed_profile(&db, "u1", "Dr. Asha Rao");
        }
        assert!(matches!(
            create_post(&state, "u1", "   ", None),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            create_post(&state, "u1", &"x".repeat(MAX_POST_LEN + 1), None),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            create_post(&state, "ghost", "hello", None),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn test_institution_author_resolves_as_institution() {
        let state = test_state();
        {
            let db = state.db.lock();
            // An institution account posts through its institution-typed profile
            db.insert_profile(
                "i1",
                "clinic@example.org",
                "Lakeside Clinic",
                crate::types::ProfileType::Institution,
            )
            .expect("seed");
            seed_institution(&db, "inst-i1", "Lakeside Clinic");
        }
        let post = create_post(&state, "i1", "We're hiring.", None).expect("post");
        let feed = get_feed(&state, "i1", 0).expect("feed");
        assert_eq!(feed[0].post.id, post.id);
        assert!(matches!(feed[0].author, Actor::Institution { .. }));
    }
}
