//! Service layer: validation, cross-entity orchestration, cache and event
//! wiring. Each module maps to one surface of the app; all of them take the
//! shared [`AppState`](crate::state::AppState) and return
//! [`ServiceError`](crate::error::ServiceError).

pub mod auth;
pub mod events;
pub mod feed;
pub mod jobs;
pub mod messaging;
pub mod network;
pub mod notifications;
pub mod profiles;
