//! Kendraa — professional networking core for healthcare.
//!
//! Profiles and institutions, a reverse-chronological feed, a connection and
//! follow graph with a short-TTL status cache, direct and clinical messaging,
//! a job board, and events with attendee registration. Everything persists in
//! a single SQLite database under `~/.kendraa/`; media lands in per-bucket
//! directories next to it.
//!
//! Construct an [`AppState`](state::AppState) from an
//! [`AppConfig`](config::AppConfig) and call into the [`services`] modules;
//! subscribe to the [`events::EventBus`] to react to status changes and new
//! notifications.

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod migrations;
pub mod services;
pub mod state;
pub mod status_cache;
pub mod storage;
pub mod types;
