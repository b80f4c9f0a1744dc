//! Shared application state handed to every service call.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::config::AppConfig;
use crate::db::SocialDb;
use crate::error::ServiceError;
use crate::events::EventBus;
use crate::status_cache::StatusCache;
use crate::storage::Storage;

pub struct AppState {
    pub db: Mutex<SocialDb>,
    pub status_cache: StatusCache,
    pub event_bus: EventBus,
    pub storage: Storage,
    pub config: AppConfig,
    /// Session token -> signed-in profile id. In-memory only; sessions do
    /// not survive a restart.
    sessions: RwLock<HashMap<String, String>>,
}

impl AppState {
    /// Open the database under the configured data directory and wire up the
    /// caches and bus.
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        let data_dir = config.resolved_data_dir()?;
        let db = SocialDb::open_at(data_dir.join("kendraa.db"))?;
        log::info!("opened data dir at {}", data_dir.display());
        Ok(Self {
            db: Mutex::new(db),
            status_cache: StatusCache::with_ttl(Duration::from_secs(
                config.status_cache_ttl_secs,
            )),
            event_bus: EventBus::new(),
            storage: Storage::new(&data_dir),
            config,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    pub fn insert_session(&self, token: &str, user_id: &str) {
        self.sessions
            .write()
            .insert(token.to_string(), user_id.to_string());
    }

    /// The profile id behind a session token, or an auth error.
    pub fn session_user(&self, token: &str) -> Result<String, ServiceError> {
        self.sessions
            .read()
            .get(token)
            .cloned()
            .ok_or_else(|| ServiceError::Auth("invalid or expired session".into()))
    }

    /// Returns false when the token was already gone.
    pub fn remove_session(&self, token: &str) -> bool {
        self.sessions.write().remove(token).is_some()
    }
}

#[cfg(test)]
pub mod test_utils {
    use std::collections::HashMap;
    use std::time::Duration;

    use parking_lot::{Mutex, RwLock};

    use super::AppState;
    use crate::config::AppConfig;
    use crate::db::test_utils::test_db;
    use crate::events::EventBus;
    use crate::status_cache::StatusCache;
    use crate::storage::Storage;

    /// State over a temp database and temp storage root. FK enforcement is
    /// on here, unlike `test_db` used alone, because service tests go
    /// through the real write paths.
    pub fn test_state() -> AppState {
        let db = test_db();
        db.conn_ref()
            .execute_batch("PRAGMA foreign_keys = ON;")
            .expect("enable FK");
        let storage_dir = tempfile::tempdir().expect("temp dir");
        let storage = Storage::new(storage_dir.path());
        std::mem::forget(storage_dir);
        AppState {
            db: Mutex::new(db),
            status_cache: StatusCache::with_ttl(Duration::from_secs(30)),
            event_bus: EventBus::new(),
            storage,
            config: AppConfig::default(),
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::test_state;

    #[test]
    fn test_session_round_trip() {
        let state = test_state();
        state.insert_session("tok-1", "u1");

        assert_eq!(state.session_user("tok-1").expect("valid"), "u1");
        assert!(state.session_user("tok-2").is_err());

        assert!(state.remove_session("tok-1"));
        assert!(!state.remove_session("tok-1"));
        assert!(state.session_user("tok-1").is_err());
    }
}
