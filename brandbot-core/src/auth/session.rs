use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use dashmap::DashMap;
use rand::Rng;
use uuid::Uuid;
use brandbot_common::models::Session;

/// Process-local session table keyed by opaque bearer token.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, user_id: Uuid) -> Session {
        let session = Session {
            token: new_token(),
            user_id,
            created_at: Utc::now(),
        };
        self.sessions.insert(session.token.clone(), session.clone());
        session
    }

    pub fn get(&self, token: &str) -> Option<Session> {
        self.sessions.get(token).map(|entry| entry.value().clone())
    }

    /// Returns whether a session was actually removed.
    pub fn remove(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drops every session belonging to `user_id`.
    pub fn remove_user(&self, user_id: Uuid) {
        self.sessions.retain(|_, s| s.user_id != user_id);
    }
}

fn new_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
