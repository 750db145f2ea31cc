// server/src/state.rs
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use poster_fusion_cli::ai::CreativeService;
use poster_fusion_cli::SessionController;
use std::sync::Arc;
use uuid::Uuid;

// One poster session per browser, keyed by the session cookie.
pub struct SessionEntry {
    pub controller: Arc<SessionController>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<DashMap<Uuid, SessionEntry>>,
    pub service: Arc<dyn CreativeService>,
    pub max_sessions: usize,
}

impl AppState {
    pub fn new(service: Arc<dyn CreativeService>, max_sessions: usize) -> Self {
        AppState {
            sessions: Arc::new(DashMap::new()),
            service,
            max_sessions,
        }
    }

    /// Returns the session for `id`, refreshing its idle timer.
    pub fn touch(&self, id: &Uuid) -> Option<Arc<SessionController>> {
        self.sessions.get_mut(id).map(|mut entry| {
            entry.last_seen = Utc::now();
            entry.controller.clone()
        })
    }

    /// Starts a new session, or `None` when `max_sessions` are already live.
    pub fn create(&self) -> Option<(Uuid, Arc<SessionController>)> {
        if self.sessions.len() >= self.max_sessions {
            return None;
        }
        let id = Uuid::new_v4();
        let controller = Arc::new(SessionController::new(self.service.clone()));
        self.sessions.insert(
            id,
            SessionEntry {
                controller: controller.clone(),
                last_seen: Utc::now(),
            },
        );
        Some((id, controller))
    }

    /// Drops sessions idle for longer than `ttl`; returns how many went.
    pub fn prune_idle(&self, ttl: Duration) -> usize {
        let cutoff = Utc::now() - ttl;
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.last_seen >= cutoff);
        before.saturating_sub(self.sessions.len())
    }
}
