use axum::http::{HeaderMap, header};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock, watch};
use tokio::time;
use tracing::{debug, info};
use uuid::Uuid;

use super::dashboard::DashboardPage;
use super::events::EventsPage;
use super::monitoring::MonitoringPage;
use super::nodes::NodesPage;
use super::pods::PodsPage;
use super::shell::{ShellState, Theme};

pub const SESSION_COOKIE: &str = "klaw_session";

const REAP_INTERVAL: Duration = Duration::from_secs(60);

/// Everything one browser sees: shell state plus the view state of each page.
pub struct Session {
    pub id: String,
    pub shell: ShellState,
    pub dashboard: Mutex<DashboardPage>,
    pub pods: Arc<Mutex<PodsPage>>,
    pub nodes: Mutex<NodesPage>,
    pub events: Mutex<EventsPage>,
    pub monitoring: Mutex<MonitoringPage>,
    touched: AtomicU64,
    open_streams: AtomicUsize,
}

impl Session {
    fn new(id: String, theme: Theme, now: u64) -> Self {
        Self {
            id,
            shell: ShellState::init(theme),
            dashboard: Mutex::default(),
            pods: Arc::default(),
            nodes: Mutex::default(),
            events: Mutex::default(),
            monitoring: Mutex::default(),
            touched: AtomicU64::new(now),
            open_streams: AtomicUsize::new(0),
        }
    }

    /// Keeps the session out of the reaper's reach until the lease is dropped.
    pub fn hold(self: &Arc<Self>) -> SessionLease {
        self.open_streams.fetch_add(1, Ordering::Relaxed);
        SessionLease(Arc::clone(self))
    }

    fn is_held(&self) -> bool {
        self.open_streams.load(Ordering::Relaxed) > 0
    }
}

/// Held by long-lived responses such as the theme stream.
pub struct SessionLease(Arc<Session>);

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.0.open_streams.fetch_sub(1, Ordering::Relaxed);
    }
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    default_theme: Theme,
    idle: Duration,
    epoch: Instant,
}

impl SessionStore {
    pub fn new(default_theme: Theme, idle: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            default_theme,
            idle,
            epoch: Instant::now(),
        }
    }

    /// Returns the session for `id`, or a fresh one. The flag is true when a
    /// new session was created and the caller must set the cookie.
    pub async fn get_or_create(&self, id: Option<&str>) -> (Arc<Session>, bool) {
        let now = self.now_secs();
        if let Some(id) = id {
            if let Some(session) = self.sessions.read().await.get(id) {
                session.touched.store(now, Ordering::Relaxed);
                return (session.clone(), false);
            }
        }

        let id = Uuid::new_v4().to_string();
        let session = Arc::new(Session::new(id.clone(), self.default_theme, now));
        self.sessions.write().await.insert(id.clone(), session.clone());
        debug!("created session {}", id);
        (session, true)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops sessions not touched within the idle window and not held by an
    /// open stream; returns how many went.
    pub async fn evict_idle(&self) -> usize {
        let now = self.now_secs();
        let idle = self.idle.as_secs();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| {
            s.is_held() || now.saturating_sub(s.touched.load(Ordering::Relaxed)) < idle
        });
        before - sessions.len()
    }

    pub async fn run_reaper(self: Arc<Self>, mut shutdown: watch::Receiver<()>) {
        let mut interval = time::interval(REAP_INTERVAL);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let evicted = self.evict_idle().await;
                    if evicted > 0 {
                        info!("evicted {} idle sessions, {} active", evicted, self.len().await);
                    }
                }
                _ = shutdown.changed() => {
                    info!("session reaper shutting down");
                    return;
                }
            }
        }
    }

    fn now_secs(&self) -> u64 {
        self.epoch.elapsed().as_secs()
    }
}

pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == SESSION_COOKIE)
        .map(|(_, v)| v.to_string())
        .filter(|v| !v.is_empty())
}

pub fn session_cookie(id: &str) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}
