//! Per-client sessions.
//!
//! A session is created on first contact and identified by the
//! `glycodash_session` cookie. All handler work for one session runs inside
//! its turn lock, so a session processes one event at a time; different
//! sessions run in parallel and share only the immutable reference data.
//!
//! Sessions that see no request for `server.session_idle_secs` are closed by
//! a background sweep, see [`spawn_idle_sweeper`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use glycodash_auth::SessionAuth;
use glycodash_common::SessionId;
use glycodash_context::{BranchSelection, BranchSplit, ContextView, FilterSelection};
use glycodash_data::{SessionDataStore, ViewMemo};

use crate::error::ApiError;
use crate::state::SharedState;

pub const SESSION_COOKIE: &str = "glycodash_session";

/// State touched by handlers, guarded by the session's turn lock.
pub struct SessionTurn {
    pub auth: SessionAuth,
    pub data: SessionDataStore,
    pub context_views: ViewMemo<FilterSelection, ContextView>,
    pub branch_views: ViewMemo<BranchSelection, BranchSplit>,
}

pub struct Session {
    pub id: SessionId,
    created: Instant,
    /// Milliseconds after `created` of the last request.
    last_seen_ms: AtomicU64,
    closed: AtomicBool,
    turn: Mutex<SessionTurn>,
}

impl Session {
    pub fn new(id: SessionId, auth: SessionAuth, data: SessionDataStore) -> Self {
        Self {
            id,
            created: Instant::now(),
            last_seen_ms: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            turn: Mutex::new(SessionTurn {
                auth,
                data,
                context_views: ViewMemo::new(),
                branch_views: ViewMemo::new(),
            }),
        }
    }

    /// Wait for this session's previous event to finish.
    pub async fn turn(&self) -> MutexGuard<'_, SessionTurn> {
        self.turn.lock().await
    }

    /// Set once the client disconnects. Work still in flight checks this
    /// before committing results.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Record activity.
    pub fn touch(&self) {
        let ms = u64::try_from(self.created.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_seen_ms.fetch_max(ms, Ordering::AcqRel);
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        let ms = self.last_seen_ms.load(Ordering::Acquire);
        match self.created.checked_add(Duration::from_millis(ms)) {
            Some(last_seen) => now.saturating_duration_since(last_seen),
            None => Duration::ZERO,
        }
    }

    /// A request is running inside this session's turn.
    fn is_busy(&self) -> bool {
        self.turn.try_lock().is_err()
    }
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
}

impl SessionRegistry {
    pub async fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn insert(&self, session: Session) -> Arc<Session> {
        let session = Arc::new(session);
        self.sessions
            .write()
            .await
            .insert(session.id, Arc::clone(&session));
        info!(session_id = %session.id, "Session created");
        session
    }

    /// Disconnect: drop the session and flag it closed. Does not wait for the
    /// turn lock, so an in-flight exchange sees the flag and discards its
    /// result.
    pub async fn close(&self, id: &SessionId) -> bool {
        let Some(session) = self.sessions.write().await.remove(id) else {
            return false;
        };
        session.close();
        info!(session_id = %id, "Session closed");
        true
    }

    /// Close every session idle for at least `max_idle`. Sessions with a
    /// request in flight are left alone until the next sweep.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let stale: Vec<SessionId> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.idle_for(now) >= max_idle && !s.is_busy())
            .map(|s| s.id)
            .collect();

        let mut evicted = 0;
        for id in stale {
            if self.close(&id).await {
                evicted += 1;
            }
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Run [`SessionRegistry::evict_idle`] every `server.session_sweep_secs`.
pub fn spawn_idle_sweeper(state: SharedState) -> JoinHandle<()> {
    let max_idle = state.config.server.session_idle();
    let every = state.config.server.session_sweep_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = state.sessions.evict_idle(max_idle).await;
            if evicted > 0 {
                let remaining = state.sessions.len().await;
                info!(evicted, remaining, "Idle sessions closed");
            } else {
                debug!("No idle sessions");
            }
        }
    })
}

// ── Cookie ─────────────────────────────────────────────────────────────

pub(crate) fn session_cookie(id: SessionId) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

pub(crate) fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

fn cookie_session_id(jar: &CookieJar) -> Option<SessionId> {
    jar.get(SESSION_COOKIE)
        .and_then(|c| c.value().parse::<SessionId>().ok())
}

// ── Middleware & extractor ─────────────────────────────────────────────

/// Resolve the caller's session, creating one on first contact, and make it
/// available to handlers through [`CurrentSession`].
pub async fn attach_session(
    State(state): State<SharedState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let existing = match cookie_session_id(&jar) {
        Some(id) => state.sessions.get(&id).await,
        None => None,
    };
    let (session, created) = match existing {
        Some(session) => (session, false),
        None => (state.sessions.insert(state.new_session()).await, true),
    };

    session.touch();
    req.extensions_mut().insert(Arc::clone(&session));
    let response = next.run(req).await;
    session.touch();

    if created {
        (jar.add(session_cookie(session.id)), response).into_response()
    } else {
        response
    }
}

/// The session resolved by [`attach_session`].
#[derive(Clone)]
pub struct CurrentSession(pub Arc<Session>);

impl<S: Send + Sync> FromRequestParts<S> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<Session>>()
            .cloned()
            .map(CurrentSession)
            .ok_or(ApiError::NoSession)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glycodash_data::{DataFiles, LocalDirSource, ReferenceStore};

    fn session() -> Session {
        let files = DataFiles {
            dataset: "dataset.csv".into(),
            taxonomy: "taxonomy.csv".into(),
            structure_projection: "structures.csv".into(),
            word_projection: "words.csv".into(),
            letter_projection: "letters.csv".into(),
        };
        let source = Arc::new(LocalDirSource::new("/nonexistent"));
        let reference = Arc::new(ReferenceStore::new(source, files, "Homo sapiens"));
        Session::new(SessionId::new(), SessionAuth::new(), SessionDataStore::new(reference))
    }

    #[tokio::test]
    async fn test_registry_insert_get_close() {
        let registry = SessionRegistry::default();
        assert!(registry.is_empty().await);

        let s = registry.insert(session()).await;
        let id = s.id;
        assert_eq!(registry.len().await, 1);
        assert!(Arc::ptr_eq(&s, &registry.get(&id).await.unwrap()));
        assert!(!s.is_closed());

        assert!(registry.close(&id).await);
        assert!(s.is_closed());
        assert!(registry.get(&id).await.is_none());
        assert!(!registry.close(&id).await);
    }

    #[tokio::test]
    async fn test_close_does_not_wait_for_turn() {
        let registry = SessionRegistry::default();
        let s = registry.insert(session()).await;

        let turn = s.turn().await;
        registry.close(&s.id).await;
        assert!(s.is_closed());
        drop(turn);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_idle_closes_only_stale_sessions() {
        let max_idle = Duration::from_secs(30 * 60);
        let registry = SessionRegistry::default();
        let stale = registry.insert(session()).await;
        let active = registry.insert(session()).await;
        let busy = registry.insert(session()).await;

        tokio::time::advance(Duration::from_secs(20 * 60)).await;
        active.touch();
        tokio::time::advance(Duration::from_secs(15 * 60)).await;
        assert_eq!(active.idle_for(Instant::now()), Duration::from_secs(15 * 60));

        // A request in flight keeps its session alive this round.
        let turn = busy.turn().await;
        assert_eq!(registry.evict_idle(max_idle).await, 1);
        assert!(stale.is_closed());
        assert!(registry.get(&stale.id).await.is_none());
        assert!(!active.is_closed());
        assert!(!busy.is_closed());
        drop(turn);

        assert_eq!(registry.evict_idle(max_idle).await, 1);
        assert!(busy.is_closed());
        assert_eq!(registry.len().await, 1);
        assert!(registry.get(&active.id).await.is_some());
    }

    #[test]
    fn test_cookie_attributes() {
        let id = SessionId::new();
        let cookie = session_cookie(id);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), id.to_string());
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }
}
