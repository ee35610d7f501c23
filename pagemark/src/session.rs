//! SearchSession - stateful search controller for one document view
//!
//! Ties the pieces together: waits for the surface's text layer, runs the
//! matcher, paints highlights and publishes a [`SearchState`] that UI code
//! can observe through a `watch` channel.
//!
//! Cancellation Architecture:
//! Every `search` call bumps a generation counter and cancels the previous
//! call's `CancellationToken`. The pipeline task captures its generation when
//! it starts and re-checks it under the session lock before touching state or
//! highlights, so a slow earlier search can never clobber a newer one. The
//! token only shortens the wasted wait; the generation check is what keeps
//! state consistent.

use crate::config::{PollSchedule, SessionConfig};
use crate::highlight::Highlighter;
use crate::interface::{FragmentSurface, MatchCandidate, PagemarkError, SearchHints, SearchState};
use crate::matcher;
use crate::normalize::QueryFeatures;
use crate::poller::{self, PollError};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Global fallback Tokio runtime for when `search` is called outside any runtime context.
/// Shared across all sessions and never dropped.
static FALLBACK_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("pagemark-session")
        .enable_all()
        .build()
        .expect("Failed to create fallback tokio runtime")
});

/// Mutable session state, guarded by one lock
struct Inner {
    generation: u64,
    /// Token of the in-flight search, if any
    token: Option<CancellationToken>,
    highlighter: Highlighter,
    state: SearchState,
}

struct Shared<S> {
    surface: S,
    schedule: PollSchedule,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<SearchState>,
}

/// Search controller bound to one fragment surface.
///
/// Concurrency Model:
/// - `search` returns immediately; polling, matching and painting run on a tokio task
/// - Uses the current runtime if there is one, otherwise a global fallback runtime
/// - `next`, `previous` and `clear` are synchronous
/// - Dropping the session clears it: highlights are removed and in-flight work is cancelled
/// - Surface methods run under the session lock; see [`FragmentSurface`] for what they may call
pub struct SearchSession<S: FragmentSurface + 'static> {
    shared: Arc<Shared<S>>,
}

impl<S: FragmentSurface + 'static> SearchSession<S> {
    pub fn new(surface: S) -> Self {
        Self::with_config(surface, SessionConfig::default())
    }

    pub fn with_config(surface: S, config: SessionConfig) -> Self {
        let (state_tx, _) = watch::channel(SearchState::default());
        let inner = Inner {
            generation: 0,
            token: None,
            highlighter: Highlighter::new(config.palette),
            state: SearchState::default(),
        };
        Self {
            shared: Arc::new(Shared {
                surface,
                schedule: config.poll,
                inner: Mutex::new(inner),
                state_tx,
            }),
        }
    }

    /// Build a session from a JSON config file (see [`SessionConfig`])
    pub fn from_config_file(surface: S, path: impl AsRef<Path>) -> Result<Self, PagemarkError> {
        let config = SessionConfig::load(path)?;
        Ok(Self::with_config(surface, config))
    }

    pub fn surface(&self) -> &S {
        &self.shared.surface
    }

    /// Snapshot of the last published state. Does not take the session lock,
    /// so surface callbacks may read it.
    pub fn state(&self) -> SearchState {
        self.shared.state_tx.borrow().clone()
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.shared.state_tx.subscribe()
    }

    /// Get a tokio runtime handle - uses current runtime if available, otherwise global fallback
    fn runtime_handle(&self) -> tokio::runtime::Handle {
        tokio::runtime::Handle::try_current()
            .unwrap_or_else(|_| FALLBACK_RUNTIME.handle().clone())
    }

    /// Start a search, superseding any search still in flight.
    ///
    /// A blank query resets the session to `Idle` and returns `None`. Otherwise
    /// the state moves to `Searching` right away and the returned task settles
    /// it on `Found` or `NotFound`.
    pub fn search(&self, query: &str, hints: Option<SearchHints>) -> Option<JoinHandle<()>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            self.clear();
            return None;
        }

        let (generation, token) = {
            let mut inner = self.shared.inner.lock();
            let generation = self.shared.begin(&mut inner);
            let token = CancellationToken::new();
            inner.token = Some(token.clone());
            inner.state = SearchState::searching(trimmed);
            self.shared.publish(&inner.state);
            (generation, token)
        };

        tracing::debug!(generation, query = %trimmed, "search_started");

        let shared = Arc::clone(&self.shared);
        let query = trimmed.to_string();
        Some(self.runtime_handle().spawn(async move {
            shared.run(generation, token, query, hints).await;
        }))
    }

    /// Make the next match active, wrapping to the first
    pub fn next(&self) {
        self.shared.step(|i, n| (i + 1) % n);
    }

    /// Make the previous match active, wrapping to the last
    pub fn previous(&self) {
        self.shared.step(|i, n| if i == 0 { n - 1 } else { i - 1 });
    }

    /// Cancel any in-flight search, remove all highlights and reset to `Idle`.
    pub fn clear(&self) {
        let mut inner = self.shared.inner.lock();
        self.shared.begin(&mut inner);
        inner.state = SearchState::default();
        self.shared.publish(&inner.state);
    }
}

impl<S: FragmentSurface + 'static> Drop for SearchSession<S> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<S: FragmentSurface> Shared<S> {
    /// Invalidate the previous generation: cancel its token and remove its paints.
    fn begin(&self, inner: &mut Inner) -> u64 {
        inner.generation += 1;
        if let Some(token) = inner.token.take() {
            token.cancel();
        }
        inner.highlighter.clear(&self.surface);
        inner.generation
    }

    fn publish(&self, state: &SearchState) {
        self.state_tx.send_replace(state.clone());
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().generation == generation
    }

    async fn run(&self, generation: u64, token: CancellationToken, query: String, hints: Option<SearchHints>) {
        let fragments = match poller::await_fragments(&self.surface, &self.schedule, &token).await {
            Ok(fragments) => fragments,
            Err(PollError::Cancelled) => {
                tracing::debug!(generation, "search_cancelled");
                return;
            }
            Err(e @ PollError::NotReady { .. }) => {
                tracing::debug!(generation, error = %e, "search_not_ready");
                self.commit(generation, &query, Vec::new());
                return;
            }
        };

        if !self.is_current(generation) {
            tracing::debug!(generation, "stale_search_dropped");
            return;
        }

        let features = QueryFeatures::from_query(&query);
        let outcome = matcher::find_matches_with_features(&features, &fragments, hints.as_ref());
        tracing::debug!(
            generation,
            phase = ?outcome.phase,
            matches = outcome.matches.len(),
            marca = hints.as_ref().and_then(|h| h.marca.as_deref()),
            "match_pass"
        );
        self.commit(generation, &query, outcome.matches);
    }

    /// Publish a finished search, unless a newer generation has started.
    fn commit(&self, generation: u64, query: &str, matches: Vec<MatchCandidate>) -> bool {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            tracing::debug!(generation, current = inner.generation, "stale_search_dropped");
            return false;
        }

        inner.token = None;
        inner.highlighter.apply(&self.surface, &matches);
        inner.state = SearchState::found(query, matches);
        self.publish(&inner.state);
        true
    }

    fn step(&self, advance: impl FnOnce(usize, usize) -> usize) {
        let mut inner = self.inner.lock();
        let n = inner.state.total_matches;
        if n <= 1 {
            return;
        }

        let Inner { highlighter, state, .. } = &mut *inner;
        let previous = state.active_index;
        let current = advance(previous, n);
        highlighter.set_active(&self.surface, state.matches.get(previous), &state.matches[current]);
        state.active_index = current;
        self.publish(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::{MatchTier, SearchStatus, TextFragment};
    use crate::layer::MemoryTextLayer;

    fn catalog_page() -> MemoryTextLayer {
        MemoryTextLayer::with_fragments(TextFragment::from_texts([
            "Lenguaje y Comunicación 7° Básico",
            "Texto del estudiante",
            "Lenguaje y Comunicación 7° Básico",
            "Cuaderno de actividades",
            "Lenguaje y Comunicación 7° Básico",
        ]))
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = SearchSession::new(MemoryTextLayer::new());
        assert_eq!(session.state(), SearchState::default());
        assert_eq!(session.state().status, SearchStatus::Idle);
    }

    #[test]
    fn test_stale_commit_is_ignored() {
        let session = SearchSession::new(catalog_page());
        let shared = Arc::clone(&session.shared);
        let stale = {
            let mut inner = shared.inner.lock();
            shared.begin(&mut inner)
        };
        session.clear();

        let applied = shared.commit(stale, "old query", vec![MatchCandidate::single(0, MatchTier::Exact)]);

        assert!(!applied);
        assert_eq!(session.state().status, SearchStatus::Idle);
        assert!(session.surface().painted_orders().is_empty());
    }

    #[test]
    fn test_current_commit_publishes_found() {
        let session = SearchSession::new(catalog_page());
        let shared = Arc::clone(&session.shared);
        let generation = {
            let mut inner = shared.inner.lock();
            shared.begin(&mut inner)
        };
        let rx = session.subscribe();

        assert!(shared.commit(generation, "q", vec![
            MatchCandidate::single(0, MatchTier::Exact),
            MatchCandidate::single(2, MatchTier::Exact),
        ]));

        let state = rx.borrow().clone();
        assert_eq!(state.status, SearchStatus::Found);
        assert_eq!(state.total_matches, 2);
        assert_eq!(state.indicator(), Some((1, 2)));
        assert_eq!(session.surface().painted_orders(), vec![0, 2]);
    }

    #[test]
    fn test_navigation_noop_without_matches() {
        let session = SearchSession::new(catalog_page());
        session.next();
        session.previous();
        assert_eq!(session.state().active_index, 0);
        assert!(session.surface().scroll_requests().is_empty());
    }

    #[test]
    fn test_missing_config_file() {
        let result = SearchSession::from_config_file(MemoryTextLayer::new(), "/nonexistent/pagemark.json");
        assert!(matches!(result, Err(PagemarkError::Config(crate::config::ConfigError::Io(_)))));
    }

    #[test]
    fn test_blank_query_resets_to_idle() {
        let session = SearchSession::new(catalog_page());
        assert!(session.search("   ", None).is_none());
        assert_eq!(session.state().status, SearchStatus::Idle);
    }
}
