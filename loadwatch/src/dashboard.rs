//! Dashboard controller.
//!
//! Owns the two polling lifecycles and every piece of mutable state the
//! feeds produce: the current snapshot, the bounded snapshot history, and
//! the latest event list. Derived statistics are recomputed on demand;
//! they are never stored.
//!
//! Error policy: a feed failure overwrites that feed's error message but
//! never clears previously displayed data. Stale-but-present beats blank.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, TryRecvError};

use crate::api::{ApiClient, CircuitState, FetchError, RequestEvent, Snapshot};
use crate::feed::Poller;
use crate::stats::{self, SnapshotHistory, SourceSummary};
use crate::view::{self, TimelineTick, Tone};

pub const SNAPSHOT_INTERVAL: Duration = Duration::from_millis(1500);
pub const EVENTS_INTERVAL: Duration = Duration::from_millis(1200);

/// How many events each poll asks for; the server caps its buffer anyway.
pub const EVENT_FETCH_LIMIT: usize = 50;

/// Poll intervals for the two feeds.
#[derive(Debug, Clone, Copy)]
pub struct DashboardConfig {
    pub snapshot_interval: Duration,
    pub events_interval: Duration,
}

impl Default for DashboardConfig {
    fn default() -> DashboardConfig {
        DashboardConfig {
            snapshot_interval: SNAPSHOT_INTERVAL,
            events_interval: EVENTS_INTERVAL,
        }
    }
}

/// Feed-owned state plus the apply rules. Kept separate from the pollers
/// so the contract stays testable without a network.
#[derive(Debug, Default)]
struct DashboardState {
    snapshot: Option<Snapshot>,
    history: SnapshotHistory,
    events: Vec<RequestEvent>,
    snapshot_error: Option<String>,
    events_error: Option<String>,
    action_error: Option<String>,
}

impl DashboardState {
    fn apply_snapshot(&mut self, result: Result<Snapshot, FetchError>) {
        match result {
            Ok(snapshot) => {
                self.history.push(snapshot.clone());
                self.snapshot = Some(snapshot);
                self.snapshot_error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "snapshot feed failed");
                self.snapshot_error = Some(e.to_string());
            }
        }
    }

    fn apply_events(&mut self, result: Result<Vec<RequestEvent>, FetchError>) {
        match result {
            Ok(events) => {
                // wholesale replacement; the client never accumulates
                self.events = events;
                self.events_error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "event feed failed");
                self.events_error = Some(e.to_string());
            }
        }
    }

    /// Applies only the returned flag onto whatever snapshot is current.
    /// If a concurrent poll lands around the same time, last writer wins;
    /// the next snapshot poll reconciles the authoritative value.
    fn apply_toggle(&mut self, result: Result<bool, FetchError>) {
        match result {
            Ok(enabled) => {
                if let Some(snapshot) = self.snapshot.as_mut() {
                    snapshot.rate_limit_enabled = enabled;
                }
                self.action_error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "rate-limit toggle failed");
                self.action_error = Some(e.to_string());
            }
        }
    }

    fn view(&self) -> DashboardView {
        let snapshot = self.snapshot.as_ref();
        let circuit_state = snapshot
            .map(|s| s.circuit_breaker_state)
            .unwrap_or_default();
        DashboardView {
            circuit_state,
            tone: Tone::of(circuit_state),
            rate_limit_enabled: snapshot.map(|s| s.rate_limit_enabled),
            active_connections: snapshot.map_or(0, |s| s.active_connections),
            idle_connections: snapshot.map_or(0, |s| s.idle_connections),
            total_connections: snapshot.map_or(0, |s| s.total_connections),
            waiting_threads: snapshot.map_or(0, |s| s.waiting_threads),
            waiting_warn: snapshot.is_some_and(|s| s.waiting_threads > 0),
            db_pool_pct: snapshot.map(|s| db_pool_pct(s.active_connections, s.total_connections)),
            avg_response_time_ms: snapshot.and_then(|s| s.avg_response_time_ms),
            newest_timestamp: self.history.newest().map(|s| s.timestamp.clone()),
            ticks: view::build_ticks(self.history.iter()),
            sources: stats::summarize_sources(&self.events),
            status_counts: stats::status_distribution(&self.events),
            snapshot_error: self.snapshot_error.clone(),
            events_error: self.events_error.clone(),
            action_error: self.action_error.clone(),
        }
    }
}

/// Display-ready state derived from the current polled data. The source
/// list is complete; truncating to a top-N is the renderer's business.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub circuit_state: CircuitState,
    pub tone: Tone,
    pub rate_limit_enabled: Option<bool>,
    pub active_connections: u32,
    pub idle_connections: u32,
    pub total_connections: u32,
    pub waiting_threads: u32,
    pub waiting_warn: bool,
    /// `round(active / total * 100)`, `None` before the first snapshot.
    pub db_pool_pct: Option<u32>,
    pub avg_response_time_ms: Option<f64>,
    pub newest_timestamp: Option<String>,
    pub ticks: Vec<TimelineTick>,
    pub sources: Vec<SourceSummary>,
    pub status_counts: [(u16, u64); 4],
    pub snapshot_error: Option<String>,
    pub events_error: Option<String>,
    pub action_error: Option<String>,
}

pub fn db_pool_pct(active: u32, total: u32) -> u32 {
    if total == 0 {
        0
    } else {
        ((f64::from(active) / f64::from(total)) * 100.0).round() as u32
    }
}

/// Composes the fetch adapter, the two pollers, and the derived view.
pub struct Dashboard {
    client: Arc<ApiClient>,
    snapshot_feed: Poller<Snapshot>,
    events_feed: Poller<Vec<RequestEvent>>,
    toggle_rx: Option<Receiver<Result<bool, FetchError>>>,
    state: DashboardState,
}

impl Dashboard {
    /// Starts both polling lifecycles immediately.
    pub fn start(client: ApiClient, config: DashboardConfig) -> Dashboard {
        let client = Arc::new(client);

        let snapshot_client = Arc::clone(&client);
        let snapshot_feed = Poller::start("snapshot", config.snapshot_interval, move || {
            snapshot_client.snapshot()
        });

        let events_client = Arc::clone(&client);
        let events_feed = Poller::start("events", config.events_interval, move || {
            events_client.recent_requests(EVENT_FETCH_LIMIT)
        });

        Dashboard {
            client,
            snapshot_feed,
            events_feed,
            toggle_rx: None,
            state: DashboardState::default(),
        }
    }

    /// Drains both feeds and any pending toggle outcome, applying only
    /// results from live generations. Returns true when anything changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;

        while let Some(result) = self.snapshot_feed.try_next() {
            self.state.apply_snapshot(result);
            changed = true;
        }
        while let Some(result) = self.events_feed.try_next() {
            self.state.apply_events(result);
            changed = true;
        }

        if let Some(rx) = self.toggle_rx.take() {
            match rx.try_recv() {
                Ok(result) => {
                    self.state.apply_toggle(result);
                    changed = true;
                }
                Err(TryRecvError::Empty) => self.toggle_rx = Some(rx),
                Err(TryRecvError::Disconnected) => {}
            }
        }

        changed
    }

    /// Fires the rate-limit toggle unless one is already in flight.
    pub fn toggle_rate_limit(&mut self) {
        if self.toggle_rx.is_some() {
            return;
        }
        let (tx, rx) = channel::bounded(1);
        let client = Arc::clone(&self.client);
        thread::spawn(move || {
            let result = client
                .toggle_rate_limit()
                .map(|toggle| toggle.rate_limit_enabled);
            let _ = tx.send(result);
        });
        self.toggle_rx = Some(rx);
    }

    pub fn view(&self) -> DashboardView {
        self.state.view()
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    /// Tears down both feeds. Idempotent; in-flight calls are cancelled
    /// and their outcomes discarded, so nothing mutates state afterwards.
    pub fn stop(&mut self) {
        self.snapshot_feed.stop();
        self.events_feed.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(state: CircuitState, active: u32, total: u32, waiting: u32) -> Snapshot {
        Snapshot {
            timestamp: "2025-11-02T10:15:42Z".to_string(),
            circuit_breaker_state: state,
            active_connections: active,
            total_connections: total,
            waiting_threads: waiting,
            ..Snapshot::default()
        }
    }

    fn event(ip: &str, status: u16) -> RequestEvent {
        RequestEvent {
            ip: Some(ip.to_string()),
            status: Some(status),
            ..RequestEvent::default()
        }
    }

    #[test]
    fn open_circuit_snapshot_derives_the_danger_view() {
        let mut state = DashboardState::default();
        state.apply_snapshot(Ok(snapshot(CircuitState::Open, 18, 20, 3)));

        let view = state.view();
        assert_eq!(view.tone, Tone::Danger);
        assert_eq!(view.db_pool_pct, Some(90));
        assert!(view.waiting_warn);
        assert_eq!(view.ticks.len(), 1);
    }

    #[test]
    fn feed_errors_keep_prior_data_on_screen() {
        let mut state = DashboardState::default();
        state.apply_snapshot(Ok(snapshot(CircuitState::Closed, 2, 20, 0)));
        state.apply_snapshot(Err(FetchError::Network("unreachable".to_string())));

        let view = state.view();
        assert_eq!(view.circuit_state, CircuitState::Closed);
        assert_eq!(view.db_pool_pct, Some(10));
        assert_eq!(
            view.snapshot_error.as_deref(),
            Some("network error: unreachable")
        );

        // recovery clears the error
        state.apply_snapshot(Ok(snapshot(CircuitState::Closed, 3, 20, 0)));
        assert_eq!(state.view().snapshot_error, None);
    }

    #[test]
    fn latest_feed_error_replaces_the_previous_one() {
        let mut state = DashboardState::default();
        state.apply_events(Err(FetchError::Network("first".to_string())));
        state.apply_events(Err(FetchError::Application {
            status: 503,
            message: "second".to_string(),
        }));
        assert_eq!(state.view().events_error.as_deref(), Some("second"));
    }

    #[test]
    fn each_event_poll_replaces_the_list() {
        let mut state = DashboardState::default();
        state.apply_events(Ok(vec![event("1.1.1.1", 200), event("2.2.2.2", 200)]));
        state.apply_events(Ok(vec![event("3.3.3.3", 429)]));

        let view = state.view();
        assert_eq!(view.sources.len(), 1);
        assert_eq!(view.sources[0].ip, "3.3.3.3");
        assert_eq!(view.status_counts, [(200, 0), (429, 1), (500, 0), (503, 0)]);
    }

    #[test]
    fn event_errors_keep_the_previous_list() {
        let mut state = DashboardState::default();
        state.apply_events(Ok(vec![event("1.1.1.1", 200)]));
        state.apply_events(Err(FetchError::Network("down".to_string())));

        let view = state.view();
        assert_eq!(view.sources.len(), 1);
        assert!(view.events_error.is_some());
    }

    #[test]
    fn toggle_success_updates_only_the_flag() {
        let mut state = DashboardState::default();
        state.apply_snapshot(Ok(snapshot(CircuitState::Closed, 18, 20, 3)));
        state.apply_toggle(Ok(true));

        let view = state.view();
        assert_eq!(view.rate_limit_enabled, Some(true));
        // concurrently-polled data is untouched
        assert_eq!(view.active_connections, 18);
        assert_eq!(view.waiting_threads, 3);
    }

    #[test]
    fn toggle_failure_retains_the_previous_flag() {
        let mut state = DashboardState::default();
        let mut snap = snapshot(CircuitState::Closed, 1, 20, 0);
        snap.rate_limit_enabled = true;
        state.apply_snapshot(Ok(snap));
        state.apply_toggle(Err(FetchError::Network("unreachable".to_string())));

        let view = state.view();
        assert_eq!(view.rate_limit_enabled, Some(true));
        assert_eq!(
            view.action_error.as_deref(),
            Some("network error: unreachable")
        );
    }

    #[test]
    fn history_accumulates_across_snapshot_polls() {
        let mut state = DashboardState::default();
        for _ in 0..3 {
            state.apply_snapshot(Ok(snapshot(CircuitState::Closed, 1, 20, 0)));
        }
        assert_eq!(state.history.len(), 3);
        assert_eq!(state.view().ticks.len(), 3);
    }

    #[test]
    fn pool_percentage_survives_an_empty_pool() {
        assert_eq!(db_pool_pct(0, 0), 0);
        assert_eq!(db_pool_pct(18, 20), 90);
        assert_eq!(db_pool_pct(1, 3), 33);
        assert_eq!(db_pool_pct(2, 3), 67);
    }
}
