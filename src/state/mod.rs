// Session monitor module
//
// This module provides the SessionMonitor which tracks live sessions, widgets
// and bitmaps behind Arc<RwLock<T>> and emits lifecycle events.

use crate::metrics::Metrics;
use crate::models::{SessionId, SessionKind, SessionOutcome};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Lifecycle events emitted by sessions
///
/// Hosts can subscribe to drive their own UI or logging without polling.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// A session passed its prerequisite check
    Started { id: SessionId, kind: SessionKind },

    /// The session's widget was created
    WidgetInstantiated { id: SessionId },

    /// The session reached a result
    Resolved {
        id: SessionId,
        outcome: SessionOutcome,
    },

    /// The session's widget was torn down
    WidgetDestroyed { id: SessionId },

    /// A display session generated a new QR bitmap
    BitmapRegenerated { id: SessionId },

    /// A display session released its QR bitmap
    BitmapReleased { id: SessionId },
}

/// Counters and live-session bookkeeping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorState {
    /// Sessions started but not yet resolved
    pub active: BTreeMap<SessionId, SessionKind>,

    /// Widgets instantiated and not yet destroyed
    pub live_widgets: usize,

    /// Bitmaps generated and not yet released
    pub live_bitmaps: usize,

    /// Sessions resolved so far
    pub completed: usize,

    pub last_outcome: Option<SessionOutcome>,
}

/// Thread-safe session monitor with event emission
///
/// # Usage
///
/// - [`read()`](Self::read) for reading state through a closure
/// - [`snapshot()`](Self::snapshot) for a cloned copy
/// - [`subscribe()`](Self::subscribe) for listening to [`SessionEvent`]s
///
/// Sessions call the recording methods; hosts normally only read.
pub struct SessionMonitor {
    state: Arc<RwLock<MonitorState>>,

    /// Broadcast channel for lifecycle events
    event_tx: broadcast::Sender<SessionEvent>,

    metrics: Metrics,
}

impl SessionMonitor {
    /// Create a monitor with a broadcast buffer of 100 events
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(MonitorState::default())),
            event_tx,
            metrics: Metrics::new(),
        }
    }

    pub fn snapshot(&self) -> MonitorState {
        self.read(|state| state.clone())
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let live = monitor.read(|state| state.live_widgets);
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&MonitorState) -> R,
    {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        f(&state)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    fn update<F>(&self, update_fn: F, event: SessionEvent)
    where
        F: FnOnce(&mut MonitorState),
    {
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            update_fn(&mut state);
        }
        // Nobody listening is fine
        let _ = self.event_tx.send(event);
    }

    pub fn session_started(&self, id: SessionId, kind: SessionKind) {
        match kind {
            SessionKind::Capture => self.metrics.record_capture_started(),
            SessionKind::Display => self.metrics.record_display_shown(),
        }
        self.update(
            |state| {
                state.active.insert(id, kind);
            },
            SessionEvent::Started { id, kind },
        );
    }

    pub fn widget_instantiated(&self, id: SessionId) {
        self.update(
            |state| state.live_widgets += 1,
            SessionEvent::WidgetInstantiated { id },
        );
    }

    pub fn session_resolved(&self, id: SessionId, outcome: SessionOutcome) {
        match outcome {
            SessionOutcome::Decoded => self.metrics.record_capture_decoded(),
            SessionOutcome::Cancelled => self.metrics.record_capture_cancelled(),
            SessionOutcome::TimedOut => self.metrics.record_capture_timed_out(),
            _ => {}
        }
        let last = outcome.clone();
        self.update(
            |state| {
                state.active.remove(&id);
                state.completed += 1;
                state.last_outcome = Some(last);
            },
            SessionEvent::Resolved { id, outcome },
        );
    }

    pub fn widget_destroyed(&self, id: SessionId) {
        self.update(
            |state| state.live_widgets = state.live_widgets.saturating_sub(1),
            SessionEvent::WidgetDestroyed { id },
        );
    }

    pub fn bitmap_generated(&self, id: SessionId) {
        self.metrics.record_bitmap_generated();
        self.update(
            |state| state.live_bitmaps += 1,
            SessionEvent::BitmapRegenerated { id },
        );
    }

    pub fn bitmap_released(&self, id: SessionId) {
        self.metrics.record_bitmap_released();
        self.update(
            |state| state.live_bitmaps = state.live_bitmaps.saturating_sub(1),
            SessionEvent::BitmapReleased { id },
        );
    }

    /// Record a capture answered from the fallback text buffer
    pub fn fallback_read(&self) {
        self.metrics.record_fallback_read();
    }
}

impl Default for SessionMonitor {
    fn default() -> Self {
        Self::new()
    }
}
