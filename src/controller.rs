//! Debounced search controller.
//!
//! Wires the search box to the endpoint. Two events drive it:
//!
//! - [`on_keyup`](SearchController::on_keyup) restarts a quiet-period timer;
//!   the search fires only once typing has paused for the configured delay.
//! - [`on_input_changed`](SearchController::on_input_changed) commits the
//!   term and fires immediately.
//!
//! # State machine
//!
//! ```text
//!            keyup(non-empty)           timer fires
//!   Idle ─────────────────────▶ Scheduled ───────────▶ Requesting
//!    ▲  ◀──────────────────────     │                    │
//!    │     cancel / keyup("")       │ commit             │ rendered or failed
//!    │                              ▼                    │
//!    └──────────────────────────── Requesting ◀──────────┘
//! ```
//!
//! At most one timer is outstanding; scheduling or committing aborts the
//! previous one. Requests already sent are never aborted, and responses are
//! rendered in arrival order unless `discard_stale_responses` is set.
//!
//! The controller spawns onto the current tokio runtime, so every event
//! method must be called from within one.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Result;
use reqwest::Url;
use tokio::sync::{broadcast, Notify};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::client::{HttpSearchClient, SearchClient};
use crate::config::Config;
use crate::dom::Element;
use crate::models::{Query, SearchResponse};
use crate::page::Page;
use crate::render::ResultRenderer;

/// Observable controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No timer pending and no request in flight.
    Idle,
    /// A debounced search is waiting for its quiet period to elapse.
    Scheduled,
    /// At least one request is in flight.
    Requesting,
}

/// Behaviour switches that vary between deployments.
#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    pub debounce: Duration,
    pub search_on_load: bool,
    pub discard_stale_responses: bool,
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            debounce: config.debounce(),
            search_on_load: config.controller.search_on_load,
            discard_stale_responses: config.controller.discard_stale_responses,
        }
    }
}

/// Buffered render events per subscriber before it starts lagging.
const RENDER_EVENT_CAPACITY: usize = 64;

/// Snapshot of the page taken right after a render (results or error).
#[derive(Debug, Clone)]
pub struct RenderEvent {
    /// Renders so far, starting at 1.
    pub count: u64,
    pub location: Url,
    pub results: Element,
}

struct PendingSearch {
    id: u64,
    handle: AbortHandle,
}

struct Inner {
    page: Mutex<Page>,
    client: Arc<dyn SearchClient>,
    renderer: ResultRenderer,
    settings: ControllerSettings,
    pending: Mutex<Option<PendingSearch>>,
    next_timer: AtomicU64,
    in_flight: AtomicUsize,
    /// Sequence number of the most recently fired search.
    issued: AtomicU64,
    /// Highest sequence number rendered so far.
    rendered: AtomicU64,
    render_count: AtomicU64,
    idle: Notify,
    renders: broadcast::Sender<RenderEvent>,
}

/// Counts one request as in flight until dropped, so a panicking client
/// still lets the controller go idle.
struct InFlight(Arc<Inner>);

impl InFlight {
    fn start(inner: Arc<Inner>) -> Self {
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        Self(inner)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.0.idle.notify_waiters();
    }
}

/// Search controller for one page. Cloning yields another handle to the same
/// controller.
#[derive(Clone)]
pub struct SearchController {
    inner: Arc<Inner>,
}

impl SearchController {
    pub fn new(
        page: Page,
        client: Arc<dyn SearchClient>,
        renderer: ResultRenderer,
        settings: ControllerSettings,
    ) -> Self {
        let (renders, _) = broadcast::channel(RENDER_EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                page: Mutex::new(page),
                client,
                renderer,
                settings,
                pending: Mutex::new(None),
                next_timer: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                issued: AtomicU64::new(0),
                rendered: AtomicU64::new(0),
                render_count: AtomicU64::new(0),
                idle: Notify::new(),
                renders,
            }),
        }
    }

    /// Builds a controller that talks HTTP to the endpoint in `config`.
    pub fn from_config(config: &Config, page: Page) -> Result<Self> {
        let client = HttpSearchClient::new(&config.endpoint, page.location())?;
        Ok(Self::new(
            page,
            Arc::new(client),
            ResultRenderer::new(config.expand_policy()),
            ControllerSettings::from_config(config),
        ))
    }

    /// Restores the search from the page URL.
    ///
    /// Copies the `search` parameter (or the empty string) into the input.
    /// When `search_on_load` is set and the term is non-empty, fires one
    /// search immediately.
    pub fn initialize(&self) {
        let term = {
            let mut page = lock(&self.inner.page);
            let term = page.url_search_term().unwrap_or_default();
            page.set_search_value(&term);
            term
        };
        debug!(term = %term, "initializing search page");

        if self.inner.settings.search_on_load {
            self.on_input_changed(&term);
        }
    }

    /// The input was committed: cancel any pending timer and search now.
    pub fn on_input_changed(&self, term: &str) {
        self.cancel_pending();
        lock(&self.inner.page).set_search_value(term);

        match Query::new(term) {
            Some(query) => self.fire(query),
            None => debug!("empty term, nothing to search"),
        }
    }

    /// A key was released: restart the quiet-period timer for `term`.
    pub fn on_keyup(&self, term: &str) {
        self.cancel_pending();
        lock(&self.inner.page).set_search_value(term);

        let Some(query) = Query::new(term) else {
            debug!("empty term, no search scheduled");
            return;
        };

        let delay = self.inner.settings.debounce;
        let id = self.inner.next_timer.fetch_add(1, Ordering::Relaxed);
        debug!(term = %query, delay_ms = delay.as_millis() as u64, "scheduling search");

        // Hold the slot while spawning so the timer cannot clear it before
        // its own handle is stored.
        let mut slot = lock(&self.inner.pending);
        let controller = self.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            controller.fire_scheduled(id, query);
        });
        if let Some(previous) = slot.replace(PendingSearch {
            id,
            handle: task.abort_handle(),
        }) {
            previous.handle.abort();
        }
    }

    /// Aborts the pending timer, if any. Returns `true` when a scheduled
    /// search was cancelled before it fired.
    pub fn cancel_pending(&self) -> bool {
        let previous = lock(&self.inner.pending).take();
        match previous {
            Some(pending) => {
                pending.handle.abort();
                debug!(timer = pending.id, "cancelled scheduled search");
                self.inner.idle.notify_waiters();
                true
            }
            None => false,
        }
    }

    pub fn state(&self) -> ControllerState {
        if lock(&self.inner.pending).is_some() {
            ControllerState::Scheduled
        } else if self.inner.in_flight.load(Ordering::SeqCst) > 0 {
            ControllerState::Requesting
        } else {
            ControllerState::Idle
        }
    }

    /// Waits until no timer is pending and no request is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.state() == ControllerState::Idle {
                return;
            }
            notified.await;
        }
    }

    /// Receives one [`RenderEvent`] per render (results or error), in render
    /// order. Events published before subscribing are not replayed.
    pub fn subscribe_renders(&self) -> broadcast::Receiver<RenderEvent> {
        self.inner.renders.subscribe()
    }

    /// Runs `f` against the page while holding the page lock.
    pub fn with_page<R>(&self, f: impl FnOnce(&Page) -> R) -> R {
        f(&lock(&self.inner.page))
    }

    fn fire_scheduled(&self, id: u64, query: Query) {
        // Fire while holding the slot: a concurrent cancel either empties it
        // first, and this timer stands down, or finds it already cleared.
        let mut slot = lock(&self.inner.pending);
        if slot.as_ref().map(|pending| pending.id) != Some(id) {
            debug!(timer = id, "scheduled search was cancelled");
            return;
        }
        self.fire(query);
        *slot = None;
    }

    /// Writes the URL state and sends the request on a detached task.
    fn fire(&self, query: Query) {
        let seq = self.inner.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let in_flight = InFlight::start(self.inner.clone());
        lock(&self.inner.page).replace_search_term(query.as_str());
        debug!(seq, term = %query, "firing search");

        let controller = self.clone();
        tokio::spawn(async move {
            let _in_flight = in_flight;
            let outcome = controller.inner.client.search(query.as_str()).await;
            controller.finish(seq, &query, outcome);
        });
    }

    /// Renders the outcome of request `seq`, or shows its failure.
    fn finish(&self, seq: u64, query: &Query, outcome: Result<SearchResponse>) {
        let mut page = lock(&self.inner.page);
        let latest = self.inner.rendered.load(Ordering::SeqCst);

        if self.inner.settings.discard_stale_responses && seq < latest {
            info!(seq, latest, term = %query, "discarding stale response");
            return;
        }

        let rendered = match outcome {
            Ok(response) => self.inner.renderer.render(&mut page, &response),
            Err(err) => {
                warn!(seq, term = %query, error = %format!("{:#}", err), "search failed");
                self.inner
                    .renderer
                    .render_error(&mut page, &format!("Search for \"{}\" failed: {}", query, err))
            }
        };
        match rendered {
            Ok(()) => {
                self.inner.rendered.fetch_max(seq, Ordering::SeqCst);
                info!(seq, term = %query, "rendered results");
            }
            Err(err) => warn!(seq, error = %format!("{:#}", err), "failed to render results"),
        }

        // Published under the page lock so events arrive in render order.
        let count = self.inner.render_count.fetch_add(1, Ordering::SeqCst) + 1;
        if self.inner.renders.receiver_count() > 0 {
            if let Some(results) = page.results() {
                let _ = self.inner.renders.send(RenderEvent {
                    count,
                    location: page.location().clone(),
                    results: results.clone(),
                });
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
