//! Mutation observer bridge.
//!
//! A `MutationObserver` installed in the page buffers serialized records; a
//! background task drains that buffer every poll interval and fans the
//! records out to channel subscribers and callback handlers. Delivery is
//! at-most-once: records drained but not processed are lost.
//!
//! Lifecycle: `Idle -> Observing -> Idle` via start/stop, and `Destroyed`
//! after [`MutationObserverBridge::cleanup`], which is terminal. Waits that
//! find the bridge idle start it themselves and stop it once the last such
//! wait finishes, unless `start_observing` was called in the meantime.
//! A hook lost to a navigation is reinstalled on the next poll.

mod event;
mod script;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use webhands_protocols::{ElementHandle, PageDriver};

use crate::error::{DomError, DomResult};
use crate::locate::query_one;

pub use event::{MutationEvent, SerializedNode};
pub use script::{DISCONNECT_OBSERVER_JS, DRAIN_MUTATIONS_JS, GET_ATTRIBUTE_JS, INSTALL_OBSERVER_JS};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Idle,
    Observing,
    Destroyed,
}

/// Callback invoked for every delivered event.
pub type MutationHandler = Arc<dyn Fn(&MutationEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Waits currently running, and whether they own the observing session.
#[derive(Default)]
struct WaitLease {
    active: usize,
    started_observing: bool,
}

struct Shared {
    state: Mutex<ObserverState>,
    waits: Mutex<WaitLease>,
    listeners: Mutex<HashMap<u64, mpsc::UnboundedSender<MutationEvent>>>,
    handlers: Mutex<Vec<(HandlerId, MutationHandler)>>,
    next_id: AtomicU64,
}

impl Shared {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn dispatch(&self, events: Vec<MutationEvent>, token: &CancellationToken) {
        let handlers: Vec<MutationHandler> = self
            .handlers
            .lock()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for event in events {
            if token.is_cancelled() {
                return;
            }
            for handler in &handlers {
                handler(&event);
            }
            self.listeners
                .lock()
                .retain(|_, sender| sender.send(event.clone()).is_ok());
        }
    }
}

/// Receiving end of a subscription. Dropping it unregisters the listener.
pub struct MutationSubscription {
    id: u64,
    receiver: mpsc::UnboundedReceiver<MutationEvent>,
    shared: Weak<Shared>,
}

impl MutationSubscription {
    /// Next event, or `None` once the bridge is destroyed.
    pub async fn recv(&mut self) -> Option<MutationEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<MutationEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for MutationSubscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.listeners.lock().remove(&self.id);
        }
    }
}

fn parse_batch(value: Value) -> Vec<MutationEvent> {
    let Value::Array(records) = value else {
        return Vec::new();
    };
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(event) => Some(event),
            Err(e) => {
                debug!("Skipping malformed mutation record: {}", e);
                None
            }
        })
        .collect()
}

async fn poll_loop(
    page: Arc<dyn PageDriver>,
    shared: Arc<Shared>,
    interval: Duration,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        let batch = match page.evaluate(DRAIN_MUTATIONS_JS, vec![]).await {
            Ok(Value::Null) => {
                // the document was replaced and took the hook with it
                if token.is_cancelled() || *shared.state.lock() != ObserverState::Observing {
                    break;
                }
                info!("Mutation observer hook missing, reinstalling");
                if let Err(e) = page.evaluate(INSTALL_OBSERVER_JS, vec![]).await {
                    warn!("Failed to reinstall mutation observer: {}", e);
                }
                continue;
            }
            Ok(value) => parse_batch(value),
            Err(e) => {
                debug!("Mutation poll failed: {}", e);
                continue;
            }
        };
        if token.is_cancelled() || *shared.state.lock() != ObserverState::Observing {
            break;
        }
        if !batch.is_empty() {
            trace!(count = batch.len(), "Dispatching mutation events");
            shared.dispatch(batch, &token);
        }
    }
    debug!("Mutation poll loop stopped");
}

/// Polled bridge between an in-page `MutationObserver` and local listeners.
pub struct MutationObserverBridge {
    page: Mutex<Option<Arc<dyn PageDriver>>>,
    poll_interval: Duration,
    shared: Arc<Shared>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl MutationObserverBridge {
    pub fn new(page: Arc<dyn PageDriver>) -> Self {
        Self::with_poll_interval(page, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(page: Arc<dyn PageDriver>, poll_interval: Duration) -> Self {
        Self {
            page: Mutex::new(Some(page)),
            poll_interval,
            shared: Arc::new(Shared {
                state: Mutex::new(ObserverState::Idle),
                waits: Mutex::new(WaitLease::default()),
                listeners: Mutex::new(HashMap::new()),
                handlers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
            cancel: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ObserverState {
        *self.shared.state.lock()
    }

    /// Number of live channel subscriptions.
    pub fn listener_count(&self) -> usize {
        self.shared.listeners.lock().len()
    }

    fn page(&self) -> DomResult<Arc<dyn PageDriver>> {
        self.page.lock().clone().ok_or(DomError::ObserverDestroyed)
    }

    /// Install the in-page hook and start polling. No-op unless idle.
    pub async fn start_observing(&self) -> DomResult<()> {
        // an explicit start outlives any wait that started observing
        self.shared.waits.lock().started_observing = false;
        self.start().await.map(|_| ())
    }

    /// Start observing; `true` when this call moved the bridge out of idle.
    async fn start(&self) -> DomResult<bool> {
        if self.state() != ObserverState::Idle {
            return Ok(false);
        }
        let page = self.page()?;
        page.evaluate(INSTALL_OBSERVER_JS, vec![]).await?;

        {
            let mut state = self.shared.state.lock();
            if *state != ObserverState::Idle {
                return Ok(false);
            }
            *state = ObserverState::Observing;
        }

        let token = CancellationToken::new();
        if let Some(previous) = self.cancel.lock().replace(token.clone()) {
            previous.cancel();
        }
        tokio::spawn(poll_loop(
            page,
            self.shared.clone(),
            self.poll_interval,
            token,
        ));
        debug!(interval_ms = self.poll_interval.as_millis() as u64, "Mutation observer started");
        Ok(true)
    }

    /// Register a wait, starting the observer if it is idle.
    async fn begin_wait(&self) -> DomResult<()> {
        self.shared.waits.lock().active += 1;
        match self.start().await {
            Ok(started) => {
                if started {
                    self.shared.waits.lock().started_observing = true;
                }
                Ok(())
            }
            Err(e) => {
                self.end_wait().await;
                Err(e)
            }
        }
    }

    /// Unregister a wait; the last one out stops an observer the waits started.
    async fn end_wait(&self) {
        let stop = {
            let mut waits = self.shared.waits.lock();
            waits.active = waits.active.saturating_sub(1);
            let stop = waits.active == 0 && waits.started_observing;
            if stop {
                waits.started_observing = false;
            }
            stop
        };
        if stop {
            self.stop_observing().await;
        }
    }

    /// Stop polling and disconnect the in-page hook. No further events are
    /// delivered once this returns.
    pub async fn stop_observing(&self) {
        {
            let mut state = self.shared.state.lock();
            if *state != ObserverState::Observing {
                return;
            }
            *state = ObserverState::Idle;
        }
        if let Some(token) = self.cancel.lock().take() {
            token.cancel();
        }
        self.shared.waits.lock().started_observing = false;
        let page = self.page.lock().clone();
        if let Some(page) = page {
            if let Err(e) = page.evaluate(DISCONNECT_OBSERVER_JS, vec![]).await {
                warn!("Failed to disconnect mutation observer: {}", e);
            }
        }
        debug!("Mutation observer stopped");
    }

    /// Terminal teardown: stops observing, drops every listener and handler
    /// and releases the page. Idempotent.
    pub async fn cleanup(&self) {
        self.stop_observing().await;
        *self.shared.state.lock() = ObserverState::Destroyed;
        self.shared.listeners.lock().clear();
        self.shared.handlers.lock().clear();
        self.page.lock().take();
    }

    pub fn subscribe(&self) -> DomResult<MutationSubscription> {
        if self.state() == ObserverState::Destroyed {
            return Err(DomError::ObserverDestroyed);
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.shared.next_id();
        self.shared.listeners.lock().insert(id, sender);
        Ok(MutationSubscription {
            id,
            receiver,
            shared: Arc::downgrade(&self.shared),
        })
    }

    pub fn add_handler<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&MutationEvent) + Send + Sync + 'static,
    {
        let id = HandlerId(self.shared.next_id());
        self.shared.handlers.lock().push((id, Arc::new(handler)));
        id
    }

    pub fn remove_handler(&self, id: HandlerId) -> bool {
        let mut handlers = self.shared.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    pub fn handler_count(&self) -> usize {
        self.shared.handlers.lock().len()
    }

    /// Wait until `selector` matches an element in the live DOM.
    pub async fn wait_for_element(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> DomResult<ElementHandle> {
        let page = self.page()?;
        let mut subscription = self.subscribe()?;
        self.begin_wait().await?;

        let wait = async {
            if let Some(handle) = query_one(page.as_ref(), selector).await? {
                return Ok(handle);
            }
            while let Some(event) = subscription.recv().await {
                if !matches!(
                    event,
                    MutationEvent::Added { .. } | MutationEvent::Attribute { .. }
                ) {
                    continue;
                }
                if let Some(handle) = query_one(page.as_ref(), selector).await? {
                    return Ok(handle);
                }
            }
            Err(DomError::ObserverDestroyed)
        };

        let result = tokio::time::timeout(timeout, wait).await;
        drop(subscription);
        self.end_wait().await;
        result.map_err(|_| {
            DomError::timeout(format!("element {}", selector), timeout.as_millis() as u64)
        })?
    }

    /// Wait until `selector` no longer matches anything.
    pub async fn wait_for_element_removal(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> DomResult<()> {
        let page = self.page()?;
        let mut subscription = self.subscribe()?;
        self.begin_wait().await?;

        let wait = async {
            if query_one(page.as_ref(), selector).await?.is_none() {
                return Ok(());
            }
            while let Some(event) = subscription.recv().await {
                if !matches!(
                    event,
                    MutationEvent::Removed { .. } | MutationEvent::Attribute { .. }
                ) {
                    continue;
                }
                if query_one(page.as_ref(), selector).await?.is_none() {
                    return Ok(());
                }
            }
            Err(DomError::ObserverDestroyed)
        };

        let result = tokio::time::timeout(timeout, wait).await;
        drop(subscription);
        self.end_wait().await;
        result.map_err(|_| {
            DomError::timeout(
                format!("removal of {}", selector),
                timeout.as_millis() as u64,
            )
        })?
    }

    /// Wait until `attribute` of the element matching `selector` differs
    /// from its value when the wait began. Returns the new value.
    pub async fn wait_for_attribute_change(
        &self,
        selector: &str,
        attribute: &str,
        timeout: Duration,
    ) -> DomResult<Option<String>> {
        let page = self.page()?;
        let mut subscription = self.subscribe()?;
        self.begin_wait().await?;

        let wait = async {
            let initial = read_attribute(page.as_ref(), selector, attribute).await?;
            while let Some(event) = subscription.recv().await {
                let MutationEvent::Attribute { attribute_name, .. } = &event else {
                    continue;
                };
                if attribute_name != attribute {
                    continue;
                }
                let current = read_attribute(page.as_ref(), selector, attribute).await?;
                if current != initial {
                    return Ok(current);
                }
            }
            Err(DomError::ObserverDestroyed)
        };

        let result = tokio::time::timeout(timeout, wait).await;
        drop(subscription);
        self.end_wait().await;
        result.map_err(|_| {
            DomError::timeout(
                format!("attribute {} of {}", attribute, selector),
                timeout.as_millis() as u64,
            )
        })?
    }
}

async fn read_attribute(
    page: &dyn PageDriver,
    selector: &str,
    attribute: &str,
) -> DomResult<Option<String>> {
    let Some(handle) = query_one(page, selector).await? else {
        return Ok(None);
    };
    let value = page
        .evaluate_on(&handle, GET_ATTRIBUTE_JS, vec![Value::String(attribute.to_string())])
        .await?;
    Ok(value.as_str().map(str::to_string))
}

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;
