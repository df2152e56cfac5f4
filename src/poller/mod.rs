pub mod listener;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::PollingConfig;
use crate::decode;
use crate::error::{ApiError, Result};
use crate::transport::{BotApi, Params};
use crate::types::Update;

pub use listener::{Filter, Listener};

const IDLE: u8 = 0;
const POLLING: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
}

/// How a poll loop ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Cancelled,
    /// Another loop was already running on this poller; nothing was done
    AlreadyPolling,
}

/// Long-polls `getUpdates` and fans each update out to the registered listeners.
///
/// The cursor is the next `offset` to request. It only moves forward, to one
/// past the highest `update_id` of the last non-empty batch. Listeners are
/// awaited in order before the next fetch is issued.
pub struct UpdatePoller {
    api: Arc<dyn BotApi>,
    config: PollingConfig,
    listeners: Vec<Listener>,
    cursor: Mutex<Option<i64>>,
    state: AtomicU8,
}

/// Puts the poller back to Idle however `run` exits
struct PollingGuard<'a>(&'a AtomicU8);

impl Drop for PollingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(IDLE, Ordering::Release);
    }
}

impl UpdatePoller {
    pub fn new(api: Arc<dyn BotApi>, config: PollingConfig) -> Self {
        Self {
            api,
            config,
            listeners: Vec::new(),
            cursor: Mutex::new(None),
            state: AtomicU8::new(IDLE),
        }
    }

    pub fn with_listener(mut self, listener: Listener) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn add_listener(&mut self, listener: Listener) -> &mut Self {
        self.listeners.push(listener);
        self
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Resume from a known offset instead of the server's oldest buffered update
    pub fn with_cursor(self, cursor: Option<i64>) -> Self {
        Self {
            cursor: Mutex::new(cursor),
            ..self
        }
    }

    pub fn state(&self) -> PollState {
        match self.state.load(Ordering::Acquire) {
            POLLING => PollState::Polling,
            _ => PollState::Idle,
        }
    }

    pub async fn cursor(&self) -> Option<i64> {
        *self.cursor.lock().await
    }

    /// Fetch one batch starting at `cursor`
    pub async fn poll(&self, cursor: Option<i64>) -> Result<Vec<Update>> {
        let mut params = Params::new()
            .with_opt("offset", cursor)
            .with("timeout", self.config.timeout_secs)
            .with_opt("limit", self.config.limit);
        if !self.config.allowed_updates.is_empty() {
            params = params.with("allowed_updates", self.config.allowed_updates.clone());
        }

        debug!("Polling for updates (offset: {:?})", cursor);
        let body = self.api.send_request("getUpdates", &params).await?;
        decode::decode_updates(&body)
    }

    /// Hand each update, in arrival order, to every matching listener.
    /// Returns the number of listener invocations.
    pub async fn dispatch(&self, updates: &[Update]) -> usize {
        let mut invoked = 0;
        for update in updates {
            let Some(message) = &update.message else {
                debug!("Update {} carries no message, skipping", update.update_id);
                continue;
            };
            for listener in self.listeners.iter().filter(|l| l.matches(message)) {
                listener.invoke(message.clone()).await;
                invoked += 1;
            }
        }
        invoked
    }

    /// Poll until `cancel` fires or a request fails.
    ///
    /// Transport errors are retried up to `max_retries` times with backoff;
    /// API and decode errors end the loop at once. Calling this while a loop
    /// is already running returns [`PollOutcome::AlreadyPolling`].
    pub async fn run(&self, cancel: CancellationToken) -> Result<PollOutcome> {
        if self
            .state
            .compare_exchange(IDLE, POLLING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Polling already active, ignoring start request");
            return Ok(PollOutcome::AlreadyPolling);
        }
        let _guard = PollingGuard(&self.state);

        info!(
            "Update polling started with {} listener(s)",
            self.listeners.len()
        );

        let mut failures = 0u32;
        loop {
            if cancel.is_cancelled() {
                break;
            }

            let cursor = self.cursor().await;
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.poll(cursor) => result,
            };

            match result {
                Ok(updates) => {
                    failures = 0;
                    if updates.is_empty() {
                        continue;
                    }

                    debug!("Received {} update(s)", updates.len());
                    self.dispatch(&updates).await;
                    *self.cursor.lock().await = next_cursor(cursor, &updates);
                }
                Err(e) if e.is_transport() && failures < self.config.max_retries => {
                    failures += 1;
                    let delay = self.config.backoff(failures);
                    warn!(
                        "getUpdates failed: {} (retry {}/{} in {:?})",
                        e, failures, self.config.max_retries, delay
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => {
                    error!("Update polling stopped: {}", e);
                    return Err(e);
                }
            }
        }

        info!("Update polling cancelled");
        Ok(PollOutcome::Cancelled)
    }

    /// Run the loop on a background task
    pub fn spawn(self: Arc<Self>) -> PollHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move { self.run(token).await });
        PollHandle { cancel, task }
    }
}

/// Next `offset` after processing `updates`; never moves backwards
pub fn next_cursor(current: Option<i64>, updates: &[Update]) -> Option<i64> {
    let Some(max_id) = updates.iter().map(|u| u.update_id).max() else {
        return current;
    };
    let next = max_id.saturating_add(1);
    Some(current.map_or(next, |c| c.max(next)))
}

/// A poll loop running on its own task
pub struct PollHandle {
    cancel: CancellationToken,
    task: JoinHandle<Result<PollOutcome>>,
}

impl PollHandle {
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the loop and wait for it to wind down
    pub async fn stop(self) -> Result<PollOutcome> {
        self.cancel.cancel();
        self.join().await
    }

    /// Wait for the loop to end on its own
    pub async fn join(self) -> Result<PollOutcome> {
        self.task
            .await
            .map_err(|e| ApiError::Task(e.to_string()))?
    }
}
