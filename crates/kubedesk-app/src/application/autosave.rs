//! Change-triggered autosave.
//!
//! [`AutosaveHandle::spawn`] registers an observer on the [`SettingsStore`] and
//! starts one background task that owns all writes to the repository.
//!
//! # Request coalescing
//!
//! The observer never writes.  It bumps a request counter held in a
//! `tokio::sync::watch` channel and returns immediately.  The worker waits for
//! the counter to change, snapshots the store *at that moment* and saves the
//! snapshot.  Changes that arrive while a save is in flight only move the
//! counter again, so the worker performs exactly one more save afterwards,
//! carrying the newest record.  At most one save is ever running, and the last
//! write to reach the repository is always the latest state.
//!
//! # Observing progress
//!
//! - [`AutosaveHandle::status`] returns the latest [`SaveStatus`].
//! - [`AutosaveHandle::events`] yields a [`PersistenceEvent`] per attempt.
//! - [`AutosaveHandle::flush`] waits until every change made so far is on disk.

use std::sync::Arc;

use kubedesk_core::domain::store::SubscriptionId;
use kubedesk_core::{SettingsChange, SettingsStore};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use super::settings_repository::SettingsRepository;

/// Capacity of the persistence event channel.  Slow receivers miss old events.
const EVENT_CAPACITY: usize = 16;

/// Progress of the autosave worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStatus {
    /// Number of save requests the worker has handled.
    pub handled_requests: u64,
    /// Store revision written by the last successful save.
    pub saved_revision: Option<u64>,
    /// Successful saves.
    pub saves: u64,
    /// Failed saves.
    pub failures: u64,
    /// Error of the most recent attempt.  Cleared by the next success.
    pub last_error: Option<String>,
}

/// Outcome of one save attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceEvent {
    Saved { revision: u64 },
    SaveFailed { revision: u64, error: String },
}

/// Errors returned while waiting on the worker.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AutosaveError {
    #[error("settings save failed: {0}")]
    SaveFailed(String),

    #[error("settings autosave worker has stopped")]
    Stopped,
}

/// Owner of the autosave worker.
///
/// Every method takes `&self`, so the handle can be shared between command
/// handlers without an outer lock.  Dropping the handle unregisters the
/// observer and stops the worker after any pending save.  Use
/// [`AutosaveHandle::shutdown`] to wait for that save.
pub struct AutosaveHandle {
    store: Arc<SettingsStore>,
    subscription: SubscriptionId,
    requests: Arc<watch::Sender<u64>>,
    status: watch::Receiver<SaveStatus>,
    events: broadcast::Sender<PersistenceEvent>,
    shutdown: Arc<Notify>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AutosaveHandle {
    /// Registers the save observer on `store` and starts the worker.
    ///
    /// Must be called from within a Tokio runtime.  Nothing is written until
    /// the first change (or an explicit [`AutosaveHandle::save_now`]).
    pub fn spawn(store: Arc<SettingsStore>, repository: Arc<dyn SettingsRepository>) -> Self {
        let (request_tx, request_rx) = watch::channel(0u64);
        let requests = Arc::new(request_tx);
        let (status_tx, status_rx) = watch::channel(SaveStatus::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shutdown = Arc::new(Notify::new());

        let observer_requests = Arc::clone(&requests);
        let subscription = store.subscribe(move |change: &SettingsChange| {
            trace!(revision = change.revision, "queueing settings save");
            observer_requests.send_modify(|ticket| *ticket += 1);
        });

        let worker = Worker {
            store: Arc::clone(&store),
            repository,
            status: status_tx,
            events: events.clone(),
        };
        let worker = tokio::spawn(worker.run(request_rx, Arc::clone(&shutdown)));
        info!("settings autosave started");

        Self {
            store,
            subscription,
            requests,
            status: status_rx,
            events,
            shutdown,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Latest worker progress.
    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    /// A receiver that wakes on every status change.
    pub fn watch_status(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    /// Subscribes to save outcomes from now on.
    pub fn events(&self) -> broadcast::Receiver<PersistenceEvent> {
        self.events.subscribe()
    }

    /// Waits until every change made before this call has been saved.
    ///
    /// # Errors
    ///
    /// - [`AutosaveError::SaveFailed`] if the most recent attempt failed.
    /// - [`AutosaveError::Stopped`] if the worker exited first.
    pub async fn flush(&self) -> Result<(), AutosaveError> {
        let target = *self.requests.borrow();
        self.wait_for(target).await
    }

    /// Saves the current record even if nothing changed, and waits for it.
    ///
    /// # Errors
    ///
    /// Same as [`AutosaveHandle::flush`].
    pub async fn save_now(&self) -> Result<(), AutosaveError> {
        let mut target = 0;
        self.requests.send_modify(|ticket| {
            *ticket += 1;
            target = *ticket;
        });
        self.wait_for(target).await
    }

    /// Stops observing the store, saves any pending change and waits for the
    /// worker to exit.
    ///
    /// # Errors
    ///
    /// - [`AutosaveError::SaveFailed`] if the final attempt failed.
    /// - [`AutosaveError::Stopped`] if the worker panicked.
    ///
    /// Calling it again returns the outcome of the last attempt.
    pub async fn shutdown(&self) -> Result<(), AutosaveError> {
        self.store.unsubscribe(self.subscription);
        self.shutdown.notify_one();
        let worker = self.worker.lock().await.take();
        if let Some(worker) = worker {
            worker.await.map_err(|_| AutosaveError::Stopped)?;
        }

        let last_error = self.status.borrow().last_error.clone();
        match last_error {
            Some(err) => Err(AutosaveError::SaveFailed(err)),
            None => Ok(()),
        }
    }

    async fn wait_for(&self, ticket: u64) -> Result<(), AutosaveError> {
        let mut receiver = self.status.clone();
        let last_error = receiver
            .wait_for(|status| status.handled_requests >= ticket)
            .await
            .map_err(|_| AutosaveError::Stopped)?
            .last_error
            .clone();

        match last_error {
            Some(err) => Err(AutosaveError::SaveFailed(err)),
            None => Ok(()),
        }
    }
}

impl Drop for AutosaveHandle {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription);
        self.shutdown.notify_one();
    }
}

// ── Worker ────────────────────────────────────────────────────────────────────

struct Worker {
    store: Arc<SettingsStore>,
    repository: Arc<dyn SettingsRepository>,
    status: watch::Sender<SaveStatus>,
    events: broadcast::Sender<PersistenceEvent>,
}

impl Worker {
    async fn run(
        self,
        mut requests: watch::Receiver<u64>,
        shutdown: Arc<Notify>,
    ) {
        loop {
            tokio::select! {
                changed = requests.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let ticket = *requests.borrow_and_update();
                    self.save(ticket).await;
                }
                _ = shutdown.notified() => {
                    if requests.has_changed().unwrap_or(false) {
                        let ticket = *requests.borrow_and_update();
                        self.save(ticket).await;
                    }
                    break;
                }
            }
        }
        debug!("settings autosave stopped");
    }

    /// Saves the record as it is now, covering every request up to `ticket`.
    async fn save(&self, ticket: u64) {
        let (revision, snapshot) = self.store.versioned_snapshot();
        debug!(revision, settings = ?snapshot, "saving settings");

        let event = match self.repository.save(&snapshot).await {
            Ok(()) => {
                self.status.send_modify(|status| {
                    status.handled_requests = ticket;
                    status.saved_revision = Some(revision);
                    status.saves += 1;
                    status.last_error = None;
                });
                PersistenceEvent::Saved { revision }
            }
            Err(e) => {
                error!(revision, error = %e, "failed to save settings");
                let message = e.to_string();
                self.status.send_modify(|status| {
                    status.handled_requests = ticket;
                    status.failures += 1;
                    status.last_error = Some(message.clone());
                });
                PersistenceEvent::SaveFailed {
                    revision,
                    error: message,
                }
            }
        };

        // No receivers is fine.
        let _ = self.events.send(event);
    }
}
