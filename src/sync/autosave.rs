//! Background saving for a [`DocumentStore`].
//!
//! Two independent triggers feed one single-flight save:
//! - a debounced trigger, re-armed by every edit the store publishes, that
//!   saves once edits have been idle for the debounce delay
//! - a periodic trigger that bounds staleness when edits never go idle
//!
//! At most one save runs at a time. A periodic request that finds a save in
//! flight is dropped; a debounced or manual one sets a pending bit and the
//! debounce is re-armed when the flight lands.
//!
//! Stopping never cancels a save: the triggers only check for shutdown
//! between saves, and [`AutoSaver::stop`] waits for a flight to land.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::controller::{SaveResult, SyncController};
use super::error::SyncError;
use crate::store::{DocumentStore, StoreEvent};

/// A store shared between the editing side and the auto-saver.
pub type SharedStore = Arc<Mutex<DocumentStore>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoSaveConfig {
    /// Idle gap after the last edit before a debounced save runs.
    pub debounce: Duration,
    /// Period of the staleness-bounding save.
    pub interval: Duration,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(2000),
            interval: Duration::from_millis(30000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTrigger {
    Debounced,
    Periodic,
    Manual,
}

impl std::fmt::Display for SaveTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveTrigger::Debounced => write!(f, "debounced"),
            SaveTrigger::Periodic => write!(f, "periodic"),
            SaveTrigger::Manual => write!(f, "manual"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SaveOutcome {
    Saved(SaveResult),
    /// Nothing changed since the last save.
    Clean,
    /// Another save was in flight.
    Busy,
}

/// Published after every save attempt that reached the controller.
#[derive(Debug, Clone)]
pub enum SaveEvent {
    Saved {
        trigger: SaveTrigger,
        result: SaveResult,
    },
    Failed {
        trigger: SaveTrigger,
        error: String,
    },
}

struct Shared {
    store: SharedStore,
    controller: SyncController,
    debounce: Duration,
    in_flight: AtomicBool,
    pending: AtomicBool,
    kick: Notify,
    /// Woken whenever a flight lands.
    landed: Notify,
    events: broadcast::Sender<SaveEvent>,
}

impl Shared {
    async fn run(&self, trigger: SaveTrigger) -> Result<SaveOutcome, SyncError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            if trigger != SaveTrigger::Periodic {
                self.pending.store(true, Ordering::SeqCst);
            }
            tracing::debug!("Save in flight, {} request deferred or dropped", trigger);
            return Ok(SaveOutcome::Busy);
        }

        let result = self.save_once(trigger).await;

        self.in_flight.store(false, Ordering::SeqCst);
        self.landed.notify_waiters();
        if self.pending.swap(false, Ordering::SeqCst) {
            self.kick.notify_one();
        }
        result
    }

    async fn save_once(&self, trigger: SaveTrigger) -> Result<SaveOutcome, SyncError> {
        let (snapshot, revision) = {
            let store = self.store.lock().await;
            if !store.is_dirty() {
                return Ok(SaveOutcome::Clean);
            }
            (store.snapshot(), store.revision())
        };

        match self.controller.save(&snapshot).await {
            Ok(result) => {
                self.store
                    .lock()
                    .await
                    .apply_saved(revision, &snapshot, &result.document);

                for conflict in &result.conflicts {
                    tracing::debug!("{}", conflict);
                }
                tracing::info!(
                    "{} save of board '{}' landed as v{}",
                    trigger,
                    self.controller.board_id(),
                    result.version()
                );

                let _ = self.events.send(SaveEvent::Saved {
                    trigger,
                    result: result.clone(),
                });
                Ok(SaveOutcome::Saved(result))
            }
            Err(e) => {
                tracing::warn!("{} save failed: {}", trigger, e);
                let _ = self.events.send(SaveEvent::Failed {
                    trigger,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }
}

/// Runs the save triggers for one store until stopped or dropped.
pub struct AutoSaver {
    shared: Arc<Shared>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl AutoSaver {
    pub async fn start(
        store: SharedStore,
        controller: SyncController,
        config: AutoSaveConfig,
    ) -> Self {
        let edits = store.lock().await.subscribe();
        let (events, _) = broadcast::channel(16);
        let (shutdown, _) = watch::channel(false);

        let shared = Arc::new(Shared {
            store,
            controller,
            debounce: config.debounce,
            in_flight: AtomicBool::new(false),
            pending: AtomicBool::new(false),
            kick: Notify::new(),
            landed: Notify::new(),
            events,
        });

        let tasks = vec![
            tokio::spawn(watch_edits(shared.clone(), edits, shutdown.subscribe())),
            tokio::spawn(debounce_loop(shared.clone(), shutdown.subscribe())),
            tokio::spawn(periodic_loop(
                shared.clone(),
                config.interval,
                shutdown.subscribe(),
            )),
        ];

        tracing::debug!(
            "Auto-save started: debounce {:?}, interval {:?}",
            config.debounce,
            config.interval
        );

        Self {
            shared,
            shutdown,
            tasks,
        }
    }

    /// Requests a debounced save.
    pub fn trigger(&self) {
        self.shared.kick.notify_one();
    }

    /// Saves immediately unless a save is already in flight.
    pub async fn save_now(&self) -> Result<SaveOutcome, SyncError> {
        self.shared.run(SaveTrigger::Manual).await
    }

    pub fn is_saving(&self) -> bool {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SaveEvent> {
        self.shared.events.subscribe()
    }

    /// Stops both triggers and waits for any save in flight to land.
    ///
    /// [`AutoSaver::save_now`] keeps working afterwards, so callers can flush
    /// edits that were still pending.
    pub async fn stop(&mut self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }

        // A manual save from another task may still be running
        loop {
            let landed = self.shared.landed.notified();
            tokio::pin!(landed);
            landed.as_mut().enable();
            if !self.is_saving() {
                break;
            }
            landed.await;
        }
        tracing::debug!("Auto-save stopped");
    }
}

/// Resolves once a stop is requested or the saver is dropped.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn watch_edits(
    shared: Arc<Shared>,
    mut edits: broadcast::Receiver<StoreEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let received = tokio::select! {
            biased;
            _ = stopped(&mut shutdown) => break,
            received = edits.recv() => received,
        };
        match received {
            Ok(event) if event.is_edit() => shared.kick.notify_one(),
            Ok(_) => {}
            // Missed events were edits too
            Err(RecvError::Lagged(_)) => shared.kick.notify_one(),
            Err(RecvError::Closed) => break,
        }
    }
}

async fn debounce_loop(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            biased;
            _ = stopped(&mut shutdown) => return,
            _ = shared.kick.notified() => {}
        }

        // Restart the idle timer on every further kick
        loop {
            tokio::select! {
                biased;
                _ = stopped(&mut shutdown) => return,
                _ = tokio::time::sleep(shared.debounce) => break,
                _ = shared.kick.notified() => continue,
            }
        }

        // Runs to completion; failures are logged and published by the save
        let _ = shared.run(SaveTrigger::Debounced).await;
    }
}

async fn periodic_loop(
    shared: Arc<Shared>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = stopped(&mut shutdown) => return,
            _ = ticker.tick() => {}
        }
        let _ = shared.run(SaveTrigger::Periodic).await;
    }
}
