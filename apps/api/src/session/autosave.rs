//! Autosave Scheduler: debounced persistence of an open document.
//!
//! Every applied edit touches the scheduler. Once no touch has arrived for the
//! quiet period, mirrors are synced and the document is persisted. A snapshot
//! identical to the last persisted one is not saved again. A failed save keeps
//! the document dirty and is retried after another quiet period.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use uuid::Uuid;

use crate::cv::mirror::{mirrors_in_sync, sync_mirrors};
use crate::cv::Document;
use crate::session::store::DocumentStore;

#[derive(Debug, Clone)]
pub struct AutosaveConfig {
    pub quiet_period: Duration,
}

/// Owns the "what was last written" bookkeeping for one document.
pub struct Persister {
    cv_id: Uuid,
    document: Arc<Mutex<Document>>,
    store: Arc<dyn DocumentStore>,
    dirty: AtomicBool,
    last_saved: Mutex<Option<Value>>,
}

impl Persister {
    /// `last_saved` is the stored value the document was opened from, if any.
    pub fn new(
        cv_id: Uuid,
        document: Arc<Mutex<Document>>,
        store: Arc<dyn DocumentStore>,
        last_saved: Option<Value>,
    ) -> Self {
        Self {
            cv_id,
            document,
            store,
            dirty: AtomicBool::new(false),
            last_saved: Mutex::new(last_saved),
        }
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Syncs mirrors and saves. Returns the new version, or `None` when the
    /// snapshot matched the last persisted value.
    pub async fn persist(&self) -> Result<Option<i32>> {
        // Cleared before the snapshot so an edit racing with the save re-dirties.
        self.dirty.store(false, Ordering::SeqCst);
        let snapshot = {
            let mut doc = self.document.lock().await;
            if !mirrors_in_sync(&doc) {
                debug!("Syncing stale mirrors of CV {}", self.cv_id);
                sync_mirrors(&mut doc);
            }
            doc.to_value()
        };

        let mut last_saved = self.last_saved.lock().await;
        if last_saved.as_ref() == Some(&snapshot) {
            debug!("CV {} unchanged since last save; skipping", self.cv_id);
            return Ok(None);
        }

        match self.store.save(self.cv_id, &snapshot).await {
            Ok(version) => {
                debug!("Autosaved CV {} as version {version}", self.cv_id);
                *last_saved = Some(snapshot);
                Ok(Some(version))
            }
            Err(e) => {
                self.mark_dirty();
                Err(e)
            }
        }
    }

    pub async fn flush_if_dirty(&self) -> Result<Option<i32>> {
        if self.is_dirty() {
            self.persist().await
        } else {
            Ok(None)
        }
    }
}

pub struct AutosaveScheduler {
    persister: Arc<Persister>,
    touch_tx: mpsc::UnboundedSender<()>,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl AutosaveScheduler {
    pub fn spawn(persister: Arc<Persister>, config: AutosaveConfig) -> Self {
        let (touch_tx, touch_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(debounce_loop(
            persister.clone(),
            config.quiet_period,
            touch_rx,
            cancel.clone(),
        ));
        Self {
            persister,
            touch_tx,
            cancel,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Records an edit and restarts the quiet period.
    pub fn touch(&self) {
        self.persister.mark_dirty();
        let _ = self.touch_tx.send(());
    }

    /// Stops the scheduler. A save already in progress completes first; pending
    /// edits are left for the caller to flush.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let Some(handle) = self.handle.lock().await.take() else {
            return;
        };
        if let Err(e) = handle.await {
            error!("Autosave task ended abnormally: {e}");
        }
    }
}

async fn debounce_loop(
    persister: Arc<Persister>,
    quiet_period: Duration,
    mut touch_rx: mpsc::UnboundedReceiver<()>,
    cancel: CancellationToken,
) {
    let mut retry = false;
    loop {
        if !retry {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                touch = touch_rx.recv() => if touch.is_none() { return },
            }
        }

        // Quiet period, restarted by every touch.
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                touch = touch_rx.recv() => match touch {
                    Some(()) => continue,
                    None => return,
                },
                _ = tokio::time::sleep(quiet_period) => break,
            }
        }

        retry = match persister.persist().await {
            Ok(_) => false,
            Err(e) => {
                error!("Autosave failed; will retry: {e:#}");
                true
            }
        };
    }
}
