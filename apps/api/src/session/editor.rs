//! Editing sessions: one open Document per CV, its autosave, and the readiness
//! job that produces it.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tokio::sync::{watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::cv::mirror::sync_mirrors;
use crate::cv::render::render_document_to_md;
use crate::cv::{assemble, Document};
use crate::errors::AppError;
use crate::ingestion::readiness::{
    run_readiness_poll, ReadinessConfig, ReadinessState, ReadinessStatus, StatusSource,
};
use crate::session::autosave::{AutosaveConfig, AutosaveScheduler, Persister};
use crate::session::store::DocumentStore;

pub struct EditorSession {
    document: Arc<Mutex<Document>>,
    persister: Arc<Persister>,
    autosave: AutosaveScheduler,
}

impl EditorSession {
    /// Assembles `raw` into a Document and starts its autosave. `persisted` says
    /// whether `raw` came from the store, in which case an unedited document is
    /// never written back.
    pub fn open(
        cv_id: Uuid,
        raw: &Value,
        persisted: bool,
        store: Arc<dyn DocumentStore>,
        config: AutosaveConfig,
    ) -> Self {
        let document = assemble(raw);
        let last_saved = persisted.then(|| document.to_value());
        let document = Arc::new(Mutex::new(document));
        let persister = Arc::new(Persister::new(cv_id, document.clone(), store, last_saved));
        let autosave = AutosaveScheduler::spawn(persister.clone(), config);
        Self {
            document,
            persister,
            autosave,
        }
    }

    /// Applies one Mutation API call. Applied edits restart the autosave quiet period.
    pub async fn mutate<F>(&self, edit: F) -> bool
    where
        F: FnOnce(&mut Document) -> bool,
    {
        let applied = {
            let mut doc = self.document.lock().await;
            edit(&mut doc)
        };
        if applied {
            self.autosave.touch();
        }
        applied
    }

    /// A copy of the document with its mirrors brought up to date.
    pub async fn snapshot(&self) -> Document {
        let mut doc = self.document.lock().await.clone();
        sync_mirrors(&mut doc);
        doc
    }

    pub async fn export_markdown(&self) -> String {
        render_document_to_md(&*self.document.lock().await)
    }

    /// Manual save. Returns the new version, or `None` if nothing changed.
    pub async fn save_now(&self) -> Result<Option<i32>> {
        self.persister.persist().await
    }

    /// Stops autosave and flushes unsaved edits.
    pub async fn close(&self) -> Result<Option<i32>> {
        self.autosave.shutdown().await;
        self.persister.flush_if_dirty().await
    }
}

struct IngestionJob {
    state_rx: watch::Receiver<ReadinessState>,
    cancel: CancellationToken,
}

impl IngestionJob {
    fn is_running(&self) -> bool {
        !matches!(
            self.state_rx.borrow().status,
            ReadinessStatus::Completed | ReadinessStatus::Failed
        ) && !self.cancel.is_cancelled()
    }
}

pub struct SessionRegistry {
    store: Arc<dyn DocumentStore>,
    producer: Arc<dyn StatusSource>,
    readiness_config: ReadinessConfig,
    autosave_config: AutosaveConfig,
    sessions: RwLock<HashMap<Uuid, Arc<EditorSession>>>,
    jobs: Mutex<HashMap<Uuid, IngestionJob>>,
}

impl SessionRegistry {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        producer: Arc<dyn StatusSource>,
        readiness_config: ReadinessConfig,
        autosave_config: AutosaveConfig,
    ) -> Self {
        Self {
            store,
            producer,
            readiness_config,
            autosave_config,
            sessions: RwLock::new(HashMap::new()),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Starts polling the producer for `job_id`. On completion the payload is
    /// assembled and installed as the CV's session before `Completed` is published.
    pub async fn start_ingestion(self: &Arc<Self>, cv_id: Uuid, job_id: String) -> Result<(), AppError> {
        let mut jobs = self.jobs.lock().await;
        if jobs.get(&cv_id).is_some_and(IngestionJob::is_running) {
            return Err(AppError::Conflict(format!(
                "An ingestion job is already running for CV {cv_id}"
            )));
        }

        let (state_tx, state_rx) = watch::channel(ReadinessState::default());
        let cancel = CancellationToken::new();
        jobs.insert(
            cv_id,
            IngestionJob {
                state_rx,
                cancel: cancel.clone(),
            },
        );
        drop(jobs);

        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = run_readiness_poll(
                registry.producer.clone(),
                job_id,
                registry.readiness_config.clone(),
                &state_tx,
                cancel.clone(),
            )
            .await;
            let Some((state, payload)) = outcome else {
                info!("Ingestion for CV {cv_id} cancelled");
                return;
            };
            if state.status == ReadinessStatus::Completed
                && !registry.finish_ingestion(cv_id, &cancel, payload.as_ref()).await
            {
                return;
            }
            state_tx.send_replace(state);
        });
        Ok(())
    }

    /// Opens the session for a completed ingestion. Holds the jobs lock so it
    /// cannot interleave with `close`; a job cancelled by then installs nothing.
    async fn finish_ingestion(
        &self,
        cv_id: Uuid,
        cancel: &CancellationToken,
        payload: Option<&Value>,
    ) -> bool {
        let jobs = self.jobs.lock().await;
        if cancel.is_cancelled() {
            info!("Ingestion for CV {cv_id} completed after it was cancelled; discarding");
            return false;
        }
        let Some(payload) = payload else {
            return false;
        };
        self.install(cv_id, payload, false).await;
        drop(jobs);
        true
    }

    pub async fn readiness(&self, cv_id: Uuid) -> Option<ReadinessState> {
        self.jobs
            .lock()
            .await
            .get(&cv_id)
            .map(|job| job.state_rx.borrow().clone())
    }

    pub async fn get(&self, cv_id: Uuid) -> Option<Arc<EditorSession>> {
        self.sessions.read().await.get(&cv_id).cloned()
    }

    pub async fn session(&self, cv_id: Uuid) -> Result<Arc<EditorSession>, AppError> {
        self.get(cv_id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("No open session for CV {cv_id}")))
    }

    /// Opens the latest saved version, or returns the session already open.
    pub async fn open_from_store(&self, cv_id: Uuid) -> Result<Arc<EditorSession>, AppError> {
        if let Some(session) = self.get(cv_id).await {
            return Ok(session);
        }
        let raw = self
            .store
            .load_latest(cv_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No saved document for CV {cv_id}")))?;
        Ok(self.install(cv_id, &raw, true).await)
    }

    /// Closes the session and cancels any readiness job. Returns the version
    /// written by the final flush, if one was needed.
    pub async fn close(&self, cv_id: Uuid) -> Result<Option<i32>, AppError> {
        let job = self.jobs.lock().await.remove(&cv_id);
        if let Some(job) = &job {
            job.cancel.cancel();
        }
        let session = self.sessions.write().await.remove(&cv_id);
        match session {
            Some(session) => Ok(session.close().await?),
            None if job.is_some() => Ok(None),
            None => Err(AppError::NotFound(format!("No open session for CV {cv_id}"))),
        }
    }

    /// Closes everything; used on shutdown.
    pub async fn close_all(&self) {
        for job in self.jobs.lock().await.drain().map(|(_, job)| job) {
            job.cancel.cancel();
        }
        let sessions: Vec<_> = self.sessions.write().await.drain().collect();
        for (cv_id, session) in sessions {
            if let Err(e) = session.close().await {
                error!("Final save of CV {cv_id} failed: {e:#}");
            }
        }
    }

    async fn install(&self, cv_id: Uuid, raw: &Value, persisted: bool) -> Arc<EditorSession> {
        let session = Arc::new(EditorSession::open(
            cv_id,
            raw,
            persisted,
            self.store.clone(),
            self.autosave_config.clone(),
        ));
        let previous = self.sessions.write().await.insert(cv_id, session.clone());
        if let Some(previous) = previous {
            warn!("Replacing open session for CV {cv_id}");
            if let Err(e) = previous.close().await {
                error!("Final save of replaced session for CV {cv_id} failed: {e:#}");
            }
        }
        info!("Opened editor session for CV {cv_id}");
        session
    }
}
