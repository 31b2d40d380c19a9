//! Streaming sessions
//!
//! Each connected client gets a [`Session`]: one tokio task that consumes its
//! frames strictly in arrival order and owns a private [`FocusProcessor`].
//! Summary and feedback queries take the processor lock for the duration of
//! the read (or read-and-reset), so they can run alongside the frame path.
//! Inference runs on the blocking pool without holding that lock.

use crate::clock::{Clock, MonotonicClock};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::feedback::FeedbackReport;
use crate::pipeline::{analyze_frame, FocusProcessor, FrameAnalysis};
use crate::protocol::{parse_message, IngestOutcome};
use crate::providers::{LandmarkProvider, ObjectDetector};
use crate::types::{FocusResult, SessionSummary};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Inference capabilities handed to every session
#[derive(Clone)]
pub struct Providers {
    pub landmarks: Arc<dyn LandmarkProvider>,
    pub detector: Arc<dyn ObjectDetector>,
}

impl Providers {
    pub fn new(landmarks: Arc<dyn LandmarkProvider>, detector: Arc<dyn ObjectDetector>) -> Self {
        Self {
            landmarks,
            detector,
        }
    }
}

/// What happened to one submitted client message
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Frame queued; its result arrives on the results channel
    Queued,
    /// Summary request answered inline
    Summary(SessionSummary),
    Ignored,
}

fn lock(processor: &Mutex<FocusProcessor>) -> MutexGuard<'_, FocusProcessor> {
    processor
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One client's stream
pub struct Session {
    id: Uuid,
    opened_at: DateTime<Utc>,
    frames_tx: mpsc::Sender<Vec<u8>>,
    processor: Arc<Mutex<FocusProcessor>>,
    cancel_token: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Start a session worker. Must be called inside a tokio runtime.
    pub fn spawn(
        id: Uuid,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        providers: Providers,
    ) -> (Self, mpsc::UnboundedReceiver<FocusResult>) {
        let (frames_tx, frames_rx) = mpsc::channel(config.session.frame_queue_capacity.max(1));
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let processor = Arc::new(Mutex::new(FocusProcessor::with_clock(config, clock)));
        let cancel_token = CancellationToken::new();

        let handle = tokio::spawn(
            frame_worker(
                frames_rx,
                Arc::clone(&processor),
                providers,
                results_tx,
                cancel_token.clone(),
            )
            .instrument(tracing::info_span!("session", id = %id)),
        );

        tracing::info!(session = %id, "session opened");

        let session = Self {
            id,
            opened_at: Utc::now(),
            frames_tx,
            processor,
            cancel_token,
            handle: Mutex::new(Some(handle)),
        };
        (session, results_rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Handle one raw client message
    pub async fn submit(&self, text: &str) -> Result<SubmitOutcome, EngineError> {
        match parse_message(text) {
            IngestOutcome::Frame(image) => {
                self.push_frame(image).await?;
                Ok(SubmitOutcome::Queued)
            }
            IngestOutcome::Summary { reset } => Ok(SubmitOutcome::Summary(self.summary(reset))),
            IngestOutcome::Ignored => Ok(SubmitOutcome::Ignored),
        }
    }

    /// Queue decoded frame bytes. Waits while the queue is full.
    pub async fn push_frame(&self, image: Vec<u8>) -> Result<(), EngineError> {
        if self.cancel_token.is_cancelled() {
            return Err(EngineError::SessionClosed(self.id));
        }
        self.frames_tx
            .send(image)
            .await
            .map_err(|_| EngineError::SessionClosed(self.id))
    }

    /// Summary of everything processed so far
    pub fn summary(&self, reset: bool) -> SessionSummary {
        lock(&self.processor).summary(reset)
    }

    pub fn feedback(&self) -> Option<FeedbackReport> {
        lock(&self.processor).feedback()
    }

    pub fn frames_processed(&self) -> u64 {
        lock(&self.processor).frames_processed()
    }

    pub fn is_closed(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Stop accepting frames and wait for the worker to exit
    pub async fn close(&self) {
        self.cancel_token.cancel();

        let handle = self
            .handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(session = %self.id, error = %e, "session worker failed to join");
            }
        }
        tracing::info!(session = %self.id, "session closed");
    }
}

async fn frame_worker(
    mut frames_rx: mpsc::Receiver<Vec<u8>>,
    processor: Arc<Mutex<FocusProcessor>>,
    providers: Providers,
    results_tx: mpsc::UnboundedSender<FocusResult>,
    cancel_token: CancellationToken,
) {
    loop {
        let image = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            frame = frames_rx.recv() => match frame {
                Some(image) => image,
                None => break,
            },
        };

        let analysis = tokio::task::spawn_blocking({
            let providers = providers.clone();
            move || {
                analyze_frame(
                    &image,
                    providers.landmarks.as_ref(),
                    providers.detector.as_ref(),
                )
            }
        })
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "frame analysis panicked, treating frame as empty");
            FrameAnalysis::default()
        });

        let processed = panic::catch_unwind(AssertUnwindSafe(|| {
            lock(&processor).process(analysis.landmarks.as_ref(), analysis.phone)
        }));
        let result = match processed {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("frame processing panicked, dropping frame");
                continue;
            }
        };

        if results_tx.send(result).is_err() {
            tracing::debug!("result receiver dropped");
        }
    }

    tracing::debug!("session worker shutting down");
}

/// All live sessions, keyed by connection id
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
    providers: Providers,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl SessionRegistry {
    pub fn new(config: EngineConfig, providers: Providers) -> Self {
        Self::with_clock(config, providers, Arc::new(MonotonicClock::start()))
    }

    pub fn with_clock(config: EngineConfig, providers: Providers, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            providers,
            config,
            clock,
        }
    }

    /// Open a fresh session with its own trackers
    pub async fn open(&self) -> (Uuid, mpsc::UnboundedReceiver<FocusResult>) {
        let id = Uuid::new_v4();
        let (session, results_rx) = Session::spawn(
            id,
            self.config.clone(),
            Arc::clone(&self.clock),
            self.providers.clone(),
        );
        self.sessions.write().await.insert(id, Arc::new(session));
        (id, results_rx)
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<Session>, EngineError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(EngineError::SessionNotFound(id))
    }

    pub async fn submit(&self, id: Uuid, text: &str) -> Result<SubmitOutcome, EngineError> {
        self.get(id).await?.submit(text).await
    }

    pub async fn summary(&self, id: Uuid, reset: bool) -> Result<SessionSummary, EngineError> {
        Ok(self.get(id).await?.summary(reset))
    }

    pub async fn feedback(&self, id: Uuid) -> Result<Option<FeedbackReport>, EngineError> {
        Ok(self.get(id).await?.feedback())
    }

    /// Disconnect: drop the session and wait for its worker
    pub async fn close(&self, id: Uuid) -> Result<(), EngineError> {
        let session = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(EngineError::SessionNotFound(id))?;
        session.close().await;
        Ok(())
    }

    pub async fn close_all(&self) {
        let sessions: Vec<_> = self.sessions.write().await.drain().map(|(_, s)| s).collect();
        for session in sessions {
            session.close().await;
        }
    }

    pub async fn ids(&self) -> Vec<Uuid> {
        self.sessions.read().await.keys().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
