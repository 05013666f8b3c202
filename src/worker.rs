//! Dedicated pipeline thread.
//!
//! The pipeline runs on its own single-threaded runtime, so its futures never
//! need to be `Send` and runs never overlap within one process. HTTP handlers
//! and the interval scheduler talk to it through a [`PipelineHandle`]; each
//! trigger is queued and answered when its run finishes.

use std::error::Error;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{RwLock, mpsc, oneshot};
use tracing::{error, info};

use crate::error::CurateError;
use crate::models::RunReport;
use crate::pipeline::Pipeline;
use crate::utils::now_rfc3339;

/// Pending triggers beyond the one currently running.
const QUEUE_DEPTH: usize = 8;

type Reply = oneshot::Sender<Result<RunReport, CurateError>>;

/// What the status endpoint reports about past runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStatus {
    pub running: bool,
    pub runs: u64,
    pub last_started: Option<String>,
    pub last_finished: Option<String>,
    pub last_report: Option<RunReport>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PipelineHandle {
    tx: mpsc::Sender<Reply>,
    status: Arc<RwLock<RunStatus>>,
}

impl PipelineHandle {
    /// Queue a run and wait for its outcome.
    pub async fn trigger(&self) -> Result<RunReport, CurateError> {
        let (reply, outcome) = oneshot::channel();
        self.tx
            .send(reply)
            .await
            .map_err(|_| CurateError::WorkerGone)?;
        outcome.await.map_err(|_| CurateError::WorkerGone)?
    }

    pub async fn status(&self) -> RunStatus {
        self.status.read().await.clone()
    }
}

/// Start the pipeline thread.
///
/// `build` runs on the new thread; this returns once it has produced a
/// pipeline, or with [`CurateError::Init`] if it failed.
pub async fn spawn<B, Fut, P>(build: B) -> Result<PipelineHandle, CurateError>
where
    B: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<P, Box<dyn Error>>> + 'static,
    P: Pipeline + 'static,
{
    let (tx, rx) = mpsc::channel::<Reply>(QUEUE_DEPTH);
    let (ready_tx, ready_rx) = oneshot::channel::<Result<(), String>>();
    let status = Arc::new(RwLock::new(RunStatus::default()));
    let worker_status = Arc::clone(&status);

    std::thread::Builder::new()
        .name("curator-pipeline".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };
            runtime.block_on(async move {
                let pipeline = match build().await {
                    Ok(pipeline) => pipeline,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                serve_runs(pipeline, rx, worker_status).await;
            });
        })
        .map_err(|e| CurateError::Init(e.to_string()))?;

    match ready_rx.await {
        Ok(Ok(())) => {
            info!("Pipeline worker ready");
            Ok(PipelineHandle { tx, status })
        }
        Ok(Err(message)) => Err(CurateError::Init(message)),
        Err(_) => Err(CurateError::Init("pipeline thread exited".to_string())),
    }
}

async fn serve_runs<P: Pipeline>(
    pipeline: P,
    mut rx: mpsc::Receiver<Reply>,
    status: Arc<RwLock<RunStatus>>,
) {
    while let Some(reply) = rx.recv().await {
        {
            let mut status = status.write().await;
            status.running = true;
            status.last_started = Some(now_rfc3339());
        }

        let outcome = pipeline.run().await;

        {
            let mut status = status.write().await;
            status.running = false;
            status.runs += 1;
            status.last_finished = Some(now_rfc3339());
            match &outcome {
                Ok(report) => {
                    status.last_report = Some(report.clone());
                    status.last_error = None;
                }
                Err(e) => {
                    error!(error = %e, "Curation run failed");
                    status.last_error = Some(e.to_string());
                }
            }
        }

        // The caller may have gone away (e.g. HTTP client disconnected).
        let _ = reply.send(outcome);
    }
    info!("Pipeline worker shutting down");
}


#[cfg(test)]
mod tests {
    use super::testing::CannedPipeline;
    use super::*;

    #[tokio::test]
    async fn test_runs_are_serialized_and_recorded() {
        let handle = spawn(|| async { Ok::<_, Box<dyn Error>>(CannedPipeline::default()) })
            .await
            .unwrap();

        let first = handle.trigger().await.unwrap();
        let second = handle.trigger().await.unwrap();
        assert_eq!(first.processed, 1);
        assert_eq!(second.processed, 2);

        let status = handle.status().await;
        assert!(!status.running);
        assert_eq!(status.runs, 2);
        assert_eq!(status.last_report, Some(second));
        assert!(status.last_error.is_none());
    }

    #[tokio::test]
    async fn test_failed_run_is_recorded() {
        let handle = spawn(|| async { Ok::<_, Box<dyn Error>>(CannedPipeline::failing()) })
            .await
            .unwrap();

        let err = handle.trigger().await.unwrap_err();
        assert!(err.to_string().contains("sources table missing"));
        let status = handle.status().await;
        assert_eq!(status.runs, 1);
        assert!(status.last_error.unwrap().contains("sources table missing"));
    }

    #[tokio::test]
    async fn test_build_failure_is_init_error() {
        let result = spawn(|| async { Err::<CannedPipeline, Box<dyn Error>>("no config".into()) }).await;
        match result {
            Err(CurateError::Init(message)) => assert_eq!(message, "no config"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
