use domain::{PrintJob, SubmissionId};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::link::PrinterLink;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Print dispatcher is not running")]
    Stopped,
}

/// Fire-and-forget submission handle.
///
/// `submit` only enqueues; the caller never learns whether the payload
/// reached the printer. Clones share the same queue.
#[derive(Clone)]
pub struct JobDispatcher {
    job_tx: mpsc::UnboundedSender<PrintJob>,
}

impl JobDispatcher {
    pub fn new(link: Arc<PrinterLink>, cancel_token: CancellationToken) -> (Self, DispatchWorker) {
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        let worker = DispatchWorker {
            link,
            job_rx,
            cancel_token,
            in_flight: JoinSet::new(),
        };
        (Self { job_tx }, worker)
    }

    pub fn submit(&self, payload: Vec<u8>) -> Result<SubmissionId, DispatchError> {
        let job = PrintJob::new(payload);
        let id = job.id;
        let bytes = job.len();
        self.job_tx.send(job).map_err(|_| DispatchError::Stopped)?;
        debug!(job_id = %id, bytes, "Print job queued");
        Ok(id)
    }

    pub fn is_running(&self) -> bool {
        !self.job_tx.is_closed()
    }
}

/// Background side of the dispatcher. Runs every job as its own task, so
/// jobs carry no ordering guarantee relative to each other; the printer link
/// still serializes the actual writes.
pub struct DispatchWorker {
    link: Arc<PrinterLink>,
    job_rx: mpsc::UnboundedReceiver<PrintJob>,
    cancel_token: CancellationToken,
    in_flight: JoinSet<()>,
}

impl DispatchWorker {
    pub async fn run(mut self) {
        info!("🖨️ Print dispatcher started");

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    let pending = self.in_flight.len();
                    if pending > 0 {
                        warn!(pending, "Aborting in-flight print jobs");
                    }
                    self.in_flight.abort_all();
                    while self.in_flight.join_next().await.is_some() {}
                    info!("🖨️ Print dispatcher stopped");
                    return;
                }
                job = self.job_rx.recv() => match job {
                    Some(job) => {
                        self.in_flight.spawn(execute(self.link.clone(), job));
                    }
                    None => break,
                },
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Print job task failed");
                    }
                }
            }
        }

        // All submission handles dropped: let queued work finish unless cancelled
        info!("🖨️ Print job channel closed. Draining in-flight jobs");
        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    self.in_flight.abort_all();
                    while self.in_flight.join_next().await.is_some() {}
                    break;
                }
                joined = self.in_flight.join_next() => match joined {
                    Some(Err(e)) if e.is_panic() => error!(error = %e, "Print job task panicked"),
                    Some(_) => {}
                    None => break,
                },
            }
        }
        info!("🖨️ Print dispatcher stopped");
    }
}

async fn execute(link: Arc<PrinterLink>, job: PrintJob) {
    let started = std::time::Instant::now();
    match link.send_bytes(&job.payload).await {
        Ok(()) => info!(
            job_id = %job.id,
            bytes = job.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "✅ Print job sent"
        ),
        Err(e) => error!(
            job_id = %job.id,
            bytes = job.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            error = %e,
            "❌ Print job failed. Job dropped"
        ),
    }
}
