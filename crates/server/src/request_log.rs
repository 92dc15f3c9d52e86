//! Non-blocking request log.
//!
//! Handlers hand records to a bounded channel; a single writer task drains it
//! into the store. When the writer falls behind, records are dropped rather
//! than slowing the request path.

use crate::metrics;
use std::sync::Arc;
use strmlink_cache::repos::RequestLogRepo;
use strmlink_cache::{RequestLogRow, ResolutionStore};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct RequestLogger {
    tx: Option<mpsc::Sender<RequestLogRow>>,
}

impl RequestLogger {
    /// A logger that discards every record.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Start the writer task. It exits once every logger clone is dropped
    /// and the buffer is drained.
    pub fn spawn(store: Arc<dyn ResolutionStore>, buffer: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<RequestLogRow>(buffer.max(1));
        let handle = tokio::spawn(async move {
            while let Some(row) = rx.recv().await {
                if let Err(e) = store.append_request(&row).await {
                    tracing::warn!(error = %e, "failed to write request log record");
                }
            }
            tracing::debug!("request log writer stopped");
        });
        (Self { tx: Some(tx) }, handle)
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    pub fn record(&self, row: RequestLogRow) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(row) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                metrics::REQUEST_LOG_DROPPED.inc();
                tracing::debug!("request log buffer full, dropping record");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("request log writer gone, dropping record");
            }
        }
    }
}
