//! Asynchronous batch replay strategy
//!
//! This module provides an asynchronous implementation of the ReplayStrategy
//! trait. The command file is read in batches with csv-async over a tokio
//! file, and each batch is applied on the runtime's blocking pool while the
//! next batch is being read.
//!
//! # Architecture
//!
//! ```text
//! AsyncReplayStrategy
//!     ├── ReplayConfig (batch_size, worker_threads)
//!     ├── AsyncReader (batch CSV reading)
//!     └── LedgerEngine (shared behind Arc)
//! ```
//!
//! # Ordering
//!
//! Credit ids, balances, and every funding decision depend on command
//! order, so batches are applied strictly one after another and commands
//! inside a batch in file order. At most one batch is being applied while at
//! most one more is being read. The output is identical to the sync strategy.

use crate::core::{Command, LedgerEngine, ReplaySummary};
use crate::io::async_reader::AsyncReader;
use crate::io::sync_reader::open_input;
use crate::strategy::{seeded_engine, write_balances, ReplayInputs, ReplayStrategy};
use crate::types::LedgerError;
use std::io::Write;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Configuration for batch replay
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayConfig {
    /// Number of commands per batch
    pub batch_size: usize,
    /// Number of tokio worker threads
    pub worker_threads: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            worker_threads: num_cpus::get(),
        }
    }
}

impl ReplayConfig {
    /// Create a new ReplayConfig, replacing zero values with defaults
    pub fn new(batch_size: usize, worker_threads: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                default = default.batch_size,
                "Invalid batch_size (0), using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let worker_threads = if worker_threads == 0 {
            warn!(
                default = default.worker_threads,
                "Invalid worker_threads (0), using default"
            );
            default.worker_threads
        } else {
            worker_threads
        };

        Self {
            batch_size,
            worker_threads,
        }
    }
}

/// Asynchronous batch replay strategy
#[derive(Debug, Clone)]
pub struct AsyncReplayStrategy {
    config: ReplayConfig,
}

impl AsyncReplayStrategy {
    pub fn new(config: ReplayConfig) -> Self {
        Self { config }
    }

    fn apply_batch(engine: &Arc<LedgerEngine>, batch: Vec<Command>) -> JoinHandle<ReplaySummary> {
        let engine = Arc::clone(engine);
        tokio::task::spawn_blocking(move || engine.apply_all(batch))
    }
}

async fn finish(
    pending: Option<JoinHandle<ReplaySummary>>,
    summary: &mut ReplaySummary,
) -> Result<(), LedgerError> {
    if let Some(handle) = pending {
        let done = handle.await.map_err(|e| LedgerError::IoError {
            message: format!("Batch task failed: {}", e),
        })?;
        summary.merge(done);
    }
    Ok(())
}

impl ReplayStrategy for AsyncReplayStrategy {
    /// Replay the command file in batches
    ///
    /// 1. Seeds the engine from the snapshot files
    /// 2. Creates a tokio multi-threaded runtime
    /// 3. Reads a batch while the previous batch is being applied
    /// 4. Waits for the previous batch before starting the next one
    /// 5. Writes the final balances
    fn process(&self, inputs: &ReplayInputs, output: &mut dyn Write) -> Result<(), LedgerError> {
        let engine = Arc::new(seeded_engine(&inputs.snapshot)?);

        // Fail on a missing command file before spinning up the runtime
        drop(open_input(&inputs.commands)?);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.worker_threads)
            .build()
            .map_err(|e| LedgerError::IoError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        let summary = runtime.block_on(async {
            let file = tokio::fs::File::open(&inputs.commands).await?;
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut summary = ReplaySummary::default();
            let mut pending: Option<JoinHandle<ReplaySummary>> = None;

            loop {
                let batch = reader.read_batch(self.config.batch_size).await;

                finish(pending.take(), &mut summary).await?;

                if batch.is_empty() {
                    break;
                }
                pending = Some(Self::apply_batch(&engine, batch));
            }

            Ok::<_, LedgerError>(summary)
        })?;

        info!(
            applied = summary.applied,
            rejected = summary.rejected,
            batch_size = self.config.batch_size,
            "Replay finished"
        );

        write_balances(&engine, output)
    }
}
