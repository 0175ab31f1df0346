//! Replay strategy module
//!
//! This module defines the Strategy pattern for complete replay pipelines:
//! seeding a ledger from snapshot files, applying a command file, and writing
//! the final balances. Different implementations (synchronous, asynchronous
//! batch) can be selected at runtime and produce identical output.

use crate::cli::StrategyType;
use crate::core::LedgerEngine;
use crate::io::{load_snapshot, SnapshotPaths};
use crate::types::LedgerError;
use std::io::Write;
use std::path::PathBuf;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncReplayStrategy, ReplayConfig};
pub use sync::SyncReplayStrategy;

/// Input files of one replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayInputs {
    pub snapshot: SnapshotPaths,
    pub commands: PathBuf,
}

/// Replay strategy trait for complete replay pipelines
pub trait ReplayStrategy: Send + Sync {
    /// Replay `inputs` and write the final account balances to `output`
    ///
    /// Individual command failures are logged and skipped; they never cause
    /// this method to return an error.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An input file cannot be opened (`FileNotFound`, `IoError`)
    /// - The async runtime cannot be created
    /// - Output cannot be written
    fn process(&self, inputs: &ReplayInputs, output: &mut dyn Write) -> Result<(), LedgerError>;
}

/// Build an engine seeded from the snapshot files
pub(crate) fn seeded_engine(snapshot: &SnapshotPaths) -> Result<LedgerEngine, LedgerError> {
    let engine = LedgerEngine::new();
    load_snapshot(&engine, snapshot)?;
    Ok(engine)
}

/// Write the engine's final balances
pub(crate) fn write_balances(
    engine: &LedgerEngine,
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    crate::io::write_accounts_csv(&engine.accounts(), output)
        .map_err(|message| LedgerError::IoError { message })
}

/// Create a replay strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of replay strategy to create (Sync or Async)
/// * `config` - Optional batch configuration (ignored for sync)
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<ReplayConfig>,
) -> Box<dyn ReplayStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncReplayStrategy),
        StrategyType::Async => Box::new(AsyncReplayStrategy::new(config.unwrap_or_default())),
    }
}
