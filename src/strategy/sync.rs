//! Synchronous replay strategy
//!
//! Streams the command file one row at a time through `SyncReader` and
//! applies each command to the engine on the calling thread.

use crate::core::ReplaySummary;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{seeded_engine, write_balances, ReplayInputs, ReplayStrategy};
use crate::types::LedgerError;
use std::io::Write;
use tracing::{info, warn};

/// Synchronous replay strategy
#[derive(Debug, Clone, Copy)]
pub struct SyncReplayStrategy;

impl ReplayStrategy for SyncReplayStrategy {
    fn process(&self, inputs: &ReplayInputs, output: &mut dyn Write) -> Result<(), LedgerError> {
        let engine = seeded_engine(&inputs.snapshot)?;
        let reader = SyncReader::commands(&inputs.commands)?;

        let mut summary = ReplaySummary::default();
        for row in reader {
            match row {
                Ok(command) => summary.merge(engine.apply_all([command])),
                Err(e) => warn!(error = %e, "Skipping invalid command row"),
            }
        }
        info!(
            applied = summary.applied,
            rejected = summary.rejected,
            "Replay finished"
        );

        write_balances(&engine, output)
    }
}
