//! Asynchronous CSV reader for command files
//!
//! Provides batch reading of ledger commands from any `futures` async reader.
//!
//! # Design
//!
//! The AsyncReader uses:
//! - csv-async for streaming CSV parsing
//! - the `csv_format` module for row conversion
//! - tracing for rows that cannot be parsed or converted
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of Commands
//!                  ↓
//!           csv_format module
//!           (CommandRow, convert_command_row)
//! ```

use crate::core::Command;
use crate::io::csv_format::{convert_command_row, CommandRow};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous command reader
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read up to `batch_size` commands
    ///
    /// Rows that fail to parse or convert are logged and skipped, and do not
    /// count toward the batch size. Returns an empty vector at end of file.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<Command> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut rows = self.csv_reader.deserialize::<CommandRow>();

        while batch.len() < batch_size {
            match rows.next().await {
                Some(Ok(row)) => match convert_command_row(row) {
                    Ok(command) => batch.push(command),
                    Err(e) => warn!(error = %e, "Skipping invalid command row"),
                },
                Some(Err(e)) => warn!(error = %e, "Skipping malformed command row"),
                None => break,
            }
        }

        batch
    }
}
