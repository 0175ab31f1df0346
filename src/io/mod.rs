//! I/O module
//!
//! Handles CSV parsing and output.
//!
//! # Components
//!
//! - `csv_format` - CSV row formats, conversion to domain types, account output
//! - `sync_reader` - Synchronous CSV reader with iterator interface
//! - `async_reader` - Asynchronous command reader with batch reading interface
//! - `snapshot` - Seeding an engine from account/package/subscriber files

pub mod async_reader;
pub mod csv_format;
pub mod snapshot;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{convert_command_row, write_accounts_csv, CommandRow};
pub use snapshot::{load_snapshot, SnapshotPaths};
pub use sync_reader::SyncReader;
