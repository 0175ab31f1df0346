//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over converted rows of a CSV file. The same
//! reader serves every input format: it is parameterized by the row type to
//! deserialize and by the `csv_format` conversion to apply to each row.
//!
//! # Iterator Interface
//!
//! SyncReader implements the Iterator trait, yielding `Result<T, String>` for
//! each CSV row:
//!
//! ```no_run
//! use reseller_ledger::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::commands(Path::new("commands.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(command) => println!("Command: {:?}", command),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual row errors are yielded as Err variants in the iterator
//! - Line numbers are included in error messages for debugging

use crate::core::Command;
use crate::io::csv_format::{
    convert_account_row, convert_command_row, convert_package_row, convert_subscriber_row,
    AccountRow, CommandRow, PackageRow, SubscriberRow,
};
use crate::types::{Account, LedgerError, Package, Subscriber};
use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::Path;

/// Open an input file, reporting a missing file as `FileNotFound`
pub fn open_input(path: &Path) -> Result<File, LedgerError> {
    File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => LedgerError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => LedgerError::IoError {
            message: format!("Failed to open file '{}': {}", path.display(), e),
        },
    })
}

/// Synchronous CSV reader
///
/// Reads rows of type `R` and converts each into a `T`.
pub struct SyncReader<R, T> {
    reader: csv::Reader<File>,
    convert: fn(R) -> Result<T, String>,
    line_num: u64,
    _row: PhantomData<R>,
}

impl<R: DeserializeOwned, T> SyncReader<R, T> {
    /// Create a new SyncReader from a file path
    ///
    /// The CSV reader is configured to:
    /// - Trim whitespace from all fields
    /// - Allow flexible field counts (trailing optional columns may be omitted)
    /// - Use an 8KB buffer for efficient I/O
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the CSV file
    /// * `convert` - Conversion from a deserialized row to the domain type
    pub fn new(path: &Path, convert: fn(R) -> Result<T, String>) -> Result<Self, LedgerError> {
        let file = open_input(path)?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            convert,
            line_num: 1,
            _row: PhantomData,
        })
    }
}

impl SyncReader<CommandRow, Command> {
    pub fn commands(path: &Path) -> Result<Self, LedgerError> {
        Self::new(path, convert_command_row)
    }
}

impl SyncReader<AccountRow, Account> {
    pub fn accounts(path: &Path) -> Result<Self, LedgerError> {
        Self::new(path, convert_account_row)
    }
}

impl SyncReader<PackageRow, Package> {
    pub fn packages(path: &Path) -> Result<Self, LedgerError> {
        Self::new(path, convert_package_row)
    }
}

impl SyncReader<SubscriberRow, Subscriber> {
    pub fn subscribers(path: &Path) -> Result<Self, LedgerError> {
        Self::new(path, convert_subscriber_row)
    }
}

impl<R: DeserializeOwned, T> Iterator for SyncReader<R, T> {
    type Item = Result<T, String>;

    /// Get the next converted row
    ///
    /// # Returns
    ///
    /// * `Some(Ok(T))` - Successfully parsed row
    /// * `Some(Err(String))` - Parse or conversion error with line number
    /// * `None` - End of file reached
    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<R>();
        let row = deserializer.next()?;
        self.line_num += 1;

        Some(match row {
            Ok(row) => (self.convert)(row).map_err(|e| format!("Line {}: {}", self.line_num, e)),
            Err(e) => Err(format!("Line {}: CSV parse error: {}", self.line_num, e)),
        })
    }
}
