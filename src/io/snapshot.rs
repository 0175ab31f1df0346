//! Snapshot loading
//!
//! Seeds a `LedgerEngine` from the accounts, packages, and subscribers CSV
//! files. Packages are loaded before subscribers so subscriber package lists
//! can be checked against the catalog. Rows that cannot be parsed or that the
//! engine rejects are logged and skipped; a missing file is fatal.

use crate::core::LedgerEngine;
use crate::io::sync_reader::SyncReader;
use crate::types::LedgerError;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Locations of the snapshot files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPaths {
    pub accounts: PathBuf,
    pub packages: Option<PathBuf>,
    pub subscribers: Option<PathBuf>,
}

impl SnapshotPaths {
    pub fn accounts_only(accounts: impl Into<PathBuf>) -> Self {
        Self {
            accounts: accounts.into(),
            packages: None,
            subscribers: None,
        }
    }
}

/// Feed every converted row of `reader` to `add`, returning how many were kept
fn seed<R, T, F>(kind: &str, path: &Path, reader: SyncReader<R, T>, add: F) -> usize
where
    R: DeserializeOwned,
    F: Fn(T) -> Result<(), LedgerError>,
{
    let mut loaded = 0;
    for row in reader {
        let added = row.and_then(|item| add(item).map_err(|e| e.to_string()));
        match added {
            Ok(()) => loaded += 1,
            Err(error) => warn!(kind, path = %path.display(), %error, "Skipping snapshot row"),
        }
    }
    info!(kind, loaded, "Snapshot loaded");
    loaded
}

/// Load all snapshot files into `engine`
pub fn load_snapshot(engine: &LedgerEngine, paths: &SnapshotPaths) -> Result<(), LedgerError> {
    let reader = SyncReader::accounts(&paths.accounts)?;
    seed("accounts", &paths.accounts, reader, |a| engine.add_account(a));

    if let Some(path) = &paths.packages {
        let reader = SyncReader::packages(path)?;
        seed("packages", path, reader, |p| engine.add_package(p));
    }

    if let Some(path) = &paths.subscribers {
        let reader = SyncReader::subscribers(path)?;
        seed("subscribers", path, reader, |s| engine.add_subscriber(s));
    }

    Ok(())
}
