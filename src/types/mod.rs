//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account, role, and status types
//! - `credit`: Credit ledger records and transfer results
//! - `subscriber`: Packages, subscribers, and billing results
//! - `error`: Error types for the ledger

pub mod account;
pub mod credit;
pub mod error;
pub mod subscriber;

pub use account::{Account, AccountId, AccountStatus, Role};
pub use credit::{CreditId, CreditRecord, CreditType, TransferResult};
pub use error::{Denial, FundingSide, LedgerError, CURRENCY_SYMBOL};
pub use subscriber::{
    Package, PackageId, RenewResult, Subscriber, SubscriberId, SubscriberStatus, UpdateResult,
};
