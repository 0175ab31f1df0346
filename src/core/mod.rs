//! Core business logic module
//!
//! This module contains the credit ledger components:
//! - `traits` - Clock abstraction for deterministic time
//! - `account_store` - Account balances and guarded balance updates
//! - `credit_store` - Credit records (the transfer audit trail)
//! - `policy` - Transfer authorization decision table
//! - `ledger` - Transfer executor and reversal
//! - `billing` - Subscriber renewal and package update cost engine
//! - `engine` - Command dispatch over all of the above

pub mod account_store;
pub mod billing;
pub mod credit_store;
pub mod engine;
pub mod ledger;
pub mod policy;
pub mod traits;

pub use account_store::AccountStore;
pub use billing::SubscriptionBilling;
pub use credit_store::{CreditScope, CreditStore};
pub use engine::{Command, LedgerEngine, Outcome, ReplaySummary};
pub use ledger::{parse_amount, CreditLedger, TransferRequest};
pub use traits::{Clock, FixedClock, SystemClock};
