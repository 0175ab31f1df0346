//! Reseller Credit Ledger Library
//! # Overview
//!
//! This library implements the credit ledger of a reseller hierarchy
//! (admin → distributor → reseller → subscriber): balance transfers between
//! accounts, the audit trail of those transfers, and the billing of
//! subscriber renewals and package changes to the owning reseller.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Account, CreditRecord, Subscriber, LedgerError)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Business logic components:
//!   - [`core::policy`] - Transfer authorization decision table
//!   - [`core::ledger`] - Transfer executor and reversal
//!   - [`core::billing`] - Subscriber renewal/update cost engine
//!   - [`core::account_store`] - Account balances with guarded updates
//!   - [`core::credit_store`] - Credit records
//!   - [`core::engine`] - Command dispatch used by the replay tool
//! - [`io`] - CSV snapshot, command, and balance formats
//! - [`strategy`] - Sync and async replay pipelines
//!
//! # Transfer Types
//!
//! - **Debit**: actor → target; the actor must hold the amount
//! - **Reverse Credit**: target → actor; the target must hold the amount
//!
//! # Invariants
//!
//! - No balance is ever negative
//! - A transfer leaves `actor.balance + target.balance` unchanged
//! - A transfer's balance changes and its credit record are applied together
//! - Reversing a credit record restores both participants

pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use self::core::{Command, CreditLedger, LedgerEngine, SubscriptionBilling, TransferRequest};
pub use io::write_accounts_csv;
pub use types::{
    Account, AccountId, CreditId, CreditRecord, CreditType, LedgerError, Role, Subscriber,
    SubscriberId,
};
