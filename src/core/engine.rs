//! Ledger command processing
//!
//! `LedgerEngine` wires the account store, the credit store, the credit
//! ledger, and subscription billing together, and dispatches [`Command`]s to
//! them. It is what the replay strategies drive.
//!
//! # Command Semantics
//!
//! - **Transfer**: raw amount and type strings are validated in the same
//!   order a request handler would (amount, then type), then executed.
//! - **Reverse**: admin-only deletion of a credit record, restoring both sides.
//! - **Renew**: flat-cost renewal of a subscriber's current packages.
//! - **UpdatePackages**: package set change charged by positive cost delta.
//!
//! A failed command leaves every balance, record, and subscriber untouched.

use crate::core::account_store::AccountStore;
use crate::core::billing::SubscriptionBilling;
use crate::core::credit_store::CreditStore;
use crate::core::ledger::{CreditLedger, TransferRequest};
use crate::core::traits::{Clock, SystemClock};
use crate::types::{
    Account, AccountId, CreditId, CreditRecord, LedgerError, Package, PackageId, RenewResult,
    Subscriber, SubscriberId, TransferResult, UpdateResult,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// A single ledger operation, as read from a command file
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Transfer {
        actor: AccountId,
        target: AccountId,
        credit_type: String,
        amount: String,
    },
    Reverse {
        actor: AccountId,
        credit: CreditId,
    },
    Renew {
        subscriber: SubscriberId,
        days: i64,
    },
    UpdatePackages {
        subscriber: SubscriberId,
        packages: Vec<PackageId>,
        expiry: Option<DateTime<Utc>>,
    },
}

impl Command {
    /// Short operation name for log output
    pub fn op(&self) -> &'static str {
        match self {
            Command::Transfer { .. } => "transfer",
            Command::Reverse { .. } => "reverse",
            Command::Renew { .. } => "renew",
            Command::UpdatePackages { .. } => "update",
        }
    }
}

/// Result of a successfully applied command
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Transferred(TransferResult),
    Reversed(CreditRecord),
    Renewed(RenewResult),
    Updated(UpdateResult),
}

/// Counts of applied and rejected commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub rejected: usize,
}

impl ReplaySummary {
    pub fn merge(&mut self, other: ReplaySummary) {
        self.applied += other.applied;
        self.rejected += other.rejected;
    }
}

/// Main ledger engine
///
/// All methods take `&self`; the engine can be shared across threads behind
/// an `Arc`.
pub struct LedgerEngine {
    ledger: Arc<CreditLedger>,
    billing: SubscriptionBilling,
}

impl LedgerEngine {
    /// Create an empty engine timestamped by the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let ledger = Arc::new(CreditLedger::with_clock(
            Arc::new(AccountStore::new()),
            Arc::new(CreditStore::new()),
            clock,
        ));
        let billing = SubscriptionBilling::new(Arc::clone(&ledger));

        Self { ledger, billing }
    }

    pub fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    pub fn billing(&self) -> &SubscriptionBilling {
        &self.billing
    }

    pub fn add_account(&self, account: Account) -> Result<(), LedgerError> {
        self.ledger.accounts().insert(account)
    }

    pub fn add_package(&self, package: Package) -> Result<(), LedgerError> {
        self.billing.add_package(package)
    }

    pub fn add_subscriber(&self, subscriber: Subscriber) -> Result<(), LedgerError> {
        self.billing.add_subscriber(subscriber)
    }

    /// Snapshot of every account, sorted by id
    pub fn accounts(&self) -> Vec<Account> {
        self.ledger.accounts().all()
    }

    /// Apply one command
    pub fn apply(&self, command: Command) -> Result<Outcome, LedgerError> {
        match command {
            Command::Transfer {
                actor,
                target,
                credit_type,
                amount,
            } => {
                let request = TransferRequest::parse(actor, target, &credit_type, &amount)?;
                self.ledger.transfer(request).map(Outcome::Transferred)
            }
            Command::Reverse { actor, credit } => self
                .ledger
                .reverse_transfer(actor, credit)
                .map(Outcome::Reversed),
            Command::Renew { subscriber, days } => {
                self.billing.renew(subscriber, days).map(Outcome::Renewed)
            }
            Command::UpdatePackages {
                subscriber,
                packages,
                expiry,
            } => self
                .billing
                .update_packages(subscriber, &packages, expiry)
                .map(Outcome::Updated),
        }
    }

    /// Apply commands in order, logging and skipping the ones that fail
    pub fn apply_all<I>(&self, commands: I) -> ReplaySummary
    where
        I: IntoIterator<Item = Command>,
    {
        let mut summary = ReplaySummary::default();
        for command in commands {
            let op = command.op();
            match self.apply(command) {
                Ok(outcome) => {
                    debug!(op, ?outcome, "Command applied");
                    summary.applied += 1;
                }
                Err(e) => {
                    warn!(op, error = %e, "Command rejected");
                    summary.rejected += 1;
                }
            }
        }
        summary
    }
}

impl Default for LedgerEngine {
    fn default() -> Self {
        Self::new()
    }
}
