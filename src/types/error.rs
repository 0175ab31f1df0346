//! Error types for the reseller ledger
//!
//! Every error carries a human-readable message suitable for direct display
//! to the user that triggered the operation.
//!
//! # Error Categories
//!
//! - **Validation Errors**: invalid amount, type, duration, expiry, package set
//! - **Lookup Errors**: unknown account, credit record, subscriber, or package
//! - **Authorization Errors**: transfer policy denials with role-specific messages
//! - **Funding Errors**: insufficient balance on the paying side
//! - **Arithmetic Errors**: balance overflow
//! - **File I/O Errors**: used by the replay harness only
//!
//! All validation, lookup, authorization, and funding errors are detected
//! before any balance is mutated.

use super::account::{AccountId, Role};
use super::credit::CreditId;
use super::subscriber::{PackageId, SubscriberId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

/// Currency symbol used in user-facing balance messages
pub const CURRENCY_SYMBOL: &str = "₹";

/// Reason the transfer authorization policy refused an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Resellers cannot initiate credit transactions
    ResellerInitiated,

    /// Distributor targeted a reseller it did not create
    NotOwnReseller,

    /// Distributor targeted something other than a reseller
    DistributorTargetNotReseller,

    /// Admin targeted something other than a distributor or reseller
    AdminTargetNotAllowed,

    /// Operation restricted to admins
    AdminOnly,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Denial::ResellerInitiated => "Resellers are not allowed to perform credit transactions",
            Denial::NotOwnReseller => {
                "You can only manage credits for resellers you have created"
            }
            Denial::DistributorTargetNotReseller => {
                "Distributors can only transfer credits to resellers"
            }
            Denial::AdminTargetNotAllowed => {
                "Admins can only transfer credits to distributors or resellers"
            }
            Denial::AdminOnly => "Only admins can perform this operation",
        };
        f.write_str(message)
    }
}

/// Which side of an operation lacked funds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundingSide {
    /// The initiating actor (Debit)
    Actor,

    /// The target account (Reverse Credit, or reversal of a Debit)
    Target,

    /// The original sender of a Reverse Credit being reversed
    Sender,

    /// The reseller paying for a subscriber renewal/upgrade
    Reseller,
}

fn funding_message(side: &FundingSide, balance: &Decimal, requested: &Decimal) -> String {
    match side {
        FundingSide::Actor => format!("Insufficient balance. Your balance: {CURRENCY_SYMBOL}{balance}"),
        FundingSide::Target => format!(
            "Insufficient balance in target account. Available: {CURRENCY_SYMBOL}{balance}, required: {CURRENCY_SYMBOL}{requested}"
        ),
        FundingSide::Sender => format!(
            "Insufficient balance in sender account. Available: {CURRENCY_SYMBOL}{balance}, required: {CURRENCY_SYMBOL}{requested}"
        ),
        FundingSide::Reseller => format!(
            "Insufficient reseller balance. Available: {CURRENCY_SYMBOL}{balance}, required: {CURRENCY_SYMBOL}{requested}"
        ),
    }
}

/// Main error type for the reseller ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Amount is not a number, or is not strictly positive
    #[error("Invalid amount '{amount}': amount must be a number greater than zero")]
    InvalidAmount {
        /// The rejected amount as supplied
        amount: String,
    },

    /// Credit type is neither Debit nor Reverse Credit
    #[error("Invalid transaction type '{credit_type}': expected 'Debit' or 'Reverse Credit'")]
    InvalidType {
        /// The rejected type as supplied
        credit_type: String,
    },

    #[error("User {account} not found")]
    AccountNotFound { account: AccountId },

    #[error("Credit record {credit} not found")]
    CreditNotFound { credit: CreditId },

    #[error("Subscriber {subscriber} not found")]
    SubscriberNotFound { subscriber: SubscriberId },

    #[error("Package {package} not found")]
    PackageNotFound { package: PackageId },

    /// Authorization policy denial
    #[error("{reason}")]
    Forbidden { reason: Denial },

    /// The paying side does not hold enough balance
    ///
    /// The message distinguishes which side lacked funds.
    #[error("{}", funding_message(.side, .balance, .requested))]
    InsufficientFunds {
        side: FundingSide,
        account: AccountId,
        balance: Decimal,
        requested: Decimal,
    },

    #[error("Invalid duration {days}: duration must be a positive number of days")]
    InvalidDuration { days: i64 },

    /// Explicit expiry earlier than the current one
    #[error("New expiry date {requested} cannot be before current expiry date {current}")]
    InvalidExpiry {
        requested: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("Subscriber {subscriber} must keep at least one package")]
    EmptyPackageSet { subscriber: SubscriberId },

    /// Account (or its owning distributor) is not Active
    #[error("Account {account} is inactive")]
    AccountInactive { account: AccountId },

    /// Subscriber billing charged to an account that is not a reseller
    #[error("Account {account} is a {role} and cannot pay for subscribers")]
    PayerNotReseller { account: AccountId, role: Role },

    #[error("Source and target account cannot be the same ({account})")]
    SameAccount { account: AccountId },

    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        operation: String,
        account: AccountId,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("I/O error: {message}")]
    IoError { message: String },

    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        line: Option<u64>,
        message: String,
    },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    pub fn invalid_amount(amount: impl ToString) -> Self {
        LedgerError::InvalidAmount {
            amount: amount.to_string(),
        }
    }

    pub fn invalid_type(credit_type: &str) -> Self {
        LedgerError::InvalidType {
            credit_type: credit_type.to_string(),
        }
    }

    pub fn account_not_found(account: AccountId) -> Self {
        LedgerError::AccountNotFound { account }
    }

    pub fn credit_not_found(credit: CreditId) -> Self {
        LedgerError::CreditNotFound { credit }
    }

    pub fn subscriber_not_found(subscriber: SubscriberId) -> Self {
        LedgerError::SubscriberNotFound { subscriber }
    }

    pub fn package_not_found(package: PackageId) -> Self {
        LedgerError::PackageNotFound { package }
    }

    pub fn forbidden(reason: Denial) -> Self {
        LedgerError::Forbidden { reason }
    }

    pub fn insufficient_funds(
        side: FundingSide,
        account: AccountId,
        balance: Decimal,
        requested: Decimal,
    ) -> Self {
        LedgerError::InsufficientFunds {
            side,
            account,
            balance,
            requested,
        }
    }

    pub fn invalid_duration(days: i64) -> Self {
        LedgerError::InvalidDuration { days }
    }

    pub fn invalid_expiry(requested: DateTime<Utc>, current: DateTime<Utc>) -> Self {
        LedgerError::InvalidExpiry { requested, current }
    }

    pub fn account_inactive(account: AccountId) -> Self {
        LedgerError::AccountInactive { account }
    }

    pub fn payer_not_reseller(account: AccountId, role: Role) -> Self {
        LedgerError::PayerNotReseller { account, role }
    }

    pub fn arithmetic_overflow(operation: &str, account: AccountId) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account,
        }
    }

    /// Re-attribute an insufficient-funds error to another side
    ///
    /// Store primitives only know which row failed its guard; callers know
    /// what that row represents for the user.
    pub fn on_side(self, side: FundingSide) -> Self {
        match self {
            LedgerError::InsufficientFunds {
                account,
                balance,
                requested,
                ..
            } => LedgerError::InsufficientFunds {
                side,
                account,
                balance,
                requested,
            },
            other => other,
        }
    }
}
