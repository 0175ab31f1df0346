//! Credit ledger record types
//!
//! A credit record is the audit entry written for every completed transfer.
//! Records are immutable once written; the only lifecycle transition is
//! whole-record deletion by the reversal operation.

use super::account::AccountId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// Credit record identifier
///
/// Assigned from a monotonic sequence starting at 1.
pub type CreditId = u64;

/// Direction of a transfer relative to the initiating actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreditType {
    /// Money flows actor → target
    Debit,

    /// Money flows target → actor (claw back)
    ReverseCredit,
}

impl CreditType {
    pub fn as_str(self) -> &'static str {
        match self {
            CreditType::Debit => "Debit",
            CreditType::ReverseCredit => "Reverse Credit",
        }
    }
}

impl fmt::Display for CreditType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CreditType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "debit" => Ok(CreditType::Debit),
            "reversecredit" => Ok(CreditType::ReverseCredit),
            _ => Err(s.to_string()),
        }
    }
}

/// One completed transfer
///
/// Stores both participants so that a reversal can restore both balances.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditRecord {
    pub id: CreditId,

    pub credit_type: CreditType,

    /// Transferred amount, always strictly positive
    pub amount: Decimal,

    /// The actor that initiated the transfer
    pub sender: AccountId,

    /// The target account of the transfer
    pub user: AccountId,

    pub created_at: DateTime<Utc>,
}

impl CreditRecord {
    /// Account the money left during the forward transfer
    pub fn payer(&self) -> AccountId {
        match self.credit_type {
            CreditType::Debit => self.sender,
            CreditType::ReverseCredit => self.user,
        }
    }

    /// Account the money arrived at during the forward transfer
    pub fn payee(&self) -> AccountId {
        match self.credit_type {
            CreditType::Debit => self.user,
            CreditType::ReverseCredit => self.sender,
        }
    }
}

/// Outcome of a successful transfer, for UI feedback
#[derive(Debug, Clone, PartialEq)]
pub struct TransferResult {
    /// The ledger record written for this transfer
    pub credit: CreditRecord,
    pub actor_name: String,
    pub actor_balance: Decimal,
    pub target_name: String,
    pub target_balance: Decimal,
}
