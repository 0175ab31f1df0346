//! Account-related types for the reseller ledger
//!
//! This module defines the Account structure that carries the mutable
//! `balance` field of every admin, distributor, and reseller, together with
//! the role and ownership data the transfer policy decides on.

use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// Account identifier
pub type AccountId = u32;

/// Position of an account in the admin → distributor → reseller hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Platform administrator, may fund distributors and resellers
    Admin,

    /// Distributor, may fund only the resellers it created
    Distributor,

    /// Reseller, pays for subscriber renewals and upgrades
    ///
    /// Resellers never initiate credit transactions.
    Reseller,
}

impl Role {
    /// All roles, in decision-table order
    pub const ALL: [Role; 3] = [Role::Admin, Role::Distributor, Role::Reseller];

    /// Row/column index of this role in the transfer decision table
    pub const fn index(self) -> usize {
        match self {
            Role::Admin => 0,
            Role::Distributor => 1,
            Role::Reseller => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Distributor => "distributor",
            Role::Reseller => "reseller",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "distributor" => Ok(Role::Distributor),
            "reseller" => Ok(Role::Reseller),
            other => Err(format!("Unknown role '{}'", other)),
        }
    }
}

/// Whether an account may take part in balance-affecting operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountStatus {
    #[default]
    Active,
    Inactive,
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "active" => Ok(AccountStatus::Active),
            "inactive" => Ok(AccountStatus::Inactive),
            other => Err(format!("Unknown account status '{}'", other)),
        }
    }
}

/// Ledger view of an admin, distributor, or reseller account
///
/// The balance is a single denormalized number. It is only ever written by
/// the transfer executor and the subscriber billing engine, and is never
/// negative at rest.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// The account ID
    pub id: AccountId,

    /// Display name, echoed back in transfer results
    pub name: String,

    /// Role in the account hierarchy
    pub role: Role,

    /// Current spendable balance in currency units
    pub balance: Decimal,

    /// Owning account
    ///
    /// `None` for admins and top-level distributors; set to the creating
    /// distributor's id for resellers.
    pub created_by: Option<AccountId>,

    /// Active or Inactive
    pub status: AccountStatus,
}

impl Account {
    /// Create a new active account with a zero balance and no owner
    pub fn new(id: AccountId, name: impl Into<String>, role: Role) -> Self {
        Account {
            id,
            name: name.into(),
            role,
            balance: Decimal::ZERO,
            created_by: None,
            status: AccountStatus::Active,
        }
    }

    /// Set the opening balance
    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance = balance;
        self
    }

    /// Set the owning account
    pub fn created_by(mut self, owner: AccountId) -> Self {
        self.created_by = Some(owner);
        self
    }

    /// Set the account status
    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}
