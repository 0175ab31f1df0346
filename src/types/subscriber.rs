//! Subscriber package assignment types
//!
//! Subscribers hold no balance. Their renewal and upgrade costs are charged
//! to the reseller that owns them.

use super::account::AccountId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Subscriber identifier
pub type SubscriberId = u32;

/// Package identifier
pub type PackageId = u32;

/// A sellable channel package
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub id: PackageId,
    pub name: String,

    /// Price charged to the reseller per renewal
    pub cost: Decimal,

    /// Default billing period of the package, in days
    ///
    /// Informational only: renewal cost is a flat sum of package costs and
    /// does not scale with the requested duration.
    pub duration_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriberStatus {
    #[default]
    Active,
    Inactive,
}

impl FromStr for SubscriberStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "active" => Ok(SubscriberStatus::Active),
            "inactive" | "expired" => Ok(SubscriberStatus::Inactive),
            other => Err(format!("Unknown subscriber status '{}'", other)),
        }
    }
}

/// A subscriber together with its package assignment
#[derive(Debug, Clone, PartialEq)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub name: String,

    /// Owning reseller, payer of every renewal and upgrade
    pub reseller: AccountId,

    /// Assigned packages, in assignment order, without duplicates
    pub packages: Vec<PackageId>,

    /// One of `packages`
    pub primary_package: PackageId,

    pub expiry: DateTime<Utc>,

    pub status: SubscriberStatus,
}

/// Outcome of a successful renewal
#[derive(Debug, Clone, PartialEq)]
pub struct RenewResult {
    pub subscriber: SubscriberId,

    /// Amount deducted from the reseller
    pub charged: Decimal,

    /// Reseller balance after the deduction
    pub reseller_balance: Decimal,

    pub expiry: DateTime<Utc>,
}

/// Outcome of a successful package set change
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateResult {
    pub subscriber: SubscriberId,
    pub added: Vec<PackageId>,
    pub removed: Vec<PackageId>,

    /// sum(cost of added) - sum(cost of removed)
    pub cost_delta: Decimal,

    /// Amount deducted from the reseller; zero for downgrades
    pub charged: Decimal,

    /// Reseller balance after the operation
    pub reseller_balance: Decimal,

    pub packages: Vec<PackageId>,
    pub primary_package: PackageId,
    pub expiry: DateTime<Utc>,
}
