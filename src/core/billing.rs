//! Subscriber renewal and package update billing
//!
//! This module provides `SubscriptionBilling`, which computes what a change to
//! a subscriber's package assignment costs and charges it to the owning
//! reseller through the ledger's balance-deduction primitive. Billing writes
//! no credit records and bypasses the transfer authorization policy.
//!
//! # Pricing
//!
//! - **Renew**: flat sum of the costs of the currently assigned packages. The
//!   requested duration only moves the expiry date.
//! - **Update**: `sum(cost of added) - sum(cost of removed)`. Only a positive
//!   delta is charged; downgrades are free and refund nothing.
//!
//! # Thread Safety
//!
//! The subscriber entry stays locked from validation until the new expiry and
//! package set are written, so concurrent renewals of the same subscriber are
//! serialized. The reseller balance is deducted with a guarded update, so
//! concurrent renewals of different subscribers of one reseller can never
//! overdraw it.

use crate::core::ledger::CreditLedger;
use crate::types::{
    Account, AccountId, FundingSide, LedgerError, Package, PackageId, RenewResult, Role,
    Subscriber, SubscriberId, SubscriberStatus, UpdateResult,
};
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Package catalog, subscriber assignments, and the billing operations over them
pub struct SubscriptionBilling {
    ledger: Arc<CreditLedger>,
    packages: DashMap<PackageId, Package>,
    subscribers: DashMap<SubscriberId, Subscriber>,
}

impl SubscriptionBilling {
    pub fn new(ledger: Arc<CreditLedger>) -> Self {
        Self {
            ledger,
            packages: DashMap::new(),
            subscribers: DashMap::new(),
        }
    }

    /// Add or replace a catalog package
    ///
    /// # Errors
    ///
    /// `InvalidAmount` if the package cost is negative.
    pub fn add_package(&self, package: Package) -> Result<(), LedgerError> {
        if package.cost < Decimal::ZERO {
            return Err(LedgerError::invalid_amount(package.cost));
        }
        self.packages.insert(package.id, package);
        Ok(())
    }

    /// Add or replace a subscriber
    ///
    /// The package list is de-duplicated and the primary package falls back
    /// to the first package when it is not part of the list.
    ///
    /// # Errors
    ///
    /// - `EmptyPackageSet` if no package is assigned
    /// - `PackageNotFound` if a package is not in the catalog
    /// - `AccountNotFound` if the paying account does not exist
    /// - `PayerNotReseller` if the paying account is not a reseller
    pub fn add_subscriber(&self, mut subscriber: Subscriber) -> Result<(), LedgerError> {
        self.billable_reseller(subscriber.reseller)?;
        subscriber.packages = self.resolve_packages(subscriber.id, &subscriber.packages)?;
        if !subscriber.packages.contains(&subscriber.primary_package) {
            subscriber.primary_package = subscriber.packages[0];
        }
        self.subscribers.insert(subscriber.id, subscriber);
        Ok(())
    }

    pub fn package(&self, id: PackageId) -> Option<Package> {
        self.packages.get(&id).map(|entry| entry.value().clone())
    }

    pub fn subscriber(&self, id: SubscriberId) -> Result<Subscriber, LedgerError> {
        self.subscribers
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LedgerError::subscriber_not_found(id))
    }

    /// Snapshot of every subscriber, sorted by id
    pub fn subscribers(&self) -> Vec<Subscriber> {
        let mut all: Vec<Subscriber> = self
            .subscribers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by_key(|s| s.id);
        all
    }

    /// Extend a subscriber's current packages by `duration_days`
    ///
    /// Charges the flat sum of the assigned package costs to the owning
    /// reseller, sets `expiry = max(expiry, now) + duration_days`, and marks
    /// the subscriber Active.
    ///
    /// # Errors
    ///
    /// - `InvalidDuration` if `duration_days <= 0`
    /// - `SubscriberNotFound`, `AccountNotFound`, `PackageNotFound`
    /// - `PayerNotReseller` if the paying account is not a reseller
    /// - `AccountInactive` if the reseller or its distributor is inactive
    /// - `InsufficientFunds` if the reseller cannot pay; nothing is changed
    pub fn renew(
        &self,
        subscriber: SubscriberId,
        duration_days: i64,
    ) -> Result<RenewResult, LedgerError> {
        if duration_days <= 0 {
            return Err(LedgerError::invalid_duration(duration_days));
        }

        let mut entry = self
            .subscribers
            .get_mut(&subscriber)
            .ok_or_else(|| LedgerError::subscriber_not_found(subscriber))?;

        let reseller = self.billable_reseller(entry.reseller)?;
        self.ensure_active(&reseller)?;
        let cost = self.total_cost(&entry.packages, reseller.id)?;

        let base = entry.expiry.max(self.ledger.clock().now());
        let expiry = TimeDelta::try_days(duration_days)
            .and_then(|delta| base.checked_add_signed(delta))
            .ok_or_else(|| LedgerError::invalid_duration(duration_days))?;

        let reseller_balance = self.charge(&reseller, cost).inspect_err(|e| {
            warn!(subscriber, reseller = reseller.id, %cost, error = %e, "Renewal rejected");
        })?;

        entry.expiry = expiry;
        entry.status = SubscriberStatus::Active;

        info!(
            subscriber,
            reseller = reseller.id,
            duration_days,
            %cost,
            %reseller_balance,
            %expiry,
            "Subscriber renewed"
        );

        Ok(RenewResult {
            subscriber,
            charged: cost,
            reseller_balance,
            expiry,
        })
    }

    /// Replace a subscriber's package set
    ///
    /// A positive cost delta is charged to the reseller; a zero or negative
    /// delta changes no balance and skips the account status check. When
    /// `explicit_expiry` is given it becomes the new expiry, otherwise the
    /// expiry is kept.
    ///
    /// # Errors
    ///
    /// - `EmptyPackageSet`, `PackageNotFound`
    /// - `InvalidExpiry` if `explicit_expiry` is before the current expiry
    /// - `SubscriberNotFound`, `AccountNotFound`, `PayerNotReseller`
    /// - `AccountInactive` if a charge is due and the reseller or its
    ///   distributor is inactive
    /// - `InsufficientFunds` if the reseller cannot pay; nothing is changed
    pub fn update_packages(
        &self,
        subscriber: SubscriberId,
        package_ids: &[PackageId],
        explicit_expiry: Option<DateTime<Utc>>,
    ) -> Result<UpdateResult, LedgerError> {
        let mut entry = self
            .subscribers
            .get_mut(&subscriber)
            .ok_or_else(|| LedgerError::subscriber_not_found(subscriber))?;

        let requested = self.resolve_packages(subscriber, package_ids)?;

        if let Some(expiry) = explicit_expiry {
            if expiry < entry.expiry {
                return Err(LedgerError::invalid_expiry(expiry, entry.expiry));
            }
        }

        let reseller = self.billable_reseller(entry.reseller)?;

        let old: HashSet<PackageId> = entry.packages.iter().copied().collect();
        let new: HashSet<PackageId> = requested.iter().copied().collect();
        let added: Vec<PackageId> = requested.iter().copied().filter(|p| !old.contains(p)).collect();
        let removed: Vec<PackageId> = entry
            .packages
            .iter()
            .copied()
            .filter(|p| !new.contains(p))
            .collect();

        let cost_delta = self
            .total_cost(&added, reseller.id)?
            .checked_sub(self.total_cost(&removed, reseller.id)?)
            .ok_or_else(|| LedgerError::arithmetic_overflow("cost delta", reseller.id))?;

        let (charged, reseller_balance) = if cost_delta > Decimal::ZERO {
            self.ensure_active(&reseller)?;
            let balance = self.charge(&reseller, cost_delta).inspect_err(|e| {
                warn!(subscriber, reseller = reseller.id, %cost_delta, error = %e, "Package update rejected");
            })?;
            (cost_delta, balance)
        } else {
            (Decimal::ZERO, reseller.balance)
        };

        if !requested.contains(&entry.primary_package) {
            entry.primary_package = requested[0];
        }
        entry.packages = requested;
        if let Some(expiry) = explicit_expiry {
            entry.expiry = expiry;
        }

        info!(
            subscriber,
            reseller = reseller.id,
            added = ?added,
            removed = ?removed,
            %cost_delta,
            %charged,
            "Subscriber packages updated"
        );

        Ok(UpdateResult {
            subscriber,
            added,
            removed,
            cost_delta,
            charged,
            reseller_balance,
            packages: entry.packages.clone(),
            primary_package: entry.primary_package,
            expiry: entry.expiry,
        })
    }

    /// Snapshot of the account billed for a subscriber; only resellers pay
    fn billable_reseller(&self, account: AccountId) -> Result<Account, LedgerError> {
        let reseller = self.ledger.accounts().get(account)?;
        if reseller.role != Role::Reseller {
            return Err(LedgerError::payer_not_reseller(reseller.id, reseller.role));
        }
        Ok(reseller)
    }

    /// A reseller may only be charged while it and its distributor are Active
    fn ensure_active(&self, reseller: &Account) -> Result<(), LedgerError> {
        let accounts = self.ledger.accounts();
        if !reseller.is_active() {
            return Err(LedgerError::account_inactive(reseller.id));
        }
        if let Some(owner) = reseller.created_by {
            if !accounts.get(owner)?.is_active() {
                return Err(LedgerError::account_inactive(owner));
            }
        }
        Ok(())
    }

    /// De-duplicate `ids` keeping first occurrences and check each exists
    fn resolve_packages(
        &self,
        subscriber: SubscriberId,
        ids: &[PackageId],
    ) -> Result<Vec<PackageId>, LedgerError> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(ids.len());
        for &id in ids {
            if !self.packages.contains_key(&id) {
                return Err(LedgerError::package_not_found(id));
            }
            if seen.insert(id) {
                resolved.push(id);
            }
        }
        if resolved.is_empty() {
            return Err(LedgerError::EmptyPackageSet { subscriber });
        }
        Ok(resolved)
    }

    fn total_cost(&self, ids: &[PackageId], payer: AccountId) -> Result<Decimal, LedgerError> {
        ids.iter().try_fold(Decimal::ZERO, |total, id| {
            let package = self
                .packages
                .get(id)
                .ok_or_else(|| LedgerError::package_not_found(*id))?;
            total
                .checked_add(package.cost)
                .ok_or_else(|| LedgerError::arithmetic_overflow("package cost", payer))
        })
    }

    /// Deduct `amount` from the reseller, checked twice
    ///
    /// The snapshot check gives an early answer; the guarded deduction is the
    /// one that counts when another charge lands in between.
    fn charge(&self, reseller: &Account, amount: Decimal) -> Result<Decimal, LedgerError> {
        if amount.is_zero() {
            return Ok(reseller.balance);
        }
        if reseller.balance < amount {
            return Err(LedgerError::insufficient_funds(
                FundingSide::Reseller,
                reseller.id,
                reseller.balance,
                amount,
            ));
        }
        self.ledger
            .deduct(reseller.id, amount)
            .map_err(|e| e.on_side(FundingSide::Reseller))
    }
}
