//! Thread-safe credit record storage
//!
//! This module provides the `CreditStore` struct, the audit trail of completed
//! transfers. Records are written once by the transfer executor and removed
//! whole by the reversal operation; they are never edited in place.
//!
//! # Design
//!
//! Records live in a `DashMap` keyed by `CreditId`. Ids come from an atomic
//! sequence starting at 1, so replaying the same command stream always
//! produces the same ids.

use crate::types::{AccountId, CreditId, CreditRecord, CreditType};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

/// Which records a listing may return
///
/// Derived from the requesting actor's role by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreditScope {
    /// Every record (admins)
    All,

    /// Records a distributor sent or received, plus records targeting any
    /// of the resellers it created
    Hierarchy {
        distributor: AccountId,
        resellers: HashSet<AccountId>,
    },

    /// Records targeting a single account (resellers)
    Account(AccountId),
}

impl CreditScope {
    pub fn includes(&self, record: &CreditRecord) -> bool {
        match self {
            CreditScope::All => true,
            CreditScope::Hierarchy {
                distributor,
                resellers,
            } => {
                record.user == *distributor
                    || record.sender == *distributor
                    || resellers.contains(&record.user)
            }
            CreditScope::Account(account) => record.user == *account,
        }
    }
}

/// Concurrent credit record store
#[derive(Debug)]
pub struct CreditStore {
    records: DashMap<CreditId, CreditRecord>,
    next_id: AtomicU64,
}

impl CreditStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Assign the next id and store a new record
    pub fn record(
        &self,
        credit_type: CreditType,
        amount: Decimal,
        sender: AccountId,
        user: AccountId,
        created_at: DateTime<Utc>,
    ) -> CreditRecord {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = CreditRecord {
            id,
            credit_type,
            amount,
            sender,
            user,
            created_at,
        };
        self.records.insert(id, record.clone());
        record
    }

    /// Get a copy of a record
    pub fn get(&self, id: CreditId) -> Option<CreditRecord> {
        self.records.get(&id).map(|entry| entry.value().clone())
    }

    /// Remove a record, returning it if it was still present
    ///
    /// Of two concurrent removals of the same id, exactly one gets the record.
    pub fn remove(&self, id: CreditId) -> Option<CreditRecord> {
        self.records.remove(&id).map(|(_, record)| record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records visible in `scope`, optionally of one type, newest first
    ///
    /// Newest means highest id. Timestamps from concurrent transfers on
    /// unrelated accounts may interleave differently from their ids.
    pub fn list(&self, scope: &CreditScope, type_filter: Option<CreditType>) -> Vec<CreditRecord> {
        let mut records: Vec<CreditRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|record| scope.includes(record))
            .filter(|record| type_filter.is_none_or(|t| record.credit_type == t))
            .collect();

        records.sort_by(|a, b| b.id.cmp(&a.id));
        records
    }
}

impl Default for CreditStore {
    fn default() -> Self {
        Self::new()
    }
}
