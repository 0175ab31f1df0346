//! Thread-safe account balance storage
//!
//! This module provides the `AccountStore` struct, which owns the `balance`
//! field of every admin, distributor, and reseller account.
//!
//! # Design
//!
//! Accounts are kept in a `DashMap` of `Arc<Mutex<Account>>` rows. The map
//! lock is only held long enough to clone the row handle; all balance work
//! happens under the row's own mutex. This lets an operation hold two rows at
//! once (the payer and the payee of a transfer) without holding a DashMap
//! shard lock, which would deadlock when both keys hash to the same shard.
//!
//! # Guarded Updates
//!
//! - `guarded_debit` decrements a balance only if `balance >= amount`, with
//!   the check and the write under the same row lock.
//! - `with_pair` locks two rows in ascending id order and runs a closure over
//!   copies of both accounts. The copies are written back only if the closure
//!   succeeds, so a failing closure leaves both balances untouched.
//!
//! # Thread Safety
//!
//! Every public method is safe to call concurrently. Two `with_pair` calls
//! over the same accounts in opposite order cannot deadlock because rows are
//! always locked lowest id first.

use crate::types::{Account, AccountId, FundingSide, LedgerError};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex, MutexGuard};

type Row = Arc<Mutex<Account>>;

/// Lock a row, recovering from poisoning
///
/// Rows are only ever written whole (copy, mutate, assign), so a panic under
/// the lock cannot leave a half-written account behind.
fn lock_row(row: &Row) -> MutexGuard<'_, Account> {
    row.lock().unwrap_or_else(|e| e.into_inner())
}

/// Concurrent account balance store
#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: DashMap<AccountId, Row>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    /// Insert or replace an account
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` if the opening balance is negative.
    pub fn insert(&self, account: Account) -> Result<(), LedgerError> {
        if account.balance < Decimal::ZERO {
            return Err(LedgerError::invalid_amount(account.balance));
        }
        self.accounts
            .insert(account.id, Arc::new(Mutex::new(account)));
        Ok(())
    }

    fn row(&self, id: AccountId) -> Result<Row, LedgerError> {
        self.accounts
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    /// Snapshot of one account
    ///
    /// The snapshot may be stale as soon as it is returned; use it for
    /// authorization and pre-checks, never as the basis of a write.
    pub fn get(&self, id: AccountId) -> Result<Account, LedgerError> {
        let row = self.row(id)?;
        let account = lock_row(&row).clone();
        Ok(account)
    }

    /// Snapshot of all accounts, sorted by id
    pub fn all(&self) -> Vec<Account> {
        let rows: Vec<Row> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut accounts: Vec<Account> = rows.iter().map(|row| lock_row(row).clone()).collect();
        accounts.sort_by_key(|account| account.id);
        accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Decrement a balance only if it covers `amount`
    ///
    /// # Returns
    ///
    /// The balance after the decrement.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if the account does not exist
    /// - `InsufficientFunds` (attributed to the actor side; callers re-attribute
    ///   with [`LedgerError::on_side`]) if `balance < amount`
    pub fn guarded_debit(&self, id: AccountId, amount: Decimal) -> Result<Decimal, LedgerError> {
        let row = self.row(id)?;
        let mut account = lock_row(&row);

        let remaining = debited_balance(&account, amount)?;
        account.balance = remaining;
        Ok(remaining)
    }

    /// Run `f` over two accounts with both rows locked
    ///
    /// `f` receives copies of the `first` and `second` accounts, in that
    /// order. The copies replace the stored accounts only if `f` returns
    /// `Ok`, so every mutation made inside `f` is all-or-nothing.
    ///
    /// # Errors
    ///
    /// - `SameAccount` if both ids are equal
    /// - `AccountNotFound` if either account does not exist
    /// - any error returned by `f`
    pub fn with_pair<T, F>(&self, first: AccountId, second: AccountId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Account, &mut Account) -> Result<T, LedgerError>,
    {
        if first == second {
            return Err(LedgerError::SameAccount { account: first });
        }

        let first_row = self.row(first)?;
        let second_row = self.row(second)?;

        let (mut first_guard, mut second_guard) = if first < second {
            let a = lock_row(&first_row);
            let b = lock_row(&second_row);
            (a, b)
        } else {
            let b = lock_row(&second_row);
            let a = lock_row(&first_row);
            (a, b)
        };

        let mut first_copy = first_guard.clone();
        let mut second_copy = second_guard.clone();

        let outcome = f(&mut first_copy, &mut second_copy)?;

        *first_guard = first_copy;
        *second_guard = second_copy;
        Ok(outcome)
    }
}

/// Balance after removing `amount` from `account`, if it is covered
pub(crate) fn debited_balance(account: &Account, amount: Decimal) -> Result<Decimal, LedgerError> {
    if account.balance < amount {
        return Err(LedgerError::insufficient_funds(
            FundingSide::Actor,
            account.id,
            account.balance,
            amount,
        ));
    }
    account
        .balance
        .checked_sub(amount)
        .ok_or_else(|| LedgerError::arithmetic_overflow("debit", account.id))
}

/// Balance after adding `amount` to `account`
pub(crate) fn credited_balance(account: &Account, amount: Decimal) -> Result<Decimal, LedgerError> {
    account
        .balance
        .checked_add(amount)
        .ok_or_else(|| LedgerError::arithmetic_overflow("credit", account.id))
}
