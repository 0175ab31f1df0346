//! Transfer executor
//!
//! This module provides the `CreditLedger`, the only component allowed to
//! move balance between accounts. It validates a transfer request, consults
//! the authorization policy, applies both balance changes, and writes the
//! credit record, all while both account rows are locked.
//!
//! # Validation Order
//!
//! Validation stops at the first failure and nothing is mutated before the
//! last check passes:
//!
//! 1. amount is a number greater than zero (`InvalidAmount`)
//! 2. type is Debit or Reverse Credit (`InvalidType`)
//! 3. target account exists (`AccountNotFound`)
//! 4. policy allows the transfer (`Forbidden`)
//! 5. paying side holds the amount (`InsufficientFunds`)
//!
//! # Atomicity
//!
//! The payer decrement, the payee increment, and the credit record insertion
//! of one transfer are performed inside a single [`AccountStore::with_pair`]
//! call. Readers that look at balances never observe half a transfer, and
//! `actor.balance + target.balance` is the same before and after.
//!
//! # Reversal
//!
//! Credit records carry both participants, so reversing a record restores
//! both balances: the payee of the forward transfer gives the amount back to
//! the payer. A reversal that would drive the payee negative is refused.

use crate::core::account_store::{credited_balance, debited_balance, AccountStore};
use crate::core::credit_store::{CreditScope, CreditStore};
use crate::core::policy;
use crate::core::traits::{Clock, SystemClock};
use crate::types::{
    AccountId, CreditId, CreditRecord, CreditType, FundingSide, LedgerError, Role, TransferResult,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Parse a user-supplied amount
///
/// # Errors
///
/// `InvalidAmount` if `raw` is not a decimal number or is not greater than zero.
pub fn parse_amount(raw: &str) -> Result<Decimal, LedgerError> {
    let amount =
        Decimal::from_str(raw.trim()).map_err(|_| LedgerError::invalid_amount(raw.trim()))?;
    if amount <= Decimal::ZERO {
        return Err(LedgerError::invalid_amount(raw.trim()));
    }
    Ok(amount)
}

/// A validated request to move credit between two accounts
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    /// The authenticated account initiating the transfer
    pub actor: AccountId,
    pub target: AccountId,
    pub credit_type: CreditType,
    pub amount: Decimal,
}

impl TransferRequest {
    pub fn new(actor: AccountId, target: AccountId, credit_type: CreditType, amount: Decimal) -> Self {
        Self {
            actor,
            target,
            credit_type,
            amount,
        }
    }

    /// Build a request from raw request-body strings
    ///
    /// The amount is validated before the type.
    pub fn parse(
        actor: AccountId,
        target: AccountId,
        credit_type: &str,
        amount: &str,
    ) -> Result<Self, LedgerError> {
        let amount = parse_amount(amount)?;
        let credit_type = credit_type
            .parse::<CreditType>()
            .map_err(|_| LedgerError::invalid_type(credit_type.trim()))?;

        Ok(Self::new(actor, target, credit_type, amount))
    }
}

/// The credit ledger: transfer executor and credit record owner
pub struct CreditLedger {
    accounts: Arc<AccountStore>,
    credits: Arc<CreditStore>,
    clock: Arc<dyn Clock>,
}

impl CreditLedger {
    /// Create a ledger over existing stores, timestamped by the system clock
    pub fn new(accounts: Arc<AccountStore>, credits: Arc<CreditStore>) -> Self {
        Self::with_clock(accounts, credits, Arc::new(SystemClock))
    }

    pub fn with_clock(
        accounts: Arc<AccountStore>,
        credits: Arc<CreditStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts,
            credits,
            clock,
        }
    }

    pub fn accounts(&self) -> &AccountStore {
        &self.accounts
    }

    pub fn credits(&self) -> &CreditStore {
        &self.credits
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Move `amount` between the actor and the target
    ///
    /// - `Debit`: actor → target, requires `actor.balance >= amount`
    /// - `ReverseCredit`: target → actor, requires `target.balance >= amount`
    ///
    /// On success both balances are updated and one credit record with
    /// `user = target` is written.
    pub fn transfer(&self, request: TransferRequest) -> Result<TransferResult, LedgerError> {
        let TransferRequest {
            actor,
            target,
            credit_type,
            amount,
        } = request;

        if amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount(amount));
        }

        let target_account = self.accounts.get(target)?;
        let actor_account = self.accounts.get(actor)?;

        if let Err(reason) = policy::authorize(&actor_account, &target_account) {
            warn!(
                actor,
                actor_role = %actor_account.role,
                target,
                target_role = %target_account.role,
                %reason,
                "Credit transfer denied"
            );
            return Err(LedgerError::forbidden(reason));
        }

        let result = self.accounts.with_pair(actor, target, |actor_row, target_row| {
            match credit_type {
                CreditType::Debit => {
                    actor_row.balance = debited_balance(actor_row, amount)?;
                    target_row.balance = credited_balance(target_row, amount)?;
                }
                CreditType::ReverseCredit => {
                    target_row.balance = debited_balance(target_row, amount)
                        .map_err(|e| e.on_side(FundingSide::Target))?;
                    actor_row.balance = credited_balance(actor_row, amount)?;
                }
            }

            let credit =
                self.credits
                    .record(credit_type, amount, actor, target, self.clock.now());

            Ok(TransferResult {
                credit,
                actor_name: actor_row.name.clone(),
                actor_balance: actor_row.balance,
                target_name: target_row.name.clone(),
                target_balance: target_row.balance,
            })
        });

        match &result {
            Ok(done) => info!(
                credit = done.credit.id,
                actor,
                target,
                %credit_type,
                %amount,
                actor_balance = %done.actor_balance,
                target_balance = %done.target_balance,
                "Credit transfer completed"
            ),
            Err(e) => warn!(actor, target, %credit_type, %amount, error = %e, "Credit transfer rejected"),
        }
        result
    }

    /// Delete a credit record and undo its balance effect on both accounts
    ///
    /// Only admins may reverse. Returns the removed record.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if the actor (or a participant) does not exist
    /// - `Forbidden` if the actor is not an admin
    /// - `CreditNotFound` if the record does not exist or was reversed concurrently
    /// - `InsufficientFunds` if the forward payee no longer holds the amount
    pub fn reverse_transfer(
        &self,
        actor: AccountId,
        credit: CreditId,
    ) -> Result<CreditRecord, LedgerError> {
        let actor_account = self.accounts.get(actor)?;
        policy::authorize_reversal(&actor_account).map_err(|reason| {
            warn!(actor, credit, %reason, "Credit reversal denied");
            LedgerError::forbidden(reason)
        })?;

        let record = self
            .credits
            .get(credit)
            .ok_or_else(|| LedgerError::credit_not_found(credit))?;

        let payee_side = match record.credit_type {
            CreditType::Debit => FundingSide::Target,
            CreditType::ReverseCredit => FundingSide::Sender,
        };

        let result = self
            .accounts
            .with_pair(record.payee(), record.payer(), |payee, payer| {
                payee.balance = debited_balance(payee, record.amount)
                    .map_err(|e| e.on_side(payee_side))?;
                payer.balance = credited_balance(payer, record.amount)?;

                // Last step: a failure here discards the balance copies above
                self.credits
                    .remove(credit)
                    .ok_or_else(|| LedgerError::credit_not_found(credit))
            });

        match &result {
            Ok(removed) => info!(
                actor,
                credit,
                credit_type = %removed.credit_type,
                amount = %removed.amount,
                sender = removed.sender,
                user = removed.user,
                "Credit record reversed"
            ),
            Err(e) => warn!(actor, credit, error = %e, "Credit reversal rejected"),
        }
        result
    }

    /// Credit records visible in `scope`, newest first
    pub fn list_credits(
        &self,
        scope: &CreditScope,
        type_filter: Option<CreditType>,
    ) -> Vec<CreditRecord> {
        self.credits.list(scope, type_filter)
    }

    /// Credit records visible to `actor`, newest first
    pub fn list_credits_for(
        &self,
        actor: AccountId,
        type_filter: Option<CreditType>,
    ) -> Result<Vec<CreditRecord>, LedgerError> {
        let scope = self.scope_for(actor)?;
        Ok(self.list_credits(&scope, type_filter))
    }

    /// Listing scope of an account, derived from its role
    pub fn scope_for(&self, actor: AccountId) -> Result<CreditScope, LedgerError> {
        let account = self.accounts.get(actor)?;
        let scope = match account.role {
            Role::Admin => CreditScope::All,
            Role::Distributor => CreditScope::Hierarchy {
                distributor: account.id,
                resellers: self
                    .accounts
                    .all()
                    .into_iter()
                    .filter(|a| a.role == Role::Reseller && a.created_by == Some(account.id))
                    .map(|a| a.id)
                    .collect(),
            },
            Role::Reseller => CreditScope::Account(account.id),
        };
        Ok(scope)
    }

    /// Balance-deduction primitive
    ///
    /// Decrements `account` by `amount` only if the balance covers it. Writes
    /// no credit record and skips the authorization policy; used by the
    /// subscriber billing engine to charge resellers.
    pub fn deduct(&self, account: AccountId, amount: Decimal) -> Result<Decimal, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount(amount));
        }
        let remaining = self.accounts.guarded_debit(account, amount)?;
        debug!(account, %amount, %remaining, "Balance deducted");
        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::FixedClock;
    use crate::types::{Account, Denial};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    const ADMIN: AccountId = 1;
    const DISTRIBUTOR: AccountId = 2;
    const OWN_RESELLER: AccountId = 3;
    const OTHER_DISTRIBUTOR: AccountId = 4;
    const OTHER_RESELLER: AccountId = 5;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    fn ledger(balances: [i64; 5]) -> CreditLedger {
        let accounts = Arc::new(AccountStore::new());
        let seed = [
            Account::new(ADMIN, "Admin", Role::Admin),
            Account::new(DISTRIBUTOR, "Dist A", Role::Distributor),
            Account::new(OWN_RESELLER, "Reseller A1", Role::Reseller).created_by(DISTRIBUTOR),
            Account::new(OTHER_DISTRIBUTOR, "Dist B", Role::Distributor),
            Account::new(OTHER_RESELLER, "Reseller B1", Role::Reseller)
                .created_by(OTHER_DISTRIBUTOR),
        ];
        for (account, balance) in seed.into_iter().zip(balances) {
            accounts.insert(account.with_balance(dec(balance))).unwrap();
        }
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        ));
        CreditLedger::with_clock(accounts, Arc::new(CreditStore::new()), clock)
    }

    fn balance(ledger: &CreditLedger, id: AccountId) -> Decimal {
        ledger.accounts().get(id).unwrap().balance
    }

    #[rstest]
    #[case("100", dec(100))]
    #[case(" 12.50 ", Decimal::new(1250, 2))]
    fn test_parse_amount_valid(#[case] raw: &str, #[case] expected: Decimal) {
        assert_eq!(parse_amount(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("0")]
    #[case("-5")]
    #[case("abc")]
    #[case("")]
    fn test_parse_amount_invalid(#[case] raw: &str) {
        assert!(matches!(parse_amount(raw), Err(LedgerError::InvalidAmount { .. })));
    }

    #[test]
    fn test_request_parse_checks_amount_before_type() {
        let result = TransferRequest::parse(ADMIN, DISTRIBUTOR, "Bogus", "-1");
        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));

        let result = TransferRequest::parse(ADMIN, DISTRIBUTOR, "Bogus", "10");
        assert_eq!(result, Err(LedgerError::invalid_type("Bogus")));
    }

    #[test]
    fn test_admin_debit_to_distributor() {
        let ledger = ledger([5000, 0, 0, 0, 0]);

        let result = ledger
            .transfer(TransferRequest::new(ADMIN, DISTRIBUTOR, CreditType::Debit, dec(1000)))
            .unwrap();

        assert_eq!(result.actor_balance, dec(4000));
        assert_eq!(result.target_balance, dec(1000));
        assert_eq!(result.actor_name, "Admin");
        assert_eq!(result.target_name, "Dist A");
        assert_eq!(result.credit.credit_type, CreditType::Debit);
        assert_eq!(result.credit.amount, dec(1000));
        assert_eq!(result.credit.user, DISTRIBUTOR);
        assert_eq!(result.credit.sender, ADMIN);
        assert_eq!(ledger.credits().len(), 1);
    }

    #[test]
    fn test_reverse_credit_claws_back_from_target() {
        let ledger = ledger([0, 100, 300, 0, 0]);

        let result = ledger
            .transfer(TransferRequest::new(
                DISTRIBUTOR,
                OWN_RESELLER,
                CreditType::ReverseCredit,
                dec(120),
            ))
            .unwrap();

        assert_eq!(result.actor_balance, dec(220));
        assert_eq!(result.target_balance, dec(180));
    }

    #[rstest]
    #[case::debit_actor_short(CreditType::Debit, [0, 50, 500, 0, 0], FundingSide::Actor, DISTRIBUTOR)]
    #[case::reverse_target_short(CreditType::ReverseCredit, [0, 500, 50, 0, 0], FundingSide::Target, OWN_RESELLER)]
    fn test_insufficient_funds_mutates_nothing(
        #[case] credit_type: CreditType,
        #[case] balances: [i64; 5],
        #[case] side: FundingSide,
        #[case] short_account: AccountId,
    ) {
        let ledger = ledger(balances);

        let result =
            ledger.transfer(TransferRequest::new(DISTRIBUTOR, OWN_RESELLER, credit_type, dec(100)));

        assert_eq!(
            result,
            Err(LedgerError::insufficient_funds(side, short_account, dec(50), dec(100)))
        );
        assert_eq!(balance(&ledger, DISTRIBUTOR), dec(balances[1]));
        assert_eq!(balance(&ledger, OWN_RESELLER), dec(balances[2]));
        assert!(ledger.credits().is_empty());
    }

    #[rstest]
    #[case::distributor_foreign_reseller(DISTRIBUTOR, OTHER_RESELLER, Denial::NotOwnReseller)]
    #[case::distributor_to_distributor(DISTRIBUTOR, OTHER_DISTRIBUTOR, Denial::DistributorTargetNotReseller)]
    #[case::reseller_initiated(OWN_RESELLER, OTHER_RESELLER, Denial::ResellerInitiated)]
    #[case::reseller_to_own_distributor(OWN_RESELLER, DISTRIBUTOR, Denial::ResellerInitiated)]
    #[case::admin_to_self(ADMIN, ADMIN, Denial::AdminTargetNotAllowed)]
    fn test_forbidden_transfers(
        #[case] actor: AccountId,
        #[case] target: AccountId,
        #[case] denial: Denial,
    ) {
        let ledger = ledger([1000, 1000, 1000, 1000, 1000]);

        let result = ledger.transfer(TransferRequest::new(actor, target, CreditType::Debit, dec(10)));

        assert_eq!(result, Err(LedgerError::forbidden(denial)));
        assert!(ledger.credits().is_empty());
        let total: Decimal = ledger.accounts().all().iter().map(|a| a.balance).sum();
        assert_eq!(total, dec(5000));
    }

    #[test]
    fn test_unknown_target_is_not_found() {
        let ledger = ledger([1000, 0, 0, 0, 0]);

        let result = ledger.transfer(TransferRequest::new(ADMIN, 77, CreditType::Debit, dec(10)));

        assert_eq!(result, Err(LedgerError::account_not_found(77)));
    }

    #[test]
    fn test_non_positive_amount_is_rejected() {
        let ledger = ledger([1000, 0, 0, 0, 0]);

        let result =
            ledger.transfer(TransferRequest::new(ADMIN, DISTRIBUTOR, CreditType::Debit, Decimal::ZERO));

        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
    }

    #[rstest]
    #[case(CreditType::Debit)]
    #[case(CreditType::ReverseCredit)]
    fn test_reversal_restores_both_sides(#[case] credit_type: CreditType) {
        let ledger = ledger([0, 400, 400, 0, 0]);
        let credit = ledger
            .transfer(TransferRequest::new(DISTRIBUTOR, OWN_RESELLER, credit_type, dec(150)))
            .unwrap()
            .credit;

        let removed = ledger.reverse_transfer(ADMIN, credit.id).unwrap();

        assert_eq!(removed, credit);
        assert_eq!(balance(&ledger, DISTRIBUTOR), dec(400));
        assert_eq!(balance(&ledger, OWN_RESELLER), dec(400));
        assert!(ledger.credits().get(credit.id).is_none());
    }

    #[test]
    fn test_reversal_requires_admin() {
        let ledger = ledger([1000, 0, 0, 0, 0]);
        let credit = ledger
            .transfer(TransferRequest::new(ADMIN, DISTRIBUTOR, CreditType::Debit, dec(100)))
            .unwrap()
            .credit;

        let result = ledger.reverse_transfer(DISTRIBUTOR, credit.id);

        assert_eq!(result, Err(LedgerError::forbidden(Denial::AdminOnly)));
        assert!(ledger.credits().get(credit.id).is_some());
    }

    #[test]
    fn test_reversal_of_unknown_credit() {
        let ledger = ledger([0, 0, 0, 0, 0]);
        assert_eq!(
            ledger.reverse_transfer(ADMIN, 42),
            Err(LedgerError::credit_not_found(42))
        );
    }

    #[test]
    fn test_reversal_refused_when_payee_spent_the_funds() {
        let ledger = ledger([1000, 0, 0, 0, 0]);
        let credit = ledger
            .transfer(TransferRequest::new(ADMIN, DISTRIBUTOR, CreditType::Debit, dec(300)))
            .unwrap()
            .credit;
        ledger
            .transfer(TransferRequest::new(DISTRIBUTOR, OWN_RESELLER, CreditType::Debit, dec(250)))
            .unwrap();

        let result = ledger.reverse_transfer(ADMIN, credit.id);

        assert_eq!(
            result,
            Err(LedgerError::insufficient_funds(FundingSide::Target, DISTRIBUTOR, dec(50), dec(300)))
        );
        assert_eq!(balance(&ledger, ADMIN), dec(700));
        assert_eq!(balance(&ledger, DISTRIBUTOR), dec(50));
        assert!(ledger.credits().get(credit.id).is_some());
    }

    #[test]
    fn test_reversing_twice_fails_the_second_time() {
        let ledger = ledger([1000, 0, 0, 0, 0]);
        let credit = ledger
            .transfer(TransferRequest::new(ADMIN, DISTRIBUTOR, CreditType::Debit, dec(100)))
            .unwrap()
            .credit;

        ledger.reverse_transfer(ADMIN, credit.id).unwrap();
        let second = ledger.reverse_transfer(ADMIN, credit.id);

        assert_eq!(second, Err(LedgerError::credit_not_found(credit.id)));
        assert_eq!(balance(&ledger, ADMIN), dec(1000));
    }

    #[test]
    fn test_list_credits_for_each_role() {
        let ledger = ledger([10_000, 0, 0, 0, 0]);
        ledger
            .transfer(TransferRequest::new(ADMIN, DISTRIBUTOR, CreditType::Debit, dec(1000)))
            .unwrap();
        ledger
            .transfer(TransferRequest::new(DISTRIBUTOR, OWN_RESELLER, CreditType::Debit, dec(100)))
            .unwrap();
        ledger
            .transfer(TransferRequest::new(ADMIN, OTHER_RESELLER, CreditType::Debit, dec(50)))
            .unwrap();

        let ids = |actor: AccountId, filter: Option<CreditType>| -> Vec<CreditId> {
            ledger
                .list_credits_for(actor, filter)
                .unwrap()
                .iter()
                .map(|c| c.id)
                .collect()
        };

        assert_eq!(ids(ADMIN, None), vec![3, 2, 1]);
        assert_eq!(ids(DISTRIBUTOR, None), vec![2, 1]);
        assert_eq!(ids(OWN_RESELLER, None), vec![2]);
        assert_eq!(ids(OTHER_RESELLER, None), vec![3]);
        assert_eq!(ids(ADMIN, Some(CreditType::ReverseCredit)), Vec::<CreditId>::new());
    }

    #[test]
    fn test_credits_are_stamped_when_applied() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(start));
        let accounts = Arc::new(AccountStore::new());
        accounts
            .insert(Account::new(ADMIN, "Admin", Role::Admin).with_balance(dec(100)))
            .unwrap();
        accounts
            .insert(Account::new(DISTRIBUTOR, "Dist A", Role::Distributor))
            .unwrap();
        let ledger =
            CreditLedger::with_clock(accounts, Arc::new(CreditStore::new()), clock.clone());

        let first = ledger
            .transfer(TransferRequest::new(ADMIN, DISTRIBUTOR, CreditType::Debit, dec(10)))
            .unwrap()
            .credit;
        clock.set(start + chrono::Duration::hours(1));
        let second = ledger
            .transfer(TransferRequest::new(ADMIN, DISTRIBUTOR, CreditType::Debit, dec(10)))
            .unwrap()
            .credit;

        assert_eq!(first.created_at, start);
        assert_eq!(second.created_at, start + chrono::Duration::hours(1));
        let listed: Vec<CreditId> = ledger
            .list_credits_for(ADMIN, None)
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(listed, vec![second.id, first.id]);
    }

    #[test]
    fn test_deduct_is_guarded() {
        let ledger = ledger([0, 0, 200, 0, 0]);

        assert_eq!(ledger.deduct(OWN_RESELLER, dec(150)).unwrap(), dec(50));
        assert!(matches!(
            ledger.deduct(OWN_RESELLER, dec(60)),
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert_eq!(balance(&ledger, OWN_RESELLER), dec(50));
        assert!(ledger.credits().is_empty());
    }
}
