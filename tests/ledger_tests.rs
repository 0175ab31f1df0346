//! Ledger scenario and property tests
//!
//! Drives the public ledger and billing API directly, including from many
//! threads at once, and checks the balance invariants:
//! - no balance ever goes negative
//! - transfers conserve the total balance of the system
//! - a credit record exists for every applied transfer and only for those

use chrono::{Duration, TimeZone, Utc};
use reseller_ledger::core::{
    AccountStore, CreditLedger, CreditStore, FixedClock, SubscriptionBilling, TransferRequest,
};
use reseller_ledger::types::{
    Account, AccountId, CreditType, Denial, FundingSide, LedgerError, Package, Role, Subscriber,
    SubscriberStatus,
};
use rstest::{fixture, rstest};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::thread;

const ADMIN: AccountId = 1;
const DIST_A: AccountId = 2;
const DIST_B: AccountId = 3;
const RESELLERS_A: [AccountId; 3] = [10, 11, 12];
const RESELLER_B: AccountId = 20;

fn dec(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

#[fixture]
fn ledger() -> Arc<CreditLedger> {
    let accounts = Arc::new(AccountStore::new());
    accounts
        .insert(Account::new(ADMIN, "Admin", Role::Admin).with_balance(dec(100_000)))
        .unwrap();
    accounts
        .insert(Account::new(DIST_A, "Dist A", Role::Distributor))
        .unwrap();
    accounts
        .insert(Account::new(DIST_B, "Dist B", Role::Distributor))
        .unwrap();
    for id in RESELLERS_A {
        accounts
            .insert(Account::new(id, format!("Reseller {}", id), Role::Reseller).created_by(DIST_A))
            .unwrap();
    }
    accounts
        .insert(Account::new(RESELLER_B, "Reseller B", Role::Reseller).created_by(DIST_B))
        .unwrap();

    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
    ));
    Arc::new(CreditLedger::with_clock(
        accounts,
        Arc::new(CreditStore::new()),
        clock,
    ))
}

fn total(ledger: &CreditLedger) -> Decimal {
    ledger.accounts().all().iter().map(|a| a.balance).sum()
}

fn debit(actor: AccountId, target: AccountId, amount: i64) -> TransferRequest {
    TransferRequest::new(actor, target, CreditType::Debit, dec(amount))
}

#[rstest]
fn scenario_admin_debit_to_distributor(ledger: Arc<CreditLedger>) {
    let result = ledger.transfer(debit(ADMIN, DIST_A, 1000)).unwrap();

    assert_eq!(result.actor_balance, dec(99_000));
    assert_eq!(result.target_balance, dec(1000));

    let credits = ledger.list_credits_for(ADMIN, None).unwrap();
    assert_eq!(credits.len(), 1);
    assert_eq!(credits[0].credit_type, CreditType::Debit);
    assert_eq!(credits[0].amount, dec(1000));
    assert_eq!(credits[0].user, DIST_A);
}

#[rstest]
fn scenario_distributor_cannot_touch_foreign_reseller(ledger: Arc<CreditLedger>) {
    ledger.transfer(debit(ADMIN, DIST_A, 1000)).unwrap();
    let before = ledger.accounts().all();

    let result = ledger.transfer(debit(DIST_A, RESELLER_B, 100));

    assert_eq!(result, Err(LedgerError::forbidden(Denial::NotOwnReseller)));
    assert_eq!(ledger.accounts().all(), before);
    assert_eq!(ledger.credits().len(), 1);
}

#[rstest]
fn listing_is_scoped_by_role(ledger: Arc<CreditLedger>) {
    ledger.transfer(debit(ADMIN, DIST_A, 1000)).unwrap();
    ledger.transfer(debit(ADMIN, DIST_B, 1000)).unwrap();
    ledger.transfer(debit(DIST_A, RESELLERS_A[0], 10)).unwrap();
    ledger.transfer(debit(DIST_B, RESELLER_B, 10)).unwrap();
    ledger
        .transfer(TransferRequest::new(
            DIST_A,
            RESELLERS_A[0],
            CreditType::ReverseCredit,
            dec(5),
        ))
        .unwrap();

    assert_eq!(ledger.list_credits_for(ADMIN, None).unwrap().len(), 5);
    assert_eq!(ledger.list_credits_for(DIST_A, None).unwrap().len(), 3);
    assert_eq!(
        ledger
            .list_credits_for(DIST_A, Some(CreditType::ReverseCredit))
            .unwrap()
            .len(),
        1
    );
    assert_eq!(ledger.list_credits_for(RESELLER_B, None).unwrap().len(), 1);
    assert_eq!(
        ledger.list_credits_for(99, None),
        Err(LedgerError::account_not_found(99))
    );
}

/// Many threads transferring in both directions over the same accounts
#[rstest]
fn concurrent_transfers_conserve_balance(ledger: Arc<CreditLedger>) {
    ledger.transfer(debit(ADMIN, DIST_A, 3000)).unwrap();
    let initial_total = total(&ledger);

    let mut handles = vec![];
    for worker in 0..8usize {
        let ledger = Arc::clone(&ledger);
        handles.push(thread::spawn(move || {
            let mut applied = 0usize;
            for step in 0..50usize {
                let reseller = RESELLERS_A[(worker + step) % RESELLERS_A.len()];
                let credit_type = if (worker + step) % 3 == 0 {
                    CreditType::ReverseCredit
                } else {
                    CreditType::Debit
                };
                let request = TransferRequest::new(DIST_A, reseller, credit_type, dec(35));
                match ledger.transfer(request) {
                    Ok(_) => applied += 1,
                    Err(LedgerError::InsufficientFunds { .. }) => {}
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
            applied
        }));
    }
    let applied: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(total(&ledger), initial_total);
    assert!(ledger.accounts().all().iter().all(|a| a.balance >= Decimal::ZERO));
    assert_eq!(ledger.credits().len(), applied + 1);
}

/// Every debit competes for the same 1000; exactly 10 of 100 can succeed
#[rstest]
fn concurrent_debits_never_overdraw(ledger: Arc<CreditLedger>) {
    ledger.transfer(debit(ADMIN, DIST_A, 1000)).unwrap();

    let handles: Vec<_> = (0..100usize)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                ledger
                    .transfer(debit(DIST_A, RESELLERS_A[i % 3], 100))
                    .is_ok()
            })
        })
        .collect();
    let succeeded = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(succeeded, 10);
    assert_eq!(ledger.accounts().get(DIST_A).unwrap().balance, Decimal::ZERO);
}

/// Two admins racing to reverse the same record: one wins, balances restored once
#[rstest]
fn concurrent_reversal_applies_once(ledger: Arc<CreditLedger>) {
    let accounts_total = total(&ledger);
    let credit = ledger.transfer(debit(ADMIN, DIST_A, 500)).unwrap().credit;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || ledger.reverse_transfer(ADMIN, credit.id).is_ok())
        })
        .collect();
    let reversed = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(reversed, 1);
    assert_eq!(ledger.accounts().get(ADMIN).unwrap().balance, dec(100_000));
    assert_eq!(ledger.accounts().get(DIST_A).unwrap().balance, Decimal::ZERO);
    assert_eq!(total(&ledger), accounts_total);
}

#[rstest]
fn reversal_of_reverse_credit_needs_the_sender_funds(ledger: Arc<CreditLedger>) {
    ledger.transfer(debit(ADMIN, DIST_A, 100)).unwrap();
    ledger.transfer(debit(DIST_A, RESELLERS_A[0], 100)).unwrap();
    let clawback = ledger
        .transfer(TransferRequest::new(
            DIST_A,
            RESELLERS_A[0],
            CreditType::ReverseCredit,
            dec(60),
        ))
        .unwrap()
        .credit;
    ledger.transfer(debit(DIST_A, RESELLERS_A[1], 50)).unwrap();

    let result = ledger.reverse_transfer(ADMIN, clawback.id);

    assert_eq!(
        result,
        Err(LedgerError::insufficient_funds(
            FundingSide::Sender,
            DIST_A,
            dec(10),
            dec(60)
        ))
    );
}

fn billing(ledger: Arc<CreditLedger>, reseller_balance: i64) -> SubscriptionBilling {
    ledger
        .transfer(debit(ADMIN, DIST_A, reseller_balance))
        .unwrap();
    ledger
        .transfer(debit(DIST_A, RESELLERS_A[0], reseller_balance))
        .unwrap();

    let billing = SubscriptionBilling::new(ledger);
    for (id, cost) in [(1, 200), (2, 100), (3, 150)] {
        billing
            .add_package(Package {
                id,
                name: format!("Package {}", id),
                cost: dec(cost),
                duration_days: 30,
            })
            .unwrap();
    }
    billing
        .add_subscriber(Subscriber {
            id: 500,
            name: "Viewer".to_string(),
            reseller: RESELLERS_A[0],
            packages: vec![1, 2],
            primary_package: 1,
            expiry: Utc.with_ymd_and_hms(2026, 1, 11, 0, 0, 0).unwrap(),
            status: SubscriberStatus::Active,
        })
        .unwrap();
    billing
}

#[rstest]
fn scenario_renewal_with_enough_balance(ledger: Arc<CreditLedger>) {
    let billing = billing(Arc::clone(&ledger), 500);

    let result = billing.renew(500, 30).unwrap();

    assert_eq!(result.reseller_balance, dec(200));
    assert_eq!(
        result.expiry,
        Utc.with_ymd_and_hms(2026, 1, 11, 0, 0, 0).unwrap() + Duration::days(30)
    );
}

#[rstest]
fn scenario_renewal_without_enough_balance(ledger: Arc<CreditLedger>) {
    let billing = billing(Arc::clone(&ledger), 200);
    let before = billing.subscriber(500).unwrap();

    let result = billing.renew(500, 30);

    assert!(matches!(
        result,
        Err(LedgerError::InsufficientFunds {
            side: FundingSide::Reseller,
            ..
        })
    ));
    assert_eq!(
        ledger.accounts().get(RESELLERS_A[0]).unwrap().balance,
        dec(200)
    );
    assert_eq!(billing.subscriber(500).unwrap(), before);
}

#[rstest]
fn scenario_downgrade_costs_nothing(ledger: Arc<CreditLedger>) {
    let billing = billing(Arc::clone(&ledger), 500);

    let result = billing.update_packages(500, &[2, 3], None).unwrap();

    assert_eq!(result.cost_delta, dec(-50));
    assert_eq!(result.charged, Decimal::ZERO);
    assert_eq!(billing.subscriber(500).unwrap().packages, vec![2, 3]);
    assert_eq!(billing.subscriber(500).unwrap().primary_package, 2);
    assert_eq!(
        ledger.accounts().get(RESELLERS_A[0]).unwrap().balance,
        dec(500)
    );
}

/// Renewals billing one reseller from many threads never overdraw it
#[rstest]
fn concurrent_renewals_of_many_subscribers(ledger: Arc<CreditLedger>) {
    let billing = Arc::new(billing(Arc::clone(&ledger), 1000));
    for id in 501..520 {
        let mut subscriber = billing.subscriber(500).unwrap();
        subscriber.id = id;
        subscriber.packages = vec![2];
        billing.add_subscriber(subscriber).unwrap();
    }

    let handles: Vec<_> = (501..520)
        .map(|id| {
            let billing = Arc::clone(&billing);
            thread::spawn(move || billing.renew(id, 30).is_ok())
        })
        .collect();
    let renewed = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(renewed, 10);
    assert_eq!(
        ledger.accounts().get(RESELLERS_A[0]).unwrap().balance,
        Decimal::ZERO
    );
}
