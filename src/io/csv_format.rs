//! CSV format handling for snapshots, commands, and account output
//!
//! This module centralizes all CSV format concerns, providing:
//! - Row structures for deserialization of every input file
//! - Conversion from rows to domain types
//! - Account output serialization
//!
//! All functions are pure (no I/O) for easy testing.
//!
//! # Formats
//!
//! ```text
//! accounts.csv     id,name,role,balance,created_by,status
//! packages.csv     id,name,cost,duration
//! subscribers.csv  id,name,reseller,packages,primary,expiry,status
//! commands.csv     op,actor,target,type,amount,credit,subscriber,days,packages,expiry
//! output           id,role,balance
//! ```
//!
//! Package lists are `|`-separated ids; timestamps are RFC 3339.

use crate::core::Command;
use crate::types::{
    Account, AccountId, AccountStatus, CreditId, Package, PackageId, Role, Subscriber,
    SubscriberId, SubscriberStatus,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// One row of the accounts snapshot
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AccountRow {
    pub id: AccountId,
    pub name: String,
    pub role: String,
    pub balance: Option<String>,
    pub created_by: Option<AccountId>,
    pub status: Option<String>,
}

/// One row of the package catalog
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PackageRow {
    pub id: PackageId,
    pub name: String,
    pub cost: String,
    pub duration: Option<u32>,
}

/// One row of the subscriber snapshot
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SubscriberRow {
    pub id: SubscriberId,
    pub name: String,
    pub reseller: AccountId,
    pub packages: String,
    pub primary: Option<PackageId>,
    pub expiry: String,
    pub status: Option<String>,
}

/// One row of the command file
///
/// Only the columns used by `op` need a value; the rest may be left empty.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct CommandRow {
    pub op: String,
    pub actor: Option<AccountId>,
    pub target: Option<AccountId>,
    #[serde(rename = "type")]
    pub credit_type: Option<String>,
    pub amount: Option<String>,
    pub credit: Option<CreditId>,
    pub subscriber: Option<SubscriberId>,
    pub days: Option<i64>,
    pub packages: Option<String>,
    pub expiry: Option<String>,
}

/// Default billing period for catalog rows without a duration
const DEFAULT_PACKAGE_DAYS: u32 = 30;

fn parse_decimal(raw: &str, what: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw.trim()).map_err(|_| format!("Invalid {} '{}'", what, raw))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("Invalid timestamp '{}': {}", raw, e))
}

/// Parse a `|`-separated package id list, ignoring empty entries
pub fn parse_package_list(raw: &str) -> Result<Vec<PackageId>, String> {
    raw.split('|')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<PackageId>()
                .map_err(|_| format!("Invalid package id '{}'", id))
        })
        .collect()
}

/// Convert an accounts snapshot row to an Account
///
/// A missing balance means zero; a missing status means Active.
pub fn convert_account_row(row: AccountRow) -> Result<Account, String> {
    let role = Role::from_str(&row.role)?;
    let balance = match row.balance.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => parse_decimal(raw, "balance")?,
        _ => Decimal::ZERO,
    };
    let status = AccountStatus::from_str(row.status.as_deref().unwrap_or(""))?;

    let mut account = Account::new(row.id, row.name, role)
        .with_balance(balance)
        .with_status(status);
    account.created_by = row.created_by;
    Ok(account)
}

/// Convert a catalog row to a Package
pub fn convert_package_row(row: PackageRow) -> Result<Package, String> {
    Ok(Package {
        id: row.id,
        name: row.name,
        cost: parse_decimal(&row.cost, "cost")?,
        duration_days: row.duration.unwrap_or(DEFAULT_PACKAGE_DAYS),
    })
}

/// Convert a subscriber snapshot row to a Subscriber
///
/// When no primary package is given the first listed package is used.
pub fn convert_subscriber_row(row: SubscriberRow) -> Result<Subscriber, String> {
    let packages = parse_package_list(&row.packages)?;
    let primary_package = match row.primary.or_else(|| packages.first().copied()) {
        Some(primary) => primary,
        None => return Err(format!("Subscriber {} has no packages", row.id)),
    };
    let status = SubscriberStatus::from_str(row.status.as_deref().unwrap_or(""))?;

    Ok(Subscriber {
        id: row.id,
        name: row.name,
        reseller: row.reseller,
        packages,
        primary_package,
        expiry: parse_timestamp(&row.expiry)?,
        status,
    })
}

fn required<T>(value: Option<T>, column: &str, op: &str) -> Result<T, String> {
    value.ok_or_else(|| format!("'{}' command requires a {} value", op, column))
}

/// Convert a command row to a Command
///
/// Amount and type of a transfer are kept as raw text; the engine validates
/// them. Everything else must be present and well-formed here.
pub fn convert_command_row(row: CommandRow) -> Result<Command, String> {
    let op = row.op.trim().to_lowercase();
    match op.as_str() {
        "transfer" => Ok(Command::Transfer {
            actor: required(row.actor, "actor", &op)?,
            target: required(row.target, "target", &op)?,
            credit_type: row.credit_type.unwrap_or_default(),
            amount: row.amount.unwrap_or_default(),
        }),
        "reverse" => Ok(Command::Reverse {
            actor: required(row.actor, "actor", &op)?,
            credit: required(row.credit, "credit", &op)?,
        }),
        "renew" => Ok(Command::Renew {
            subscriber: required(row.subscriber, "subscriber", &op)?,
            days: required(row.days, "days", &op)?,
        }),
        "update" => {
            let expiry = match row.expiry.as_deref().map(str::trim) {
                Some(raw) if !raw.is_empty() => Some(parse_timestamp(raw)?),
                _ => None,
            };
            Ok(Command::UpdatePackages {
                subscriber: required(row.subscriber, "subscriber", &op)?,
                packages: parse_package_list(row.packages.as_deref().unwrap_or(""))?,
                expiry,
            })
        }
        _ => Err(format!("Invalid command '{}'", row.op)),
    }
}

/// Write account balances to CSV format
///
/// Writes accounts with columns: id, role, balance
/// Accounts are sorted by id; balances are printed with two decimals.
///
/// # Arguments
///
/// * `accounts` - Slice of accounts to write
/// * `output` - Mutable reference to a writer for outputting CSV
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["id", "role", "balance"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted = accounts.to_vec();
    sorted.sort_by_key(|account| account.id);

    for account in sorted {
        writer
            .write_record(&[
                account.id.to_string(),
                account.role.to_string(),
                format!("{:.2}", account.balance),
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
