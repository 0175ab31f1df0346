//! Transfer authorization policy
//!
//! Decides whether an actor may move credit to or from a target account.
//! The policy is a static role-capability table: one rule per
//! (actor role, target role) pair, with distributor rules additionally
//! requiring that the distributor created the target.
//!
//! | actor \ target | admin  | distributor | reseller         |
//! |----------------|--------|-------------|------------------|
//! | admin          | deny   | allow       | allow            |
//! | distributor    | deny   | deny        | allow if created |
//! | reseller       | deny   | deny        | deny             |
//!
//! The functions here are pure: no I/O, no side effects, no failure mode
//! other than a denial.

use crate::types::{Account, Denial, Role};

/// Cell of the decision table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Allow,

    /// Allowed only when `target.created_by == actor.id`
    AllowOwned,

    Deny(Denial),
}

const ADMIN_DENY: Rule = Rule::Deny(Denial::AdminTargetNotAllowed);
const DISTRIBUTOR_DENY: Rule = Rule::Deny(Denial::DistributorTargetNotReseller);
const RESELLER_DENY: Rule = Rule::Deny(Denial::ResellerInitiated);

/// Transfer rules indexed by `[actor.role.index()][target.role.index()]`
pub const TRANSFER_RULES: [[Rule; 3]; 3] = [
    // admin ->      admin,            distributor,      reseller
    [ADMIN_DENY, Rule::Allow, Rule::Allow],
    // distributor -> admin,            distributor,      reseller
    [DISTRIBUTOR_DENY, DISTRIBUTOR_DENY, Rule::AllowOwned],
    // reseller ->   admin,            distributor,      reseller
    [RESELLER_DENY, RESELLER_DENY, RESELLER_DENY],
];

/// Look up the rule for a role pair
pub const fn rule_for(actor: Role, target: Role) -> Rule {
    TRANSFER_RULES[actor.index()][target.index()]
}

/// Decide whether `actor` may transfer credit with `target`
///
/// # Errors
///
/// Returns the role-specific [`Denial`] when the transfer is not allowed.
pub fn authorize(actor: &Account, target: &Account) -> Result<(), Denial> {
    match rule_for(actor.role, target.role) {
        Rule::Allow => Ok(()),
        Rule::AllowOwned if target.created_by == Some(actor.id) => Ok(()),
        Rule::AllowOwned => Err(Denial::NotOwnReseller),
        Rule::Deny(denial) => Err(denial),
    }
}

/// `true` iff [`authorize`] allows the transfer
pub fn can_transfer(actor: &Account, target: &Account) -> bool {
    authorize(actor, target).is_ok()
}

/// Credit record reversal is admin-only
pub fn authorize_reversal(actor: &Account) -> Result<(), Denial> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::Distributor | Role::Reseller => Err(Denial::AdminOnly),
    }
}
