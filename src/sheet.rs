//! Read-only snapshot of a group's balances.

use crate::ledger::BalanceLedger;
use crate::model::UserId;
use crate::money::Money;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One non-zero entry of the balance matrix: `debtor` owes `creditor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PairwiseBalance {
    pub creditor: UserId,
    pub debtor: UserId,

    /// Always positive.
    pub amount: Money,
}

/// The full matrix and net positions of a group at one point in time.
///
/// Built from the ledger's incrementally maintained state, so taking a sheet
/// costs one pass over the non-zero pairs rather than a replay of history.
/// Members with no activity are listed with a zero net position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupBalanceSheet {
    matrix: Vec<PairwiseBalance>,
    net_positions: BTreeMap<UserId, Money>,
}

impl GroupBalanceSheet {
    pub fn new(ledger: &BalanceLedger, members: &BTreeSet<UserId>) -> Self {
        let mut matrix: Vec<PairwiseBalance> = ledger
            .debts()
            .map(|(creditor, debtor, amount)| PairwiseBalance {
                creditor,
                debtor,
                amount,
            })
            .collect();
        matrix.sort_by_key(|entry| (entry.creditor, entry.debtor));

        let mut net_positions: BTreeMap<UserId, Money> =
            members.iter().map(|&member| (member, Money::ZERO)).collect();
        net_positions.extend(ledger.net_positions().iter().map(|(&u, &m)| (u, m)));

        GroupBalanceSheet {
            matrix,
            net_positions,
        }
    }

    /// Every non-zero pairwise balance, ordered by creditor then debtor.
    pub fn matrix(&self) -> &[PairwiseBalance] {
        &self.matrix
    }

    /// User -> net amount; positive is a net creditor, negative a net debtor.
    pub fn net_positions(&self) -> &BTreeMap<UserId, Money> {
        &self.net_positions
    }

    pub fn net_position(&self, user: UserId) -> Money {
        self.net_positions.get(&user).copied().unwrap_or(Money::ZERO)
    }

    /// Amount `debtor` owes `creditor`; negative when it runs the other way.
    pub fn balance(&self, creditor: UserId, debtor: UserId) -> Money {
        self.matrix
            .iter()
            .find_map(|entry| {
                if entry.creditor == creditor && entry.debtor == debtor {
                    Some(entry.amount)
                } else if entry.creditor == debtor && entry.debtor == creditor {
                    Some(-entry.amount)
                } else {
                    None
                }
            })
            .unwrap_or(Money::ZERO)
    }

    /// Sum of all net positions. Zero for any sheet taken from a ledger.
    pub fn total(&self) -> Money {
        self.net_positions.values().sum()
    }
}

/// One user's view of a group: each counterparty's balance and the total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserBalances {
    pub user: UserId,

    /// Equal to the user's net position.
    pub total: Money,

    /// Counterparty -> amount; positive when the counterparty owes `user`.
    pub counterparties: BTreeMap<UserId, Money>,
}

impl UserBalances {
    pub fn new(ledger: &BalanceLedger, user: UserId) -> Self {
        UserBalances {
            user,
            total: ledger.net_position(user),
            counterparties: ledger.counterparties(user),
        }
    }
}
