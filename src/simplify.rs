//! Greedy debt simplification.
//!
//! Pairs the largest debtor with the largest creditor until everyone is
//! square. Each step zeroes at least one side, so `n` non-zero positions need
//! at most `n - 1` transactions. This is a heuristic: finding the true minimum
//! is a partition-style search and is not attempted.

use crate::error::{LedgerError, Result};
use crate::model::{SettlementTransaction, UserId};
use crate::money::Money;
use log::debug;
use std::collections::BTreeMap;

/// Plans settling transactions from net positions.
pub struct DebtSimplifier;

impl DebtSimplifier {
    /// Returns transactions that, applied as payments, zero every position.
    ///
    /// Positions below ε are ignored. Fails with [`LedgerError::State`] when
    /// the remaining positions don't sum to zero, since that can only come
    /// from a corrupted ledger; no attempt is made to repair it.
    pub fn plan(net_positions: &BTreeMap<UserId, Money>) -> Result<Vec<SettlementTransaction>> {
        let mut positions: Vec<(UserId, Money)> = net_positions
            .iter()
            .filter(|(_, net)| !net.is_negligible())
            .map(|(&user, &net)| (user, net))
            .collect();

        let total: Money = positions.iter().map(|(_, net)| *net).sum();
        if !total.is_negligible() {
            return Err(LedgerError::State(format!(
                "net positions sum to {} instead of zero",
                total
            )));
        }

        // Most negative first; ties by user id keep the plan deterministic.
        positions.sort_by_key(|&(user, net)| (net, user));

        let mut transactions = Vec::new();
        if positions.is_empty() {
            return Ok(transactions);
        }

        let mut i = 0;
        let mut j = positions.len() - 1;
        while i < j {
            let (debtor, owed) = positions[i];
            let (creditor, due) = positions[j];
            let amount = owed.abs().min(due);

            transactions.push(SettlementTransaction {
                from: debtor,
                to: creditor,
                amount,
            });
            positions[i].1 += amount;
            positions[j].1 -= amount;

            if positions[i].1.is_negligible() {
                i += 1;
            }
            if positions[j].1.is_negligible() {
                j -= 1;
            }
        }

        debug!(
            "Planned {} settlement transactions for {} open positions",
            transactions.len(),
            positions.len()
        );
        Ok(transactions)
    }
}
