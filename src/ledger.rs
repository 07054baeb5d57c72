//! Pairwise balance state for one group.
//!
//! Maintains two invariants after every committed operation:
//! `balance(x, y) == -balance(y, x)` and `Σ net_position(u) == 0`.

use crate::error::{LedgerError, Result};
use crate::model::{Expense, Payment, UserId};
use crate::money::Money;
use crate::split::Split;
use log::debug;
use std::collections::BTreeMap;

/// The authoritative balances of one group.
///
/// # Representation
///
/// Each unordered pair is stored once under `(low, high)` as
/// `balance(low, high)`, the amount `high` owes `low`. The reverse direction
/// is derived by negation, so antisymmetry cannot drift. Zero pairs are
/// removed. Net positions are updated alongside every pair change instead of
/// being recomputed from history.
#[derive(Debug, Clone, Default)]
pub struct BalanceLedger {
    /// Canonical pair `(low, high)` -> amount `high` owes `low`.
    pairs: BTreeMap<(UserId, UserId), Money>,

    /// Net position of every user seen so far, zero included.
    net: BTreeMap<UserId, Money>,
}

impl BalanceLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an expense: every participant other than the payer now owes
    /// the payer their share.
    ///
    /// The split is validated as a whole before any balance changes. On error
    /// the ledger is untouched.
    pub fn apply_expense(&mut self, expense: &Expense) -> Result<()> {
        Self::check_expense(expense.amount, &expense.split)
            .map_err(|e| e.context(format!("expense {}", expense.id)))?;

        self.touch(expense.payer);
        for (&participant, &share) in &expense.split {
            self.touch(participant);
            if participant != expense.payer {
                self.adjust(expense.payer, participant, share);
            }
        }

        debug!(
            "Applied expense {} ({}) paid by {}: {}",
            expense.id, expense.description, expense.payer, expense.amount
        );
        debug_assert!(self.check_invariants());
        Ok(())
    }

    /// Checks that `split` can be applied for an expense of `amount`: positive
    /// amount, at least one participant, no negative share and a total equal
    /// to the amount.
    pub fn check_expense(amount: Money, split: &Split) -> Result<()> {
        if !amount.is_positive() {
            return Err(LedgerError::invalid(format!(
                "non-positive amount {}",
                amount
            )));
        }
        if split.is_empty() {
            return Err(LedgerError::invalid("no participants"));
        }
        if let Some((user, share)) = split.iter().find(|(_, s)| s.is_negative()) {
            return Err(LedgerError::invalid(format!(
                "participant {} has a negative share {}",
                user, share
            )));
        }
        let total = split.total();
        if !total.approx_eq(amount) {
            return Err(LedgerError::validation(format!(
                "split totals {} but the amount is {}",
                total, amount
            )));
        }
        Ok(())
    }

    /// Applies a direct payment: the payer's debt to the payee shrinks by the
    /// amount.
    ///
    /// Overpaying flips the sign of the pair. Amount and distinct parties are
    /// checked by [`crate::PaymentRecorder`].
    pub fn apply_payment(&mut self, payment: &Payment) {
        debug_assert!(payment.from != payment.to);
        self.touch(payment.from);
        self.touch(payment.to);
        self.adjust(payment.to, payment.from, -payment.amount);

        debug!(
            "Applied payment {}: {} paid {} {}",
            payment.id, payment.from, payment.to, payment.amount
        );
        debug_assert!(self.check_invariants());
    }

    /// Undoes a payment previously applied with [`BalanceLedger::apply_payment`].
    pub fn revert_payment(&mut self, payment: &Payment) {
        self.adjust(payment.to, payment.from, payment.amount);

        debug!(
            "Reverted payment {}: {} paid {} {}",
            payment.id, payment.from, payment.to, payment.amount
        );
        debug_assert!(self.check_invariants());
    }

    /// Amount `debtor` currently owes `creditor`. Negative when the debt runs
    /// the other way.
    pub fn balance(&self, creditor: UserId, debtor: UserId) -> Money {
        if creditor == debtor {
            return Money::ZERO;
        }
        let stored = self
            .pairs
            .get(&canonical(creditor, debtor))
            .copied()
            .unwrap_or(Money::ZERO);
        if creditor < debtor {
            stored
        } else {
            -stored
        }
    }

    /// Sum of every pairwise balance of `user`; zero for unknown users.
    pub fn net_position(&self, user: UserId) -> Money {
        self.net.get(&user).copied().unwrap_or(Money::ZERO)
    }

    /// Net positions of every user seen so far.
    pub fn net_positions(&self) -> &BTreeMap<UserId, Money> {
        &self.net
    }

    /// Non-zero balances of `user` keyed by counterparty: positive when the
    /// counterparty owes `user`, negative when `user` owes them.
    pub fn counterparties(&self, user: UserId) -> BTreeMap<UserId, Money> {
        self.pairs
            .iter()
            .filter_map(|(&(low, high), &amount)| {
                if low == user {
                    Some((high, amount))
                } else if high == user {
                    Some((low, -amount))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Every user that has taken part in an expense or payment.
    pub fn users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.net.keys().copied()
    }

    /// Non-zero balances as `(creditor, debtor, amount)` with a positive amount.
    pub fn debts(&self) -> impl Iterator<Item = (UserId, UserId, Money)> + '_ {
        self.pairs.iter().map(|(&(low, high), &amount)| {
            if amount.is_positive() {
                (low, high, amount)
            } else {
                (high, low, -amount)
            }
        })
    }

    /// Returns `true` when nobody owes anybody anything.
    pub fn is_settled(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Verifies antisymmetry, that stored nets match the pairwise sums, and
    /// that nets sum to zero.
    pub fn check_invariants(&self) -> bool {
        let users: Vec<UserId> = self.net.keys().copied().collect();
        for &x in &users {
            let mut sum = Money::ZERO;
            for &y in &users {
                if self.balance(x, y) != -self.balance(y, x) {
                    return false;
                }
                sum += self.balance(x, y);
            }
            if sum != self.net_position(x) {
                return false;
            }
        }
        self.pairs.values().all(|m| !m.is_zero())
            && self.net.values().sum::<Money>().is_zero()
    }

    fn touch(&mut self, user: UserId) {
        self.net.entry(user).or_insert(Money::ZERO);
    }

    /// Adds `delta` to `balance(creditor, debtor)` and to both net positions.
    fn adjust(&mut self, creditor: UserId, debtor: UserId, delta: Money) {
        if creditor == debtor || delta.is_zero() {
            return;
        }

        let key = canonical(creditor, debtor);
        let signed = if creditor < debtor { delta } else { -delta };
        let entry = self.pairs.entry(key).or_insert(Money::ZERO);
        *entry += signed;
        if entry.is_zero() {
            self.pairs.remove(&key);
        }

        *self.net.entry(creditor).or_insert(Money::ZERO) += delta;
        *self.net.entry(debtor).or_insert(Money::ZERO) -= delta;
    }
}

fn canonical(a: UserId, b: UserId) -> (UserId, UserId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}
