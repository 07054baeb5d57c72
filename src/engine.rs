//! Thread-safe ledger service over many groups.
//!
//! Each group sits behind its own `RwLock`: expenses and payments take the
//! group's write lock, sheets and plans take its read lock. Groups never
//! block each other. The registry lock is only written when a group is
//! registered.

use crate::error::{LedgerError, Result};
use crate::group::Group;
use crate::model::{
    Expense, ExpenseId, GroupId, Payment, PaymentId, SettlementTransaction, UserId,
};
use crate::money::Money;
use crate::payment::PaymentRecorder;
use crate::ledger::BalanceLedger;
use crate::sheet::{GroupBalanceSheet, UserBalances};
use crate::split::{SplitCalculator, SplitRule};
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// An expense as submitted by the caller, before it is split.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub description: String,
    pub amount: Money,
    pub payer: UserId,

    /// Participants in the order the split rule's parameters refer to.
    pub participants: Vec<UserId>,
    pub rule: SplitRule,
}

type SharedGroup = Arc<RwLock<Group>>;

/// Entry point for callers: owns every group and hands out ids for the
/// expenses and payments it applies.
#[derive(Debug)]
pub struct SettlementEngine {
    groups: RwLock<HashMap<GroupId, SharedGroup>>,
    next_expense_id: AtomicU64,
    next_payment_id: AtomicU64,
}

impl SettlementEngine {
    /// Creates an engine with no groups.
    pub fn new() -> Self {
        SettlementEngine {
            groups: RwLock::new(HashMap::new()),
            next_expense_id: AtomicU64::new(1),
            next_payment_id: AtomicU64::new(1),
        }
    }

    /// Registers a group with its members, or adds members to an existing one.
    ///
    /// Returns `true` if the group was newly created.
    pub fn register_group(
        &self,
        id: GroupId,
        name: &str,
        members: impl IntoIterator<Item = UserId>,
    ) -> Result<bool> {
        let mut groups = self.groups.write().map_err(poisoned)?;
        let created = !groups.contains_key(&id);
        let group = groups
            .entry(id)
            .or_insert_with(|| Arc::new(RwLock::new(Group::new(id, name))));

        let mut group = write(group)?;
        for member in members {
            group.add_member(member);
        }
        if created {
            debug!("Registered group {} ({})", id, name);
        }
        Ok(created)
    }

    /// Returns `true` if `id` has been registered.
    pub fn has_group(&self, id: GroupId) -> Result<bool> {
        Ok(self.groups.read().map_err(poisoned)?.contains_key(&id))
    }

    /// Registered group ids in ascending order.
    pub fn group_ids(&self) -> Result<Vec<GroupId>> {
        let mut ids: Vec<GroupId> = self
            .groups
            .read()
            .map_err(poisoned)?
            .keys()
            .copied()
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Splits an expense and applies it to the group's ledger.
    ///
    /// The split is computed and checked before the group lock is taken;
    /// nothing is applied and no id is consumed when it fails.
    pub fn submit_expense(&self, group_id: GroupId, new: NewExpense) -> Result<Expense> {
        let split = SplitCalculator::compute(new.amount, &new.participants, &new.rule)?;
        BalanceLedger::check_expense(new.amount, &split)?;
        let group = self.group(group_id)?;
        let mut group = write(&group)?;

        let expense = Expense {
            id: ExpenseId(self.next_expense_id.fetch_add(1, Ordering::Relaxed)),
            description: new.description,
            amount: new.amount,
            payer: new.payer,
            kind: new.rule.kind(),
            split,
        };
        group.add_expense(expense.clone())?;
        Ok(expense)
    }

    /// Records a direct payment from `from` to `to` within a group.
    pub fn record_payment(
        &self,
        group_id: GroupId,
        from: UserId,
        to: UserId,
        amount: Money,
        related_expense: Option<ExpenseId>,
    ) -> Result<Payment> {
        PaymentRecorder::check(from, to, amount)?;
        let group = self.group(group_id)?;
        let mut group = write(&group)?;

        let payment = Payment::new(
            PaymentId(self.next_payment_id.fetch_add(1, Ordering::Relaxed)),
            from,
            to,
            amount,
            related_expense,
        );
        group.add_payment(payment.clone())?;
        Ok(payment)
    }

    /// Confirms that a recorded payment went through.
    pub fn complete_payment(&self, group_id: GroupId, id: PaymentId) -> Result<Payment> {
        let group = self.group(group_id)?;
        let mut group = write(&group)?;
        group.complete_payment(id)
    }

    /// Calls off a pending payment; the debt it paid down is owed again.
    pub fn cancel_payment(&self, group_id: GroupId, id: PaymentId) -> Result<Payment> {
        let group = self.group(group_id)?;
        let mut group = write(&group)?;
        let payment = group.cancel_payment(id)?;
        debug!("Cancelled payment {} in group {}", id, group_id);
        Ok(payment)
    }

    pub fn balance_sheet(&self, group_id: GroupId) -> Result<GroupBalanceSheet> {
        let group = self.group(group_id)?;
        let group = read(&group)?;
        Ok(group.balance_sheet())
    }

    pub fn net_positions(&self, group_id: GroupId) -> Result<BTreeMap<UserId, Money>> {
        Ok(self.balance_sheet(group_id)?.net_positions().clone())
    }

    /// Balances of one user against each counterparty in the group.
    pub fn user_balances(&self, group_id: GroupId, user: UserId) -> Result<UserBalances> {
        let group = self.group(group_id)?;
        let group = read(&group)?;
        Ok(group.user_balances(user))
    }

    pub fn settlement_plan(&self, group_id: GroupId) -> Result<Vec<SettlementTransaction>> {
        let group = self.group(group_id)?;
        let group = read(&group)?;
        group.settlement_plan()
    }

    /// Plans a settlement and records every step as a payment, under one
    /// write lock so no other event can interleave.
    pub fn settle_group(&self, group_id: GroupId) -> Result<Vec<Payment>> {
        let group = self.group(group_id)?;
        let mut group = write(&group)?;

        let plan = group.settlement_plan()?;
        let mut payments = Vec::with_capacity(plan.len());
        for tx in plan {
            let payment = Payment::new(
                PaymentId(self.next_payment_id.fetch_add(1, Ordering::Relaxed)),
                tx.from,
                tx.to,
                tx.amount,
                None,
            );
            group.add_payment(payment.clone())?;
            payments.push(payment);
        }

        debug!("Settled group {} with {} payments", group_id, payments.len());
        Ok(payments)
    }

    /// Expenses applied to the group, oldest first.
    pub fn expenses(&self, group_id: GroupId) -> Result<Vec<Expense>> {
        let group = self.group(group_id)?;
        let group = read(&group)?;
        Ok(group.expenses().to_vec())
    }

    /// Payments applied to the group, oldest first.
    pub fn payments(&self, group_id: GroupId) -> Result<Vec<Payment>> {
        let group = self.group(group_id)?;
        let group = read(&group)?;
        Ok(group.payments().to_vec())
    }

    fn group(&self, id: GroupId) -> Result<SharedGroup> {
        self.groups
            .read()
            .map_err(poisoned)?
            .get(&id)
            .cloned()
            .ok_or(LedgerError::UnknownGroup(id))
    }
}

impl Default for SettlementEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn read(group: &SharedGroup) -> Result<RwLockReadGuard<'_, Group>> {
    group.read().map_err(poisoned)
}

fn write(group: &SharedGroup) -> Result<RwLockWriteGuard<'_, Group>> {
    group.write().map_err(poisoned)
}

fn poisoned<T>(_: T) -> LedgerError {
    LedgerError::State("lock poisoned".to_string())
}
