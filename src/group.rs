//! A group and the ledger it owns.

use crate::error::{LedgerError, Result};
use crate::ledger::BalanceLedger;
use crate::model::{Expense, GroupId, Payment, PaymentId, SettlementTransaction, UserId};
use crate::payment::PaymentRecorder;
use crate::sheet::{GroupBalanceSheet, UserBalances};
use crate::simplify::DebtSimplifier;
use std::collections::BTreeSet;

/// A group of users sharing expenses.
///
/// Owns exactly one [`BalanceLedger`]; the ledger changes only through
/// [`Group::add_expense`], [`Group::add_payment`] and
/// [`Group::cancel_payment`], which also keep the history of what was applied.
#[derive(Debug, Clone)]
pub struct Group {
    id: GroupId,
    name: String,
    members: BTreeSet<UserId>,
    ledger: BalanceLedger,
    expenses: Vec<Expense>,
    payments: Vec<Payment>,
}

impl Group {
    pub fn new(id: GroupId, name: impl Into<String>) -> Self {
        Group {
            id,
            name: name.into(),
            members: BTreeSet::new(),
            ledger: BalanceLedger::new(),
            expenses: Vec::new(),
            payments: Vec::new(),
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records a member supplied by the caller. Returns `false` if already present.
    pub fn add_member(&mut self, user: UserId) -> bool {
        self.members.insert(user)
    }

    pub fn members(&self) -> &BTreeSet<UserId> {
        &self.members
    }

    pub fn ledger(&self) -> &BalanceLedger {
        &self.ledger
    }

    /// Applies an expense and keeps it in the group history.
    pub fn add_expense(&mut self, expense: Expense) -> Result<()> {
        self.ledger.apply_expense(&expense)?;
        self.expenses.push(expense);
        Ok(())
    }

    /// Applies a payment and keeps it in the group history.
    pub fn add_payment(&mut self, payment: Payment) -> Result<()> {
        PaymentRecorder::record(&mut self.ledger, &payment)?;
        self.payments.push(payment);
        Ok(())
    }

    /// Marks a pending payment as completed. The ledger is unchanged.
    pub fn complete_payment(&mut self, id: PaymentId) -> Result<Payment> {
        let payment = self.payment_mut(id)?;
        payment.mark_completed()?;
        Ok(payment.clone())
    }

    /// Cancels a pending payment and reverts its effect on the ledger.
    pub fn cancel_payment(&mut self, id: PaymentId) -> Result<Payment> {
        let payment = self
            .payments
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(LedgerError::UnknownPayment(id))?;
        PaymentRecorder::cancel(&mut self.ledger, payment)?;
        Ok(payment.clone())
    }

    fn payment_mut(&mut self, id: PaymentId) -> Result<&mut Payment> {
        self.payments
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(LedgerError::UnknownPayment(id))
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn balance_sheet(&self) -> GroupBalanceSheet {
        GroupBalanceSheet::new(&self.ledger, &self.members)
    }

    pub fn user_balances(&self, user: UserId) -> UserBalances {
        UserBalances::new(&self.ledger, user)
    }

    pub fn settlement_plan(&self) -> Result<Vec<SettlementTransaction>> {
        DebtSimplifier::plan(self.ledger.net_positions())
    }
}
