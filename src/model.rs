//! Identifiers and the immutable records the ledger consumes and produces.

use crate::error::{LedgerError, Result};
use crate::money::Money;
use crate::split::{Split, SplitKind};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// A user, already registered by the caller.
    UserId(u32)
);
id_type!(
    /// A group, already registered by the caller.
    GroupId(u32)
);
id_type!(ExpenseId(u64));
id_type!(PaymentId(u64));

/// An expense that has been split and applied to a group ledger.
///
/// Immutable once built; `split` always sums to `amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub description: String,

    /// Total paid, always positive.
    pub amount: Money,

    /// User who paid the full amount up front.
    pub payer: UserId,

    pub kind: SplitKind,

    /// What each participant owes for this expense (payer's own share included).
    pub split: Split,
}

/// A direct transfer from one user to another, independent of any split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payment {
    pub id: PaymentId,

    /// User handing over the money (the debtor).
    pub from: UserId,

    /// User receiving the money (the creditor).
    pub to: UserId,

    pub amount: Money,

    /// Expense this payment is meant to cover, if any.
    pub related_expense: Option<ExpenseId>,

    pub status: PaymentStatus,
}

/// Lifecycle of a recorded payment.
///
/// A payment moves the ledger as soon as it is recorded. `Pending` may move
/// to `Completed` or `Cancelled`; both of those are final, and cancelling
/// takes the payment back out of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Cancelled,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

impl Payment {
    /// Creates a pending payment.
    pub fn new(
        id: PaymentId,
        from: UserId,
        to: UserId,
        amount: Money,
        related_expense: Option<ExpenseId>,
    ) -> Self {
        Payment {
            id,
            from,
            to,
            amount,
            related_expense,
            status: PaymentStatus::Pending,
        }
    }

    /// Marks a pending payment as completed.
    pub fn mark_completed(&mut self) -> Result<()> {
        self.transition(PaymentStatus::Completed)
    }

    /// Marks a pending payment as cancelled. The caller reverts its ledger
    /// effect.
    pub fn cancel(&mut self) -> Result<()> {
        self.transition(PaymentStatus::Cancelled)
    }

    fn transition(&mut self, next: PaymentStatus) -> Result<()> {
        if self.status != PaymentStatus::Pending {
            return Err(LedgerError::State(format!(
                "payment {} is already {}, cannot mark it {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

/// One proposed payment in a settlement plan.
///
/// Derived from net positions on demand and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettlementTransaction {
    pub from: UserId,
    pub to: UserId,
    pub amount: Money,
}

impl fmt::Display for SettlementTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} pays {} {}", self.from, self.to, self.amount)
    }
}
