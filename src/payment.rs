//! Direct peer-to-peer payments.

use crate::error::{LedgerError, Result};
use crate::ledger::BalanceLedger;
use crate::model::{Payment, PaymentStatus, UserId};
use crate::money::Money;

/// Validates a payment and applies it to a ledger.
///
/// Whether the users belong to the group is the caller's concern.
pub struct PaymentRecorder;

impl PaymentRecorder {
    pub fn record(ledger: &mut BalanceLedger, payment: &Payment) -> Result<()> {
        Self::check(payment.from, payment.to, payment.amount)?;
        if payment.status == PaymentStatus::Cancelled {
            return Err(LedgerError::invalid(format!(
                "payment {} is cancelled",
                payment.id
            )));
        }
        ledger.apply_payment(payment);
        Ok(())
    }

    /// Cancels a pending payment and takes it back out of the ledger.
    pub fn cancel(ledger: &mut BalanceLedger, payment: &mut Payment) -> Result<()> {
        payment.cancel()?;
        ledger.revert_payment(payment);
        Ok(())
    }

    /// Checks that `amount > 0` and that `from` and `to` differ.
    pub fn check(from: UserId, to: UserId, amount: Money) -> Result<()> {
        if !amount.is_positive() {
            return Err(LedgerError::invalid(format!(
                "payment amount must be positive, got {}",
                amount
            )));
        }
        if from == to {
            return Err(LedgerError::invalid(format!(
                "user {} cannot pay themselves",
                from
            )));
        }
        Ok(())
    }
}
