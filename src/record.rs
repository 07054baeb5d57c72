//! Event records for CSV batch input.

use crate::engine::NewExpense;
use crate::error::{LedgerError, Result};
use crate::model::{GroupId, UserId};
use crate::money::Money;
use crate::ledger::BalanceLedger;
use crate::payment::PaymentRecorder;
use crate::split::{SplitCalculator, SplitKind, SplitRule};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

/// Separator for list-valued columns (`participants`, `params`).
const LIST_SEPARATOR: char = ';';

/// Raw event row as read from CSV.
///
/// Columns not used by an event type are left empty.
#[derive(Debug, Deserialize)]
pub struct EventRecord {
    /// Event type: expense or payment
    #[serde(rename = "type")]
    pub event_type: String,

    pub group: u32,

    /// Payer of the expense, or the user making the payment
    pub user: u32,

    /// Payee of a payment
    pub counterparty: Option<u32>,

    pub amount: Option<String>,

    /// Split kind of an expense: equal, exact, percentage, shares
    pub split: Option<String>,

    /// `;`-separated participant ids of an expense
    pub participants: Option<String>,

    /// `;`-separated split parameters lined up with `participants`
    pub params: Option<String>,

    pub description: Option<String>,
}

/// A parsed event ready to be applied.
#[derive(Debug, Clone)]
pub struct ParsedEvent {
    pub group: GroupId,
    pub kind: EventKind,
}

#[derive(Debug, Clone)]
pub enum EventKind {
    Expense(NewExpense),
    Payment {
        from: UserId,
        to: UserId,
        amount: Money,
    },
}

impl ParsedEvent {
    /// Users this event involves, for group membership.
    pub fn users(&self) -> Vec<UserId> {
        match &self.kind {
            EventKind::Expense(expense) => {
                let mut users = vec![expense.payer];
                users.extend(expense.participants.iter().copied());
                users
            }
            EventKind::Payment { from, to, .. } => vec![*from, *to],
        }
    }
}

impl ParsedEvent {
    /// Runs every check the engine would run, without touching any group.
    pub fn validate(&self) -> Result<()> {
        match &self.kind {
            EventKind::Expense(new) => {
                let split = SplitCalculator::compute(new.amount, &new.participants, &new.rule)?;
                BalanceLedger::check_expense(new.amount, &split)
            }
            EventKind::Payment { from, to, amount } => PaymentRecorder::check(*from, *to, *amount),
        }
    }
}

impl EventRecord {
    /// Parses the raw CSV record into a typed event.
    pub fn parse(&self, row: usize) -> Result<ParsedEvent> {
        let event_type = self.event_type.trim().to_lowercase();
        let group = GroupId(self.group);

        let kind = match event_type.as_str() {
            "expense" => EventKind::Expense(self.parse_expense(row)?),
            "payment" => {
                let to = self
                    .counterparty
                    .ok_or_else(|| invalid(row, "payment without counterparty"))?;
                EventKind::Payment {
                    from: UserId(self.user),
                    to: UserId(to),
                    amount: self.parse_amount(row)?,
                }
            }
            other => return Err(invalid(row, format!("unknown event type '{}'", other))),
        };

        Ok(ParsedEvent { group, kind })
    }

    fn parse_expense(&self, row: usize) -> Result<NewExpense> {
        let amount = self.parse_amount(row)?;
        let kind = match non_empty(&self.split) {
            Some(split) => SplitKind::from_str(split).map_err(|e| at_row(row, e))?,
            None => SplitKind::Equal,
        };

        let participants = list(&self.participants)
            .map(|id| {
                u32::from_str(id)
                    .map(UserId)
                    .map_err(|_| invalid(row, format!("bad participant id '{}'", id)))
            })
            .collect::<Result<Vec<_>>>()?;

        let params: Vec<&str> = list(&self.params).collect();
        let rule = match kind {
            SplitKind::Equal if params.is_empty() => SplitRule::Equal,
            SplitKind::Equal => return Err(invalid(row, "equal split takes no params")),
            SplitKind::Exact => SplitRule::Exact(
                params
                    .iter()
                    .map(|p| Money::from_str(p).map_err(|e| at_row(row, e)))
                    .collect::<Result<_>>()?,
            ),
            SplitKind::Percentage => SplitRule::Percentage(
                params
                    .iter()
                    .map(|p| {
                        Decimal::from_str(p)
                            .map_err(|_| invalid(row, format!("bad percentage '{}'", p)))
                    })
                    .collect::<Result<_>>()?,
            ),
            SplitKind::Shares => SplitRule::Shares(
                params
                    .iter()
                    .map(|p| {
                        u32::from_str(p)
                            .map_err(|_| invalid(row, format!("bad share weight '{}'", p)))
                    })
                    .collect::<Result<_>>()?,
            ),
        };

        Ok(NewExpense {
            description: self.description.clone().unwrap_or_default(),
            amount,
            payer: UserId(self.user),
            participants,
            rule,
        })
    }

    /// Parses the amount field into `Money`.
    fn parse_amount(&self, row: usize) -> Result<Money> {
        let amount = non_empty(&self.amount).ok_or_else(|| invalid(row, "missing amount"))?;
        Money::from_str(amount).map_err(|e| at_row(row, e))
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn list<'a>(field: &'a Option<String>) -> impl Iterator<Item = &'a str> + 'a {
    non_empty(field)
        .into_iter()
        .flat_map(|value| value.split(LIST_SEPARATOR))
        .map(str::trim)
}

fn invalid(row: usize, message: impl Into<String>) -> LedgerError {
    LedgerError::InvalidRecord {
        row,
        message: message.into(),
    }
}

fn at_row(row: usize, err: LedgerError) -> LedgerError {
    invalid(row, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(event_type: &str, user: u32) -> EventRecord {
        EventRecord {
            event_type: event_type.to_string(),
            group: 1,
            user,
            counterparty: None,
            amount: None,
            split: None,
            participants: None,
            params: None,
            description: None,
        }
    }

    #[test]
    fn test_parse_equal_expense() {
        let mut rec = record(" Expense ", 1);
        rec.amount = Some(" 90.00 ".to_string());
        rec.participants = Some("1; 2;3".to_string());
        rec.description = Some("Dinner".to_string());

        let parsed = rec.parse(2).unwrap();
        assert_eq!(parsed.group, GroupId(1));
        match parsed.kind {
            EventKind::Expense(expense) => {
                assert_eq!(expense.amount.to_string(), "90.00");
                assert_eq!(expense.participants, vec![UserId(1), UserId(2), UserId(3)]);
                assert_eq!(expense.rule, SplitRule::Equal);
                assert_eq!(expense.description, "Dinner");
            }
            _ => panic!("Expected Expense"),
        }
    }

    #[test]
    fn test_parse_percentage_expense() {
        let mut rec = record("expense", 2);
        rec.amount = Some("250".to_string());
        rec.split = Some("percentage".to_string());
        rec.participants = Some("1;2;3".to_string());
        rec.params = Some("40;40;20".to_string());

        let parsed = rec.parse(2).unwrap();
        match parsed.kind {
            EventKind::Expense(expense) => {
                assert_eq!(expense.rule.kind(), SplitKind::Percentage);
                assert_eq!(expense.payer, UserId(2));
            }
            _ => panic!("Expected Expense"),
        }
    }

    #[test]
    fn test_parse_payment() {
        let mut rec = record("payment", 3);
        rec.counterparty = Some(1);
        rec.amount = Some("40".to_string());

        let parsed = rec.parse(5).unwrap();
        assert_eq!(parsed.users(), vec![UserId(3), UserId(1)]);
        match parsed.kind {
            EventKind::Payment { from, to, amount } => {
                assert_eq!(from, UserId(3));
                assert_eq!(to, UserId(1));
                assert_eq!(amount.to_string(), "40.00");
            }
            _ => panic!("Expected Payment"),
        }
    }

    #[test]
    fn test_validate_catches_what_the_engine_rejects() {
        let mut rec = record("expense", 1);
        rec.amount = Some("300".to_string());
        rec.split = Some("exact".to_string());
        rec.participants = Some("1;2;3".to_string());
        rec.params = Some("100;100;50".to_string());
        let parsed = rec.parse(2).unwrap();
        assert!(matches!(parsed.validate(), Err(LedgerError::Validation(_))));

        let mut rec = record("payment", 4);
        rec.counterparty = Some(4);
        rec.amount = Some("1".to_string());
        let parsed = rec.parse(3).unwrap();
        assert!(matches!(parsed.validate(), Err(LedgerError::InvalidInput(_))));
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let err = record("refund", 1).parse(4).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRecord { row: 4, .. }));
    }

    #[test]
    fn test_parse_rejects_missing_amount() {
        let mut rec = record("expense", 1);
        rec.participants = Some("1;2".to_string());
        assert!(rec.parse(2).is_err());
    }

    #[test]
    fn test_parse_rejects_payment_without_counterparty() {
        let mut rec = record("payment", 1);
        rec.amount = Some("5".to_string());
        assert!(rec.parse(2).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_params() {
        let mut rec = record("expense", 1);
        rec.amount = Some("10".to_string());
        rec.participants = Some("1;2".to_string());
        rec.split = Some("shares".to_string());
        rec.params = Some("1;x".to_string());
        assert!(rec.parse(2).is_err());

        rec.split = Some("equal".to_string());
        assert!(rec.parse(2).is_err());

        rec.split = Some("thirds".to_string());
        assert!(rec.parse(2).is_err());
    }
}
