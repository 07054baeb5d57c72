//! # Ledger Engine
//!
//! Splits shared group expenses, keeps pairwise balances per group and plans
//! the payments that settle them.
//!
//! ## Design Principles
//!
//! - **Fixed-point arithmetic**: Money is held in exact cents via `rust_decimal`
//! - **Validate, then commit**: A rejected expense or payment changes nothing
//! - **Strict invariants**: `balance(x, y) == -balance(y, x)` and net positions sum to zero
//! - **Deterministic output**: Split remainders and settlement plans never depend on hash order
//!
//! ## Example
//!
//! ```
//! use ledger_engine::{GroupId, Money, NewExpense, SettlementEngine, SplitRule, UserId};
//! use std::str::FromStr;
//!
//! let engine = SettlementEngine::new();
//! let (a, b, c) = (UserId(1), UserId(2), UserId(3));
//! engine.register_group(GroupId(1), "Trip", [a, b, c]).unwrap();
//!
//! engine
//!     .submit_expense(
//!         GroupId(1),
//!         NewExpense {
//!             description: "Dinner".to_string(),
//!             amount: Money::from_str("90").unwrap(),
//!             payer: a,
//!             participants: vec![a, b, c],
//!             rule: SplitRule::Equal,
//!         },
//!     )
//!     .unwrap();
//!
//! let plan = engine.settlement_plan(GroupId(1)).unwrap();
//! assert_eq!(plan.len(), 2);
//! ```

pub mod engine;
pub mod error;
pub mod group;
pub mod ledger;
pub mod model;
pub mod money;
pub mod payment;
pub mod processor;
pub mod record;
pub mod sheet;
pub mod simplify;
pub mod split;

pub use engine::{NewExpense, SettlementEngine};
pub use error::{LedgerError, Result};
pub use group::Group;
pub use ledger::BalanceLedger;
pub use model::{
    Expense, ExpenseId, GroupId, Payment, PaymentId, PaymentStatus, SettlementTransaction, UserId,
};
pub use money::Money;
pub use payment::PaymentRecorder;
pub use processor::LedgerProcessor;
pub use record::{EventKind, EventRecord, ParsedEvent};
pub use sheet::{GroupBalanceSheet, PairwiseBalance, UserBalances};
pub use simplify::DebtSimplifier;
pub use split::{Split, SplitCalculator, SplitKind, SplitRule};
