//! Batch processing of event CSV files.
//!
//! Events are applied in the order they are read. A row that fails to parse
//! or is rejected by the ledger is logged and skipped; it never leaves a
//! partial change behind.

use crate::engine::SettlementEngine;
use crate::error::{LedgerError, Result};
use crate::record::{EventKind, EventRecord, ParsedEvent};
use csv::{ReaderBuilder, Trim};
use log::{debug, warn};
use std::io::{Read, Write};

/// Feeds CSV events into a [`SettlementEngine`] and writes reports.
///
/// Groups are registered on first reference; every user named in an applied
/// row becomes a member of its group.
#[derive(Debug, Default)]
pub struct LedgerProcessor {
    engine: SettlementEngine,
}

impl LedgerProcessor {
    /// Creates a processor with an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engine(&self) -> &SettlementEngine {
        &self.engine
    }

    /// Processes events from a CSV reader in streaming fashion.
    ///
    /// Invalid records are logged at warn level and skipped.
    pub fn process_csv<R: Read>(&mut self, reader: R) -> Result<()> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        for (row_idx, result) in csv_reader.deserialize::<EventRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            match result {
                Ok(record) => match record.parse(row_num) {
                    Ok(event) => {
                        if let Err(e) = self.apply(event, row_num) {
                            warn!("Row {}: {}", row_num, e);
                        }
                    }
                    Err(e) => warn!("{}", e),
                },
                Err(e) => {
                    warn!("Row {}: CSV parse error: {}", row_num, e);
                }
            }
        }

        Ok(())
    }

    /// Applies a single parsed event.
    ///
    /// The event is checked before its group is registered, so a rejected
    /// row never creates a group or adds members.
    fn apply(&mut self, event: ParsedEvent, row: usize) -> Result<()> {
        event.validate()?;
        let group = event.group;
        self.engine
            .register_group(group, &format!("group {}", group), event.users())?;

        match event.kind {
            EventKind::Expense(new) => {
                let expense = self.engine.submit_expense(group, new)?;
                debug!(
                    "Row {}: Expense {} of {} paid by {} in group {}",
                    row, expense.id, expense.amount, expense.payer, group
                );
            }
            EventKind::Payment { from, to, amount } => {
                let payment = self.engine.record_payment(group, from, to, amount, None)?;
                debug!(
                    "Row {}: Payment {} of {} from {} to {} in group {}",
                    row, payment.id, amount, from, to, group
                );
            }
        }

        Ok(())
    }

    /// Writes the settlement plan of every group as CSV.
    ///
    /// Groups are in ascending id order; within a group, transactions keep
    /// the order the simplifier produced.
    pub fn write_plan<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["group", "from", "to", "amount"])?;

        for group in self.engine.group_ids()? {
            for tx in self.engine.settlement_plan(group)? {
                csv_writer.write_record([
                    group.to_string(),
                    tx.from.to_string(),
                    tx.to.to_string(),
                    tx.amount.to_string(),
                ])?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Writes the net position of every member of every group as CSV.
    pub fn write_balances<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["group", "user", "net"])?;

        for group in self.engine.group_ids()? {
            for (user, net) in self.engine.net_positions(group)? {
                csv_writer.write_record([group.to_string(), user.to_string(), net.to_string()])?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Writes the named report: `plan` or `balances`.
    pub fn write_report<W: Write>(&self, report: &str, writer: W) -> Result<()> {
        match report {
            "plan" => self.write_plan(writer),
            "balances" => self.write_balances(writer),
            other => Err(LedgerError::UnknownReport(other.to_string())),
        }
    }
}
