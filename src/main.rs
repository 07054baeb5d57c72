//! Ledger Engine CLI
//!
//! Reads group expense and payment events from CSV and prints either the
//! settlement plan or the net balances of every group.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- events.csv > plan.csv
//! cargo run -- events.csv balances > balances.csv
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity

use ledger_engine::{LedgerError, LedgerProcessor, Result};
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(LedgerError::MissingArgument);
    }

    let input_path = &args[1];
    let report = args.get(2).map(String::as_str).unwrap_or("plan");
    if report != "plan" && report != "balances" {
        return Err(LedgerError::UnknownReport(report.to_string()));
    }

    let file = File::open(input_path)?;
    let reader = BufReader::new(file);

    let mut processor = LedgerProcessor::new();
    processor.process_csv(reader)?;

    let stdout = io::stdout();
    let handle = stdout.lock();
    processor.write_report(report, handle)?;

    Ok(())
}
