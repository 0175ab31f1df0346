//! Reseller Ledger CLI
//!
//! Replays a file of ledger commands against an account snapshot and prints
//! the final balances.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --accounts accounts.csv commands.csv > balances.csv
//! cargo run -- --accounts accounts.csv --packages packages.csv \
//!     --subscribers subscribers.csv --strategy sync commands.csv
//! cargo run -- --accounts accounts.csv --batch-size 500 --workers 4 \
//!     --log-level info commands.csv
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success (rejected commands are logged, not fatal)
//! - 1: Error (missing arguments, input file not found or not readable, etc.)

use reseller_ledger::cli;
use reseller_ledger::strategy;
use std::process;
use tracing::error;

fn main() {
    let args = cli::parse_args();

    if let Some(log_level) = args.log_level {
        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .init();
    }

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_replay_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy.clone(), config)
    };

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.to_replay_inputs(), &mut output) {
        error!(error = %e, "Replay failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
