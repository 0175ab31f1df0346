use crate::io::SnapshotPaths;
use crate::strategy::{ReplayConfig, ReplayInputs};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay reseller credit ledger commands against a snapshot
#[derive(Parser, Debug)]
#[command(name = "reseller-ledger")]
#[command(about = "Replay credit transfers and subscriber billing against an account snapshot", long_about = None)]
pub struct CliArgs {
    /// Command CSV file path
    #[arg(value_name = "COMMANDS", help = "Path to the command CSV file")]
    pub commands_file: PathBuf,

    /// Accounts snapshot
    #[arg(
        long = "accounts",
        value_name = "FILE",
        help = "Accounts CSV: id,name,role,balance,created_by,status"
    )]
    pub accounts_file: PathBuf,

    /// Package catalog
    #[arg(
        long = "packages",
        value_name = "FILE",
        help = "Packages CSV: id,name,cost,duration"
    )]
    pub packages_file: Option<PathBuf>,

    /// Subscriber snapshot
    #[arg(
        long = "subscribers",
        value_name = "FILE",
        help = "Subscribers CSV: id,name,reseller,packages,primary,expiry,status"
    )]
    pub subscribers_file: Option<PathBuf>,

    /// Replay strategy to use for processing commands
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Replay strategy: 'sync' for synchronous or 'async' for asynchronous"
    )]
    pub strategy: StrategyType,

    /// Number of commands per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of commands per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Number of runtime worker threads (async mode only)
    #[arg(
        long = "workers",
        value_name = "COUNT",
        help = "Number of worker threads (default: CPU cores)"
    )]
    pub workers: Option<usize>,

    /// Log verbosity; logging is off when omitted
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<tracing::Level>,
}

/// Available replay strategies
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a ReplayConfig from CLI arguments, falling back to defaults
    pub fn to_replay_config(&self) -> ReplayConfig {
        if self.batch_size.is_none() && self.workers.is_none() {
            return ReplayConfig::default();
        }
        let default = ReplayConfig::default();
        ReplayConfig::new(
            self.batch_size.unwrap_or(default.batch_size),
            self.workers.unwrap_or(default.worker_threads),
        )
    }

    pub fn to_replay_inputs(&self) -> ReplayInputs {
        ReplayInputs {
            snapshot: SnapshotPaths {
                accounts: self.accounts_file.clone(),
                packages: self.packages_file.clone(),
                subscribers: self.subscribers_file.clone(),
            },
            commands: self.commands_file.clone(),
        }
    }
}
