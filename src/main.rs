//! Paging simulator - Main Entry Point
//!
//! Usage: paging-sim [OPTIONS] [INPUT]
//!
//! Reads a record stream (page size, memory size, then `NEW`-delimited
//! sessions of reference records) and prints each page fault, the fault
//! ratio, and the page table / main memory state after every record.

use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use paging_sim::constants::DEFAULT_INPUT_FILE;
use paging_sim::io::{Reporter, format_ratio, read_records};
use paging_sim::logger;
use paging_sim::{CounterScope, PolicyKind, VmManager};

/// Command-line configuration
#[derive(Parser, Debug)]
#[command(name = "paging-sim")]
#[command(about = "Simulate demand paging over a stream of address references")]
#[command(version)]
struct Cli {
    /// Record file: page size, memory size, then NEW-delimited sessions
    #[arg(default_value = DEFAULT_INPUT_FILE)]
    input: PathBuf,

    /// Frame replacement policy used once memory is full
    #[arg(long, value_enum, default_value_t = PolicyKind::Fixed)]
    policy: PolicyKind,

    /// Restart hit/miss counters at every session
    #[arg(long)]
    reset_counters: bool,

    /// Only print faults and the summary, not the tables after each record
    #[arg(short, long)]
    quiet: bool,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(logger::level_for(cli.verbose)).context("failed to install logger")?;
    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let records = read_records(&cli.input)
        .with_context(|| format!("failed to read input file {}", cli.input.display()))?;

    let scope = if cli.reset_counters { CounterScope::Session } else { CounterScope::Run };
    info!(
        "{} records from {}, {:?} policy, {:?} counters",
        records.len(),
        cli.input.display(),
        cli.policy,
        scope
    );

    let stdout = io::stdout();
    let reporter = Reporter::new(BufWriter::new(stdout.lock()));
    let mut reporter = if cli.quiet { reporter.without_tables() } else { reporter };

    let mut vm = VmManager::new(cli.policy.build(), scope);
    let summary = vm
        .run(&records, &mut reporter)
        .with_context(|| format!("simulation of {} aborted", cli.input.display()))?;

    info!(
        "done: {} hits, {} misses, fault ratio {}",
        summary.counters.hits,
        summary.counters.misses,
        format_ratio(summary.fault_ratio())
    );
    Ok(())
}
