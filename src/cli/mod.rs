use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use simplelog::LevelFilter;

mod extractcsvtables;
mod listbooks;
mod listtables;

/// Extracts tables from Traveller rulebook PDFs into CSV files.
#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Logging level.
    #[arg(long, default_value = "Warn")]
    log_level: LevelFilter,
}

#[derive(Subcommand)]
enum Command {
    ExtractCsvTables(extractcsvtables::Command),
    ListBooks(listbooks::Command),
    ListTables(listtables::Command),
}

pub fn run() -> Result<()> {
    let args = Args::parse();

    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default())
        .with_context(|| "configuring logging")?;

    use Command::*;
    match &args.command {
        ExtractCsvTables(cmd) => extractcsvtables::run(cmd),
        ListBooks(cmd) => listbooks::run(cmd),
        ListTables(cmd) => listtables::run(cmd),
    }
}
