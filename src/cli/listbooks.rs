use anyhow::Result;
use clap::Args;

use crate::config::{ConfigArgs, root::load_config};

/// Lists the IDs and names of the books in the configuration.
#[derive(Args, Debug)]
pub struct Command {
    #[command(flatten)]
    config: ConfigArgs,
}

/// Runs the subcommand.
pub fn run(cmd: &Command) -> Result<()> {
    let cfg_reader = cmd.config.new_cfg_reader()?;
    let cfg = load_config(cfg_reader.as_ref())?;

    for (id, book) in &cfg.books {
        println!("{}\t{}\t{}", id, book.name, book.default_filename);
    }

    Ok(())
}
