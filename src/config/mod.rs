use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::Args;

use crate::filesio::{self, DirReadWriter};

pub mod book;
pub mod error;
pub mod extract;
pub mod root;

const DEFAULT_CONFIG_DIR: &str = "config";

/// CLI arguments relating to [root::Config].
#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    /// Path to the configuration. This must be a directory directly
    /// containing a config.yaml file, book.yaml files in directories, and
    /// its required Tabula templates. Defaults to ./config if that contains
    /// a config.yaml.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl ConfigArgs {
    /// Creates a new [filesio::Reader] for the configuration.
    pub fn new_cfg_reader(&self) -> Result<Box<dyn filesio::Reader>> {
        let cfg_path = self
            .config
            .clone()
            .or_else(default_config_dir)
            .ok_or_else(|| {
                anyhow!(
                    "--config must be specified, as ./{} does not contain a config.yaml",
                    DEFAULT_CONFIG_DIR
                )
            })?;
        if !cfg_path.is_dir() {
            return Err(anyhow!("config path {:?} is not a directory", cfg_path));
        }
        Ok(Box::new(DirReadWriter::new(cfg_path)))
    }
}

fn default_config_dir() -> Option<PathBuf> {
    let dir = Path::new(DEFAULT_CONFIG_DIR);
    if dir.join("config.yaml").is_file() {
        Some(dir.to_owned())
    } else {
        None
    }
}
