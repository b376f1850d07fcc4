use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::{Result, bail};
use clap::Args;
use simple_bar::ProgressBar;

use crate::{
    config::{ConfigArgs, root::load_config},
    extraction::{
        bookextract::{ExtractEvent, ExtractEvents, ExtractSpec, ExtractSummary, Extractor},
        pdf::{TableReader, serialised::SerialisedTableReader, tabulareader::TabulaClient},
        transform::Registry,
    },
    filesio::DirReadWriter,
};

/// Extracts data tables from a Traveller rulebook PDF as CSV files.
#[derive(Args, Debug)]
pub struct Command {
    /// ID of the book in the configuration to extract tables for.
    book_id: String,

    /// Path to input PDF.
    input_pdf: PathBuf,

    /// Path to the directory to output the CSV files into.
    output: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,

    /// Path to Tabula JAR file.
    #[arg(long)]
    tabula_libpath: String,

    /// Extract CSV tables that already exist in the output. This is useful when
    /// testing larger scale changes to the configuration or code.
    #[arg(long)]
    overwrite_existing: bool,

    /// Only extract tables that have any of these tags. --without-tags takes
    /// precedence over this.
    #[arg(long, value_delimiter(','))]
    with_tags: Vec<String>,

    /// Only extract tables that do not have any of these tags. This takes
    /// precedence over --with-tags.
    #[arg(long, value_delimiter(','))]
    without_tags: Vec<String>,

    /// Number of tables to process concurrently. Reads from the PDF are
    /// serialised regardless.
    #[arg(long, default_value = "1")]
    workers: usize,

    /// Do not show a progress bar reflecting overall extraction progress.
    #[arg(long, default_value = "false")]
    no_progress: bool,
}

/// Runs the subcommand.
pub fn run(cmd: &Command) -> Result<()> {
    let cfg_reader = cmd.config.new_cfg_reader()?;
    let cfg = load_config(cfg_reader.as_ref())?;
    let book = cfg.book(&cmd.book_id)?;
    let registry = Registry::builtin();
    let group = book.load_group(cfg_reader.as_ref(), &registry)?;

    let tabula_libpath = cmd.tabula_libpath.clone();
    let table_reader = SerialisedTableReader::spawn(move || {
        let client: Box<dyn TableReader> = Box::new(TabulaClient::new(&tabula_libpath)?);
        Ok(client)
    })?;

    let out_writer = DirReadWriter::new(&cmd.output);

    let spec = ExtractSpec {
        input_pdf: &cmd.input_pdf,
        overwrite_existing: cmd.overwrite_existing,
        with_tags: &cmd.with_tags,
        without_tags: &cmd.without_tags,
        workers: cmd.workers,
    };

    let continue_intent = Arc::new(AtomicBool::new(true));
    let mut events = EventDisplayer::new(!cmd.no_progress, continue_intent.clone());
    ctrlc::set_handler(move || continue_intent.store(false, Ordering::SeqCst))?;

    {
        let extractor =
            Extractor::new(&table_reader, &registry, cfg_reader.as_ref(), book, &group);
        extractor.extract_book(spec, &mut events, &out_writer);
    }

    if let Err(err) = table_reader.close() {
        log::warn!("Failed to shut down table reader: {err}");
    }

    if events.failed_terminally {
        bail!("extraction failed");
    }

    Ok(())
}

struct EventDisplayer {
    show_progress: bool,
    progress_bar: Option<ProgressBar>,
    continue_intent: Arc<AtomicBool>,
    failed_terminally: bool,
}

impl EventDisplayer {
    fn new(show_progress: bool, continue_intent: Arc<AtomicBool>) -> Self {
        EventDisplayer {
            show_progress,
            progress_bar: None,
            continue_intent,
            failed_terminally: false,
        }
    }

    fn print_summary(summary: &ExtractSummary) {
        eprintln!(
            "{} extracted, {} skipped as already present, {} failed.",
            summary.extracted, summary.skipped, summary.failed
        );
    }
}

impl ExtractEvents for EventDisplayer {
    fn on_event(&mut self, event: ExtractEvent) {
        match event {
            ExtractEvent::Skipped { .. } | ExtractEvent::Output { .. } => {}
            ExtractEvent::Progress { total, .. } => {
                if !self.show_progress {
                    return;
                }

                self.progress_bar
                    .get_or_insert_with(|| ProgressBar::cargo_style(total as u32, 80, true))
                    .update();
            }
            ExtractEvent::Error {
                err,
                terminal: false,
            } => {
                eprintln!("Error (continuing): {:?}.", err);
            }
            ExtractEvent::Error {
                err,
                terminal: true,
            } => {
                self.failed_terminally = true;
                eprintln!("Extraction failed: {:?}.", err);
            }
            ExtractEvent::Completed(summary) => {
                eprintln!("Extraction complete.");
                Self::print_summary(&summary);
            }
            ExtractEvent::Cancelled(summary) => {
                eprintln!("Extraction cancelled.");
                Self::print_summary(&summary);
            }
        }
    }

    fn do_continue(&self) -> bool {
        self.continue_intent.load(Ordering::Relaxed)
    }
}
