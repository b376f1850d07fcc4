
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc,
    },
    thread,
};

use anyhow::{Context, Result, anyhow};

use super::{
    folding::fold, index::IndexWriter, pdf::TableReader, rowtransform::apply_row_transforms,
    transform::Registry,
};
use crate::{
    config::{
        book::{self, Group},
        error::ConfigError,
        extract::TableExtraction,
        root::Book,
    },
    filesio::{ReadWriter, Reader},
    mpscutil,
    table::{Row, Table},
};

/// Encapsulates the values required to extract tables from a book.
pub struct Extractor<'a> {
    table_reader: &'a (dyn TableReader + Sync),
    registry: &'a Registry,
    cfg_reader: &'a dyn Reader,
    book: &'a Book,
    group: &'a Group,
}

/// Specifies a book's tables to be extracted by [Extractor::extract_book].
pub struct ExtractSpec<'a> {
    pub input_pdf: &'a Path,
    pub overwrite_existing: bool,
    pub with_tags: &'a [String],
    pub without_tags: &'a [String],
    /// Number of tables extracted concurrently. Zero is treated as one.
    pub workers: usize,
}

impl ExtractSpec<'_> {
    /// Returns `true` if `tags` is allowed by both `with_tags` and `without_tags`.
    fn allows(&self, tags: &HashSet<String>) -> bool {
        self.with_tags_allows(tags) && self.without_tags_allows(tags)
    }

    /// Returns `true` if `tags` is allowed by `self.with_tags`.
    fn with_tags_allows(&self, tags: &HashSet<String>) -> bool {
        self.with_tags.is_empty() || tags.iter().any(|tag| self.with_tags.contains(tag))
    }

    /// Returns `true` if `tags` is allowed by `self.without_tags`.
    fn without_tags_allows(&self, tags: &HashSet<String>) -> bool {
        self.without_tags.is_empty() || !tags.iter().any(|tag| self.without_tags.contains(tag))
    }
}

/// Counts of tables by outcome.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ExtractSummary {
    pub extracted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Extraction event emitted to track progress.
#[derive(Debug)]
pub enum ExtractEvent {
    /// The output file already exists, so the table was not extracted.
    Skipped { path: PathBuf },
    /// The output file was written.
    Output { path: PathBuf },
    /// Indicates progress of extraction of a single output file, successful
    /// or not.
    Progress {
        path: PathBuf,
        completed: usize,
        total: usize,
    },
    /// Indicates error with some portion of the extraction process.
    /// If `true`, `terminal` indicates that the error prevents any progress being made.
    Error { err: anyhow::Error, terminal: bool },
    /// Indicates that extraction has completed and that no more events will follow.
    Completed(ExtractSummary),
    /// Indicates that extraction has been cancelled, and than no more events will follow.
    Cancelled(ExtractSummary),
}

/// Trait to implement to receive notifications about extraction events, or to
/// cancel extraction early.
pub trait ExtractEvents {
    fn on_event(&mut self, event: ExtractEvent);
    fn do_continue(&self) -> bool;
}

struct OutputTable<'g> {
    out_filepath: PathBuf,
    table: &'g book::Table,
    extraction: &'g TableExtraction,
}

impl<'a> Extractor<'a> {
    /// Create a new [Extractor] for the book whose configuration is `group`.
    pub fn new(
        table_reader: &'a (dyn TableReader + Sync),
        registry: &'a Registry,
        cfg_reader: &'a dyn Reader,
        book: &'a Book,
        group: &'a Group,
    ) -> Self {
        Self {
            table_reader,
            registry,
            cfg_reader,
            book,
            group,
        }
    }

    /// Extracts tables from the book, and returns counts of the outcomes. The
    /// same summary is reported in the final event.
    pub fn extract_book(
        &self,
        spec: ExtractSpec,
        events: &mut dyn ExtractEvents,
        out_writer: &dyn ReadWriter,
    ) -> ExtractSummary {
        let mut summary = ExtractSummary::default();

        let mut index_writer =
            match IndexWriter::new(out_writer).with_context(|| "opening index for update") {
                Ok(index_writer) => index_writer,
                Err(err) => {
                    events.on_event(ExtractEvent::Error {
                        err,
                        terminal: true,
                    });
                    return summary;
                }
            };

        let output_tables = self.collect_output_tables(&spec, out_writer, events, &mut summary);

        if !events.do_continue() {
            events.on_event(ExtractEvent::Cancelled(summary));
            return summary;
        }

        let total = output_tables.len();
        let workers = spec.workers.clamp(1, total.max(1));
        let next_index = AtomicUsize::new(0);
        let stop = AtomicBool::new(false);
        let mut cancelled = false;

        thread::scope(|scope| {
            let (result_sender, result_receiver) = mpsc::sync_channel::<(usize, Result<Vec<i32>>)>(0);

            for _ in 0..workers {
                let result_sender = result_sender.clone();
                let output_tables = &output_tables;
                let next_index = &next_index;
                let stop = &stop;
                let spec = &spec;
                scope.spawn(move || {
                    while !stop.load(Ordering::SeqCst) {
                        let i = next_index.fetch_add(1, Ordering::SeqCst);
                        let Some(out_table) = output_tables.get(i) else {
                            return;
                        };
                        let result = self
                            .extract_table(out_table, spec.input_pdf, out_writer)
                            .with_context(|| {
                                format!("processing table {:?}", out_table.table.file_stem)
                            });
                        mpscutil::send_or_log_warning(&result_sender, "table result", (i, result));
                    }
                });
            }
            drop(result_sender);

            for (completed, (i, result)) in result_receiver.iter().enumerate() {
                let out_table = &output_tables[i];
                match result {
                    Err(err) => {
                        log::warn!("Failed to extract {:?}: {:#}", out_table.out_filepath, err);
                        summary.failed += 1;
                        events.on_event(ExtractEvent::Error {
                            err,
                            terminal: false,
                        });
                    }
                    Ok(page_numbers) => {
                        log::info!("Wrote {:?}.", out_table.out_filepath);
                        summary.extracted += 1;
                        index_writer.add_entry(
                            out_table.out_filepath.clone(),
                            out_table.table.tags.iter().map(String::as_str),
                            page_numbers,
                        );
                        events.on_event(ExtractEvent::Output {
                            path: out_table.out_filepath.clone(),
                        });
                    }
                }

                events.on_event(ExtractEvent::Progress {
                    path: out_table.out_filepath.clone(),
                    completed: completed + 1,
                    total,
                });
                if !cancelled && !events.do_continue() {
                    // In-flight tables still run to completion.
                    cancelled = true;
                    stop.store(true, Ordering::SeqCst);
                }
            }
        });

        if summary.extracted > 0 {
            if let Err(err) = index_writer
                .commit()
                .with_context(|| "committing changes to the index")
            {
                events.on_event(ExtractEvent::Error {
                    err,
                    terminal: false,
                });
            }
        }

        if cancelled {
            events.on_event(ExtractEvent::Cancelled(summary));
        } else {
            events.on_event(ExtractEvent::Completed(summary));
        }
        summary
    }

    /// Collects the tables that are to be included in the extraction by
    /// `spec`, reporting those skipped because their output already exists.
    fn collect_output_tables(
        &self,
        spec: &ExtractSpec,
        out_writer: &dyn ReadWriter,
        events: &mut dyn ExtractEvents,
        summary: &mut ExtractSummary,
    ) -> Vec<OutputTable<'a>> {
        let mut output_tables = Vec::new();

        for table in self.group.tables() {
            let Some(extraction) = &table.extraction else {
                continue;
            };
            if !spec.allows(&table.tags) {
                continue;
            }

            let out_filepath = table.output_path();
            if !spec.overwrite_existing && out_writer.exists(&out_filepath) {
                log::debug!("Skipping {:?}, as it already exists.", out_filepath);
                summary.skipped += 1;
                events.on_event(ExtractEvent::Skipped { path: out_filepath });
                continue;
            }

            output_tables.push(OutputTable {
                out_filepath,
                table,
                extraction,
            });
        }

        output_tables
    }

    /// Extracts a single table into a CSV file, returning the page numbers it
    /// was sourced from.
    fn extract_table(
        &self,
        out_table: &OutputTable,
        input_pdf: &Path,
        out_writer: &dyn ReadWriter,
    ) -> Result<Vec<i32>> {
        let template_path = out_table.table.tabula_template_path(&self.book.id);
        let template_json = self
            .cfg_reader
            .read_to_string(&template_path)
            .with_context(|| format!("reading Tabula template {:?}", template_path))?;

        let extracted = self
            .table_reader
            .read_pdf_with_template(input_pdf, &template_json)
            .with_context(|| format!("extracting table from PDF {:?}", input_pdf))?;

        let table = self.process_table(
            out_table,
            Table::concatenated(extracted.tables),
        )?;

        let mut csv_file = out_writer.open_write(&out_table.out_filepath)?;
        if let Err(err) = table.write_csv(&mut csv_file) {
            if let Err(discard_err) = csv_file.discard() {
                log::warn!("Failed to discard partial {:?}: {:#}", out_table.out_filepath, discard_err);
            }
            return Err(err);
        }
        csv_file.commit().with_context(|| "committing CSV file")?;

        let mut page_numbers: Vec<i32> = extracted
            .source_pages
            .into_iter()
            .map(|page_number| page_number + self.book.page_offset)
            .collect();
        page_numbers.sort();
        Ok(page_numbers)
    }

    /// Folds, adds the header, applies row operations, cleans, then
    /// transforms the table.
    fn process_table(&self, out_table: &OutputTable, table: Table) -> Result<Table> {
        let extraction = out_table.extraction;

        let mut table = fold(table, &extraction.fold_rows);
        if let Some(header) = &extraction.add_header_row {
            table.insert(0, Row::from(header.iter().map(String::as_str)));
        }
        let mut table = apply_row_transforms(&extraction.transforms, table)
            .with_context(|| "applying row transforms")?;
        table.clean();

        let Some(transform_name) = &extraction.transform else {
            return Ok(table);
        };
        let unit = self.registry.get(transform_name).ok_or_else(|| {
            anyhow!(ConfigError::UnknownTransform {
                table: out_table.table.file_stem.clone(),
                transform: transform_name.clone(),
            })
        })?;
        unit.apply(table)
            .with_context(|| format!("applying transform {:?}", transform_name))
    }
}
