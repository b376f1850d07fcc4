//! Code to create/update an index of output data.

use std::{
    collections::BTreeMap,
    io::Read,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::{
    filesio::{FilesIoError, ReadWriter},
    fmtutil,
};

pub const INDEX_PATH: &str = "index.csv";
const ITEMS_DELIM: &str = ";";

/// Creates or updates an index. Nothing is written until [IndexWriter::commit].
pub struct IndexWriter<'rw> {
    read_writer: &'rw dyn ReadWriter,
    entries: BTreeMap<PathBuf, WriteRecord>,
}

impl<'rw> IndexWriter<'rw> {
    /// Loads existing entries, if any, from `read_writer`.
    pub fn new(read_writer: &'rw dyn ReadWriter) -> Result<Self> {
        let mut entries: BTreeMap<PathBuf, WriteRecord> = BTreeMap::new();
        match read_writer.open_read(Path::new(INDEX_PATH)) {
            Ok(r) => Self::load_entries(r, &mut entries)
                .with_context(|| format!("loading existing {}", INDEX_PATH))?,
            Err(err) if FilesIoError::NotFound.eq_anyhow(&err) => {}
            Err(err) => bail!(err),
        }

        Ok(Self {
            read_writer,
            entries,
        })
    }

    fn load_entries<R: Read>(r: R, entries: &mut BTreeMap<PathBuf, WriteRecord>) -> Result<()> {
        let mut reader = csv::Reader::from_reader(r);
        for record_result in reader.deserialize::<CsvRecord>() {
            let record = record_result?;
            entries.insert(
                record.table_path,
                WriteRecord {
                    pages: record.pages,
                    tags: record.tags,
                },
            );
        }
        Ok(())
    }

    /// Commits entries to the index file.
    pub fn commit(self) -> Result<()> {
        let mut write_file = self.read_writer.open_write(Path::new(INDEX_PATH))?;
        let mut w = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .from_writer(&mut write_file);
        for (table_path, write_record) in self.entries {
            w.serialize(CsvRecord {
                table_path,
                pages: write_record.pages,
                tags: write_record.tags,
            })?;
        }
        w.flush()?;
        drop(w);
        write_file.commit()
    }

    /// Write an index entry.
    ///
    /// * `output_path` Path to the table file within the output.
    /// * `tags` Tags for the table being output.
    /// * `page_numbers` Page numbers that the entry was sourced from.
    pub fn add_entry<'a>(
        &mut self,
        output_path: PathBuf,
        tags: impl Iterator<Item = &'a str>,
        mut page_numbers: Vec<i32>,
    ) {
        let mut sorted_tags: Vec<String> = tags.map(str::to_string).collect();
        sorted_tags.sort();
        sorted_tags.dedup();

        page_numbers.sort();
        page_numbers.dedup();

        self.entries.insert(
            output_path,
            WriteRecord {
                pages: fmtutil::join_display(&page_numbers, ITEMS_DELIM),
                tags: fmtutil::join_display(&sorted_tags, ITEMS_DELIM),
            },
        );
    }
}

struct WriteRecord {
    pages: String,
    tags: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct CsvRecord {
    table_path: PathBuf,
    pages: String,
    tags: String,
}
