use std::{
    io::Write,
    ops::{Deref, DerefMut},
};

use anyhow::{Context, Result};

use crate::extraction::parseutil::clean_text;

/// Rows of text cells, as extracted from a PDF or produced by a transform.
/// Rows may differ in width.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Table(pub Vec<Row>);

impl Table {
    /// Concatenates the rows of the given tables, in order.
    pub fn concatenated<I>(tables: I) -> Self
    where
        I: IntoIterator<Item = Table>,
    {
        Table(tables.into_iter().flat_map(|table| table.0).collect())
    }

    /// Clean leading, trailing, and redundant sequences of whitespace within
    /// the `Table`, in-place.
    pub fn clean(&mut self) {
        for row in self.iter_mut() {
            for cell in row.iter_mut() {
                clean_text(cell);
            }
        }
    }

    /// Writes the table as CSV records into `w`.
    pub fn write_csv<W: Write>(&self, w: W) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .flexible(true)
            .from_writer(w);

        for row in self.iter() {
            csv_writer
                .write_record(&row.0)
                .with_context(|| "writing record")?;
        }

        // Check for error rather than implicitly flushing and ignoring.
        csv_writer.flush().with_context(|| "flushing to CSV")?;

        Ok(())
    }
}

impl Deref for Table {
    type Target = Vec<Row>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Table {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<C, R> From<C> for Table
where
    C: IntoIterator<Item = R>,
    R: Into<Row>,
{
    fn from(value: C) -> Self {
        Table(value.into_iter().map(Into::into).collect())
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Row(pub Vec<String>);

impl Deref for Row {
    type Target = Vec<String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Row {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<C, S> From<C> for Row
where
    C: IntoIterator<Item = S>,
    S: Into<String>,
{
    fn from(value: C) -> Self {
        Row(value.into_iter().map(Into::into).collect())
    }
}
