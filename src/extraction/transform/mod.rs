//! Per-table transform units.
//!
//! A transform unit parses folded rows into typed records, and renders those
//! records back into rows for CSV output. Units are registered by name in a
//! [Registry], and a table's configuration selects one by that name.

mod ditto;
mod skillpackages;
mod skills;

use std::collections::BTreeMap;

use crate::table::{Row, Table};

pub use ditto::MergedLabelDitto;
pub use skillpackages::{SkillLevel, SkillPackage, SkillPackages};
pub use skills::{Skill, Skills, Speciality};

/// Error from a transform unit. Fatal for the table being transformed only.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum TransformError {
    #[error("line {line_number} {line:?} does not match pattern {pattern:?}")]
    PatternMismatch {
        /// 1-based line number within the folded table.
        line_number: usize,
        line: String,
        pattern: &'static str,
    },
    #[error("expected a row at index {index}")]
    MissingRow { index: usize },
    #[error("invalid level {text:?} for skill {skill:?}")]
    InvalidLevel { skill: String, text: String },
}

/// A document-specific parser and renderer pair for one kind of table.
pub trait TableTransform {
    type Record;

    /// Parses folded rows into records.
    fn parse(&self, table: Table) -> Result<Vec<Self::Record>, TransformError>;

    /// Renders records as a header row followed by data rows.
    fn to_csv(&self, records: Vec<Self::Record>) -> Table;
}

/// Object-safe form of [TableTransform], as stored in a [Registry].
pub trait DynTransform: Send + Sync {
    /// Parses then renders `table`.
    fn apply(&self, table: Table) -> Result<Table, TransformError>;
}

impl<T> DynTransform for T
where
    T: TableTransform + Send + Sync,
{
    fn apply(&self, table: Table) -> Result<Table, TransformError> {
        let records = self.parse(table)?;
        Ok(self.to_csv(records))
    }
}

/// Maps transform names to units. Built once and read-only thereafter.
pub struct Registry {
    units: BTreeMap<&'static str, Box<dyn DynTransform>>,
}

impl Registry {
    /// Returns a registry containing every built-in unit.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(skills::NAME, Skills);
        registry.register(skillpackages::NAME, SkillPackages);
        registry.register(ditto::NAME, MergedLabelDitto);
        registry
    }

    pub fn empty() -> Self {
        Self {
            units: BTreeMap::new(),
        }
    }

    /// Adds a unit under `name`.
    ///
    /// # Panics
    ///
    /// If `name` is already registered. Registration happens with static
    /// names at startup, so this is a programming error.
    pub fn register<T>(&mut self, name: &'static str, unit: T)
    where
        T: DynTransform + 'static,
    {
        if self.units.insert(name, Box::new(unit)).is_some() {
            panic!("transform {name:?} registered more than once");
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn DynTransform> {
        self.units.get(name).map(Box::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    #[cfg(test)]
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.units.keys().copied()
    }
}

/// Builds a row of exactly `width` cells from `cells`, padding with empty
/// cells.
fn padded_row<const N: usize>(cells: [&str; N], width: usize) -> Row {
    let mut row: Row = cells.into();
    row.resize(width.max(N), String::new());
    row
}

/// Lines of text from a table with their 1-based line numbers, blank lines
/// excluded.
fn numbered_lines(table: &Table) -> impl Iterator<Item = (usize, String)> + '_ {
    table
        .iter()
        .map(super::parseutil::row_text)
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim().to_string()))
        .filter(|(_, line)| !line.is_empty())
}
