//! Configurable row operations, applied in order to a folded table before any
//! transform unit sees it.

use std::{cmp::min, ops::Range};

use anyhow::Result;
use lazy_regex::{regex, regex_replace_all};
use regex::{Captures, Regex};
use serde::Deserialize;

use crate::table::{Row, Table};

#[derive(Clone, Deserialize, Debug, Eq, PartialEq)]
/// Supported row operations.
pub enum RowTransform {
    ExpandColumnOnRegex(ExpandColumnOnRegex),
    JoinColumns(JoinColumns),
    PrependRow(PrependRow),
    SplitColumn(SplitColumn),
    Transpose(Transpose),
    WrapRowEveryN(WrapRowEveryN),
}

/// A row operation that can never succeed.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum RowTransformError {
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("WrapRowEveryN requires at least one column")]
    ZeroWrapWidth,
}

impl RowTransform {
    /// Checks the values that cannot be checked while parsing.
    pub fn validate(&self) -> Result<(), RowTransformError> {
        use RowTransform::*;
        match self {
            ExpandColumnOnRegex(cfg) => full_match_regex(&cfg.pattern).map(|_| ()),
            SplitColumn(cfg) => compile(&cfg.pattern).map(|_| ()),
            WrapRowEveryN(cfg) if cfg.num_columns == 0 => Err(RowTransformError::ZeroWrapWidth),
            _ => Ok(()),
        }
    }
}

/// Applies `transforms` to `table`, in order.
pub fn apply_row_transforms(transforms: &[RowTransform], mut table: Table) -> Result<Table> {
    for transform in transforms {
        table = apply(transform, table)?;
    }
    Ok(table)
}

fn apply(cfg: &RowTransform, table: Table) -> Result<Table> {
    use RowTransform::*;
    Ok(match cfg {
        ExpandColumnOnRegex(cfg) => expand_column_on_regex(cfg, table)?,
        JoinColumns(cfg) => join_columns(cfg, table),
        PrependRow(cfg) => prepend_row(cfg, table),
        SplitColumn(cfg) => split_column(cfg, table)?,
        Transpose(_) => transpose(table),
        WrapRowEveryN(cfg) => wrap_row_every_n(cfg, table)?,
    })
}

fn compile(pattern: &str) -> Result<Regex, RowTransformError> {
    Regex::new(pattern).map_err(|err| RowTransformError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: err.to_string(),
    })
}

/// Compiles `pattern` so that it only matches an entire cell.
fn full_match_regex(pattern: &str) -> Result<Regex, RowTransformError> {
    compile(pattern)?;
    compile(&format!(r"\A(?:{pattern})\z"))
}

#[derive(Clone, Deserialize, Debug, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
/// Replaces a column with cells built from a match on its whole content.
///
/// Cell templates refer to groups as `\1` or `\g<1>`, with `\g<0>` being the
/// entire cell.
pub struct ExpandColumnOnRegex {
    pub column: usize,
    pub pattern: String,
    /// Templates used when `pattern` matches.
    pub on_match: Vec<String>,
    /// Templates used when `pattern` does not match. Only `\g<0>` is
    /// meaningful here.
    pub default: Vec<String>,
}

fn expand_column_on_regex(cfg: &ExpandColumnOnRegex, mut table: Table) -> Result<Table> {
    let rx = full_match_regex(&cfg.pattern)?;
    let on_match = cell_templates(&cfg.on_match);
    let default = cell_templates(&cfg.default);
    let anything = regex!(r"(?s)\A.*\z");

    for row in table.iter_mut() {
        let Some(cell) = row.get_mut(cfg.column).map(std::mem::take) else {
            continue;
        };

        let cells = if let Some(captures) = rx.captures(&cell) {
            expand(&on_match, &captures)
        } else if let Some(captures) = anything.captures(&cell) {
            expand(&default, &captures)
        } else {
            vec![cell]
        };

        row.splice(cfg.column..cfg.column + 1, cells);
    }

    Ok(table)
}

/// Rewrites `\1` and `\g<1>` group references into `${1}`, escaping any `$`
/// already present.
fn cell_templates(templates: &[String]) -> Vec<String> {
    templates
        .iter()
        .map(|template| {
            let escaped = template.replace('$', "$$");
            regex_replace_all!(
                r"\\(?:g<([0-9]+)>|([0-9]+))",
                &escaped,
                |_, named: &str, bare: &str| {
                    let group = if named.is_empty() { bare } else { named };
                    format!("${{{group}}}")
                }
            )
            .into_owned()
        })
        .collect()
}

fn expand(templates: &[String], captures: &Captures) -> Vec<String> {
    templates
        .iter()
        .map(|template| {
            let mut cell = String::new();
            captures.expand(template, &mut cell);
            cell
        })
        .collect()
}

#[derive(Clone, Deserialize, Debug, Default, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
/// Joins the columns `from..to` of each row into one. Either bound defaults
/// to the respective end of the row.
pub struct JoinColumns {
    #[serde(default)]
    pub from: Option<usize>,
    #[serde(default)]
    pub to: Option<usize>,
    #[serde(default)]
    pub delim: String,
}

fn join_columns(cfg: &JoinColumns, mut table: Table) -> Table {
    for row in table.iter_mut() {
        let Some(range) = column_range(row.len(), cfg.from, cfg.to) else {
            continue;
        };
        let joined = row[range.clone()].join(&cfg.delim);
        row.drain(range.start + 1..range.end);
        row[range.start] = joined;
    }
    table
}

/// Clamps `from..to` to a row of `len` cells, or `None` if nothing is left.
fn column_range(len: usize, from: Option<usize>, to: Option<usize>) -> Option<Range<usize>> {
    let from = min(len, from.unwrap_or(0));
    let to = min(len, to.unwrap_or(len));
    (from < to).then_some(from..to)
}

#[derive(Clone, Deserialize, Debug, Eq, PartialEq)]
#[serde(transparent)]
/// Inserts a literal row at the start of the table.
pub struct PrependRow(pub Vec<String>);

fn prepend_row(cfg: &PrependRow, mut table: Table) -> Table {
    table.insert(0, cfg.0.clone().into());
    table
}

#[derive(Clone, Deserialize, Debug, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
/// Splits a column into several wherever `pattern` matches.
pub struct SplitColumn {
    pub column: usize,
    pub pattern: String,
}

fn split_column(cfg: &SplitColumn, mut table: Table) -> Result<Table> {
    let rx = compile(&cfg.pattern)?;

    for row in table.iter_mut() {
        let Some(cell) = row.get(cfg.column) else {
            continue;
        };
        let cells: Vec<String> = rx.split(cell).map(str::to_string).collect();
        row.splice(cfg.column..cfg.column + 1, cells);
    }

    Ok(table)
}

#[derive(Clone, Deserialize, Debug, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
/// Swaps rows and columns. Short rows are padded with empty cells.
pub struct Transpose {}

fn transpose(table: Table) -> Table {
    let num_cols = table.iter().map(|row| row.len()).max().unwrap_or(0);
    let num_rows = table.len();

    let mut out = Table(
        (0..num_cols)
            .map(|_| Row(vec![String::new(); num_rows]))
            .collect(),
    );
    for (row_index, row) in table.0.into_iter().enumerate() {
        for (col_index, cell) in row.0.into_iter().enumerate() {
            out[col_index][row_index] = cell;
        }
    }
    out
}

#[derive(Clone, Deserialize, Debug, Eq, PartialEq)]
#[serde(transparent)]
/// Flows every cell of the table, in order, into rows of `num_columns` cells.
/// The last row may be short.
pub struct WrapRowEveryN {
    pub num_columns: usize,
}

fn wrap_row_every_n(cfg: &WrapRowEveryN, table: Table) -> Result<Table> {
    let width = cfg.num_columns;
    if width == 0 {
        return Err(RowTransformError::ZeroWrapWidth.into());
    }

    let cells: Vec<String> = table.0.into_iter().flat_map(|row| row.0).collect();
    let mut out = Table(Vec::with_capacity(cells.len().div_ceil(width)));
    let mut cells = cells.into_iter().peekable();
    while cells.peek().is_some() {
        out.push(Row(cells.by_ref().take(width).collect()));
    }
    Ok(out)
}
