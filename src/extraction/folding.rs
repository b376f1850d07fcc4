//! Folds raw extracted rows into logical rows.
//!
//! Tabula commonly splits a single logical table row over several physical
//! rows. A sequence of [FoldingDirective]s, applied in order, describes how to
//! merge them back together. Rows left over once every directive has been
//! applied pass through unchanged.

use serde::Deserialize;

use super::parseutil::join_non_empty;
use crate::table::{Row, Table};

type RowIter = std::vec::IntoIter<Row>;

#[derive(Clone, Deserialize, Debug, Eq, PartialEq)]
/// Supported row folding operations.
pub enum FoldingDirective {
    AllRows(AllRows),
    StaticRowCounts(StaticRowCounts),
    #[serde(alias = "EmptyColumn")]
    EmptyColumnGroup(EmptyColumnGroup),
}

#[derive(Clone, Deserialize, Debug, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
/// Specifies to merge all remaining rows into one.
pub struct AllRows {}

#[derive(Clone, Deserialize, Debug, Eq, PartialEq)]
#[serde(transparent)]
/// Specifies explicit input row counts for output rows.
pub struct StaticRowCounts {
    pub row_counts: Vec<usize>,
}

#[derive(Clone, Deserialize, Debug, Eq, PartialEq)]
#[serde(transparent)]
/// Specifies to merge rows into the preceding row while a given column is
/// empty. Consumes all remaining rows.
pub struct EmptyColumnGroup {
    pub column_index: usize,
}

/// Folds `table` according to `directives`.
///
/// Folding is total: every input row contributes to exactly one output row,
/// and row order is preserved.
pub fn fold(table: Table, directives: &[FoldingDirective]) -> Table {
    let mut table_out = Table(Vec::with_capacity(table.len()));
    let mut rows: RowIter = table.0.into_iter();

    for directive in directives {
        use FoldingDirective::*;
        match directive {
            AllRows(_) => all_rows(&mut rows, &mut table_out),
            StaticRowCounts(cfg) => static_row_counts(cfg, &mut rows, &mut table_out),
            EmptyColumnGroup(cfg) => empty_column_group(cfg, &mut rows, &mut table_out),
        }
    }

    // Pass through everything else without folding.
    table_out.extend(rows);

    table_out
}

fn all_rows(rows: &mut RowIter, table_out: &mut Table) {
    let group: Vec<Row> = rows.collect();
    if !group.is_empty() {
        table_out.push(join_rows(group));
    }
}

fn static_row_counts(cfg: &StaticRowCounts, rows: &mut RowIter, table_out: &mut Table) {
    for &count in &cfg.row_counts {
        let group: Vec<Row> = rows.by_ref().take(count).collect();
        let exhausted = group.len() < count;
        if !group.is_empty() {
            table_out.push(join_rows(group));
        }
        if exhausted {
            return;
        }
    }
}

fn empty_column_group(cfg: &EmptyColumnGroup, rows: &mut RowIter, table_out: &mut Table) {
    let column = cfg.column_index;
    // A leading continuation is filled from the row emitted just before this
    // directive, so no emitted row is left with a blank designated cell.
    let mut last_seen: Option<String> = table_out
        .last()
        .and_then(|row| row.get(column))
        .filter(|cell| !is_blank(cell))
        .cloned();

    let mut group: Vec<Row> = Vec::new();
    for row in rows {
        // A cell beyond the row's width counts as non-empty.
        let continuation = row.get(column).is_some_and(|cell| is_blank(cell));
        if !continuation && !group.is_empty() {
            let group = std::mem::take(&mut group);
            table_out.push(ditto_row(join_rows(group), column, &mut last_seen));
        }
        group.push(row);
    }

    if !group.is_empty() {
        table_out.push(ditto_row(join_rows(group), column, &mut last_seen));
    }
}

/// Rewrites the cell at `column` from `last_seen` if it is blank, otherwise
/// records it as the new `last_seen`.
fn ditto_row(mut row: Row, column: usize, last_seen: &mut Option<String>) -> Row {
    if let Some(cell) = row.get_mut(column) {
        if is_blank(cell) {
            if let Some(value) = last_seen {
                cell.clone_from(value);
            }
        } else {
            *last_seen = Some(cell.clone());
        }
    }
    row
}

fn is_blank(cell: &str) -> bool {
    cell.trim().is_empty()
}

/// Composes a single row from the group. A lone row is kept verbatim,
/// otherwise each column is the space-joined non-empty cells of that column.
fn join_rows(mut group: Vec<Row>) -> Row {
    if group.len() == 1 {
        return group.pop().unwrap_or_default();
    }

    let row_len = group.iter().map(|row| row.len()).max().unwrap_or(0);

    let mut row_out = Row(Vec::with_capacity(row_len));
    for col in 0..row_len {
        row_out.push(join_non_empty(
            group
                .iter()
                .filter_map(|row| row.get(col))
                .map(String::as_str),
        ));
    }

    row_out
}

#[cfg(test)]
mod tests {
    use googletest::{assert_that, expect_that, matchers::eq};
    use test_casing::test_casing;

    use super::*;

    fn table(rows: &[&[&str]]) -> Table {
        rows.iter().map(|r| r.iter().copied()).into()
    }

    fn parse_directives(yaml: &str) -> Vec<FoldingDirective> {
        serde_yaml_ng::from_str(yaml).expect("should parse directives")
    }

    #[googletest::test]
    fn parses_tagged_directives() {
        let directives = parse_directives(
            r#"
            - !StaticRowCounts [2, 3]
            - !EmptyColumnGroup 1
            - !EmptyColumn 0
            - !AllRows {}
            "#,
        );

        expect_that!(
            directives,
            eq(&vec![
                FoldingDirective::StaticRowCounts(StaticRowCounts {
                    row_counts: vec![2, 3]
                }),
                FoldingDirective::EmptyColumnGroup(EmptyColumnGroup { column_index: 1 }),
                FoldingDirective::EmptyColumnGroup(EmptyColumnGroup { column_index: 0 }),
                FoldingDirective::AllRows(AllRows {}),
            ])
        );
    }

    #[googletest::test]
    fn no_directives_passes_through() {
        let input = table(&[&["a", "b"], &["c"], &[]]);
        expect_that!(fold(input.clone(), &[]), eq(&input));
    }

    #[googletest::test]
    fn static_row_counts_passes_through_remainder() {
        let directives = parse_directives("- !StaticRowCounts [2, 3]");
        let folded = fold(table(&[&["a"], &["b"], &["c"], &["d"], &["e"], &["f"]]), &directives);
        expect_that!(folded, eq(&table(&[&["a b"], &["c d e"], &["f"]])));
    }

    #[googletest::test]
    fn static_row_counts_with_shortfall() {
        let directives = parse_directives("- !StaticRowCounts [2, 1, 2]");
        let folded = fold(table(&[&["first"], &["second"], &["third"], &["fourth"]]), &directives);
        expect_that!(folded, eq(&table(&[&["first second"], &["third"], &["fourth"]])));
    }

    #[googletest::test]
    fn static_row_counts_joins_columnwise() {
        let directives = parse_directives("- !StaticRowCounts [2, 2]");
        let folded = fold(
            table(&[
                &["", "header 2-1"],
                &["header 1", "header 2-2"],
                &["r1c1", "r1c2", "r1c3"],
                &["", "r2c2"],
            ]),
            &directives,
        );
        expect_that!(
            folded,
            eq(&table(&[
                &["header 1", "header 2-1 header 2-2"],
                &["r1c1", "r1c2 r2c2", "r1c3"],
            ]))
        );
    }

    #[googletest::test]
    fn all_rows_merges_remainder() {
        let directives = parse_directives(
            r#"
            - !StaticRowCounts [1]
            - !AllRows {}
            "#,
        );
        let folded = fold(
            table(&[
                &["head"],
                &["r1c1", "r1c2", "r1c3"],
                &["r2c1", "r2c2"],
                &["r3c1", "r3c2", "r3c3"],
            ]),
            &directives,
        );
        expect_that!(
            folded,
            eq(&table(&[&["head"], &["r1c1 r2c1 r3c1", "r1c2 r2c2 r3c2", "r1c3 r3c3"]]))
        );
    }

    #[googletest::test]
    fn all_rows_of_nothing_emits_nothing() {
        let directives = parse_directives("[!StaticRowCounts [2], !AllRows {}]");
        expect_that!(fold(table(&[&["a"], &["b"]]), &directives), eq(&table(&[&["a b"]])));
    }

    #[googletest::test]
    fn empty_column_group_merges_continuations() {
        let directives = parse_directives("- !EmptyColumnGroup 0");
        let folded = fold(table(&[&["X", "1"], &["", "2"], &["Y", "3"]]), &directives);
        expect_that!(folded, eq(&table(&[&["X", "1 2"], &["Y", "3"]])));
    }

    #[googletest::test]
    fn empty_column_group_after_static_header() {
        let directives = parse_directives(
            r#"
            - !StaticRowCounts [2]
            - !EmptyColumnGroup 0
            "#,
        );
        let folded = fold(
            table(&[
                &["", "header 2-1"],
                &["header 1", "header 2-2"],
                &["r1c1", "r1c2"],
                &["", "r2c2"],
                &["r3c1", "r3c2"],
                &["r4c1", ""],
                &["r5c1", "r5c2"],
            ]),
            &directives,
        );
        expect_that!(
            folded,
            eq(&table(&[
                &["header 1", "header 2-1 header 2-2"],
                &["r1c1", "r1c2 r2c2"],
                &["r3c1", "r3c2"],
                &["r4c1", ""],
                &["r5c1", "r5c2"],
            ]))
        );
    }

    #[googletest::test]
    fn empty_column_group_ditto_fills_leading_continuation() {
        let directives = parse_directives(
            r#"
            - !StaticRowCounts [1]
            - !EmptyColumnGroup 0
            "#,
        );
        // The leading continuation takes its value from the row emitted by
        // the preceding directive, even when that is a header.
        let folded = fold(
            table(&[&["Level", "Text"], &["", "orphan 1"], &["", "orphan 2"], &["2", "next"]]),
            &directives,
        );
        expect_that!(
            folded,
            eq(&table(&[&["Level", "Text"], &["Level", "orphan 1 orphan 2"], &["2", "next"]]))
        );
    }

    #[googletest::test]
    fn empty_column_group_blank_cell_matches_empty_cell() {
        let directives = parse_directives(
            r#"
            - !StaticRowCounts [1]
            - !EmptyColumnGroup 0
            "#,
        );
        let with_blank = fold(table(&[&["X", "1"], &[" ", "2"], &["Y", "3"]]), &directives);
        let with_empty = fold(table(&[&["X", "1"], &["", "2"], &["Y", "3"]]), &directives);

        expect_that!(with_blank, eq(&table(&[&["X", "1"], &["X", "2"], &["Y", "3"]])));
        expect_that!(with_blank, eq(&with_empty));
    }

    #[googletest::test]
    fn empty_column_group_blank_earlier_row_is_not_a_ditto_value() {
        let directives = parse_directives(
            r#"
            - !StaticRowCounts [1]
            - !EmptyColumnGroup 0
            "#,
        );
        let folded = fold(table(&[&[" ", "head"], &[" ", "2"], &["Y", "3"]]), &directives);
        expect_that!(folded, eq(&table(&[&[" ", "head"], &[" ", "2"], &["Y", "3"]])));
    }

    #[googletest::test]
    fn empty_column_group_out_of_range_column_is_not_empty() {
        let directives = parse_directives("- !EmptyColumnGroup 2");
        let folded = fold(table(&[&["a", "b", "c"], &["d"], &["e", "f", ""]]), &directives);
        expect_that!(folded, eq(&table(&[&["a", "b", "c"], &["d e", "f", "c"]])));
    }

    #[derive(Debug)]
    struct TotalityCase {
        #[allow(dead_code)]
        name: &'static str,
        directives: &'static str,
    }

    const TOTALITY_CASES: [TotalityCase; 5] = [
        TotalityCase {
            name: "static_exact",
            directives: "- !StaticRowCounts [3, 4]",
        },
        TotalityCase {
            name: "static_overlong",
            directives: "- !StaticRowCounts [5, 5, 5]",
        },
        TotalityCase {
            name: "static_then_empty_column",
            directives: "[!StaticRowCounts [1, 2], !EmptyColumnGroup 0]",
        },
        TotalityCase {
            name: "empty_column_then_static",
            directives: "[!EmptyColumnGroup 1, !StaticRowCounts [2]]",
        },
        TotalityCase {
            name: "static_then_all_rows",
            directives: "[!StaticRowCounts [2], !AllRows {}]",
        },
    ];

    /// Every input token appears exactly once in the output. These inputs
    /// never leave an empty designated cell for ditto filling.
    #[test_casing(5, TOTALITY_CASES)]
    fn folding_is_total(case: TotalityCase) {
        let input = table(&[
            &["1", "a"],
            &["", "b"],
            &["2", "c"],
            &["3", ""],
            &["", "d"],
            &["4", "e"],
            &["5", "f"],
        ]);
        let cells_in: Vec<String> = input.iter().flat_map(|row| row.0.clone()).collect();

        let folded = fold(input, &parse_directives(case.directives));

        let tokens = |cells: Vec<String>| -> Vec<String> {
            cells
                .iter()
                .flat_map(|cell| cell.split(' ').map(str::to_string).collect::<Vec<_>>())
                .filter(|token| !token.is_empty())
                .collect()
        };
        let mut tokens_in = tokens(cells_in);
        let mut tokens_out = tokens(folded.iter().flat_map(|row| row.0.clone()).collect());
        tokens_in.sort();
        tokens_out.sort();

        assert_that!(tokens_out, eq(&tokens_in));
    }
}
