//! Fixed layout table whose first data row label spans two physical rows.

use super::{TableTransform, TransformError};
use crate::{
    extraction::parseutil::join_non_empty,
    table::{Row, Table},
};

pub const NAME: &str = "merged-label-ditto";

/// Rows whose labels were split by extraction. Row 0 is the header.
const LABEL_ROW: usize = 1;
const LABEL_CONTINUATION_ROW: usize = 2;

/// Merges the split label, then fills empty labels from the one above.
pub struct MergedLabelDitto;

impl TableTransform for MergedLabelDitto {
    type Record = Row;

    fn parse(&self, table: Table) -> Result<Vec<Row>, TransformError> {
        let mut rows = table.0;
        if rows.len() <= LABEL_CONTINUATION_ROW {
            return Err(TransformError::MissingRow {
                index: LABEL_CONTINUATION_ROW,
            });
        }

        let continuation = first_cell_mut(&mut rows[LABEL_CONTINUATION_ROW]).map(std::mem::take);
        if let Some(label) = first_cell_mut(&mut rows[LABEL_ROW]) {
            *label = join_non_empty([label.as_str(), continuation.as_deref().unwrap_or_default()]);
        }

        let mut last_label: Option<String> = None;
        for row in rows.iter_mut().skip(LABEL_ROW) {
            let Some(label) = first_cell_mut(row) else {
                continue;
            };
            if label.is_empty() {
                if let Some(last_label) = &last_label {
                    label.clone_from(last_label);
                }
            } else {
                last_label = Some(label.clone());
            }
        }

        Ok(rows)
    }

    fn to_csv(&self, records: Vec<Row>) -> Table {
        Table(records)
    }
}

fn first_cell_mut(row: &mut Row) -> Option<&mut String> {
    row.first_mut()
}
