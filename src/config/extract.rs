use std::path::Path;

use serde::Deserialize;

use super::error::ConfigError;
use crate::extraction::{folding::FoldingDirective, rowtransform::RowTransform, transform::Registry};

#[derive(Deserialize, Debug, Default, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
/// Configures the specifics of extracting the CSV from the PDF.
pub struct TableExtraction {
    /// Literal header row, prepended after folding.
    #[serde(default)]
    pub add_header_row: Option<Vec<String>>,
    #[serde(default)]
    pub fold_rows: Vec<FoldingDirective>,
    /// Row operations, applied in order after folding and the header row.
    #[serde(default)]
    pub transforms: Vec<RowTransform>,
    /// Name of a registered transform unit.
    #[serde(default)]
    pub transform: Option<String>,
}

impl TableExtraction {
    /// Checks references and values that cannot be checked while parsing.
    pub fn validate(&self, table: &Path, registry: &Registry) -> Result<(), ConfigError> {
        if let Some(transform) = &self.transform {
            if !registry.contains(transform) {
                return Err(ConfigError::UnknownTransform {
                    table: table.to_owned(),
                    transform: transform.clone(),
                });
            }
        }

        for directive in &self.fold_rows {
            if let FoldingDirective::StaticRowCounts(counts) = directive {
                if counts.row_counts.contains(&0) {
                    return Err(ConfigError::ZeroRowCount {
                        table: table.to_owned(),
                    });
                }
            }
        }

        for transform in &self.transforms {
            transform
                .validate()
                .map_err(|source| ConfigError::InvalidRowTransform {
                    table: table.to_owned(),
                    source,
                })?;
        }

        Ok(())
    }
}
