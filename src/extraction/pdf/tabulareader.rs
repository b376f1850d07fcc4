use std::{collections::HashSet, path::Path};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use super::{ExtractedTables, TableReader};
use crate::table::{Row, Table};

/// Tabula template, as saved by the Tabula UI. Each entry is one portion of
/// a table.
#[derive(Deserialize, Debug)]
#[serde(transparent)]
pub struct Template(pub Vec<TemplateEntry>);

#[allow(dead_code)]
#[derive(Deserialize, Debug)]
pub struct TemplateEntry {
    pub page: i32,
    pub extraction_method: String,
    pub x1: f32,
    pub x2: f32,
    pub y1: f32,
    pub y2: f32,
    pub width: f32,
    pub height: f32,
}

impl TemplateEntry {
    fn tabula_method(&self) -> Result<tabula::ExtractionMethod> {
        Ok(match self.extraction_method.as_str() {
            "stream" => tabula::ExtractionMethod::Basic,
            "guess" => tabula::ExtractionMethod::Decide,
            "lattice" => tabula::ExtractionMethod::Spreadsheet,
            other => bail!("unknown extraction_method: {:?}", other),
        })
    }
}

#[derive(Deserialize, Debug)]
#[serde(transparent)]
pub struct JsonTableSet(pub Vec<JsonTable>);

#[allow(dead_code)]
#[derive(Deserialize, Debug)]
pub struct JsonTable {
    pub extraction_method: String,
    pub page_number: i32,
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
    pub right: f32,
    pub bottom: f32,
    pub data: Vec<JsonRow>,
}

#[derive(Deserialize, Debug)]
pub struct JsonRow(pub Vec<JsonCell>);

#[allow(dead_code)]
#[derive(Deserialize, Debug)]
pub struct JsonCell {
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
    pub text: String,
}

impl From<JsonTable> for Table {
    fn from(value: JsonTable) -> Self {
        Table(value.data.into_iter().map(Into::into).collect())
    }
}

impl From<JsonRow> for Row {
    fn from(value: JsonRow) -> Self {
        Row(value.0.into_iter().map(|cell| cell.text).collect())
    }
}

/// Client wrapper around Tabula.
///
/// Tabula is not reentrant, so a `TabulaClient` stays on the thread that
/// created it. Share it between threads with
/// [super::serialised::SerialisedTableReader].
pub struct TabulaClient {
    vm: tabula::TabulaVM,
}

impl TabulaClient {
    pub fn new(libpath: &str) -> Result<Self> {
        let vm = tabula::TabulaVM::new(libpath, false)
            .with_context(|| format!("starting TabulaVM with {:?}", libpath))?;
        Ok(TabulaClient { vm })
    }
}

impl TableReader for TabulaClient {
    fn read_pdf_with_template(
        &self,
        pdf_path: &Path,
        template_json: &str,
    ) -> Result<ExtractedTables> {
        let template: Template =
            serde_json::from_str(template_json).with_context(|| "parsing Tabula template")?;
        let env = self.vm.attach().with_context(|| "attaching to TabulaVM")?;

        let mut source_pages: HashSet<i32> = HashSet::new();
        let mut tables: Vec<Table> = Vec::with_capacity(template.0.len());

        for entry in &template.0 {
            let pages = [entry.page];
            let page_areas = [(
                tabula::ABSOLUTE_AREA_CALCULATION_MODE,
                tabula::Rectangle::from_coords(entry.x1, entry.y1, entry.x2, entry.y2),
            )];

            let tabula = env
                .configure_tabula(
                    Some(&page_areas),
                    Some(&pages),
                    tabula::OutputFormat::Json,
                    false,
                    entry.tabula_method()?,
                    false,
                    None,
                )
                .with_context(|| "configuring Tabula to extract table")?;

            let extracted_file = tempfile::NamedTempFile::new()
                .context("creating temporary file for extracting PDF table data")?;
            tabula
                .parse_document_into(pdf_path, extracted_file.path())
                .with_context(|| format!("extracting table from page {}", entry.page))?;
            let result: JsonTableSet = serde_json::from_reader(extracted_file)
                .with_context(|| "parsing JSON output from Tabula")?;

            source_pages.insert(entry.page);
            tables.extend(result.0.into_iter().map(Table::from));
        }

        Ok(ExtractedTables {
            source_pages,
            tables,
        })
    }
}
