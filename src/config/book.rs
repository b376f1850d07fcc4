use std::{
    collections::{BTreeMap, HashSet},
    ffi::OsString,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

use super::{error::ConfigError, extract::TableExtraction};
use crate::{extraction::transform::Registry, filesio::Reader};

const BOOK_FILENAME: &str = "book.yaml";
const TEMPLATE_SUFFIX: &str = ".tabula-template.json";
const OUTPUT_SUFFIX: &str = ".csv";

/// Loads the top-level group of the book with ID `book_id`.
///
/// * `cfg_reader` reader over the configuration.
/// * `book_tags` tags inherited by every group and table in the book.
pub fn load_book(
    cfg_reader: &dyn Reader,
    book_id: &str,
    book_tags: &HashSet<String>,
) -> Result<Group> {
    let path = Path::new(book_id).join(BOOK_FILENAME);
    let rdr = cfg_reader
        .open_read(&path)
        .with_context(|| format!("opening book configuration {:?}", path))?;
    let yaml_group: YamlGroup = serde_yaml_ng::from_reader(rdr)
        .with_context(|| format!("parsing book configuration {:?}", path))?;

    Ok(yaml_group.prepare(PathBuf::new(), book_tags)?)
}

#[derive(Deserialize, Debug)]
struct YamlTable {
    #[serde(default)]
    tags: HashSet<String>,
    #[serde(default)]
    extraction: Option<TableExtraction>,
}

impl YamlTable {
    /// Creates a `Table` from `self`.
    ///
    /// * `name` name of the table within the parent `YamlGroup.tables`.
    /// * `rel_group_dir` path to the directory of the table's parent
    ///   `YamlGroup`.
    /// * `parent_tags` tags to inherit from parent `YamlGroup`.
    fn prepare(self, name: &str, rel_group_dir: &Path, parent_tags: &HashSet<String>) -> Table {
        let tags = self.tags.union(parent_tags).cloned().collect();
        Table {
            file_stem: rel_group_dir.join(name),
            tags,
            extraction: self.extraction,
        }
    }
}

#[derive(Deserialize, Debug)]
struct YamlGroup {
    #[serde(default)]
    tags: HashSet<String>,
    #[serde(default)]
    groups: BTreeMap<String, YamlGroup>,
    #[serde(default)]
    tables: BTreeMap<String, YamlTable>,
}

impl YamlGroup {
    /// Creates a `Group` from `self`.
    ///
    /// * `rel_dir` Path to this group's directory.
    /// * `parent_tags` tags to inherit from parent `YamlGroup`.
    fn prepare(self, rel_dir: PathBuf, parent_tags: &HashSet<String>) -> Result<Group, ConfigError> {
        let tags: HashSet<String> = self.tags.union(parent_tags).cloned().collect();

        let mut children = BTreeMap::new();
        for (name, yaml_table) in self.tables {
            let table = yaml_table.prepare(&name, &rel_dir, &tags);
            children.insert(name, Node::Table(table));
        }
        for (name, yaml_group) in self.groups {
            if children.contains_key(&name) {
                return Err(ConfigError::DuplicateName {
                    group: rel_dir,
                    name,
                });
            }
            let group = yaml_group.prepare(rel_dir.join(&name), &tags)?;
            children.insert(name, Node::Group(group));
        }

        Ok(Group {
            rel_dir,
            tags,
            children,
        })
    }
}

/// A group of tables and other groups, mirroring a directory.
#[derive(Debug)]
pub struct Group {
    pub rel_dir: PathBuf,
    pub tags: HashSet<String>,
    pub children: BTreeMap<String, Node>,
}

#[derive(Debug)]
pub enum Node {
    Group(Group),
    Table(Table),
}

/// A table in the configuration. Its `file_stem` is unique within the book.
#[derive(Debug)]
pub struct Table {
    pub file_stem: PathBuf,
    pub tags: HashSet<String>,
    /// Metadata-only tables have no extraction.
    pub extraction: Option<TableExtraction>,
}

impl Table {
    /// Path to the Tabula template within the configuration.
    pub fn tabula_template_path(&self, book_id: &str) -> PathBuf {
        with_suffix(&Path::new(book_id).join(&self.file_stem), TEMPLATE_SUFFIX)
    }

    /// Path to the CSV file within the output.
    pub fn output_path(&self) -> PathBuf {
        with_suffix(&self.file_stem, OUTPUT_SUFFIX)
    }
}

impl Group {
    /// Returns all tables in the group and its descendants, depth first and
    /// in name order.
    pub fn tables(&self) -> Vec<&Table> {
        let mut tables = Vec::new();
        self.collect_tables(&mut tables);
        tables
    }

    fn collect_tables<'a>(&'a self, tables: &mut Vec<&'a Table>) {
        for child in self.children.values() {
            match child {
                Node::Group(group) => group.collect_tables(tables),
                Node::Table(table) => tables.push(table),
            }
        }
    }

    /// Checks every table's extraction against `registry`.
    pub fn validate(&self, registry: &Registry) -> Result<(), ConfigError> {
        for table in self.tables() {
            if let Some(extraction) = &table.extraction {
                extraction.validate(&table.file_stem, registry)?;
            }
        }
        Ok(())
    }

    /// Compares the book's Tabula templates in `cfg_reader` against the
    /// tables that use them.
    pub fn audit_templates(&self, book_id: &str, cfg_reader: &dyn Reader) -> Result<TemplateAudit> {
        let book_dir = Path::new(book_id);
        let mut present = HashSet::new();
        for path_result in cfg_reader.iter_files() {
            let path = path_result.context("listing configuration files")?;
            let is_template = path
                .to_str()
                .is_some_and(|s| s.ends_with(TEMPLATE_SUFFIX));
            if is_template && path.starts_with(book_dir) {
                present.insert(path);
            }
        }

        let mut missing = Vec::new();
        for table in self.tables() {
            if table.extraction.is_none() {
                continue;
            }
            let template_path = table.tabula_template_path(book_id);
            if !present.remove(&template_path) {
                missing.push(template_path);
            }
        }

        let mut unused: Vec<PathBuf> = present.into_iter().collect();
        unused.sort();
        Ok(TemplateAudit { missing, unused })
    }
}

/// Result of [Group::audit_templates].
#[derive(Debug, Default, Eq, PartialEq)]
pub struct TemplateAudit {
    /// Templates required by tables with extraction, but not present.
    pub missing: Vec<PathBuf>,
    /// Templates present, but not used by any table with extraction.
    pub unused: Vec<PathBuf>,
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}
