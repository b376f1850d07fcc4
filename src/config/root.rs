use std::{
    collections::{BTreeMap, HashSet},
    path::Path,
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{extraction::transform::Registry, filesio::Reader};

use super::{
    book::{Group, load_book},
    error::ConfigError,
};

const CONFIG_FILENAME: &str = "config.yaml";

/// Loads the configuration from `cfg_reader`.
pub fn load_config(cfg_reader: &dyn Reader) -> Result<Config> {
    let rdr = cfg_reader
        .open_read(Path::new(CONFIG_FILENAME))
        .with_context(|| "opening configuration file")?;
    let config: YamlConfig =
        serde_yaml_ng::from_reader(rdr).with_context(|| "parsing configuration file")?;

    Ok(config.prepare())
}

/// Top level configuration, read and prepared from a `config.yaml`.
#[derive(Debug)]
pub struct Config {
    pub books: BTreeMap<String, Book>,
}

impl Config {
    /// Returns the book with the given ID.
    pub fn book(&self, book_id: &str) -> Result<&Book, ConfigError> {
        self.books
            .get(book_id)
            .ok_or_else(|| ConfigError::UnknownBook(book_id.to_string()))
    }
}

/// Top level information about a book.
#[derive(Debug)]
pub struct Book {
    pub id: String,
    pub name: String,
    pub default_filename: String,
    pub tags: HashSet<String>,
    /// Added to page numbers reported by the PDF engine.
    pub page_offset: i32,
}

impl Book {
    /// Loads and returns the validated top-level group in the `Book`.
    pub fn load_group(&self, cfg_reader: &dyn Reader, registry: &Registry) -> Result<Group> {
        let group = load_book(cfg_reader, &self.id, &self.tags)?;
        group
            .validate(registry)
            .with_context(|| format!("validating book {:?}", self.id))?;
        Ok(group)
    }
}

/// Top level configuration, read from a `config.yaml`.
#[derive(Deserialize, Debug)]
struct YamlConfig {
    books: BTreeMap<String, YamlBook>,
}

impl YamlConfig {
    /// Creates a `Config` from self.
    fn prepare(self) -> Config {
        Config {
            books: self
                .books
                .into_iter()
                .map(|(id, book)| (id.clone(), book.prepare(id)))
                .collect(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct YamlBook {
    name: String,
    default_filename: String,
    #[serde(default)]
    tags: HashSet<String>,
    #[serde(default)]
    page_offset: i32,
}

impl YamlBook {
    /// Creates a `Book` from self. `id` is the ID of the book within the parent
    /// `YamlConfig`.
    fn prepare(self, id: String) -> Book {
        let mut tags = self.tags;
        tags.insert(format!("book/{}", id));
        Book {
            id,
            name: self.name,
            default_filename: self.default_filename,
            tags,
            page_offset: self.page_offset,
        }
    }
}
