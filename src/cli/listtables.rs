use anyhow::Result;
use clap::Args;

use crate::{
    config::{ConfigArgs, book::Group, root::load_config},
    extraction::transform::Registry,
};

/// Lists the tables configured for a book.
#[derive(Args, Debug)]
pub struct Command {
    /// ID of the book to list tables for.
    book_id: String,

    #[command(flatten)]
    config: ConfigArgs,

    /// Also report Tabula templates that are missing, or that no table uses.
    #[arg(long)]
    check_templates: bool,
}

/// Runs the subcommand.
pub fn run(cmd: &Command) -> Result<()> {
    let cfg_reader = cmd.config.new_cfg_reader()?;
    let cfg = load_config(cfg_reader.as_ref())?;
    let book = cfg.book(&cmd.book_id)?;
    let group = book.load_group(cfg_reader.as_ref(), &Registry::builtin())?;

    for line in table_lines(&group) {
        println!("{}", line);
    }

    if cmd.check_templates {
        let audit = group.audit_templates(&book.id, cfg_reader.as_ref())?;
        for path in &audit.missing {
            println!("missing template: {}", path.display());
        }
        for path in &audit.unused {
            println!("unused template: {}", path.display());
        }
    }

    Ok(())
}

/// One line per table, sorted by path.
fn table_lines(group: &Group) -> Vec<String> {
    let mut tables = group.tables();
    tables.sort_by(|a, b| a.file_stem.cmp(&b.file_stem));

    tables
        .into_iter()
        .map(|table| {
            let detail = match &table.extraction {
                None => "(no extraction)",
                Some(extraction) => extraction.transform.as_deref().unwrap_or("-"),
            };
            format!("{}\t{}", table.file_stem.display(), detail)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, io::Write, path::Path};

    use googletest::{
        expect_that,
        matchers::{elements_are, eq},
    };

    use super::*;
    use crate::{
        config::book::load_book,
        filesio::{MemFilesHandle, MemReadWriter, ReadWriter},
    };

    #[googletest::test]
    fn lists_tables_with_transforms() -> Result<()> {
        let read_writer = MemReadWriter::new(MemFilesHandle::default());
        let mut w = read_writer.open_write(Path::new("core/book.yaml"))?;
        w.write_all(
            br#"
groups:
  skills:
    tables:
      skills-list:
        extraction:
          transform: skills
      packages:
        extraction: {}
tables:
  contents: {}
"#,
        )?;
        w.commit()?;

        let group = load_book(&read_writer, "core", &HashSet::new())?;

        expect_that!(
            table_lines(&group),
            elements_are![
                eq("contents\t(no extraction)"),
                eq("skills/packages\t-"),
                eq("skills/skills-list\tskills"),
            ]
        );
        Ok(())
    }
}
