//! Utilities used in tests across the crate.

use std::{
    collections::{HashMap, HashSet},
    fmt::{Debug, Display},
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::{Result, anyhow};
use googletest::{
    description::Description,
    matcher::{Matcher, MatcherBase, MatcherResult},
};

use crate::{
    extraction::pdf::{ExtractedTables, TableReader},
    table::Table,
};

/// Creates a matcher against an `anyhow::Error` that downcasts to the given
/// type and matches the inner matcher against a reference to it.
pub fn anyhow_downcasts_to<E, M>(inner: M) -> AnyhowDowncastTo<E, M> {
    AnyhowDowncastTo::<E, M> {
        inner,
        phantom_e: Default::default(),
    }
}

pub struct AnyhowDowncastTo<E, M> {
    inner: M,
    phantom_e: PhantomData<E>,
}

impl<E, M> AnyhowDowncastTo<E, M> {
    fn type_name() -> &'static str {
        std::any::type_name::<E>()
    }
}

impl<E, M> MatcherBase for AnyhowDowncastTo<E, M> {}

impl<'e, E, M> Matcher<&'e anyhow::Error> for AnyhowDowncastTo<E, M>
where
    E: Display + Debug + Send + Sync + 'static,
    M: Matcher<&'e E>,
{
    fn matches(&self, actual: &'e anyhow::Error) -> MatcherResult {
        actual
            .downcast_ref::<E>()
            .map(|v| self.inner.matches(v))
            .unwrap_or(MatcherResult::NoMatch)
    }

    fn explain_match(&self, actual: &'e anyhow::Error) -> Description {
        match actual.downcast_ref::<E>() {
            Some(e) => Description::new()
                .text(format!(
                    "which is of the expected concrete error type {}",
                    Self::type_name()
                ))
                .text("with value")
                .nested(self.inner.explain_match(e)),
            None => Description::new().text(format!(
                "which is not the expected concrete error type {}",
                Self::type_name()
            )),
        }
    }

    fn describe(&self, matcher_result: MatcherResult) -> Description {
        match matcher_result {
            MatcherResult::Match => format!(
                "is of concrete error type {} with value which {}",
                Self::type_name(),
                self.inner.describe(MatcherResult::Match)
            )
            .into(),
            MatcherResult::NoMatch => format!(
                "is or is not a concrete error type {} with value which {}",
                Self::type_name(),
                self.inner.describe(MatcherResult::NoMatch)
            )
            .into(),
        }
    }
}

/// Recorded call to [FakeTableReader::read_pdf_with_template].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FakeCall {
    pub pdf_path: PathBuf,
    pub template_json: String,
}

/// [TableReader] that returns canned tables, keyed by the template contents.
/// Clones share the call log.
#[derive(Clone, Default)]
pub struct FakeTableReader {
    results: HashMap<String, FakeResult>,
    calls: Arc<Mutex<Vec<FakeCall>>>,
}

#[derive(Clone, Default)]
struct FakeResult {
    source_pages: HashSet<i32>,
    tables: Vec<Table>,
}

impl FakeTableReader {
    /// Adds a table returned for `template_json`. Repeated calls for the same
    /// template add further tables, returned in order.
    pub fn with_table<P, T>(mut self, template_json: &str, pages: P, table: T) -> Self
    where
        P: IntoIterator<Item = i32>,
        T: Into<Table>,
    {
        let result = self.results.entry(template_json.to_string()).or_default();
        result.source_pages.extend(pages);
        result.tables.push(table.into());
        self
    }

    pub fn calls_snapshot(&self) -> Vec<FakeCall> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl TableReader for FakeTableReader {
    fn read_pdf_with_template(
        &self,
        pdf_path: &Path,
        template_json: &str,
    ) -> Result<ExtractedTables> {
        self.calls
            .lock()
            .map_err(|_| anyhow!("fake call log poisoned"))?
            .push(FakeCall {
                pdf_path: pdf_path.to_owned(),
                template_json: template_json.to_string(),
            });

        let result = self
            .results
            .get(template_json)
            .ok_or_else(|| anyhow!("no fake tables for template {:?}", template_json))?;

        Ok(ExtractedTables {
            source_pages: result.source_pages.clone(),
            tables: result.tables.clone(),
        })
    }
}
