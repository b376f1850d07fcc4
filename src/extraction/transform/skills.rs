//! Skill list parser.
//!
//! Input is a run of skill entries, each a heading line, description lines,
//! and optionally a "Specialities" section of bulleted `name: description`
//! lines interleaved with examples.

use lazy_regex::{regex, regex_is_match};
use regex::Regex;

use super::{TableTransform, TransformError, numbered_lines, padded_row};
use crate::table::Table;

pub const NAME: &str = "skills";

const SPECIALITIES_MARKER: &str = "Specialities";
const BULLET: &str = "• ";
const HEADER: [&str; 4] = ["Skill", "Description", "Speciality", "Speciality Description"];

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Skill {
    pub name: String,
    pub description: String,
    pub specialities: Vec<Speciality>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Speciality {
    pub name: String,
    pub description: String,
}

pub struct Skills;

impl TableTransform for Skills {
    type Record = Skill;

    fn parse(&self, table: Table) -> Result<Vec<Skill>, TransformError> {
        let mut parser = Parser::default();
        for (line_number, line) in numbered_lines(&table) {
            parser = parser.step(line_number, &line)?;
        }
        parser.finish()
    }

    fn to_csv(&self, records: Vec<Skill>) -> Table {
        let width = HEADER.len();
        let mut table = Table(vec![HEADER.into()]);
        for skill in records {
            table.push(padded_row([skill.name.as_str(), skill.description.as_str()], width));
            for speciality in skill.specialities {
                table.push(padded_row(
                    ["", "", speciality.name.as_str(), speciality.description.as_str()],
                    width,
                ));
            }
        }
        table
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum State {
    #[default]
    FindHeading,
    Description,
    FindSpeciality,
    Speciality,
    Example,
}

#[derive(Debug, Default)]
struct PendingSpeciality {
    line_number: usize,
    text: String,
}

impl PendingSpeciality {
    fn start(line_number: usize, line: &str) -> Self {
        Self {
            line_number,
            text: line.to_string(),
        }
    }

    fn into_speciality(self) -> Result<Speciality, TransformError> {
        let rx = speciality_rx();
        let caps = rx
            .captures(&self.text)
            .ok_or_else(|| TransformError::PatternMismatch {
                line_number: self.line_number,
                line: self.text.clone(),
                pattern: rx.as_str(),
            })?;
        Ok(Speciality {
            name: caps[1].trim().to_string(),
            description: caps[2].trim().to_string(),
        })
    }
}

fn speciality_rx() -> &'static Regex {
    regex!(r"^• ([^:]+): (.+)$")
}

/// Parser state and accumulators.
#[derive(Debug, Default)]
struct Parser {
    state: State,
    skills: Vec<Skill>,
    skill: Option<Skill>,
    speciality: Option<PendingSpeciality>,
}

impl Parser {
    /// Consumes a single non-blank line.
    fn step(mut self, line_number: usize, line: &str) -> Result<Self, TransformError> {
        use State::*;

        if is_heading(line) {
            self.flush_skill()?;
            self.skill = Some(Skill {
                name: line.to_string(),
                description: String::new(),
                specialities: Vec::new(),
            });
            self.state = Description;
            return Ok(self);
        }

        let state = self.state;
        self.state = match state {
            FindHeading => FindHeading,
            Description if line == SPECIALITIES_MARKER => FindSpeciality,
            Description if line.starts_with(BULLET) && line.contains(':') => FindHeading,
            Description => {
                if let Some(skill) = &mut self.skill {
                    append_text(&mut skill.description, line);
                }
                Description
            }
            FindSpeciality | Example if line.starts_with(BULLET) => {
                self.speciality = Some(PendingSpeciality::start(line_number, line));
                Speciality
            }
            FindSpeciality => FindSpeciality,
            Example => Example,
            Speciality if line.starts_with(BULLET) => {
                self.flush_speciality()?;
                self.speciality = Some(PendingSpeciality::start(line_number, line));
                Speciality
            }
            Speciality if line.contains(':') => {
                self.flush_speciality()?;
                Example
            }
            Speciality => {
                if let Some(speciality) = &mut self.speciality {
                    append_text(&mut speciality.text, line);
                }
                Speciality
            }
        };

        Ok(self)
    }

    /// Flushes anything pending at the end of input.
    fn finish(mut self) -> Result<Vec<Skill>, TransformError> {
        self.flush_skill()?;
        Ok(self.skills)
    }

    fn flush_speciality(&mut self) -> Result<(), TransformError> {
        if let Some(pending) = self.speciality.take() {
            let speciality = pending.into_speciality()?;
            if let Some(skill) = &mut self.skill {
                skill.specialities.push(speciality);
            }
        }
        Ok(())
    }

    fn flush_skill(&mut self) -> Result<(), TransformError> {
        self.flush_speciality()?;
        if let Some(skill) = self.skill.take() {
            self.skills.push(skill);
        }
        Ok(())
    }
}

fn is_heading(line: &str) -> bool {
    line != SPECIALITIES_MARKER && regex_is_match!(r"^[A-Z][A-Za-z'-]*( [A-Z][A-Za-z'-]*)?$", line)
}

fn append_text(text: &mut String, line: &str) {
    if !text.is_empty() {
        text.push(' ');
    }
    text.push_str(line);
}
