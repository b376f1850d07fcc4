//! Skill package parser.
//!
//! Each package is a heading line ending in " Package", description lines, a
//! "Skills" header line, then a comma separated list of skills with levels,
//! e.g. "Pilot 1, Vacc Suit 0, Gun Combat (any) 1".

use lazy_regex::regex;
use regex::Regex;

use super::{TableTransform, TransformError, numbered_lines, padded_row};
use crate::table::Table;

pub const NAME: &str = "skill-packages";

const HEADING_SUFFIX: &str = " Package";
const HEADER: [&str; 4] = ["Package", "Description", "Skill", "Level"];

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SkillPackage {
    pub name: String,
    pub description: String,
    pub skills: Vec<SkillLevel>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SkillLevel {
    pub name: String,
    pub level: u32,
}

pub struct SkillPackages;

impl TableTransform for SkillPackages {
    type Record = SkillPackage;

    fn parse(&self, table: Table) -> Result<Vec<SkillPackage>, TransformError> {
        let mut parser = Parser::default();
        for (line_number, line) in numbered_lines(&table) {
            parser = parser.step(line_number, &line)?;
        }
        parser.finish()
    }

    fn to_csv(&self, records: Vec<SkillPackage>) -> Table {
        let width = HEADER.len();
        let mut table = Table(vec![HEADER.into()]);
        for package in records {
            table.push(padded_row(
                [package.name.as_str(), package.description.as_str()],
                width,
            ));
            for skill in package.skills {
                let level = skill.level.to_string();
                table.push(padded_row(
                    ["", "", skill.name.as_str(), level.as_str()],
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
    Heading,
    Description,
    SkillsList,
}

#[derive(Debug)]
struct PendingPackage {
    name: String,
    description: String,
    /// Line number of the first skills list line.
    skills_line_number: usize,
    skills_text: String,
}

impl PendingPackage {
    fn into_package(self) -> Result<SkillPackage, TransformError> {
        let skills = parse_skill_levels(&self.skills_text, self.skills_line_number)?;
        Ok(SkillPackage {
            name: self.name,
            description: self.description,
            skills,
        })
    }
}

#[derive(Debug, Default)]
struct Parser {
    state: State,
    packages: Vec<SkillPackage>,
    package: Option<PendingPackage>,
}

impl Parser {
    fn step(mut self, line_number: usize, line: &str) -> Result<Self, TransformError> {
        use State::*;

        if line.ends_with(HEADING_SUFFIX) {
            self.flush_package()?;
            self.package = Some(PendingPackage {
                name: line.to_string(),
                description: String::new(),
                skills_line_number: 0,
                skills_text: String::new(),
            });
            self.state = Heading;
            return Ok(self);
        }

        let Some(package) = &mut self.package else {
            // Still looking for the first heading.
            return Ok(self);
        };

        self.state = match self.state {
            FindHeading => FindHeading,
            Heading | Description => match skills_header_remainder(line) {
                Some(rest) => {
                    if !rest.is_empty() {
                        package.skills_line_number = line_number;
                        append_text(&mut package.skills_text, rest);
                    }
                    SkillsList
                }
                None => {
                    append_text(&mut package.description, line);
                    Description
                }
            },
            SkillsList => {
                if package.skills_text.is_empty() {
                    package.skills_line_number = line_number;
                }
                append_text(&mut package.skills_text, line);
                SkillsList
            }
        };

        Ok(self)
    }

    fn finish(mut self) -> Result<Vec<SkillPackage>, TransformError> {
        self.flush_package()?;
        Ok(self.packages)
    }

    fn flush_package(&mut self) -> Result<(), TransformError> {
        if let Some(pending) = self.package.take() {
            self.packages.push(pending.into_package()?);
        }
        Ok(())
    }
}

/// Returns the text following a skills header, if `line` is one.
fn skills_header_remainder(line: &str) -> Option<&str> {
    if line == "Skills" {
        return Some("");
    }
    line.strip_prefix("Skills:").map(str::trim)
}

/// Scans `text` for all `name level` pairs.
fn parse_skill_levels(text: &str, line_number: usize) -> Result<Vec<SkillLevel>, TransformError> {
    let mut skills = Vec::new();
    let rx = skill_level_rx();
    for caps in rx.captures_iter(text) {
        let name = caps[1].trim().to_string();
        let level = caps[2]
            .parse()
            .map_err(|_| TransformError::InvalidLevel {
                skill: name.clone(),
                text: caps[2].to_string(),
            })?;
        skills.push(SkillLevel { name, level });
    }

    if skills.is_empty() && !text.is_empty() {
        return Err(TransformError::PatternMismatch {
            line_number,
            line: text.to_string(),
            pattern: rx.as_str(),
        });
    }

    Ok(skills)
}

fn skill_level_rx() -> &'static Regex {
    regex!(r"([A-Za-z][A-Za-z ()'-]*?)\s*(\d+)")
}

fn append_text(text: &mut String, line: &str) {
    if !text.is_empty() {
        text.push(' ');
    }
    text.push_str(line);
}

#[cfg(test)]
mod tests {
    use googletest::{
        assert_that, expect_that,
        matchers::{eq, err, ok},
    };

    use super::*;

    fn lines_table(lines: &[&str]) -> Table {
        lines.iter().map(|line| [*line]).into()
    }

    fn skill_level(name: &str, level: u32) -> SkillLevel {
        SkillLevel {
            name: name.to_string(),
            level,
        }
    }

    #[googletest::test]
    fn parses_pilot_gunner_package() {
        let table = lines_table(&[
            "Starship Crew Package",
            "For characters who serve aboard ships.",
            "Skills",
            "Pilot4, Gunner2",
        ]);

        let packages = SkillPackages.parse(table);

        assert_that!(
            packages,
            ok(eq(&vec![SkillPackage {
                name: "Starship Crew Package".to_string(),
                description: "For characters who serve aboard ships.".to_string(),
                skills: vec![skill_level("Pilot", 4), skill_level("Gunner", 2)],
            }]))
        );
    }

    #[googletest::test]
    fn parses_multiple_packages_with_wrapped_skills() {
        let table = lines_table(&[
            "Mercenary Package",
            "Hired guns.",
            "",
            "Skills:",
            "Gun Combat (any) 1, Vacc",
            "Suit 0, Jack-of-All-Trades 1",
            "Explorer Package",
            "Skills: Recon 1, Survival 2",
        ]);

        let packages = SkillPackages.parse(table);

        assert_that!(
            packages,
            ok(eq(&vec![
                SkillPackage {
                    name: "Mercenary Package".to_string(),
                    description: "Hired guns.".to_string(),
                    skills: vec![
                        skill_level("Gun Combat (any)", 1),
                        skill_level("Vacc Suit", 0),
                        skill_level("Jack-of-All-Trades", 1),
                    ],
                },
                SkillPackage {
                    name: "Explorer Package".to_string(),
                    description: String::new(),
                    skills: vec![skill_level("Recon", 1), skill_level("Survival", 2)],
                },
            ]))
        );
    }

    #[googletest::test]
    fn skills_without_levels_is_mismatch() {
        let table = lines_table(&["Envoy Package", "Skills", "Diplomat, Persuade"]);

        expect_that!(
            SkillPackages.parse(table),
            err(eq(&TransformError::PatternMismatch {
                line_number: 3,
                line: "Diplomat, Persuade".to_string(),
                pattern: skill_level_rx().as_str(),
            }))
        );
    }

    #[googletest::test]
    fn oversized_level_is_invalid() {
        expect_that!(
            parse_skill_levels("Pilot 99999999999", 1),
            err(eq(&TransformError::InvalidLevel {
                skill: "Pilot".to_string(),
                text: "99999999999".to_string(),
            }))
        );
    }

    #[googletest::test]
    fn to_csv_nests_skills() {
        let packages = vec![SkillPackage {
            name: "Starship Crew Package".to_string(),
            description: "Ship work.".to_string(),
            skills: vec![skill_level("Pilot", 4), skill_level("Gunner", 2)],
        }];

        let expected: Table = vec![
            vec!["Package", "Description", "Skill", "Level"],
            vec!["Starship Crew Package", "Ship work.", "", ""],
            vec!["", "", "Pilot", "4"],
            vec!["", "", "Gunner", "2"],
        ]
        .into();
        expect_that!(SkillPackages.to_csv(packages), eq(&expected));
    }
}
