//! Compiled extraction patterns.

use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::PatternConfig;

/// Every regular expression the extraction passes use, compiled once.
#[derive(Debug, Clone)]
pub struct Patterns {
    pub department_chunk: Regex,
    pub department_abbreviation: Regex,
    pub department_link: Regex,
    pub tag: Regex,
    pub class_chunk: Regex,
    pub class_name: Regex,
    pub class_abbreviation: Regex,
    pub class_code: Regex,
    pub class_title: Regex,
    pub section_chunk: Regex,
    pub sln: Regex,
    pub seats: Regex,
    pub meeting_time: Regex,
    pub blank_line: Regex,
}

impl Patterns {
    /// Compile the configured patterns.
    pub fn compile(config: &PatternConfig) -> Result<Self> {
        Ok(Self {
            department_chunk: compile(&config.department_chunk)?,
            department_abbreviation: compile(&config.department_abbreviation)?,
            department_link: compile(&config.department_link)?,
            tag: compile(&config.tag)?,
            class_chunk: compile(&config.class_chunk)?,
            class_name: compile(&config.class_name)?,
            class_abbreviation: compile(&config.class_abbreviation)?,
            class_code: compile(&config.class_code)?,
            class_title: compile(&config.class_title)?,
            section_chunk: compile(&config.section_chunk)?,
            sln: compile(&config.sln)?,
            seats: compile(&config.seats)?,
            meeting_time: compile(&config.meeting_time)?,
            blank_line: compile(&config.blank_line)?,
        })
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| AppError::pattern(pattern, e))
}
