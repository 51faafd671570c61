//! Extraction engine.
//!
//! Three passes mirror the schedule hierarchy:
//! - Department index (`DepartmentExtractor`)
//! - Class headings on a department page (`ClassExtractor`)
//! - Section rows beneath those headings (`SectionExtractor`)
//!
//! Every pass is a pure function of its input text. Malformed chunks are
//! skipped and reported through [`Extracted::errors`].

mod classes;
mod departments;
mod patterns;
mod sections;

pub use classes::ClassExtractor;
pub use departments::DepartmentExtractor;
pub use patterns::Patterns;
pub use sections::{ClassCursor, SectionExtractor};

use url::Url;

use crate::error::{AppError, ExtractErrors, Result};
use crate::models::{Class, Config, Department, ScheduleConfig, Section};

/// Records recovered from a document plus the chunks that failed.
#[derive(Debug)]
pub struct Extracted<T> {
    pub records: Vec<T>,
    pub errors: ExtractErrors,
}

impl<T> Default for Extracted<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            errors: ExtractErrors::new(),
        }
    }
}

/// Owns the compiled patterns and exposes the three passes.
#[derive(Debug, Clone)]
pub struct ScheduleExtractor {
    patterns: Patterns,
}

impl ScheduleExtractor {
    pub fn new(patterns: Patterns) -> Self {
        Self { patterns }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(Patterns::compile(&config.patterns)?))
    }

    /// Departments on the index page; links resolve against `root`.
    pub fn departments(&self, document: &str, root: &Url) -> Extracted<Department> {
        DepartmentExtractor::new(&self.patterns, root).extract(document)
    }

    pub fn classes(&self, document: &str, department: &str) -> Extracted<Class> {
        ClassExtractor::new(&self.patterns).extract(document, department)
    }

    pub fn sections(&self, document: &str, classes: &[Class]) -> Extracted<Section> {
        SectionExtractor::new(&self.patterns).extract(document, classes)
    }
}

/// Parse a schedule's index URL.
pub fn root_url(schedule: &ScheduleConfig) -> Result<Url> {
    Url::parse(&schedule.root_url).map_err(|e| {
        AppError::config(format!(
            "schedule '{}' has invalid root_url '{}': {e}",
            schedule.name, schedule.root_url
        ))
    })
}
