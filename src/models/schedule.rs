// src/models/schedule.rs

//! Department, Class, Section, and MeetingTime data structures.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A department listed on the schedule index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Department {
    /// Upper-cased abbreviation, unique within a pass (e.g. "CSE")
    pub abbreviation: String,

    /// Display name without the parenthesized abbreviation
    pub name: String,

    /// Absolute URL of the department's class listing
    pub link: String,
}

impl Department {
    pub fn key(&self) -> &str {
        &self.abbreviation
    }
}

/// A class heading on a department page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Class {
    /// Abbreviation of the owning department
    pub department: String,

    /// Lower-cased class abbreviation (e.g. "cse")
    pub abbreviation: String,

    /// Numeric course code (e.g. "142")
    pub code: String,

    /// Display title
    pub title: String,

    /// Byte offset where the class chunk starts
    pub start: usize,

    /// Byte offset of the next class chunk, or the document length for the last class
    pub end: usize,
}

impl Class {
    /// Natural key: abbreviation followed by code.
    pub fn key(&self) -> String {
        format!("{}{}", self.abbreviation, self.code)
    }
}

/// A section row beneath a class heading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Section {
    /// Key of the owning class (abbreviation + code)
    pub class_key: String,
    pub restriction: String,
    /// Schedule line number, the section's natural key
    pub sln: String,
    /// Section letter(s), e.g. "A" or "AB"
    pub section: String,
    pub credit: String,
    /// JSON array of [`MeetingTime`]
    pub meeting_times: String,
    pub instructor: String,
    pub status: String,
    pub taken_seats: i64,
    pub total_seats: i64,
    pub grades: String,
    pub fee: String,
    pub other: String,
    /// Free-text lines that follow the section row, each newline-terminated
    pub notes: String,
}

impl Section {
    /// Decode the stored meeting times.
    pub fn meeting_times(&self) -> Result<Vec<MeetingTime>> {
        Ok(serde_json::from_str(&self.meeting_times)?)
    }

    /// True while at least one seat remains.
    pub fn is_open(&self) -> bool {
        self.total_seats - self.taken_seats >= 1
    }

    /// Quiz sections carry "QZ" in the credit column.
    pub fn is_quiz_section(&self) -> bool {
        self.credit == "QZ"
    }
}

/// When and where a section meets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MeetingTime {
    pub days: String,
    pub time: String,
    pub building: String,
    pub room: String,
}
