// src/services/sections.rs

//! Section extraction and section-to-class association.

use crate::error::ExtractError;
use crate::models::{Class, MeetingTime, Section};
use crate::services::{Extracted, Patterns};
use crate::utils::text::{self, column};

// Fixed column layout of a section row.
const RESTRICTION: (usize, Option<usize>) = (0, Some(7));
const SLN: (usize, Option<usize>) = (7, Some(13));
const SECTION: (usize, Option<usize>) = (13, Some(16));
const CREDIT: (usize, Option<usize>) = (16, Some(24));
const DAYS: (usize, Option<usize>) = (24, Some(31));
const TIME: (usize, Option<usize>) = (31, Some(42));
const BUILDING: (usize, Option<usize>) = (42, Some(47));
const ROOM: (usize, Option<usize>) = (47, Some(56));
const INSTRUCTOR: (usize, Option<usize>) = (56, Some(83));
const STATUS: (usize, Option<usize>) = (83, Some(89));
const SEATS: (usize, Option<usize>) = (89, Some(101));
const GRADES: (usize, Option<usize>) = (101, Some(108));
const FEE: (usize, Option<usize>) = (108, Some(115));
const OTHER: (usize, Option<usize>) = (115, None);

fn field(line: &str, (start, end): (usize, Option<usize>)) -> &str {
    column(line, start, end)
}

fn columns_meeting_time(line: &str) -> MeetingTime {
    MeetingTime {
        days: field(line, DAYS).to_string(),
        time: field(line, TIME).to_string(),
        building: field(line, BUILDING).to_string(),
        room: field(line, ROOM).to_string(),
    }
}

/// Walks an ordered class list alongside non-decreasing section offsets.
///
/// The owner of an offset is the last class whose start precedes it. The
/// cursor only moves forward.
pub struct ClassCursor<'c> {
    classes: &'c [Class],
    current: Option<usize>,
}

impl<'c> ClassCursor<'c> {
    pub fn new(classes: &'c [Class]) -> Self {
        Self {
            classes,
            current: None,
        }
    }

    pub fn owner(&mut self, offset: usize) -> Option<&'c Class> {
        let mut next = self.current.map_or(0, |i| i + 1);
        while next < self.classes.len() && self.classes[next].start < offset {
            self.current = Some(next);
            next += 1;
        }
        self.current.map(|i| &self.classes[i])
    }
}

/// Extracts section rows and attaches each to its class.
pub struct SectionExtractor<'a> {
    patterns: &'a Patterns,
}

impl<'a> SectionExtractor<'a> {
    pub fn new(patterns: &'a Patterns) -> Self {
        Self { patterns }
    }

    /// Scan the page for section rows.
    ///
    /// `classes` must be the document-ordered output of class extraction on
    /// the same document.
    pub fn extract(&self, document: &str, classes: &[Class]) -> Extracted<Section> {
        let mut out = Extracted::default();
        let mut cursor = ClassCursor::new(classes);

        for chunk in self.patterns.section_chunk.find_iter(document) {
            let offset = chunk.start();
            let owner = cursor.owner(offset);
            match self.parse_chunk(chunk.as_str(), offset, owner) {
                Ok(section) => out.records.push(section),
                Err(e) => out.errors.push(e),
            }
        }

        out
    }

    fn parse_chunk(
        &self,
        raw: &str,
        offset: usize,
        owner: Option<&Class>,
    ) -> Result<Section, ExtractError> {
        let plain = text::strip_tags(&self.patterns.tag, raw);
        let mut lines = plain.lines();
        let first = lines.next().unwrap_or("");

        let sln = field(first, SLN);
        if !self.patterns.sln.is_match(sln) {
            return Err(ExtractError::InvalidSln {
                offset,
                value: sln.to_string(),
            });
        }
        let owner = owner.ok_or_else(|| ExtractError::OrphanSection {
            offset,
            sln: sln.to_string(),
        })?;

        let mut times = Vec::new();
        if let Some(time) = self.meeting_time(first) {
            times.push(time);
        }

        let mut notes = String::new();
        for line in lines {
            if self.patterns.blank_line.is_match(line) {
                continue;
            }
            match self.meeting_time(line) {
                Some(time) => times.push(time),
                None => {
                    notes.push_str(&text::decode_entities(line.trim()));
                    notes.push('\n');
                }
            }
        }

        let meeting_times =
            serde_json::to_string(&times).map_err(|source| ExtractError::MeetingTimes {
                sln: sln.to_string(),
                source,
            })?;
        let (taken_seats, total_seats) = self.parse_seats(field(first, SEATS)).unwrap_or((0, 0));

        Ok(Section {
            class_key: owner.key(),
            restriction: field(first, RESTRICTION).to_string(),
            sln: sln.to_string(),
            section: field(first, SECTION).to_string(),
            credit: field(first, CREDIT).to_string(),
            meeting_times,
            instructor: field(first, INSTRUCTOR).to_string(),
            status: field(first, STATUS).to_string(),
            taken_seats,
            total_seats,
            grades: field(first, GRADES).to_string(),
            fee: field(first, FEE).to_string(),
            other: field(first, OTHER).to_string(),
            notes,
        })
    }

    /// A meeting time on `line`, if it carries one.
    ///
    /// Lines whose day token sits at the days column are sliced by the fixed
    /// layout. Anything else takes days and time from the pattern's capture
    /// groups and building and room from the next two words after the match.
    fn meeting_time(&self, line: &str) -> Option<MeetingTime> {
        let caps = self.patterns.meeting_time.captures(line)?;
        let (Some(days), Some(time)) = (caps.get(1), caps.get(2)) else {
            return Some(columns_meeting_time(line));
        };
        if line[..days.start()].chars().count() == DAYS.0 {
            return Some(columns_meeting_time(line));
        }

        let mut rest = line[caps.get(0)?.end()..].split_whitespace();
        Some(MeetingTime {
            days: days.as_str().to_string(),
            time: time.as_str().to_string(),
            building: rest.next().unwrap_or_default().to_string(),
            room: rest.next().unwrap_or_default().to_string(),
        })
    }

    /// Taken and total seats, only when the segment holds exactly two integers.
    pub fn parse_seats(&self, segment: &str) -> Option<(i64, i64)> {
        let numbers: Vec<&str> = self
            .patterns
            .seats
            .find_iter(segment)
            .map(|m| m.as_str())
            .collect();
        match numbers.as_slice() {
            [taken, total] => Some((taken.parse().ok()?, total.parse().ok()?)),
            _ => None,
        }
    }
}
