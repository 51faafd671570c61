// src/services/departments.rs

//! Department extraction from the schedule index.

use std::collections::HashSet;

use url::Url;

use crate::error::ExtractError;
use crate::models::Department;
use crate::services::{Extracted, Patterns};
use crate::utils::{resolve_url, text};

/// Extracts departments from the root index page.
pub struct DepartmentExtractor<'a> {
    patterns: &'a Patterns,
    root: &'a Url,
}

impl<'a> DepartmentExtractor<'a> {
    pub fn new(patterns: &'a Patterns, root: &'a Url) -> Self {
        Self { patterns, root }
    }

    /// Scan every list-item link in the document.
    ///
    /// Entries without a parenthesized abbreviation and in-page anchors are not
    /// departments and are skipped silently. A repeated abbreviation keeps the
    /// first occurrence.
    pub fn extract(&self, document: &str) -> Extracted<Department> {
        let mut out = Extracted::default();
        let mut seen = HashSet::new();

        for chunk in self.patterns.department_chunk.find_iter(document) {
            let raw = chunk.as_str();
            let plain = text::display_text(&self.patterns.tag, raw);

            let Some(abbreviation) = self.abbreviation(&plain) else {
                continue;
            };

            let Some(href) = self
                .patterns
                .department_link
                .captures(raw)
                .and_then(|caps| caps.get(1))
                .map(|m| text::decode_entities(m.as_str()))
            else {
                out.errors.push(ExtractError::MissingField {
                    offset: chunk.start(),
                    field: "link",
                });
                continue;
            };
            if href.starts_with('#') {
                continue;
            }

            if !seen.insert(abbreviation.clone()) {
                log::debug!("Dropping repeated department {abbreviation}");
                continue;
            }

            let name = text::normalize_whitespace(
                &self.patterns.department_abbreviation.replace_all(&plain, ""),
            );

            out.records.push(Department {
                abbreviation,
                name,
                link: resolve_url(self.root, &href),
            });
        }

        out
    }

    /// Trailing parenthesized token, upper-cased with inner spaces removed.
    fn abbreviation(&self, plain: &str) -> Option<String> {
        let last = self
            .patterns
            .department_abbreviation
            .find_iter(plain)
            .last()?;
        let abbreviation: String = last
            .as_str()
            .trim_matches(|c| c == '(' || c == ')')
            .split_whitespace()
            .collect::<String>()
            .to_uppercase();
        (!abbreviation.is_empty()).then_some(abbreviation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatternConfig;

    const INDEX: &str = r##"
<h2>Arts &amp; Sciences</h2>
<ul>
<li><a href="cse.html">Computer Science &amp; Engineering (CSE)</a></li>
<li><a href="#cse">Computer Science (CSE)</a></li>
<li><a href="math.html">Mathematics (math)</a></li>
<li><a href="biol.html">Biology</a></li>
<li><a href="cse2.html">Comp Sci (Honors) (C SE)</a></li>
<li><a>Anthropology (ANTH)</a></li>
</ul>
"##;

    fn extract(document: &str) -> Extracted<Department> {
        let patterns = Patterns::compile(&PatternConfig::default()).unwrap();
        let root = Url::parse("https://example.edu/timeschd/AUT2013/").unwrap();
        DepartmentExtractor::new(&patterns, &root).extract(document)
    }

    #[test]
    fn test_extracts_departments_in_order() {
        let out = extract(INDEX);
        let keys: Vec<&str> = out.records.iter().map(|d| d.key()).collect();
        assert_eq!(keys, vec!["CSE", "MATH"]);

        let cse = &out.records[0];
        assert_eq!(cse.name, "Computer Science & Engineering");
        assert_eq!(cse.link, "https://example.edu/timeschd/AUT2013/cse.html");
    }

    #[test]
    fn test_repeated_abbreviation_is_dropped() {
        let out = extract(INDEX);
        assert_eq!(
            out.records.iter().filter(|d| d.abbreviation == "CSE").count(),
            1
        );
        assert!(out.records.iter().all(|d| !d.link.ends_with("cse2.html")));
    }

    #[test]
    fn test_missing_link_is_collected_error() {
        let out = extract(INDEX);
        assert_eq!(out.errors.len(), 1);
        assert!(out.errors.to_string().contains("missing link"));
    }

    #[test]
    fn test_empty_document() {
        let out = extract("");
        assert!(out.records.is_empty());
        assert!(out.errors.is_empty());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        assert_eq!(extract(INDEX).records, extract(INDEX).records);
    }
}
