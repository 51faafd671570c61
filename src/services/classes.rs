// src/services/classes.rs

//! Class extraction from a department page.

use crate::error::ExtractError;
use crate::models::Class;
use crate::services::{Extracted, Patterns};
use crate::utils::text;

/// Extracts class headings in document order.
pub struct ClassExtractor<'a> {
    patterns: &'a Patterns,
}

impl<'a> ClassExtractor<'a> {
    pub fn new(patterns: &'a Patterns) -> Self {
        Self { patterns }
    }

    /// Scan the page for class heading tables.
    ///
    /// The returned list is in document order and each class's window runs
    /// up to the start of the next emitted class, the last one to the end of
    /// the document. Section extraction depends on both properties.
    pub fn extract(&self, document: &str, department: &str) -> Extracted<Class> {
        let mut out = Extracted::default();

        for chunk in self.patterns.class_chunk.find_iter(document) {
            match self.parse_chunk(chunk.as_str(), chunk.start(), department) {
                Ok(class) => out.records.push(class),
                Err(e) => out.errors.push(e),
            }
        }

        let starts: Vec<usize> = out.records.iter().skip(1).map(|c| c.start).collect();
        for (class, end) in out
            .records
            .iter_mut()
            .zip(starts.into_iter().chain(std::iter::once(document.len())))
        {
            class.end = end;
        }

        out
    }

    fn parse_chunk(
        &self,
        raw: &str,
        offset: usize,
        department: &str,
    ) -> Result<Class, ExtractError> {
        let missing = |field| ExtractError::MissingField { offset, field };

        let name = self
            .patterns
            .class_name
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .ok_or_else(|| missing("name"))?;

        let abbreviation = self
            .patterns
            .class_abbreviation
            .find(name)
            .map(|m| m.as_str().to_lowercase())
            .ok_or_else(|| missing("abbreviation"))?;

        let code = self
            .patterns
            .class_code
            .find(name)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| missing("code"))?;

        let title = self
            .patterns
            .class_title
            .find(raw)
            .map(|m| text::display_text(&self.patterns.tag, m.as_str()))
            .unwrap_or_default();

        Ok(Class {
            department: department.to_string(),
            abbreviation,
            code,
            title,
            start: offset,
            end: offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatternConfig;

    fn heading(name: &str, label: &str, title: &str) -> String {
        format!(
            "<table bgcolor=\"#ffcccc\" width=\"100%\"><tr><td><b>\
             <A NAME={name}>{label}</A>&nbsp;\
             <A HREF=/students/crscat/cse.html#{name}>{title}</A></b></td></tr></table>\n"
        )
    }

    fn page() -> String {
        let mut page = String::from("<html><body><h1>Computer Science</h1>\n");
        page.push_str(&heading("cse142", "CSE 142", "COMPUTER PRGRMNG I"));
        page.push_str("<pre>rows for 142</pre>\n");
        page.push_str("<table bgcolor=\"#ffcccc\"><tr><td>no anchor here</td></tr></table>\n");
        page.push_str(&heading("cse143", "CSE 143", "COMPUTER PRGRMNG II"));
        page.push_str("<pre>rows for 143</pre>\n");
        page.push_str(&heading("cse190", "CSE 190", "CURRENT TOPICS &amp; TRENDS"));
        page.push_str("</body></html>\n");
        page
    }

    fn extract(document: &str) -> Extracted<Class> {
        let patterns = Patterns::compile(&PatternConfig::default()).unwrap();
        ClassExtractor::new(&patterns).extract(document, "CSE")
    }

    #[test]
    fn test_extracts_classes_in_document_order() {
        let out = extract(&page());
        let keys: Vec<String> = out.records.iter().map(|c| c.key()).collect();
        assert_eq!(keys, vec!["cse142", "cse143", "cse190"]);

        let first = &out.records[0];
        assert_eq!(first.department, "CSE");
        assert_eq!(first.abbreviation, "cse");
        assert_eq!(first.code, "142");
        assert_eq!(first.title, "COMPUTER PRGRMNG I");
        assert_eq!(out.records[2].title, "CURRENT TOPICS & TRENDS");
    }

    #[test]
    fn test_windows_are_contiguous_and_ordered() {
        let document = page();
        let out = extract(&document);
        let classes = &out.records;

        for pair in classes.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!(pair[0].start < pair[0].end);
        }
        assert_eq!(classes.last().unwrap().end, document.len());
        assert!(document[classes[0].start..].starts_with("<table"));
    }

    #[test]
    fn test_malformed_chunk_is_skipped_and_reported() {
        let out = extract(&page());
        assert_eq!(out.records.len(), 3);
        assert_eq!(out.errors.len(), 1);
        assert!(out.errors.to_string().contains("missing name"));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let document = page();
        assert_eq!(extract(&document).records, extract(&document).records);
    }
}
