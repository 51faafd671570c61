// src/pipeline/crawl.rs

//! Crawl orchestrator.
//!
//! One task per department fetches its page under the fetch limit, extracts
//! classes and sections, persists the department, then fans out one insert
//! task per class and section. Every insert runs under the independent
//! insert limit.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use url::Url;

use crate::error::Result;
use crate::models::{CrawlerConfig, Department, Record};
use crate::services::ScheduleExtractor;
use crate::storage::ScheduleStore;
use crate::utils::http::Fetcher;
use crate::utils::text;

/// Counts for one crawl pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub departments_found: usize,
    pub departments_fetched: usize,
    pub fetch_failures: usize,
    pub inserted: usize,
    pub insert_failures: usize,
    pub extract_errors: usize,
}

impl CrawlReport {
    fn merge(&mut self, other: &CrawlReport) {
        self.departments_found += other.departments_found;
        self.departments_fetched += other.departments_fetched;
        self.fetch_failures += other.fetch_failures;
        self.inserted += other.inserted;
        self.insert_failures += other.insert_failures;
        self.extract_errors += other.extract_errors;
    }
}

/// State shared by every task of one pass.
struct Pass {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<ScheduleExtractor>,
    store: Arc<dyn ScheduleStore>,
    fetch_permits: Semaphore,
    insert_permits: Semaphore,
}

/// Drives fetch, extraction, and persistence for a whole schedule.
#[derive(Clone)]
pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<ScheduleExtractor>,
    fetch_limit: usize,
    insert_limit: usize,
    request_delay: Duration,
}

impl Crawler {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<ScheduleExtractor>,
        fetch_limit: usize,
        insert_limit: usize,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            fetch_limit: fetch_limit.max(1),
            insert_limit: insert_limit.max(1),
            request_delay: Duration::ZERO,
        }
    }

    pub fn from_config(
        config: &CrawlerConfig,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<ScheduleExtractor>,
    ) -> Self {
        Self::new(fetcher, extractor, config.fetch_limit, config.insert_limit)
            .with_request_delay(Duration::from_millis(config.request_delay_ms))
    }

    /// Pause between department task launches.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Crawl the schedule under `root` into `store`.
    ///
    /// Fails only when the root index cannot be fetched. Department fetch
    /// failures, extraction errors, and insert failures are logged and
    /// counted in the report.
    pub async fn crawl(&self, root: &Url, store: Arc<dyn ScheduleStore>) -> Result<CrawlReport> {
        let body = self.fetcher.fetch(root.as_str()).await.inspect_err(|e| {
            log::error!("Root index fetch failed: {e}");
        })?;
        let document = text::decode_body(&body);

        let departments = self.extractor.departments(&document, root);
        if !departments.errors.is_empty() {
            log::warn!(
                "{} department entries skipped: {}",
                departments.errors.len(),
                departments.errors
            );
        }

        let mut report = CrawlReport {
            departments_found: departments.records.len(),
            extract_errors: departments.errors.len(),
            ..CrawlReport::default()
        };
        log::info!(
            "Found {} departments (fetch limit {}, insert limit {})",
            report.departments_found,
            self.fetch_limit,
            self.insert_limit
        );

        let pass = Arc::new(Pass {
            fetcher: Arc::clone(&self.fetcher),
            extractor: Arc::clone(&self.extractor),
            store,
            fetch_permits: Semaphore::new(self.fetch_limit),
            insert_permits: Semaphore::new(self.insert_limit),
        });

        let mut handles = Vec::with_capacity(departments.records.len());
        for (i, department) in departments.records.into_iter().enumerate() {
            if i > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
            handles.push(tokio::spawn(crawl_department(Arc::clone(&pass), department)));
        }

        for result in join_all(handles).await {
            match result {
                Ok(outcome) => report.merge(&outcome),
                Err(e) => {
                    log::warn!("Department task aborted: {e}");
                    report.fetch_failures += 1;
                }
            }
        }

        log::info!(
            "Crawl finished: {}/{} departments fetched, {} records inserted, {} insert failures, {} extraction errors",
            report.departments_fetched,
            report.departments_found,
            report.inserted,
            report.insert_failures,
            report.extract_errors
        );
        Ok(report)
    }
}

async fn crawl_department(pass: Arc<Pass>, department: Department) -> CrawlReport {
    let mut report = CrawlReport::default();

    let fetched = match pass.fetch_permits.acquire().await {
        Ok(_permit) => pass.fetcher.fetch(&department.link).await,
        Err(e) => {
            log::warn!("Fetch permits closed for {}: {e}", department.abbreviation);
            report.fetch_failures += 1;
            return report;
        }
    };
    let body = match fetched {
        Ok(body) => body,
        Err(e) => {
            log::warn!("Skipping department {}: {e}", department.abbreviation);
            report.fetch_failures += 1;
            return report;
        }
    };
    report.departments_fetched += 1;

    let document = text::decode_body(&body);
    let classes = pass.extractor.classes(&document, department.key());
    let sections = pass.extractor.sections(&document, &classes.records);

    report.extract_errors = classes.errors.len() + sections.errors.len();
    if report.extract_errors > 0 {
        log::warn!(
            "{}: {} chunks skipped: {}",
            department.abbreviation,
            report.extract_errors,
            [classes.errors.to_string(), sections.errors.to_string()]
                .iter()
                .filter(|s| !s.is_empty())
                .cloned()
                .collect::<Vec<_>>()
                .join("; ")
        );
    }
    log::debug!(
        "{}: {} classes, {} sections",
        department.abbreviation,
        classes.records.len(),
        sections.records.len()
    );

    // The department row lands before any of its classes or sections start.
    let department_insert =
        tokio::spawn(insert_record(Arc::clone(&pass), Record::from(department))).await;
    let handles: Vec<_> = classes
        .records
        .into_iter()
        .map(Record::from)
        .chain(sections.records.into_iter().map(Record::from))
        .map(|record| tokio::spawn(insert_record(Arc::clone(&pass), record)))
        .collect();

    let results = std::iter::once(department_insert).chain(join_all(handles).await);
    for result in results {
        match result {
            Ok(true) => report.inserted += 1,
            Ok(false) => report.insert_failures += 1,
            Err(e) => {
                log::warn!("Insert task aborted: {e}");
                report.insert_failures += 1;
            }
        }
    }

    report
}

async fn insert_record(pass: Arc<Pass>, record: Record) -> bool {
    let Ok(_permit) = pass.insert_permits.acquire().await else {
        log::warn!("Insert permits closed for {} {}", record.kind(), record.key());
        return false;
    };
    match pass.store.insert(&record).await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Insert failed for {} {}: {e}", record.kind(), record.key());
            false
        }
    }
}

/// Scripted fetcher and schedule pages shared by pipeline tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::error::{AppError, Result};
    use crate::utils::http::Fetcher;

    pub const ROOT: &str = "https://example.edu/timeschd/AUT2013/";

    /// Serves fixed pages, fails listed URLs, and records peak concurrency.
    #[derive(Default)]
    pub struct ScriptedFetcher {
        pages: HashMap<String, String>,
        failing: HashSet<String>,
        delay_ms: u64,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        /// A schedule with one department per abbreviation.
        pub fn schedule(abbreviations: &[&str]) -> Self {
            let mut pages = HashMap::new();
            pages.insert(ROOT.to_string(), index(abbreviations));
            for (i, abbreviation) in abbreviations.iter().enumerate() {
                let url = format!("{ROOT}{}.html", abbreviation.to_lowercase());
                pages.insert(url, department_page(abbreviation, 10_000 + 100 * i as u32));
            }
            Self {
                pages,
                ..Self::default()
            }
        }

        pub fn with_delay(mut self, delay_ms: u64) -> Self {
            self.delay_ms = delay_ms;
            self
        }

        pub fn failing(mut self, url: impl Into<String>) -> Self {
            self.failing.insert(url.into());
            self
        }

        pub fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }

        pub fn calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.calls.lock().unwrap().push(url.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            if self.delay_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(url) {
                return Err(AppError::fetch(url, "non-2xx/3xx status 503 Service Unavailable"));
            }
            self.pages
                .get(url)
                .map(|page| page.clone().into_bytes())
                .ok_or_else(|| AppError::fetch(url, "non-2xx/3xx status 404 Not Found"))
        }
    }

    pub fn index(abbreviations: &[&str]) -> String {
        let mut page = String::from("<html><body><h2>Departments</h2>\n<ul>\n");
        for abbreviation in abbreviations {
            page.push_str(&format!(
                "<li><a href=\"{}.html\">{abbreviation} Department ({abbreviation})</a></li>\n",
                abbreviation.to_lowercase()
            ));
        }
        page.push_str("</ul></body></html>\n");
        page
    }

    /// Two classes with one section each; SLNs start at `sln`.
    pub fn department_page(abbreviation: &str, sln: u32) -> String {
        let lower = abbreviation.to_lowercase();
        let mut page = String::from("<html><body>\n");
        for (i, code) in ["100", "200"].iter().enumerate() {
            page.push_str(&format!(
                "<table bgcolor=\"#ffcccc\"><tr><td><A NAME={lower}{code}>{abbreviation} {code}</A> \
                 <A HREF=/crscat/{lower}.html#{lower}{code}>INTRO {code}</A></td></tr></table>\n<pre>\n"
            ));
            page.push_str(&section_row(&(sln + i as u32).to_string()));
            page.push_str("\n</pre>\n");
        }
        page.push_str("</body></html>\n");
        page
    }

    fn section_row(sln: &str) -> String {
        let line = format!(
            "{:<7}{:<6}{:<3}{:<8}{:<7}{:<11}{:<5}{:<9}{:<27}{:<6}{:<12}",
            "", sln, "A", "5", "MWF", "930-1020", "KNE", "120", "Staff", "open", " 1/ 30"
        );
        let anchored = line.replacen(
            sln,
            &format!("<A HREF=https://sdb.example.edu/sln.asp?SLN={sln}>{sln}</A>"),
            1,
        );
        format!("{anchored}\n</td>")
    }
}
