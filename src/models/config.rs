//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and concurrency settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Schedules to crawl, each with its own control and slot databases
    #[serde(default = "defaults::schedules")]
    pub schedules: Vec<ScheduleConfig>,

    /// Control and slot database locations
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Rebuild loop behavior
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Extraction patterns
    #[serde(default)]
    pub patterns: PatternConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            schedules: defaults::schedules(),
            database: DatabaseConfig::default(),
            scheduler: SchedulerConfig::default(),
            patterns: PatternConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.fetch_limit == 0 {
            return Err(AppError::validation("crawler.fetch_limit must be > 0"));
        }
        if self.crawler.insert_limit == 0 {
            return Err(AppError::validation("crawler.insert_limit must be > 0"));
        }
        if self.schedules.is_empty() {
            return Err(AppError::validation("no schedules configured"));
        }
        let mut names = HashSet::new();
        for schedule in &self.schedules {
            schedule.validate()?;
            if !names.insert(schedule.name.as_str()) {
                return Err(AppError::validation(format!(
                    "schedule '{}' is defined twice",
                    schedule.name
                )));
            }
        }
        if self.scheduler.loop_enabled && self.scheduler.interval_minutes == 0 {
            return Err(AppError::validation(
                "scheduler.interval_minutes must be > 0 when looping",
            ));
        }
        for (name, file) in [
            ("control_file", &self.database.control_file),
            ("slot_a_file", &self.database.slot_a_file),
            ("slot_b_file", &self.database.slot_b_file),
        ] {
            if file.trim().is_empty() {
                return Err(AppError::validation(format!("database.{name} is empty")));
            }
        }
        if self.database.slot_a_file == self.database.slot_b_file {
            return Err(AppError::validation(
                "database.slot_a_file and database.slot_b_file must differ",
            ));
        }
        if self.database.max_connections == 0 {
            return Err(AppError::validation("database.max_connections must be > 0"));
        }
        crate::services::Patterns::compile(&self.patterns)?;
        Ok(())
    }

    /// The named schedule, or the first one when no name is given.
    pub fn schedule(&self, name: Option<&str>) -> Result<&ScheduleConfig> {
        match name {
            Some(name) => self
                .schedules
                .iter()
                .find(|s| s.name == name)
                .ok_or_else(|| AppError::config(format!("no schedule named '{name}'"))),
            None => self
                .schedules
                .first()
                .ok_or_else(|| AppError::config("no schedules configured")),
        }
    }
}

/// HTTP client and concurrency settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum in-flight department page fetches
    #[serde(default = "defaults::fetch_limit")]
    pub fetch_limit: usize,

    /// Maximum in-flight record inserts
    #[serde(default = "defaults::insert_limit")]
    pub insert_limit: usize,

    /// Delay between department task launches in milliseconds
    #[serde(default)]
    pub request_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            fetch_limit: defaults::fetch_limit(),
            insert_limit: defaults::insert_limit(),
            request_delay_ms: 0,
        }
    }
}

/// One published schedule, e.g. a single quarter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Short identifier; names the schedule's database directory
    pub name: String,

    /// Department index page; department links are resolved against it
    #[serde(default = "defaults::root_url")]
    pub root_url: String,
}

impl ScheduleConfig {
    fn validate(&self) -> Result<()> {
        let valid_name = !self.name.is_empty()
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_name {
            return Err(AppError::validation(format!(
                "schedule name '{}' must be non-empty ASCII letters, digits, '_' or '-'",
                self.name
            )));
        }
        if let Err(e) = url::Url::parse(&self.root_url) {
            return Err(AppError::validation(format!(
                "schedule '{}' root_url '{}' is not a URL: {e}",
                self.name, self.root_url
            )));
        }
        Ok(())
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            name: defaults::schedule_name(),
            root_url: defaults::root_url(),
        }
    }
}

/// SQLite file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding all database files
    #[serde(default = "defaults::data_dir")]
    pub data_dir: String,

    /// Control database holding the active slot
    #[serde(default = "defaults::control_file")]
    pub control_file: String,

    #[serde(default = "defaults::slot_a_file")]
    pub slot_a_file: String,

    #[serde(default = "defaults::slot_b_file")]
    pub slot_b_file: String,

    /// Pool size per slot database
    #[serde(default = "defaults::max_connections")]
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Directory holding one schedule's databases.
    pub fn schedule_dir(&self, base: &Path, schedule: &str) -> PathBuf {
        base.join(&self.data_dir).join(schedule)
    }

    pub fn control_path(&self, base: &Path, schedule: &str) -> PathBuf {
        self.schedule_dir(base, schedule).join(&self.control_file)
    }

    pub fn slot_a_path(&self, base: &Path, schedule: &str) -> PathBuf {
        self.schedule_dir(base, schedule).join(&self.slot_a_file)
    }

    pub fn slot_b_path(&self, base: &Path, schedule: &str) -> PathBuf {
        self.schedule_dir(base, schedule).join(&self.slot_b_file)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
            control_file: defaults::control_file(),
            slot_a_file: defaults::slot_a_file(),
            slot_b_file: defaults::slot_b_file(),
            max_connections: defaults::max_connections(),
        }
    }
}

/// Rebuild loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Repeat passes forever instead of running once
    #[serde(default)]
    pub loop_enabled: bool,

    /// Sleep between passes in minutes
    #[serde(default = "defaults::interval_minutes")]
    pub interval_minutes: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            loop_enabled: false,
            interval_minutes: defaults::interval_minutes(),
        }
    }
}

/// Regular expressions used by the extraction engine.
///
/// The defaults match the fixed layout of the published time schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    /// One department entry: a list item wrapping a link
    #[serde(default = "defaults::department_chunk")]
    pub department_chunk: String,

    /// Parenthesized abbreviation inside a department entry
    #[serde(default = "defaults::department_abbreviation")]
    pub department_abbreviation: String,

    /// Department href; the first capture group is the link
    #[serde(default = "defaults::department_link")]
    pub department_link: String,

    /// Any markup tag
    #[serde(default = "defaults::tag")]
    pub tag: String,

    /// One class heading table
    #[serde(default = "defaults::class_chunk")]
    pub class_chunk: String,

    /// Named anchor of a class heading; the first capture group is the name
    #[serde(default = "defaults::class_name")]
    pub class_name: String,

    #[serde(default = "defaults::class_abbreviation")]
    pub class_abbreviation: String,

    #[serde(default = "defaults::class_code")]
    pub class_code: String,

    /// Linked class title
    #[serde(default = "defaults::class_title")]
    pub class_title: String,

    /// One section row
    #[serde(default = "defaults::section_chunk")]
    pub section_chunk: String,

    /// Schedule line number
    #[serde(default = "defaults::sln")]
    pub sln: String,

    /// Integers inside the seats column
    #[serde(default = "defaults::seats")]
    pub seats: String,

    /// Days and time of a meeting; capture groups 1 and 2 when present
    #[serde(default = "defaults::meeting_time")]
    pub meeting_time: String,

    #[serde(default = "defaults::blank_line")]
    pub blank_line: String,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            department_chunk: defaults::department_chunk(),
            department_abbreviation: defaults::department_abbreviation(),
            department_link: defaults::department_link(),
            tag: defaults::tag(),
            class_chunk: defaults::class_chunk(),
            class_name: defaults::class_name(),
            class_abbreviation: defaults::class_abbreviation(),
            class_code: defaults::class_code(),
            class_title: defaults::class_title(),
            section_chunk: defaults::section_chunk(),
            sln: defaults::sln(),
            seats: defaults::seats(),
            meeting_time: defaults::meeting_time(),
            blank_line: defaults::blank_line(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; schedule-crawler/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn fetch_limit() -> usize {
        5
    }
    pub fn insert_limit() -> usize {
        10
    }

    // Schedule defaults
    pub fn schedules() -> Vec<super::ScheduleConfig> {
        vec![super::ScheduleConfig::default()]
    }
    pub fn schedule_name() -> String {
        "aut2013".into()
    }
    pub fn root_url() -> String {
        "https://www.washington.edu/students/timeschd/AUT2013/".into()
    }

    // Database defaults
    pub fn data_dir() -> String {
        "data".into()
    }
    pub fn control_file() -> String {
        "switch.db".into()
    }
    pub fn slot_a_file() -> String {
        "schedule_a.db".into()
    }
    pub fn slot_b_file() -> String {
        "schedule_b.db".into()
    }
    pub fn max_connections() -> u32 {
        5
    }

    // Scheduler defaults
    pub fn interval_minutes() -> u64 {
        60
    }

    // Pattern defaults
    pub fn department_chunk() -> String {
        r"(?is)<li><a.+?</a>".into()
    }
    pub fn department_abbreviation() -> String {
        r"(?s)\(.+?\)".into()
    }
    pub fn department_link() -> String {
        r#"(?i)href\s*=\s*["']?([^"'\s>]+)["']?"#.into()
    }
    pub fn tag() -> String {
        r"(?s)<[^>]+>".into()
    }
    pub fn class_chunk() -> String {
        r##"(?is)<table bgcolor="#ffcccc".*?</table>"##.into()
    }
    pub fn class_name() -> String {
        r#"(?i)name\s*=\s*["']?([^"'>]+)["']?\s*>"#.into()
    }
    pub fn class_abbreviation() -> String {
        r"[a-zA-Z]+".into()
    }
    pub fn class_code() -> String {
        r"\d+".into()
    }
    pub fn class_title() -> String {
        r"(?is)<a href.*?>.+?</a>".into()
    }
    pub fn section_chunk() -> String {
        r"(?s).{7}<A HREF=h.+?</td>".into()
    }
    pub fn sln() -> String {
        r"^\d{5,6}$".into()
    }
    pub fn seats() -> String {
        r"\d+".into()
    }
    pub fn meeting_time() -> String {
        r"(?i)\b([a-z]{2,5})\s*(\d{3,4}-\d{3,4})".into()
    }
    pub fn blank_line() -> String {
        r"^\s*$".into()
    }
}
