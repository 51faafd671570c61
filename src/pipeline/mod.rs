//! Pipeline entry points for crawler operations.
//!
//! - `Crawler::crawl`: Fetch the schedule and persist it into one store
//! - `Rebuilder::run_pass`: Rebuild the inactive slot and promote it
//! - `run_all`: Pass every configured schedule, repeating on the configured interval

pub mod crawl;
pub mod rebuild;

pub use crawl::{CrawlReport, Crawler};
pub use rebuild::{PassSummary, Rebuilder, run_all};
