// src/models/mod.rs

//! Domain models for the schedule crawler.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod record;
mod schedule;
mod slot;

// Re-export all public types
pub use config::{
    Config, CrawlerConfig, DatabaseConfig, PatternConfig, ScheduleConfig, SchedulerConfig,
};
pub use record::{Column, Filter, Record, RecordKind, SqlType, TableSchema, Value};
pub use schedule::{Class, Department, MeetingTime, Section};
pub use slot::Slot;
