//! Lead-generation toolkit for the published MSP ranking.
//!
//! Scrapes the ranked company list, resolves current executives at each
//! company through a quota-constrained people-search API, persists the
//! results in SQLite, and round-trips hand-cleaned contact exports.
//!
//! # Modules
//!
//! - `apollo`: Quota-aware people-search API client.
//! - `cleanse`: Hand-cleaned spreadsheet import.
//! - `cli`: Command-line argument surface.
//! - `config`: Configuration management.
//! - `db`: Database connection and schema setup.
//! - `errors`: Error handling types.
//! - `models`: Core data models.
//! - `pipeline`: End-to-end collection flows.
//! - `quota`: Remaining-request budget tracking.
//! - `scrape`: Ranking-site scraper.
//! - `storage`: Database storage operations.

pub mod apollo;
pub mod cleanse;
pub mod cli;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod quota;
pub mod scrape;
pub mod storage;
