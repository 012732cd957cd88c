use clap::{ArgGroup, Parser};
use std::path::PathBuf;

/// Lead-generation toolkit for the published MSP ranking.
#[derive(Parser, Debug)]
#[command(
    name = "msp-leadgen",
    version,
    about = "Scrapes the MSP ranking, finds current executives, and exports contact sheets",
    group(ArgGroup::new("updates"))
)]
pub struct Cli {
    /// Wipe the whole store and collect everything fresh
    #[arg(short = 'r', long, group = "updates")]
    pub refresh: bool,

    /// Re-scrape only the company ranking
    #[arg(long, group = "updates")]
    pub refresh_companies: bool,

    /// Fetch executives for companies that have none yet, resuming
    /// where the last run stopped
    #[arg(long, group = "updates")]
    pub refresh_contacts: bool,

    /// Only enrich companies ranked at or above this position
    #[arg(short, long, value_name = "N")]
    pub limit: Option<i64>,

    /// Merge a hand-cleaned contact export back into the store
    #[arg(long, value_name = "CSV")]
    pub merge: Option<PathBuf>,

    /// Minimum confidence (percent) a cleaned value must exceed
    #[arg(long, default_value_t = 70, value_name = "PERCENT")]
    pub confidence: u32,

    /// Write the full company/contact sheet to this CSV file
    #[arg(short, long, value_name = "CSV")]
    pub output: Option<PathBuf>,
}
