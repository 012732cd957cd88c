//! End-to-end collection flows:
//!
//! 1. Scrape the published ranking into the companies table
//! 2. Find current executives per company via the people API
//! 3. Merge hand-cleaned exports back into stored contacts
//! 4. Export everything as a flat CSV

use crate::apollo::ApolloClient;
use crate::cleanse;
use crate::errors::{AppError, ResultExt};
use crate::scrape::RankingScraper;
use crate::storage::LeadStore;
use std::path::Path;

/// Executive titles searched for at every company.
pub const EXECUTIVE_TITLES: &[&str] = &[
    "Chief Executive Officer",
    "CEO",
    "Chief Product Officer",
    "CPO",
    "Chief Innovation Officer",
    "CIO",
    "VP operations",
    "VP of operations",
    "VPO",
    "Chief Operating Officer",
    "COO",
    "Chief Technology Officer",
    "CTO",
];

/// Scrapes the ranking and replaces the stored company list.
///
/// The scrape completes before anything is deleted, so a broken
/// ranking page never costs us the previous snapshot.
pub async fn refresh_companies(
    scraper: &RankingScraper,
    store: &LeadStore,
) -> Result<usize, AppError> {
    let companies = scraper
        .fetch_ranking()
        .await
        .context("Refreshing the company ranking")?;

    store.replace_companies(&companies).await?;
    Ok(companies.len())
}

/// Walks stored companies in ranking order and fetches their current
/// executives. Returns how many contacts were written.
///
/// With `resume` set, companies at or below the highest id that
/// already has contacts are skipped, so an interrupted run picks up
/// where it stopped. `limit` caps the walk to the top of the ranking.
pub async fn enrich_contacts(
    client: &mut ApolloClient,
    store: &LeadStore,
    limit: Option<i64>,
    resume: bool,
) -> Result<u64, AppError> {
    let companies = store.companies().await?;
    if companies.is_empty() {
        tracing::warn!("No companies stored, nothing to enrich");
        return Ok(0);
    }

    let start_after = if resume {
        let point = store.resume_point().await?;
        if let Some(id) = point {
            tracing::info!("Resuming after company #{}", id);
        }
        point
    } else {
        None
    };

    let titles: Vec<String> = EXECUTIVE_TITLES.iter().map(|t| t.to_string()).collect();
    let mut written = 0u64;

    for company in &companies {
        if start_after.is_some_and(|id| company.id <= id) {
            tracing::debug!("Skipping company #{} ({})", company.id, company.name);
            continue;
        }
        if limit.is_some_and(|cap| company.id > cap) {
            tracing::info!("Reached the top-{} cap, stopping", limit.unwrap_or_default());
            break;
        }

        let domains = [company.url.clone()];
        let people = client
            .find_people_currently_employed(&domains, &titles)
            .await?;

        if people.is_empty() {
            tracing::warn!(
                "✗ No executives found for #{} {} ({})",
                company.id,
                company.name,
                company.url
            );
            continue;
        }

        let stored = store.insert_contacts(company.id, &people).await?;
        written += stored;
        tracing::info!(
            "✓ Stored {} contact(s) for #{} {}",
            stored,
            company.id,
            company.name
        );
    }

    Ok(written)
}

/// Writes the company/contact join out as CSV, one line per contact
/// and one line per contact-less company.
pub async fn export_csv(store: &LeadStore, path: impl AsRef<Path>) -> Result<usize, AppError> {
    let path = path.as_ref();
    let rows = store.export_rows().await?;

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::Internal(format!("Cannot create {}: {}", path.display(), e)))?;

    for row in &rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::Internal(format!("Failed to write CSV row: {}", e)))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::Internal(format!("Failed to flush {}: {}", path.display(), e)))?;

    tracing::info!("✓ Exported {} rows to {}", rows.len(), path.display());
    Ok(rows.len())
}

/// Merges a hand-cleaned export into stored contacts, filling in
/// emails and phones that are still missing. Returns how many contact
/// rows were touched.
pub async fn merge_cleaned(
    store: &LeadStore,
    csv_path: impl AsRef<Path>,
    required_confidence: u32,
) -> Result<u64, AppError> {
    let cleaned = cleanse::extract_cleaned(&csv_path, required_confidence)?;
    tracing::info!(
        "Cleaned export holds {} usable contact(s) at >{}% confidence",
        cleaned.len(),
        required_confidence
    );

    let mut touched = 0u64;
    for ((first_name, last_name), contact) in &cleaned {
        let rows = store
            .fill_missing_contact_details(first_name, last_name, contact)
            .await?;
        if rows == 0 {
            tracing::debug!("No stored contact named {} {}", first_name, last_name);
        }
        touched += rows;
    }

    tracing::info!("✓ Updated {} stored contact(s)", touched);
    Ok(touched)
}
