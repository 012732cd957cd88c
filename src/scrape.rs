use crate::config::Config;
use crate::errors::AppError;
use crate::models::{RankedCompany, RankingDetail};
use regex::Regex;
use std::time::Duration;

/// Scraper for the published MSP ranking.
///
/// The ranking page only carries opaque entry keys; one follow-up call
/// per key to the detail endpoint yields the company name and site URL.
pub struct RankingScraper {
    client: reqwest::Client,
    ranking_url: String,
    detail_base_url: String,
    delay: Duration,
}

impl RankingScraper {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Scrape(format!("Failed to create scrape client: {}", e)))?;

        Ok(Self {
            client,
            ranking_url: config.ranking_url.clone(),
            detail_base_url: config.detail_base_url.clone(),
            delay: Duration::from_millis(config.scrape_delay_ms),
        })
    }

    /// Fetches the full ranking in published order.
    pub async fn fetch_ranking(&self) -> Result<Vec<RankedCompany>, AppError> {
        tracing::info!("Fetching ranking page: {}", self.ranking_url);

        let response = self
            .client
            .get(&self.ranking_url)
            .send()
            .await
            .map_err(|e| AppError::Scrape(format!("Failed to fetch ranking page: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Scrape(format!(
                "Ranking page returned status {}",
                response.status()
            )));
        }

        let page = response
            .text()
            .await
            .map_err(|e| AppError::Scrape(format!("Failed to read ranking page: {}", e)))?;

        let keys = extract_entry_keys(&page);
        if keys.is_empty() {
            return Err(AppError::Scrape(
                "No ranking entries found in page".to_string(),
            ));
        }
        tracing::info!("Found {} ranking entries", keys.len());

        let mut companies = Vec::with_capacity(keys.len());
        for key in &keys {
            // Politeness pause so the detail endpoint is not hammered.
            tokio::time::sleep(self.delay).await;

            let detail = self.fetch_detail(key).await?;
            let company = RankedCompany {
                name: detail.company,
                domain: normalize_domain(&detail.url),
            };
            tracing::info!("#{} {} ({})", companies.len() + 1, company.name, company.domain);
            companies.push(company);
        }

        Ok(companies)
    }

    async fn fetch_detail(&self, key: &str) -> Result<RankingDetail, AppError> {
        let url = format!("{}?c={}&r=45", self.detail_base_url, key);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Scrape(format!("Failed to fetch detail for '{}': {}", key, e)))?;

        if !response.status().is_success() {
            return Err(AppError::Scrape(format!(
                "Detail endpoint returned status {} for '{}'",
                response.status(),
                key
            )));
        }

        response.json().await.map_err(|e| {
            AppError::Scrape(format!("Failed to parse detail for '{}': {}", key, e))
        })
    }
}

/// Pulls the entry keys out of the ranking page, in page order.
///
/// Each entry is an anchor inside a div whose class list contains
/// `data1`, with the key carried as the value of the href's query
/// parameter.
fn extract_entry_keys(page: &str) -> Vec<String> {
    let entry = Regex::new(
        r#"(?s)<div[^>]*class="(?:[^"]*\s)?data1(?:\s[^"]*)?"[^>]*>.*?<a[^>]+href="([^"]+)""#,
    )
    .unwrap();

    entry
        .captures_iter(page)
        .filter_map(|caps| {
            let href = caps.get(1)?.as_str();
            let key = href.split('=').nth(1)?;
            Some(key.split('&').next().unwrap_or(key).to_string())
        })
        .collect()
}

/// Strips the scheme-and-www prefix the detail endpoint puts on URLs,
/// leaving the bare domain.
pub fn normalize_domain(url: &str) -> String {
    url.strip_prefix("https://www.").unwrap_or(url).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_keys_in_page_order() {
        let page = r#"
            <div class="data1"><a href="detail.htm?c=101">First Corp</a></div>
            <div class="rank data1 highlight"><a href="detail.htm?c=202">Second Corp</a></div>
            <div class="data10"><a href="detail.htm?c=999">Not an entry</a></div>
        "#;
        assert_eq!(extract_entry_keys(page), vec!["101", "202"]);
    }

    #[test]
    fn key_extraction_stops_at_extra_params() {
        let page = r#"<div class="data1"><a href="detail.htm?c=42&r=45">x</a></div>"#;
        assert_eq!(extract_entry_keys(page), vec!["42"]);
    }

    #[test]
    fn page_without_entries_yields_nothing() {
        assert!(extract_entry_keys("<html><body>maintenance</body></html>").is_empty());
    }

    #[test]
    fn normalize_strips_only_the_canonical_prefix() {
        assert_eq!(normalize_domain("https://www.example.com"), "example.com");
        assert_eq!(normalize_domain("http://example.com"), "http://example.com");
        assert_eq!(normalize_domain("example.com"), "example.com");
    }
}
