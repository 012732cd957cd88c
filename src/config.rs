use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub apollo_api_key: String,
    pub apollo_base_url: String,
    pub database_path: String,
    pub ranking_url: String,
    pub detail_base_url: String,
    /// Pause between ranking-site requests, in milliseconds.
    pub scrape_delay_ms: u64,
    /// Minimum wait before retrying a throttled call whose quota headers
    /// still read positive, in milliseconds.
    pub retry_floor_ms: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            apollo_api_key: std::env::var("APOLLO_API_KEY")
                .map_err(|_| anyhow::anyhow!("APOLLO_API_KEY environment variable required"))
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("APOLLO_API_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            apollo_base_url: std::env::var("APOLLO_BASE_URL")
                .unwrap_or_else(|_| "https://api.apollo.io/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            database_path: std::env::var("DATABASE_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "msp.db".to_string()),
            ranking_url: std::env::var("RANKING_URL").unwrap_or_else(|_| {
                "https://www.crn.com/rankings-and-lists/msp2023.htm".to_string()
            }),
            detail_base_url: std::env::var("RANKING_DETAIL_URL")
                .unwrap_or_else(|_| "https://data.crn.com/2023/detail-handler.php".to_string()),
            scrape_delay_ms: std::env::var("SCRAPE_DELAY_MS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SCRAPE_DELAY_MS must be a valid number"))?,
            retry_floor_ms: std::env::var("APOLLO_RETRY_FLOOR_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("APOLLO_RETRY_FLOOR_MS must be a valid number"))?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Apollo base URL: {}", config.apollo_base_url);
        tracing::debug!("Database path: {}", config.database_path);
        tracing::debug!("Ranking URL: {}", config.ranking_url);

        Ok(config)
    }
}
