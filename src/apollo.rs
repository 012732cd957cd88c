use crate::config::Config;
use crate::errors::AppError;
use crate::models::{BulkEnrichResponse, EnrichResponse, PeopleSearchResponse, PersonRecord};
use crate::quota::QuotaState;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Title searched for when the caller does not supply any.
pub const DEFAULT_TITLE: &str = "Chief Executive Officer";

/// The two remote operations this client speaks, plus the bulk variant
/// of enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    PeopleSearch,
    OrgEnrich,
    OrgBulkEnrich,
}

impl Endpoint {
    fn path(self) -> &'static str {
        match self {
            Endpoint::PeopleSearch => "mixed_people/search",
            Endpoint::OrgEnrich => "organizations/enrich",
            Endpoint::OrgBulkEnrich => "organizations/bulk_enrich",
        }
    }
}

/// Quota-aware client for the people-search API.
///
/// Every request goes through the same gate: consult the cached quota
/// counters first, sleep out any known exhaustion, then send. Counters
/// are refreshed from the response headers of every call, success or
/// not, and a 429 puts the request back through the gate until it gets
/// a real answer. Methods take `&mut self` since each call rewrites the
/// quota cache; one client means one caller at a time.
pub struct ApolloClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    quota: QuotaState,
    retry_floor: Duration,
    cancel: CancellationToken,
}

impl ApolloClient {
    /// Creates a new `ApolloClient`.
    ///
    /// # Arguments
    ///
    /// * `config` - Source of the base URL, credential and retry floor.
    /// * `cancel` - Cooperative signal that aborts in-flight quota waits.
    pub fn new(config: &Config, cancel: CancellationToken) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                AppError::ExternalApi(format!("Failed to create Apollo client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.apollo_base_url.clone(),
            api_key: config.apollo_api_key.clone(),
            quota: QuotaState::new(),
            retry_floor: Duration::from_millis(config.retry_floor_ms),
            cancel,
        })
    }

    /// Last-seen quota counters.
    pub fn quota(&self) -> &QuotaState {
        &self.quota
    }

    /// Resolves domains to organization ids.
    ///
    /// Returns a mapping keyed by each organization's canonical domain,
    /// which the service may normalize away from the queried one.
    /// Domains it does not recognize are simply absent from the result.
    ///
    /// A single domain goes through the one-shot enrichment endpoint;
    /// anything more uses bulk enrichment, which costs roughly ten
    /// times the quota per call.
    pub async fn resolve_organization_ids(
        &mut self,
        domains: &[String],
    ) -> Result<HashMap<String, String>, AppError> {
        if domains.is_empty() {
            return Ok(HashMap::new());
        }

        if let [domain] = domains {
            let payload = json!({
                "api_key": self.api_key,
                "domain": domain,
            });
            let body = self.post(Endpoint::OrgEnrich, &payload).await?;
            let parsed: EnrichResponse = serde_json::from_value(body).map_err(|e| {
                AppError::ExternalApi(format!("Failed to parse enrichment response: {}", e))
            })?;

            return Ok(parsed
                .organization
                .map(|org| HashMap::from([(org.primary_domain, org.id)]))
                .unwrap_or_default());
        }

        let payload = json!({
            "api_key": self.api_key,
            "domains": domains,
        });
        let body = self.post(Endpoint::OrgBulkEnrich, &payload).await?;
        let parsed: BulkEnrichResponse = serde_json::from_value(body).map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse bulk enrichment response: {}", e))
        })?;

        Ok(parsed
            .organizations
            .into_iter()
            .flatten()
            .map(|org| (org.primary_domain, org.id))
            .collect())
    }

    /// Raw people search for the given domains and titles (page 1 only).
    ///
    /// The search index over-matches, happily returning people who left
    /// an organization years ago. Prefer
    /// [`find_people_currently_employed`](Self::find_people_currently_employed)
    /// unless stale associations are acceptable.
    pub async fn find_people(
        &mut self,
        domains: &[String],
        titles: &[String],
    ) -> Result<Vec<PersonRecord>, AppError> {
        let default_titles;
        let titles = if titles.is_empty() {
            default_titles = [DEFAULT_TITLE.to_string()];
            &default_titles[..]
        } else {
            titles
        };

        let payload = json!({
            "api_key": self.api_key,
            "q_organization_domains": domains.join("\n"),
            "page": 1,
            "person_titles": titles,
        });

        let body = self.post(Endpoint::PeopleSearch, &payload).await?;
        let parsed: PeopleSearchResponse = serde_json::from_value(body).map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse people search response: {}", e))
        })?;

        Ok(parsed.people)
    }

    /// People search restricted to current employees.
    ///
    /// Title/domain search is the noisy recall step; the enrichment
    /// lookup supplies the authoritative organization ids, and anyone
    /// whose recorded employer is not among them gets dropped. An
    /// unknown domain therefore yields an empty list, never an error.
    pub async fn find_people_currently_employed(
        &mut self,
        domains: &[String],
        titles: &[String],
    ) -> Result<Vec<PersonRecord>, AppError> {
        let resolved = self.resolve_organization_ids(domains).await?;
        let people = self.find_people(domains, titles).await?;

        let org_ids: HashSet<String> = resolved.into_values().collect();
        let matched = dedupe_people(filter_by_org_ids(people, &org_ids));

        tracing::info!(
            "✓ {} current {} found across {} domain(s)",
            matched.len(),
            if matched.len() == 1 { "employee" } else { "employees" },
            domains.len()
        );
        Ok(matched)
    }

    /// Sends one POST through the quota gate.
    ///
    /// Known exhaustion is slept out before sending. A 429 afterwards
    /// means the cache was stale; the wait is recomputed from the fresh
    /// headers (never below the retry floor) and the identical request
    /// is sent again, with no cap on attempts. Any other non-200 status
    /// fails immediately.
    async fn post(
        &mut self,
        endpoint: Endpoint,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, AppError> {
        if !self.quota.can_request() {
            let wait = self.quota.time_until_available();
            tracing::warn!(
                "Request budget exhausted, waiting {:?} before '{}'",
                wait,
                endpoint.path()
            );
            self.suspend(wait).await?;
        }

        loop {
            let response = self
                .client
                .post(format!("{}/{}", self.base_url, endpoint.path()))
                .header("Cache-Control", "no-cache")
                .json(payload)
                .send()
                .await
                .map_err(|e| {
                    AppError::ExternalApi(format!(
                        "Request to '{}' failed: {}",
                        endpoint.path(),
                        e
                    ))
                })?;

            self.observe_quota(response.headers());

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let wait = self.quota.time_until_available().max(self.retry_floor);
                tracing::warn!(
                    "'{}' throttled, retrying after {:?} (budget: {}/min {}/hr {}/day)",
                    endpoint.path(),
                    wait,
                    self.quota.minute(),
                    self.quota.hour(),
                    self.quota.day()
                );
                self.suspend(wait).await?;
                continue;
            }

            if status == reqwest::StatusCode::OK {
                return response.json().await.map_err(|e| {
                    AppError::ExternalApi(format!(
                        "Failed to parse '{}' response: {}",
                        endpoint.path(),
                        e
                    ))
                });
            }

            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ApiCallFailed {
                endpoint: endpoint.path().to_string(),
                status: status.as_u16(),
                body,
            });
        }
    }

    /// Refreshes the quota cache from whichever counters the response
    /// carried. Each header stands alone.
    fn observe_quota(&mut self, headers: &reqwest::header::HeaderMap) {
        let counter = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u32>().ok())
        };

        self.quota.record_observed(
            counter("x-24-hour-requests-left"),
            counter("x-hourly-requests-left"),
            counter("x-minute-requests-left"),
        );
    }

    /// Sleeps for `wait` unless the cancellation signal fires first.
    async fn suspend(&self, wait: Duration) -> Result<(), AppError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(AppError::Cancelled),
            _ = tokio::time::sleep(wait) => Ok(()),
        }
    }
}

/// Keeps only people whose recorded employer is in `org_ids`.
///
/// A person with no organization id at all cannot be confirmed as a
/// current employee, so they are dropped too.
pub fn filter_by_org_ids(
    people: Vec<PersonRecord>,
    org_ids: &HashSet<String>,
) -> Vec<PersonRecord> {
    people
        .into_iter()
        .filter(|person| {
            person
                .organization_id
                .as_ref()
                .is_some_and(|id| org_ids.contains(id))
        })
        .collect()
}

/// Drops repeated person records, keeping the first occurrence of each
/// id. Records without an id are kept as-is.
pub fn dedupe_people(people: Vec<PersonRecord>) -> Vec<PersonRecord> {
    let mut seen = HashSet::new();
    people
        .into_iter()
        .filter(|person| match &person.id {
            Some(id) => seen.insert(id.clone()),
            None => true,
        })
        .collect()
}
