use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============ Database Models ============

/// A company from the published MSP ranking.
///
/// The row id doubles as the ranking position (1 = top of the list),
/// which is why refreshes wipe the table instead of upserting.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CompanyRow {
    /// Ranking position and primary key.
    pub id: i64,
    /// Company name as published by the ranking site.
    pub name: String,
    /// Primary domain, stored bare ("example.com").
    pub url: String,
}

/// An executive contact tied to a ranked company.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContactRow {
    /// Unique identifier for the contact.
    pub id: i64,
    /// Company this contact was found at.
    pub company_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// One line of the flat-file export: a company joined against its
/// contacts, with NULL contact columns for companies that have none.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExportRecord {
    pub company_id: i64,
    pub name: String,
    pub url: String,
    pub contact_id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

// ============ Ranking Site Models ============

/// JSON returned by the ranking site's per-company detail endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RankingDetail {
    /// Company name as published.
    #[serde(rename = "Company")]
    pub company: String,
    /// Full site URL, usually prefixed with "https://www.".
    #[serde(rename = "URL")]
    pub url: String,
}

/// A scraped company, normalized and ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedCompany {
    pub name: String,
    /// Bare domain with the "https://www." prefix stripped.
    pub domain: String,
}

// ============ People API Models ============

/// A person as returned by the people search.
///
/// Only a handful of fields are inspected locally; everything else the
/// service sends rides along in `extra` untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonRecord {
    /// Opaque person identifier, used for de-duplication.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Employer as recorded by the search index. May be stale, which is
    /// why results get filtered against freshly resolved ids.
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub phone_numbers: Vec<PhoneEntry>,
    /// Fields we do not interpret, passed through unchanged.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One phone number attached to a person record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneEntry {
    #[serde(default)]
    pub sanitized_number: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body of a people search response.
#[derive(Debug, Deserialize)]
pub struct PeopleSearchResponse {
    #[serde(default)]
    pub people: Vec<PersonRecord>,
}

/// An organization as resolved by the enrichment endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationRecord {
    /// Opaque organization identifier, distinct from the domain.
    pub id: String,
    /// Canonical domain, which may differ from the one queried.
    pub primary_domain: String,
}

/// Body of a single-domain enrichment response.
///
/// An empty body (`{}`) means the domain is unknown to the service.
#[derive(Debug, Deserialize)]
pub struct EnrichResponse {
    #[serde(default)]
    pub organization: Option<OrganizationRecord>,
}

/// Body of a bulk enrichment response.
///
/// Unmatched domains come back as nulls inside the list.
#[derive(Debug, Deserialize)]
pub struct BulkEnrichResponse {
    #[serde(default)]
    pub organizations: Vec<Option<OrganizationRecord>>,
}

// ============ Cleaned Export Models ============

/// Contact details recovered from a hand-cleaned spreadsheet export,
/// keyed externally by (first name, last name).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanedContact {
    pub email: Option<String>,
    /// E.164-normalized phone number.
    pub phone: Option<String>,
}
