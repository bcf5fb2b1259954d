//! Record types returned by the pipeline
//!
//! A record only exists when every expected field was extracted; partial
//! records are never built. Numeric-looking cells are stored as
//! `serde_json::Value` so that "12", "1,234" and "n/a" keep whatever shape the
//! page gave them after coercion.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Common surface of every fetched record
pub trait Record: Serialize + Send + 'static {
    /// The identifier this record was fetched for
    fn id(&self) -> &str;

    /// The page the record was extracted from
    fn url(&self) -> &str;
}

/// Link to the affiliation an author or department belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffiliationRef {
    pub id: Value,
    pub name: String,
    pub url: String,
}

/// SINTA score block of an author profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub overall: Value,
    #[serde(rename = "3_years")]
    pub three_years: Value,
    pub affiliation: Value,
    pub affiliation_3_years: Value,
}

/// One statistic across the three indexers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexerStats {
    pub scopus: Value,
    pub scholar: Value,
    pub wos: Value,
}

/// A researcher profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorRecord {
    pub id: String,
    pub name: String,
    pub url: String,
    pub affiliation: AffiliationRef,
    pub department: String,
    pub subjects: Vec<String>,
    pub score: Scores,
    pub image_url: Option<String>,
    pub google_scholar_id: Option<String>,
    pub articles: IndexerStats,
    pub citations: IndexerStats,
    pub cited_docs: IndexerStats,
    #[serde(rename = "h-index")]
    pub h_index: IndexerStats,
    #[serde(rename = "i10-index")]
    pub i10_index: IndexerStats,
    #[serde(rename = "g-index")]
    pub g_index: IndexerStats,
}

impl Record for AuthorRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// An affiliation (university) profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffiliationRecord {
    pub id: String,
    pub code: String,
    pub name: String,
    pub univ_abbrev: String,
    pub location: String,
    pub url: String,
}

impl Record for AffiliationRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// A department profile; `id` is the department's hashed id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentRecord {
    pub id: String,
    pub name: String,
    pub location: String,
    pub url: String,
    pub affiliation: AffiliationRef,
}

impl Record for DepartmentRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn url(&self) -> &str {
        &self.url
    }
}
