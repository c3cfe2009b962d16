//! Phrase library endpoint types.
//!
//! `GET /api/phrases` (list with filter/search/pagination),
//! `GET /api/phrases/random` and `GET /api/phrases/categories`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A canned phrase from the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    pub id: i64,
    pub content: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    pub is_pickup_line: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A phrase category with its phrase count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub count: i64,
}

/// Query parameters for the phrase list endpoint. Unset fields are omitted
/// from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhraseQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

impl PhraseQuery {
    /// Render as `(key, value)` pairs for the HTTP client.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(ref category) = self.category {
            params.push(("category", category.clone()));
        }
        if let Some(ref search) = self.search {
            params.push(("search", search.clone()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset", offset.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}
