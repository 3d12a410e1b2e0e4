use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by catalog on {collection} (retry after {retry_after_secs}s)")]
    RateLimited {
        collection: String,
        retry_after_secs: u64,
    },

    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("uniqueness conflict in {collection}: {message}")]
    Conflict { collection: String, message: String },

    #[error("unexpected HTTP status {status} from {url}: {message}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        message: String,
    },

    #[error("pagination limit reached for {collection}: exceeded {max_pages} pages")]
    PaginationLimit {
        collection: String,
        max_pages: usize,
    },

    #[error("invalid catalog URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}

impl CatalogError {
    /// `true` when the catalog refused a write because the record already
    /// exists.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, CatalogError::Conflict { .. })
    }
}
