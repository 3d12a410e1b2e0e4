//! HTTP client for the catalog's REST API.

mod response;

use std::time::Duration;

use partsync_core::{AppConfig, Collection};
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::{json, Value};

use crate::catalog::{Catalog, Page};
use crate::error::CatalogError;
use crate::retry::retry_with_backoff;

use response::{error_message, flatten_entry, ListResponse, SingleResponse};

pub(crate) const USER_AGENT: &str = concat!("partsync/", env!("CARGO_PKG_VERSION"));

/// Page size used for `find_by` lookups; matches are expected to be few.
const FIND_PAGE_SIZE: u32 = 100;

/// HTTP client for the catalog.
///
/// Speaks `{base}/api/{collection}` with bodies wrapped as `{ "data": … }`.
/// Non-2xx responses become typed errors: 404 → [`CatalogError::NotFound`],
/// 409 or a "must be unique" validation error → [`CatalogError::Conflict`],
/// 429 → [`CatalogError::RateLimited`], anything else
/// [`CatalogError::UnexpectedStatus`].
///
/// Transient errors (network failures, 429, 5xx) are retried with
/// exponential backoff up to `max_retries` additional attempts. Creates are
/// not idempotent and are only retried on 429 or a refused connection.
pub struct HttpCatalog {
    client: Client,
    base_url: String,
    token: Option<String>,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl HttpCatalog {
    /// Creates a client with the given timeout and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidBaseUrl`] if `base_url` does not parse,
    /// or [`CatalogError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, CatalogError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        Url::parse(trimmed).map_err(|e| CatalogError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: trimmed.to_owned(),
            token,
            max_retries,
            backoff_base_ms,
        })
    }

    /// Creates a client from the application configuration.
    ///
    /// # Errors
    ///
    /// See [`HttpCatalog::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, CatalogError> {
        Self::new(
            &config.catalog_url,
            config.catalog_token.clone(),
            config.request_timeout_secs,
            config.max_retries,
            config.retry_backoff_base_ms,
        )
    }

    /// Builds `{base}/api/{collection}[/{id}]` with the given query pairs.
    fn collection_url(
        &self,
        collection: Collection,
        id: Option<i64>,
        query: &[(&str, String)],
    ) -> Result<Url, CatalogError> {
        let raw = match id {
            Some(id) => format!("{}/api/{}/{id}", self.base_url, collection.path()),
            None => format!("{}/api/{}", self.base_url, collection.path()),
        };
        let mut url = Url::parse(&raw).map_err(|e| CatalogError::InvalidBaseUrl {
            base_url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Like [`Self::collection_url`], plus one `populate[i]` pair per
    /// relation so linked ids come back in the response.
    fn populated_url(
        &self,
        collection: Collection,
        id: Option<i64>,
        query: &[(&str, String)],
    ) -> Result<Url, CatalogError> {
        let mut url = self.collection_url(collection, id, query)?;
        let relations = collection.relations();
        if !relations.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (i, relation) in relations.iter().enumerate() {
                pairs.append_pair(&format!("populate[{i}]"), relation);
            }
        }
        Ok(url)
    }

    /// Sends one request with retries and returns the decoded JSON body
    /// (`Value::Null` for an empty body).
    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        collection: Collection,
    ) -> Result<Value, CatalogError> {
        let idempotent = method != Method::POST;
        retry_with_backoff(self.max_retries, self.backoff_base_ms, idempotent, || {
            let method = method.clone();
            let url = url.clone();
            async move {
                let mut request = self
                    .client
                    .request(method, url.clone())
                    .header(reqwest::header::ACCEPT, "application/json");
                if let Some(token) = &self.token {
                    request = request.bearer_auth(token);
                }
                if let Some(body) = body {
                    request = request.json(body);
                }

                let response = request.send().await?;
                let status = response.status();

                if status == StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    return Err(CatalogError::RateLimited {
                        collection: collection.to_string(),
                        retry_after_secs,
                    });
                }

                let text = response.text().await?;

                if status == StatusCode::NOT_FOUND {
                    return Err(CatalogError::NotFound {
                        url: url.to_string(),
                    });
                }

                if !status.is_success() {
                    let message = error_message(&text);
                    if status == StatusCode::CONFLICT || message.contains("must be unique") {
                        return Err(CatalogError::Conflict {
                            collection: collection.to_string(),
                            message,
                        });
                    }
                    return Err(CatalogError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                        message,
                    });
                }

                if text.trim().is_empty() {
                    return Ok(Value::Null);
                }
                serde_json::from_str::<Value>(&text).map_err(|e| CatalogError::Deserialize {
                    context: format!("{collection} response from {url}"),
                    source: e,
                })
            }
        })
        .await
    }

    fn decode_list(body: Value, collection: Collection) -> Result<ListResponse, CatalogError> {
        serde_json::from_value(body).map_err(|e| CatalogError::Deserialize {
            context: format!("{collection} list response"),
            source: e,
        })
    }

    fn decode_single(body: Value, collection: Collection) -> Result<Value, CatalogError> {
        let single: SingleResponse =
            serde_json::from_value(body).map_err(|e| CatalogError::Deserialize {
                context: format!("{collection} entry response"),
                source: e,
            })?;
        Ok(flatten_entry(single.data))
    }
}

impl Catalog for HttpCatalog {
    async fn list_page(
        &self,
        collection: Collection,
        page: u32,
        page_size: u32,
    ) -> Result<Page, CatalogError> {
        let url = self.populated_url(
            collection,
            None,
            &[
                ("pagination[page]", page.to_string()),
                ("pagination[pageSize]", page_size.to_string()),
            ],
        )?;
        let body = self.execute(Method::GET, url, None, collection).await?;
        let list = Self::decode_list(body, collection)?;
        Ok(Page {
            items: list.data.into_iter().map(flatten_entry).collect(),
            meta: list.meta.and_then(|m| m.pagination),
        })
    }

    async fn find_by(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> Result<Vec<Value>, CatalogError> {
        let filter = format!("filters[{field}][$eq]");
        let url = self.populated_url(
            collection,
            None,
            &[
                (filter.as_str(), value.to_owned()),
                ("pagination[pageSize]", FIND_PAGE_SIZE.to_string()),
            ],
        )?;
        let body = self.execute(Method::GET, url, None, collection).await?;
        let list = Self::decode_list(body, collection)?;
        Ok(list.data.into_iter().map(flatten_entry).collect())
    }

    async fn get(&self, collection: Collection, id: i64) -> Result<Option<Value>, CatalogError> {
        let url = self.populated_url(collection, Some(id), &[])?;
        match self.execute(Method::GET, url, None, collection).await {
            Ok(body) => Self::decode_single(body, collection).map(Some),
            Err(CatalogError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create(&self, collection: Collection, data: &Value) -> Result<Value, CatalogError> {
        let url = self.populated_url(collection, None, &[])?;
        let body = json!({ "data": data });
        let response = self
            .execute(Method::POST, url, Some(&body), collection)
            .await?;
        Self::decode_single(response, collection)
    }

    async fn update(
        &self,
        collection: Collection,
        id: i64,
        data: &Value,
    ) -> Result<Value, CatalogError> {
        let url = self.populated_url(collection, Some(id), &[])?;
        let body = json!({ "data": data });
        let response = self
            .execute(Method::PUT, url, Some(&body), collection)
            .await?;
        Self::decode_single(response, collection)
    }

    async fn delete(&self, collection: Collection, id: i64) -> Result<(), CatalogError> {
        let url = self.collection_url(collection, Some(id), &[])?;
        self.execute(Method::DELETE, url, None, collection).await?;
        Ok(())
    }

    async fn count(&self, collection: Collection) -> Result<u64, CatalogError> {
        let url = self.collection_url(
            collection,
            None,
            &[
                ("pagination[page]", "1".to_owned()),
                ("pagination[pageSize]", "1".to_owned()),
            ],
        )?;
        let body = self.execute(Method::GET, url, None, collection).await?;
        let list = Self::decode_list(body, collection)?;
        Ok(list
            .meta
            .and_then(|m| m.pagination)
            .and_then(|p| p.total)
            .unwrap_or(list.data.len() as u64))
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
