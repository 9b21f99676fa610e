//! Remote store client speaking the PostgREST dialect.
//!
//! Selects become `GET /rest/v1/{table}?col=eq.val&order=col.desc`, updates
//! `PATCH` with an id predicate, inserts `POST`, and procedures
//! `POST /rest/v1/rpc/{name}`. Auth rides on the `apikey` + bearer headers.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use url::Url;

use super::{DataStore, Filter, Order};
use crate::error::StoreError;

#[derive(Debug)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl HttpStore {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StoreError::Query(format!("invalid store URL {}: {}", base_url, e)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            api_key: api_key.to_string(),
        })
    }

    fn headers(&self) -> Result<HeaderMap, StoreError> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", self.api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&bearer)
                .map_err(|e| StoreError::Query(format!("invalid api key: {}", e)))?,
        );
        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| StoreError::Query(format!("invalid api key: {}", e)))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn table_url(&self, table: &str, filters: &[Filter], order: Option<&Order>) -> Result<Url, StoreError> {
        let mut url = self
            .base_url
            .join(&format!("rest/v1/{}", table))
            .map_err(|e| StoreError::Query(format!("invalid table {}: {}", table, e)))?;
        if !filters.is_empty() || order.is_some() {
            let mut pairs = url.query_pairs_mut();
            for filter in filters {
                pairs.append_pair(&filter.column, &format!("eq.{}", filter.value));
            }
            if let Some(order) = order {
                let direction = if order.descending { "desc" } else { "asc" };
                pairs.append_pair("order", &format!("{}.{}", order.column, direction));
            }
        }
        Ok(url)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Query(format!("{}: {}", status, body)))
    }
}

#[async_trait::async_trait]
impl DataStore for HttpStore {
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&Order>,
    ) -> Result<Vec<Value>, StoreError> {
        let url = self.table_url(table, filters, order)?;
        let response = self
            .client
            .get(url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let response = Self::check_status(response).await?;
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn update(&self, table: &str, id: &str, fields: Value) -> Result<(), StoreError> {
        let url = self.table_url(table, &[Filter::eq("id", id)], None)?;
        let response = self
            .client
            .patch(url)
            .headers(self.headers()?)
            .json(&fields)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Self::check_status(response).await.map(|_| ())
    }

    async fn insert(&self, table: &str, record: Value) -> Result<(), StoreError> {
        let url = self.table_url(table, &[], None)?;
        let response = self
            .client
            .post(url)
            .headers(self.headers()?)
            .json(&record)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Self::check_status(response).await.map(|_| ())
    }

    async fn rpc(&self, name: &str, params: Value) -> Result<Value, StoreError> {
        let url = self
            .base_url
            .join(&format!("rest/v1/rpc/{}", name))
            .map_err(|e| StoreError::Query(format!("invalid rpc {}: {}", name, e)))?;
        let response = self
            .client
            .post(url)
            .headers(self.headers()?)
            .json(&params)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let response = Self::check_status(response).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}
