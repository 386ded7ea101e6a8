use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use spdlog::{debug, warn};

use crate::category::Category;
use crate::post::{Post, PostChanges, PostKey, PostRow, RawPost};
use crate::store::{SortOrder, StoreError, TableStore};

/// Client for a PostgREST style table API (`{url}/rest/v1/{table}`)
pub struct RestTableStore {
    base_url: String,
    anon_key: String,
    http_client: reqwest::Client,
}

impl RestTableStore {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    fn table_url(&self, category: Category) -> String {
        format!("{}/rest/v1/{}", self.base_url, category.table_name())
    }

    fn with_auth(&self, builder: RequestBuilder, access_token: &str) -> RequestBuilder {
        let bearer = if access_token.is_empty() { self.anon_key.as_str() } else { access_token };
        builder
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", bearer))
    }

    async fn check_status(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StoreError::Unauthorized(message)),
            _ => Err(StoreError::Status { status: status.as_u16(), message }),
        }
    }

    /// Writes ask for the affected rows back so a missing id can be told apart
    /// from a successful write.
    async fn affected_rows(response: Response, key: &PostKey) -> Result<(), StoreError> {
        let response = Self::check_status(response).await?;
        let rows: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        if rows.is_empty() {
            return Err(StoreError::NotFound(key.clone()));
        }
        Ok(())
    }
}

fn id_filter(key: &PostKey) -> String {
    format!("eq.{}", key.id)
}

#[async_trait]
impl TableStore for RestTableStore {
    async fn select_all(&self, category: Category, order: SortOrder) -> Result<Vec<Post>, StoreError> {
        let order_param = format!("created_at.{}", order.as_param());
        let request = self.http_client
            .get(self.table_url(category))
            .query(&[("select", "*"), ("order", order_param.as_str())]);

        let response = self.with_auth(request, "").send().await?;
        let response = Self::check_status(response).await?;
        let rows: Vec<RawPost> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        let mut posts = Vec::with_capacity(rows.len());
        for row in rows {
            match row.normalize(category) {
                Ok(post) => posts.push(post),
                Err(e) => warn!("Skipping row: {}", e),
            }
        }
        debug!("Read {} posts from {}", posts.len(), category);

        Ok(posts)
    }

    async fn insert(&self, category: Category, row: PostRow, access_token: &str) -> Result<(), StoreError> {
        let request = self.http_client
            .post(self.table_url(category))
            .header("Prefer", "return=minimal")
            .json(&[row]);

        let response = self.with_auth(request, access_token).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn update(&self, key: &PostKey, changes: PostChanges, access_token: &str) -> Result<(), StoreError> {
        let filter = id_filter(key);
        let request = self.http_client
            .patch(self.table_url(key.category))
            .query(&[("id", filter.as_str())])
            .header("Prefer", "return=representation")
            .json(&changes);

        let response = self.with_auth(request, access_token).send().await?;
        Self::affected_rows(response, key).await
    }

    async fn delete(&self, key: &PostKey, access_token: &str) -> Result<(), StoreError> {
        let filter = id_filter(key);
        let request = self.http_client
            .delete(self.table_url(key.category))
            .query(&[("id", filter.as_str())])
            .header("Prefer", "return=representation");

        let response = self.with_auth(request, access_token).send().await?;
        Self::affected_rows(response, key).await
    }
}
