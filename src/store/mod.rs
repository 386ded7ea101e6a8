use async_trait::async_trait;
use serde::Deserialize;

use crate::category::Category;
use crate::post::{Post, PostChanges, PostKey, PostRow};

pub mod memory_store;
pub mod rest_store;

/// Direction of the `created_at` ordering applied by the backend
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_param(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Descending
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Invalid backend response: {0}")]
    Decode(String),
    #[error("Not authorized: {0}")]
    Unauthorized(String),
    #[error("Post {0} not found")]
    NotFound(PostKey),
    #[error("Table {0} is unavailable")]
    Unavailable(Category),
}

/// Table oriented data store. One table per category.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Reads every row of the category table ordered by creation timestamp.
    async fn select_all(&self, category: Category, order: SortOrder) -> Result<Vec<Post>, StoreError>;

    async fn insert(&self, category: Category, row: PostRow, access_token: &str) -> Result<(), StoreError>;

    async fn update(&self, key: &PostKey, changes: PostChanges, access_token: &str) -> Result<(), StoreError>;

    async fn delete(&self, key: &PostKey, access_token: &str) -> Result<(), StoreError>;
}
