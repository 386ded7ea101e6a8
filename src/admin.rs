use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use spdlog::{error, info};

use crate::aggregator::{aggregate, AggregateMode};
use crate::auth::Session;
use crate::category::Category;
use crate::fetcher::DataFetcher;
use crate::post::{Post, PostChanges, PostKey, PostRow, MAX_DESCRIPTION_LEN, MAX_TITLE_LEN};
use crate::store::{SortOrder, StoreError, TableStore};
use crate::uploader::{ImageUploader, UploadError};

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct NewPost {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub display_date: NaiveDate,
    pub image: Option<Vec<u8>>,
}

#[derive(Default)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub display_date: Option<NaiveDate>,
    pub image: Option<Vec<u8>>,
}

/// Filter of the manage list: one category or all of them, plus a case
/// insensitive title search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManageFilter {
    pub category: Option<Category>,
    pub search: String,
}

impl ManageFilter {
    pub fn matches(&self, post: &Post) -> bool {
        let category_ok = match self.category {
            None => true,
            Some(category) => post.category == category,
        };
        let search = self.search.trim().to_lowercase();
        category_ok && post.title.to_lowercase().contains(&search)
    }
}

pub struct ManageList {
    pub posts: Vec<Post>,
    pub total: usize,
}

fn validate_title(title: &str) -> Result<String, AdminError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AdminError::Invalid("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AdminError::Invalid(format!("Title is longer than {} characters", MAX_TITLE_LEN)));
    }
    Ok(title.to_string())
}

fn validate_description(description: &str) -> Result<String, AdminError> {
    let description = description.trim();
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(AdminError::Invalid(format!("Description is longer than {} characters", MAX_DESCRIPTION_LEN)));
    }
    Ok(description.to_string())
}

/// Creation timestamp of a new post: the chosen day at the current time of day
fn creation_timestamp(display_date: NaiveDate, now: DateTime<Utc>) -> String {
    display_date
        .and_time(now.time())
        .and_utc()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Content management on top of the table store. Images are uploaded before
/// any write, so a failed upload leaves the tables untouched.
pub struct AdminService<'a> {
    store: &'a dyn TableStore,
    uploader: &'a dyn ImageUploader,
    order: SortOrder,
}

impl<'a> AdminService<'a> {
    pub fn new(store: &'a dyn TableStore, uploader: &'a dyn ImageUploader, order: SortOrder) -> Self {
        AdminService { store, uploader, order }
    }

    async fn upload(&self, image: Option<Vec<u8>>) -> Result<Option<String>, AdminError> {
        match image {
            None => Ok(None),
            Some(bytes) => match self.uploader.upload(&bytes).await {
                Ok(url) => Ok(Some(url)),
                Err(e) => {
                    error!("Image upload failed: {}", e);
                    Err(e.into())
                }
            },
        }
    }

    pub async fn create(&self, session: &Session, new_post: NewPost) -> Result<(), AdminError> {
        let title = validate_title(&new_post.title)?;
        let description = validate_description(&new_post.description)?;
        let image_url = self.upload(new_post.image).await?.unwrap_or_default();

        let row = PostRow {
            title,
            description,
            image_url,
            date_created: new_post.display_date.format("%Y-%m-%d").to_string(),
            created_at: creation_timestamp(new_post.display_date, Utc::now()),
        };

        self.store.insert(new_post.category, row, &session.access_token).await?;
        info!("Post created in {}", new_post.category);
        Ok(())
    }

    pub async fn update(&self, session: &Session, key: &PostKey, update: PostUpdate) -> Result<(), AdminError> {
        let title = update.title.as_deref().map(validate_title).transpose()?;
        let description = update.description.as_deref().map(validate_description).transpose()?;

        let has_changes = title.is_some() || description.is_some()
            || update.display_date.is_some() || update.image.is_some();
        if !has_changes {
            return Err(AdminError::Invalid("Nothing to update".to_string()));
        }

        let image_url = self.upload(update.image).await?;
        let changes = PostChanges {
            title,
            description,
            image_url,
            date_created: update.display_date.map(|d| d.format("%Y-%m-%d").to_string()),
        };

        self.store.update(key, changes, &session.access_token).await?;
        info!("Post {} updated", key);
        Ok(())
    }

    pub async fn delete(&self, session: &Session, key: &PostKey) -> Result<(), AdminError> {
        self.store.delete(key, &session.access_token).await?;
        info!("Post {} deleted", key);
        Ok(())
    }

    /// Reads every category and applies the manage filter. `total` counts the
    /// posts before filtering.
    pub async fn list(&self, filter: &ManageFilter) -> ManageList {
        let fetcher = DataFetcher::new(self.store, self.order);
        let fetches = fetcher.fetch_all(&Category::ALL).await;
        let all = aggregate(fetches, AggregateMode::Preserve, &mut rand::rng());

        let total = all.len();
        let posts = all.into_iter().filter(|p| filter.matches(p)).collect();
        ManageList { posts, total }
    }

    pub async fn find(&self, key: &PostKey) -> Option<Post> {
        let fetcher = DataFetcher::new(self.store, self.order);
        fetcher.fetch(key.category).await
            .into_posts()
            .into_iter()
            .find(|p| p.id.same_as(&key.id))
    }
}
