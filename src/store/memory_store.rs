use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use spdlog::debug;

use crate::category::Category;
use crate::post::{parse_display_date, parse_timestamp, Post, PostChanges, PostId, PostKey, PostRow};
use crate::store::{SortOrder, StoreError, TableStore};

/// In-process table store. Used for local runs without a backend and in tests,
/// where single tables can be switched into a failing state.
pub struct MemoryTableStore {
    tables: Mutex<HashMap<Category, Vec<Post>>>,
    failing: Mutex<HashSet<Category>>,
    next_id: AtomicI64,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        MemoryTableStore {
            tables: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn with_posts(posts: Vec<Post>) -> Self {
        let store = Self::new();
        for post in posts {
            store.seed(post);
        }
        store
    }

    /// Adds a post as-is, keeping its id and category
    pub fn seed(&self, post: Post) {
        if let PostId::Int(n) = post.id {
            self.next_id.fetch_max(n + 1, Ordering::SeqCst);
        }
        let mut tables = self.tables.lock().unwrap();
        tables.entry(post.category).or_default().push(post);
    }

    pub fn fail_category(&self, category: Category) {
        self.failing.lock().unwrap().insert(category);
    }

    pub fn heal_category(&self, category: Category) {
        self.failing.lock().unwrap().remove(&category);
    }

    pub fn len(&self, category: Category) -> usize {
        let tables = self.tables.lock().unwrap();
        tables.get(&category).map(|t| t.len()).unwrap_or(0)
    }

    fn check_available(&self, category: Category) -> Result<(), StoreError> {
        if self.failing.lock().unwrap().contains(&category) {
            return Err(StoreError::Unavailable(category));
        }
        Ok(())
    }

    fn check_token(access_token: &str) -> Result<(), StoreError> {
        if access_token.is_empty() {
            return Err(StoreError::Unauthorized("Writes need a signed in session".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryTableStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn select_all(&self, category: Category, order: SortOrder) -> Result<Vec<Post>, StoreError> {
        self.check_available(category)?;

        let tables = self.tables.lock().unwrap();
        let mut posts = tables.get(&category).cloned().unwrap_or_default();
        // Stable sort keeps insertion order between equal timestamps
        match order {
            SortOrder::Ascending => posts.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortOrder::Descending => posts.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
        Ok(posts)
    }

    async fn insert(&self, category: Category, row: PostRow, access_token: &str) -> Result<(), StoreError> {
        Self::check_token(access_token)?;
        self.check_available(category)?;

        let id = PostId::Int(self.next_id.fetch_add(1, Ordering::SeqCst));
        let description = if row.description.is_empty() { None } else { Some(row.description) };
        let post = Post {
            id,
            category,
            title: row.title,
            description,
            image_url: row.image_url,
            display_date: parse_display_date(&row.date_created),
            created_at: parse_timestamp(&row.created_at),
        };
        debug!("Inserted {}", post.key());

        let mut tables = self.tables.lock().unwrap();
        tables.entry(category).or_default().push(post);
        Ok(())
    }

    async fn update(&self, key: &PostKey, changes: PostChanges, access_token: &str) -> Result<(), StoreError> {
        Self::check_token(access_token)?;
        self.check_available(key.category)?;

        let mut tables = self.tables.lock().unwrap();
        let post = tables
            .get_mut(&key.category)
            .and_then(|t| t.iter_mut().find(|p| p.id.same_as(&key.id)))
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;

        if let Some(title) = changes.title {
            post.title = title;
        }
        if let Some(description) = changes.description {
            post.description = if description.is_empty() { None } else { Some(description) };
        }
        if let Some(image_url) = changes.image_url {
            post.image_url = image_url;
        }
        if let Some(date_created) = changes.date_created {
            post.display_date = parse_display_date(&date_created);
        }
        Ok(())
    }

    async fn delete(&self, key: &PostKey, access_token: &str) -> Result<(), StoreError> {
        Self::check_token(access_token)?;
        self.check_available(key.category)?;

        let mut tables = self.tables.lock().unwrap();
        let table = tables
            .get_mut(&key.category)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        let before = table.len();
        table.retain(|p| !p.id.same_as(&key.id));
        if table.len() == before {
            return Err(StoreError::NotFound(key.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn post(category: Category, id: i64, minute: u32) -> Post {
        Post {
            id: PostId::Int(id),
            category,
            title: format!("post {}", id),
            description: None,
            image_url: String::new(),
            display_date: None,
            created_at: Some(Utc.with_ymd_and_hms(2025, 1, 1, 12, minute, 0).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_select_ordering() {
        let store = MemoryTableStore::with_posts(vec![
            post(Category::Arts, 1, 5),
            post(Category::Arts, 2, 1),
            post(Category::Arts, 3, 9),
        ]);

        let asc = store.select_all(Category::Arts, SortOrder::Ascending).await.unwrap();
        let ids: Vec<_> = asc.iter().map(|p| p.id.to_string()).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);

        let desc = store.select_all(Category::Arts, SortOrder::Descending).await.unwrap();
        let ids: Vec<_> = desc.iter().map(|p| p.id.to_string()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);

        assert!(store.select_all(Category::Gifs, SortOrder::Descending).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_table() {
        let store = MemoryTableStore::with_posts(vec![post(Category::Gifs, 1, 0)]);
        store.fail_category(Category::Gifs);
        let res = store.select_all(Category::Gifs, SortOrder::Descending).await;
        assert!(matches!(res, Err(StoreError::Unavailable(Category::Gifs))));

        store.heal_category(Category::Gifs);
        assert_eq!(store.select_all(Category::Gifs, SortOrder::Descending).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_assigns_next_id() {
        let store = MemoryTableStore::with_posts(vec![post(Category::Arts, 41, 0)]);
        let row = PostRow {
            title: "fresh".to_string(),
            description: String::new(),
            image_url: String::new(),
            date_created: "2025-03-04".to_string(),
            created_at: "2025-03-04T10:00:00Z".to_string(),
        };
        store.insert(Category::Arts, row, "token").await.unwrap();

        let posts = store.select_all(Category::Arts, SortOrder::Descending).await.unwrap();
        assert_eq!(posts[0].id, PostId::Int(42));
        assert_eq!(posts[0].description, None);
    }

    #[tokio::test]
    async fn test_writes_need_token() {
        let store = MemoryTableStore::with_posts(vec![post(Category::Arts, 1, 0)]);
        let key = PostKey { category: Category::Arts, id: PostId::Int(1) };
        assert!(matches!(store.delete(&key, "").await, Err(StoreError::Unauthorized(_))));
        assert_eq!(store.len(Category::Arts), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let store = MemoryTableStore::with_posts(vec![post(Category::Arts, 1, 0)]);
        let key = PostKey { category: Category::Arts, id: PostId::Int(1) };
        let changes = PostChanges { title: Some("renamed".to_string()), ..Default::default() };
        store.update(&key, changes, "token").await.unwrap();
        let posts = store.select_all(Category::Arts, SortOrder::Descending).await.unwrap();
        assert_eq!(posts[0].title, "renamed");

        let missing = PostKey { category: Category::Sketches, id: PostId::Int(1) };
        assert!(matches!(store.delete(&missing, "token").await, Err(StoreError::NotFound(_))));
        store.delete(&key, "token").await.unwrap();
        assert_eq!(store.len(Category::Arts), 0);
    }

    #[tokio::test]
    async fn test_text_ids_from_routes() {
        let mut numeric_text = post(Category::Gifs, 0, 0);
        numeric_text.id = PostId::Text("12".to_string());
        let store = MemoryTableStore::with_posts(vec![numeric_text]);

        let key = PostKey { category: Category::Gifs, id: PostId::parse("12") };
        let changes = PostChanges { title: Some("found".to_string()), ..Default::default() };
        store.update(&key, changes, "token").await.unwrap();
        store.delete(&key, "token").await.unwrap();
        assert_eq!(store.len(Category::Gifs), 0);
    }
}
