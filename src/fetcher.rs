use futures::future::join_all;
use spdlog::{debug, error};

use crate::category::Category;
use crate::post::Post;
use crate::store::{SortOrder, StoreError, TableStore};

/// Result of reading one category table
pub struct CategoryFetch {
    pub category: Category,
    pub result: Result<Vec<Post>, StoreError>,
}

impl CategoryFetch {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Posts of a successful read. A failed read counts as an empty table.
    pub fn into_posts(self) -> Vec<Post> {
        self.result.unwrap_or_default()
    }
}

pub struct DataFetcher<'a> {
    store: &'a dyn TableStore,
    order: SortOrder,
}

impl<'a> DataFetcher<'a> {
    pub fn new(store: &'a dyn TableStore, order: SortOrder) -> Self {
        DataFetcher { store, order }
    }

    /// Reads one category. Every returned post carries the category it was read from.
    pub async fn fetch(&self, category: Category) -> CategoryFetch {
        let result = self.store
            .select_all(category, self.order)
            .await
            .map(|posts| {
                posts.into_iter()
                    .map(|mut post| {
                        post.category = category;
                        post
                    })
                    .collect::<Vec<_>>()
            });

        match result {
            Ok(ref posts) => debug!("Fetched {} posts from {}", posts.len(), category),
            Err(ref e) => error!("Error fetching {}: {}", category, e),
        }

        CategoryFetch { category, result }
    }

    /// Issues all reads at once and waits for every one of them. The output
    /// follows the order of `categories`; one failure never cancels the rest.
    pub async fn fetch_all(&self, categories: &[Category]) -> Vec<CategoryFetch> {
        let reads = categories.iter().map(|category| self.fetch(*category));
        join_all(reads).await
    }
}

#[cfg(test)]
mod tests {
    use crate::post::PostId;
    use crate::store::memory_store::MemoryTableStore;
    use crate::test_data::sample_post;

    use super::*;

    #[tokio::test]
    async fn test_fetch_all_keeps_category_order() {
        let store = MemoryTableStore::with_posts(vec![
            sample_post(Category::Gifs, "G1"),
            sample_post(Category::Arts, "A1"),
        ]);
        let fetcher = DataFetcher::new(&store, SortOrder::Descending);
        let fetched = fetcher.fetch_all(&Category::ALL).await;

        let categories: Vec<_> = fetched.iter().map(|f| f.category).collect();
        assert_eq!(categories, Category::ALL.to_vec());
        assert!(fetched.iter().all(|f| f.is_ok()));
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let store = MemoryTableStore::with_posts(vec![
            sample_post(Category::Arts, "A1"),
            sample_post(Category::Gifs, "G1"),
        ]);
        store.fail_category(Category::Gifs);

        let fetcher = DataFetcher::new(&store, SortOrder::Descending);
        let mut fetched = fetcher.fetch_all(&[Category::Arts, Category::Gifs]).await;

        let gifs = fetched.pop().unwrap();
        assert!(!gifs.is_ok());
        assert!(gifs.into_posts().is_empty());

        let arts = fetched.pop().unwrap().into_posts();
        assert_eq!(arts.len(), 1);
        assert_eq!(arts[0].id, PostId::Text("A1".to_string()));
        assert_eq!(arts[0].category, Category::Arts);
    }
}
