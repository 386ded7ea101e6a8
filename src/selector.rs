use std::str::FromStr;

use crate::category::{Category, UnknownCategory};
use crate::post::Post;

pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

/// Route derived input of the selector
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub category: Category,
    pub post_id: Option<String>,
}

impl Route {
    pub fn parse(category: &str, post_id: Option<&str>) -> Result<Route, UnknownCategory> {
        let category = Category::from_str(category)?;
        let post_id = post_id
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());
        Ok(Route { category, post_id })
    }
}

/// How many same-category posts are offered next to the active one
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SuggestionLimit {
    Fixed(usize),
    Unbounded,
}

impl SuggestionLimit {
    /// `0` in the configuration means no cap
    pub fn from_config(limit: Option<usize>) -> Self {
        match limit {
            None => SuggestionLimit::Fixed(DEFAULT_SUGGESTION_LIMIT),
            Some(0) => SuggestionLimit::Unbounded,
            Some(n) => SuggestionLimit::Fixed(n),
        }
    }

    fn take(&self) -> usize {
        match self {
            SuggestionLimit::Fixed(n) => *n,
            SuggestionLimit::Unbounded => usize::MAX,
        }
    }
}

impl Default for SuggestionLimit {
    fn default() -> Self {
        SuggestionLimit::Fixed(DEFAULT_SUGGESTION_LIMIT)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection<'a> {
    /// No post id in the route: the whole category is shown
    Gallery { posts: &'a [Post] },
    Single { active: &'a Post, suggested: Vec<&'a Post> },
    /// The post id is not in this category (stale link, deleted post)
    NotFound { post_id: String },
}

impl Selection<'_> {
    pub fn active(&self) -> Option<&Post> {
        match self {
            Selection::Single { active, .. } => Some(*active),
            _ => None,
        }
    }
}

/// Resolves the active and suggested posts of `route` from the posts read
/// for its category. Pure: the same inputs always give the same selection.
pub fn select<'a>(route: &Route, posts: &'a [Post], limit: SuggestionLimit) -> Selection<'a> {
    let post_id = match route.post_id {
        None => return Selection::Gallery { posts },
        Some(ref id) => id,
    };

    let in_category = |post: &&Post| post.category == route.category;
    let active = posts.iter()
        .filter(in_category)
        .find(|post| post.id.matches(post_id));

    match active {
        None => Selection::NotFound { post_id: post_id.clone() },
        Some(active) => {
            let suggested = posts.iter()
                .filter(in_category)
                .filter(|post| post.id != active.id)
                .take(limit.take())
                .collect();
            Selection::Single { active, suggested }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_data::sample_posts;

    use super::*;

    fn ids(posts: &[&Post]) -> Vec<String> {
        posts.iter().map(|p| p.id.to_string()).collect()
    }

    #[test]
    fn test_gallery() {
        let posts = sample_posts(Category::Arts, &["A1", "A2", "A3"]);
        let route = Route::parse("arts", None).unwrap();
        let selection = select(&route, &posts, SuggestionLimit::default());

        assert!(selection.active().is_none());
        match selection {
            Selection::Gallery { posts: shown } => assert_eq!(shown, posts.as_slice()),
            other => panic!("unexpected selection {:?}", other),
        }
    }

    #[test]
    fn test_single_found() {
        let posts = sample_posts(Category::Arts, &["A1", "A2", "A3"]);
        let route = Route::parse("arts", Some("A2")).unwrap();

        match select(&route, &posts, SuggestionLimit::default()) {
            Selection::Single { active, suggested } => {
                assert_eq!(active.id.to_string(), "A2");
                assert_eq!(ids(&suggested), vec!["A1", "A3"]);
            }
            other => panic!("unexpected selection {:?}", other),
        }
    }

    #[test]
    fn test_single_not_found() {
        let posts = sample_posts(Category::Arts, &["A1", "A2"]);
        let route = Route::parse("arts", Some("A9")).unwrap();
        let selection = select(&route, &posts, SuggestionLimit::default());
        assert_eq!(selection, Selection::NotFound { post_id: "A9".to_string() });
        assert!(selection.active().is_none());

        let empty: Vec<Post> = vec![];
        let selection = select(&route, &empty, SuggestionLimit::default());
        assert!(matches!(selection, Selection::NotFound { .. }));
    }

    #[test]
    fn test_only_canonical_id_resolves() {
        let posts = sample_posts(Category::Arts, &["12", "13"]);
        for segment in ["012", "+12"] {
            let route = Route::parse("arts", Some(segment)).unwrap();
            assert!(matches!(select(&route, &posts, SuggestionLimit::default()), Selection::NotFound { .. }));
        }
        let route = Route::parse("arts", Some("12")).unwrap();
        assert_eq!(select(&route, &posts, SuggestionLimit::default()).active().map(|p| p.id.to_string()),
                   Some("12".to_string()));
    }

    #[test]
    fn test_other_category_is_not_found() {
        let posts = sample_posts(Category::Gifs, &["1", "2"]);
        let route = Route::parse("arts", Some("1")).unwrap();
        assert!(matches!(select(&route, &posts, SuggestionLimit::default()), Selection::NotFound { .. }));
    }

    #[test]
    fn test_suggestions_capped_in_order() {
        let posts = sample_posts(Category::Sketches, &["1", "2", "3", "4", "5", "6", "7", "8"]);
        let route = Route::parse("sketches", Some("3")).unwrap();

        match select(&route, &posts, SuggestionLimit::default()) {
            Selection::Single { suggested, .. } => {
                assert_eq!(ids(&suggested), vec!["1", "2", "4", "5", "6"]);
            }
            other => panic!("unexpected selection {:?}", other),
        }

        match select(&route, &posts, SuggestionLimit::Unbounded) {
            Selection::Single { suggested, .. } => assert_eq!(suggested.len(), 7),
            other => panic!("unexpected selection {:?}", other),
        }
    }

    #[test]
    fn test_idempotent() {
        let posts = sample_posts(Category::Animes, &["1", "2", "3"]);
        let route = Route::parse("animes", Some("2")).unwrap();
        let first = select(&route, &posts, SuggestionLimit::Fixed(1));
        let second = select(&route, &posts, SuggestionLimit::Fixed(1));
        assert_eq!(first, second);
    }

    #[test]
    fn test_route_parse() {
        assert!(Route::parse("music", None).is_err());
        assert_eq!(Route::parse("gifs", Some("  ")).unwrap().post_id, None);
        assert_eq!(SuggestionLimit::from_config(Some(0)), SuggestionLimit::Unbounded);
        assert_eq!(SuggestionLimit::from_config(None), SuggestionLimit::Fixed(5));
    }
}
