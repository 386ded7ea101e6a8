use rand::Rng;

use crate::fetcher::CategoryFetch;
use crate::post::Post;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum AggregateMode {
    /// Keep the order of the reads
    Preserve,
    /// Uniformly random order, used by the landing page
    Shuffle,
}

/// Concatenates per-category reads in input order. Failed reads add nothing.
pub fn aggregate<R: Rng>(fetches: Vec<CategoryFetch>, mode: AggregateMode, rng: &mut R) -> Vec<Post> {
    let mut posts: Vec<Post> = fetches.into_iter()
        .flat_map(|fetch| fetch.into_posts())
        .collect();

    if mode == AggregateMode::Shuffle {
        shuffle(&mut posts, rng);
    }

    posts
}

/// Fisher-Yates: every permutation is equally likely
pub fn shuffle<T, R: Rng>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}
