#![cfg(test)]

use chrono::NaiveDate;

use crate::category::Category;
use crate::post::{Post, PostId};

pub fn sample_post(category: Category, id: &str) -> Post {
    Post {
        id: PostId::parse(id),
        category,
        title: format!("Title {}", id),
        description: Some(format!("Description of {}", id)),
        image_url: format!("https://i.ibb.co/{}/image.png", id),
        display_date: NaiveDate::from_ymd_opt(2025, 10, 13),
        created_at: None,
    }
}

pub fn sample_posts(category: Category, ids: &[&str]) -> Vec<Post> {
    ids.iter().map(|id| sample_post(category, id)).collect()
}
