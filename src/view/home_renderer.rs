use std::io;

use ramhorns::Template;

use crate::post::Post;
use crate::view::{nav_items, parse_template, ViewNav};

const TILTS: [i32; 11] = [-5, -4, -3, -2, -1, 0, 1, 2, 3, 4, 5];
const SIZES: [&str; 3] = ["small", "medium", "large"];

#[derive(ramhorns::Content)]
struct HomePage<'a> {
    site_title: &'a str,
    background_url: &'a str,
    nav: Vec<ViewNav>,
    posts: Vec<HomeItem>,
    is_empty: bool,
}

#[derive(ramhorns::Content)]
struct HomeItem {
    category: String,
    title: String,
    image_url: String,
    has_image: bool,
    category_link: String,
    tilt: i32,
    size: &'static str,
}

/// Landing page: every category mixed, each card linking to its category
pub struct HomeRenderer<'a> {
    pub template: Template<'a>,
}

impl HomeRenderer<'_> {
    pub fn new(home_tpl_src: &str) -> io::Result<HomeRenderer> {
        Ok(HomeRenderer {
            template: parse_template(home_tpl_src, "home")?,
        })
    }

    pub fn render(&self, site_title: &str, background_url: &str, posts: &[Post]) -> String {
        let items = posts.iter()
            .enumerate()
            .map(|(index, post)| HomeItem {
                category: post.category.to_string(),
                title: post.title.clone(),
                image_url: post.image_url.clone(),
                has_image: post.has_image(),
                category_link: format!("/{}/", post.category),
                tilt: TILTS[index % TILTS.len()],
                size: SIZES[index % SIZES.len()],
            })
            .collect();

        self.template.render(&HomePage {
            site_title,
            background_url,
            nav: nav_items(None),
            posts: items,
            is_empty: posts.is_empty(),
        })
    }
}
