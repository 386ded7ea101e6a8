use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::Path;

use ramhorns::Template;

use crate::category::Category;
use crate::post::Post;

pub mod admin_renderer;
pub mod category_renderer;
pub mod home_renderer;

#[derive(ramhorns::Content)]
pub(crate) struct ViewNav {
    name: &'static str,
    label: &'static str,
    active: bool,
}

pub(crate) fn nav_items(active: Option<Category>) -> Vec<ViewNav> {
    Category::ALL.iter()
        .map(|c| ViewNav {
            name: c.table_name(),
            label: c.label(),
            active: Some(*c) == active,
        })
        .collect()
}

#[derive(ramhorns::Content)]
pub(crate) struct ViewPost {
    id: String,
    category: String,
    title: String,
    description: String,
    has_description: bool,
    image_url: String,
    has_image: bool,
    display_date: String,
    created: String,
    link: String,
}

impl From<&Post> for ViewPost {
    fn from(post: &Post) -> Self {
        let description = post.description.clone().unwrap_or_default();
        ViewPost {
            id: post.id.to_string(),
            category: post.category.to_string(),
            title: post.title.clone(),
            has_description: !description.is_empty(),
            description,
            image_url: post.image_url.clone(),
            has_image: post.has_image(),
            display_date: post.display_date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            created: post.created_at.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            link: post.link(),
        }
    }
}

pub(crate) fn parse_template<'a>(src: &'a str, name: &str) -> io::Result<Template<'a>> {
    match Template::new(src) {
        Ok(x) => Ok(x),
        Err(e) => Err(io::Error::new(ErrorKind::InvalidInput, format!("Error parsing {} template: {}", name, e))),
    }
}

/// Reads `name` from the template directory
pub fn read_template(template_dir: &Path, name: &str) -> io::Result<String> {
    let template_path = template_dir.join(name);
    match fs::read_to_string(&template_path) {
        Ok(src) => Ok(src),
        Err(e) => Err(io::Error::new(e.kind(), format!("Error reading template {}: {}", template_path.display(), e))),
    }
}
