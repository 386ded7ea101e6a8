use std::io;

use ramhorns::Template;

use crate::category::Category;
use crate::selector::Selection;
use crate::view::{nav_items, parse_template, ViewNav, ViewPost};

#[derive(ramhorns::Content)]
struct CategoryPage<'a> {
    site_title: &'a str,
    background_url: &'a str,
    category: &'a str,
    category_upper: String,
    nav: Vec<ViewNav>,
    is_gallery: bool,
    is_single: bool,
    is_not_found: bool,
    is_empty: bool,
    posts: Vec<ViewPost>,
    active: Option<ViewPost>,
    suggested: Vec<ViewPost>,
    has_suggested: bool,
    missing_id: &'a str,
}

pub struct CategoryRenderer<'a> {
    pub template: Template<'a>,
}

impl CategoryRenderer<'_> {
    pub fn new(category_tpl_src: &str) -> io::Result<CategoryRenderer> {
        Ok(CategoryRenderer {
            template: parse_template(category_tpl_src, "category")?,
        })
    }

    pub fn render(&self, site_title: &str, background_url: &str, category: Category, selection: &Selection) -> String {
        let mut page = CategoryPage {
            site_title,
            background_url,
            category: category.table_name(),
            category_upper: category.table_name().to_uppercase(),
            nav: nav_items(Some(category)),
            is_gallery: false,
            is_single: false,
            is_not_found: false,
            is_empty: false,
            posts: vec![],
            active: None,
            suggested: vec![],
            has_suggested: false,
            missing_id: "",
        };

        match selection {
            Selection::Gallery { posts } => {
                page.is_gallery = true;
                page.is_empty = posts.is_empty();
                page.posts = posts.iter().map(ViewPost::from).collect();
            }
            Selection::Single { active, suggested } => {
                page.is_single = true;
                page.active = Some(ViewPost::from(*active));
                page.has_suggested = !suggested.is_empty();
                page.suggested = suggested.iter().map(|p| ViewPost::from(*p)).collect();
            }
            Selection::NotFound { post_id } => {
                page.is_not_found = true;
                page.missing_id = post_id.as_str();
            }
        }

        self.template.render(&page)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::selector::{select, Route, SuggestionLimit};
    use crate::test_data::sample_posts;
    use crate::view::read_template;

    use super::*;

    const TEMPLATE: &str = "{{category_upper}}|\
{{#is_gallery}}{{#is_empty}}NO {{category_upper}} FOUND{{/is_empty}}{{#posts}}[{{id}}]{{/posts}}{{/is_gallery}}\
{{#is_single}}{{#active}}<{{title}}:{{description}}:{{display_date}}>{{/active}}\
{{#has_suggested}}SUGGESTED{{#suggested}}[{{id}}]{{/suggested}}{{/has_suggested}}{{/is_single}}\
{{#is_not_found}}NOT FOUND {{missing_id}}{{/is_not_found}}";

    fn render(ids: &[&str], post_id: Option<&str>) -> String {
        let posts = sample_posts(Category::Arts, ids);
        let route = Route::parse("arts", post_id).unwrap();
        let selection = select(&route, &posts, SuggestionLimit::default());
        CategoryRenderer::new(TEMPLATE).unwrap().render("D", "", Category::Arts, &selection)
    }

    #[test]
    fn test_gallery() {
        assert_eq!(render(&["A1", "A2", "A3"], None), "ARTS|[A1][A2][A3]");
        assert_eq!(render(&[], None), "ARTS|NO ARTS FOUND");
    }

    #[test]
    fn test_single() {
        assert_eq!(render(&["A1", "A2", "A3"], Some("A2")),
                   "ARTS|<Title A2:Description of A2:2025-10-13>SUGGESTED[A1][A3]");
        assert_eq!(render(&["A1"], Some("A1")), "ARTS|<Title A1:Description of A1:2025-10-13>");
    }

    #[test]
    fn test_shipped_template_escapes_image_url() {
        let template_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("template");
        let src = read_template(&template_dir, "category.tpl").unwrap();

        let mut posts = sample_posts(Category::Arts, &["A1", "A2"]);
        posts[0].image_url = "x\" onerror=\"alert(1)".to_string();
        let route = Route::parse("arts", Some("A1")).unwrap();
        let selection = select(&route, &posts, SuggestionLimit::default());
        let res = CategoryRenderer::new(&src).unwrap().render("D", "", Category::Arts, &selection);

        assert!(!res.contains("onerror=\"alert(1)\""));
        assert!(res.contains("&quot;"));
    }

    #[test]
    fn test_not_found() {
        assert_eq!(render(&["A1"], Some("gone")), "ARTS|NOT FOUND gone");
    }
}
