use std::io;

use chrono::NaiveDate;
use ramhorns::Template;

use crate::admin::{ManageFilter, ManageList};
use crate::category::Category;
use crate::post::{MAX_DESCRIPTION_LEN, MAX_TITLE_LEN};
use crate::query_string::Notice;
use crate::view::{parse_template, ViewPost};

#[derive(ramhorns::Content)]
struct CategoryOption {
    name: &'static str,
    label: &'static str,
    selected: bool,
}

#[derive(ramhorns::Content)]
struct AdminPage<'a> {
    site_title: &'a str,
    user_email: &'a str,
    has_notice_ok: bool,
    has_notice_error: bool,
    notice: &'a str,
    upload_configured: bool,
    today: String,
    max_title_len: u32,
    max_description_len: u32,
    categories: Vec<CategoryOption>,
    filter_all: bool,
    filter_options: Vec<CategoryOption>,
    search: &'a str,
    shown: u32,
    total: u32,
    posts: Vec<ViewPost>,
    is_empty: bool,
}

#[derive(ramhorns::Content)]
struct LoginPage<'a> {
    site_title: &'a str,
    email: &'a str,
    has_error: bool,
    error: &'a str,
}

fn category_options(selected: Option<Category>) -> Vec<CategoryOption> {
    Category::ALL.iter()
        .map(|c| CategoryOption {
            name: c.table_name(),
            label: c.label(),
            selected: Some(*c) == selected,
        })
        .collect()
}

pub struct AdminView<'a> {
    pub user_email: &'a str,
    pub notice: Option<&'a Notice>,
    pub upload_configured: bool,
    pub today: NaiveDate,
    pub filter: &'a ManageFilter,
    pub list: &'a ManageList,
}

/// Admin area: create form, manage list, and the login form
pub struct AdminRenderer<'a> {
    pub admin_template: Template<'a>,
    pub login_template: Template<'a>,
}

impl<'a> AdminRenderer<'a> {
    pub fn new(admin_tpl_src: &'a str, login_tpl_src: &'a str) -> io::Result<AdminRenderer<'a>> {
        Ok(AdminRenderer {
            admin_template: parse_template(admin_tpl_src, "admin")?,
            login_template: parse_template(login_tpl_src, "login")?,
        })
    }

    pub fn render_admin(&self, site_title: &str, view: &AdminView) -> String {
        let (has_notice_ok, has_notice_error, notice) = match view.notice {
            Some(Notice::Success(msg)) => (true, false, msg.as_str()),
            Some(Notice::Error(msg)) => (false, true, msg.as_str()),
            None => (false, false, ""),
        };

        self.admin_template.render(&AdminPage {
            site_title,
            user_email: view.user_email,
            has_notice_ok,
            has_notice_error,
            notice,
            upload_configured: view.upload_configured,
            today: view.today.format("%Y-%m-%d").to_string(),
            max_title_len: MAX_TITLE_LEN as u32,
            max_description_len: MAX_DESCRIPTION_LEN as u32,
            categories: category_options(Some(Category::Arts)),
            filter_all: view.filter.category.is_none(),
            filter_options: category_options(view.filter.category),
            search: view.filter.search.as_str(),
            shown: view.list.posts.len() as u32,
            total: view.list.total as u32,
            posts: view.list.posts.iter().map(ViewPost::from).collect(),
            is_empty: view.list.posts.is_empty(),
        })
    }

    pub fn render_login(&self, site_title: &str, email: &str, error: Option<&str>) -> String {
        self.login_template.render(&LoginPage {
            site_title,
            email,
            has_error: error.is_some(),
            error: error.unwrap_or(""),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::test_data::sample_posts;

    use super::*;

    const ADMIN_TPL: &str = "{{user_email}}|{{#has_notice_ok}}OK:{{notice}}{{/has_notice_ok}}{{#has_notice_error}}ERR:{{notice}}{{/has_notice_error}}|\
{{#filter_options}}{{#selected}}*{{/selected}}{{name}} {{/filter_options}}|\
SHOWING {{shown}} OF {{total}}|{{#posts}}[{{category}}/{{id}}]{{/posts}}{{#is_empty}}NO POSTS FOUND{{/is_empty}}";

    const LOGIN_TPL: &str = "{{#has_error}}<{{error}}>{{/has_error}}{{email}}";

    #[test]
    fn test_render_admin() {
        let renderer = AdminRenderer::new(ADMIN_TPL, LOGIN_TPL).unwrap();
        let filter = ManageFilter { category: Some(Category::Gifs), search: String::new() };
        let list = ManageList { posts: sample_posts(Category::Gifs, &["3", "4"]), total: 9 };
        let notice = Notice::Success("Post added successfully!".to_string());
        let view = AdminView {
            user_email: "admin@devcat.exe",
            notice: Some(&notice),
            upload_configured: true,
            today: NaiveDate::from_ymd_opt(2025, 10, 16).unwrap(),
            filter: &filter,
            list: &list,
        };

        let res = renderer.render_admin("D", &view);
        assert_eq!(res, "admin@devcat.exe|OK:Post added successfully!|arts *gifs sketches animes |\
SHOWING 2 OF 9|[gifs/3][gifs/4]");
    }

    #[test]
    fn test_render_admin_empty() {
        let renderer = AdminRenderer::new(ADMIN_TPL, LOGIN_TPL).unwrap();
        let filter = ManageFilter::default();
        let list = ManageList { posts: vec![], total: 0 };
        let notice = Notice::Error("Error: quota".to_string());
        let view = AdminView {
            user_email: "a",
            notice: Some(&notice),
            upload_configured: false,
            today: NaiveDate::from_ymd_opt(2025, 10, 16).unwrap(),
            filter: &filter,
            list: &list,
        };

        let res = renderer.render_admin("D", &view);
        assert_eq!(res, "a|ERR:Error: quota|arts gifs sketches animes |SHOWING 0 OF 0|NO POSTS FOUND");
    }

    #[test]
    fn test_render_login() {
        let renderer = AdminRenderer::new(ADMIN_TPL, LOGIN_TPL).unwrap();
        assert_eq!(renderer.render_login("D", "a@b.c", Some("Invalid login credentials")),
                   "<Invalid login credentials>a@b.c");
        assert_eq!(renderer.render_login("D", "", None), "");
    }
}
