use std::collections::HashMap;
use std::str::FromStr;

use spdlog::warn;

use crate::admin::ManageFilter;
use crate::category::Category;

#[derive(PartialEq, Debug)]
pub struct QueryString {
    items: HashMap<String, String>,
}

/// One shot message shown on the admin page after a redirect
#[derive(PartialEq, Debug, Clone)]
pub enum Notice {
    Success(String),
    Error(String),
}

impl Notice {
    /// Query string carrying this notice, to append to a redirect location
    pub fn to_query(&self) -> String {
        let pair = match self {
            Notice::Success(msg) => [("ok", msg.as_str())],
            Notice::Error(msg) => [("error", msg.as_str())],
        };
        serde_urlencoded::to_string(pair).unwrap_or_default()
    }
}

impl QueryString {
    pub fn from(buf: &str) -> Self {
        let vs: Vec<(String, String)> = serde_urlencoded::from_str(buf).unwrap_or_else(|_| vec![]);
        let items: HashMap<String, String> = vs.into_iter().collect();

        QueryString {
            items,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(|v| v.as_str())
    }

    /// `category` is a category name or `all`. Unknown names fall back to all.
    pub fn get_manage_filter(&self) -> ManageFilter {
        let category = match self.get("category") {
            None | Some("") | Some("all") => None,
            Some(name) => match Category::from_str(name) {
                Ok(category) => Some(category),
                Err(e) => {
                    warn!("{}. Showing all categories", e);
                    None
                }
            },
        };
        let search = self.get("q").unwrap_or("").to_string();

        ManageFilter { category, search }
    }

    pub fn get_notice(&self) -> Option<Notice> {
        if let Some(msg) = self.get("error") {
            return Some(Notice::Error(msg.to_string()));
        }
        self.get("ok").map(|msg| Notice::Success(msg.to_string()))
    }
}
