use std::fmt;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::Category;

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Row identifier. Tables use either a serial integer or a uuid string.
/// It is only unique inside one category table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostId {
    Int(i64),
    Text(String),
}

impl PostId {
    /// Builds an id from a route or form segment
    pub fn parse(s: &str) -> PostId {
        match s.parse::<i64>() {
            Ok(n) => PostId::Int(n),
            Err(_) => PostId::Text(s.to_string()),
        }
    }

    /// Only the canonical form matches: `/arts/12/` but not `/arts/012/`
    pub fn matches(&self, segment: &str) -> bool {
        match self {
            PostId::Int(n) => n.to_string() == segment,
            PostId::Text(s) => s == segment,
        }
    }

    /// Same row id, whether it was parsed as a number or kept as text
    pub fn same_as(&self, other: &PostId) -> bool {
        match (self, other) {
            (PostId::Int(a), PostId::Int(b)) => a == b,
            (PostId::Text(a), PostId::Text(b)) => a == b,
            (a, b) => a.to_string() == b.to_string(),
        }
    }
}

impl Display for PostId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PostId::Int(n) => write!(f, "{}", n),
            PostId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// The only key that identifies a post across categories
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostKey {
    pub category: Category,
    pub id: PostId,
}

impl Display for PostKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.category, self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: PostId,
    pub category: Category,
    pub title: String,
    pub description: Option<String>,
    /// Empty when the upload failed or no image was attached
    pub image_url: String,
    pub display_date: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn key(&self) -> PostKey {
        PostKey {
            category: self.category,
            id: self.id.clone(),
        }
    }

    pub fn has_image(&self) -> bool {
        !self.image_url.trim().is_empty()
    }

    /// Path of the single view for this post
    pub fn link(&self) -> String {
        format!("/{}/{}/", self.category, self.id)
    }
}

impl Display for Post {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "key={}, title={}, image={}, date={}",
               self.key(),
               self.title,
               self.image_url,
               self.display_date.map(|d| d.to_string()).unwrap_or_default(),
        )
    }
}

/// Row as returned by the backend. Older tables use `desc`, newer ones
/// `description`, and `created_at` is missing on some of them. Writes only
/// touch `description`, so it wins when both are set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPost {
    pub id: Option<PostId>,
    pub title: Option<String>,
    pub desc: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub date_created: Option<String>,
    pub created_at: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| if v.trim().is_empty() { None } else { Some(v) })
}

pub fn parse_display_date(buf: &str) -> Option<NaiveDate> {
    let day = buf.trim().get(0..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

pub fn parse_timestamp(buf: &str) -> Option<DateTime<Utc>> {
    let buf = buf.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(buf) {
        return Some(dt.with_timezone(&Utc));
    }
    // timestamp columns without a time zone
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(buf, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

impl RawPost {
    /// Converts a backend row into the canonical post, tagging it with the
    /// table it was read from.
    pub fn normalize(self, category: Category) -> Result<Post, String> {
        let id = self.id.ok_or_else(|| format!("Row in {} without id", category))?;
        let title = self.title
            .ok_or_else(|| format!("Row {} in {} without title", id, category))?;

        let description = non_empty(self.description).or(non_empty(self.desc));
        let display_date = self.date_created.as_deref().and_then(parse_display_date);
        let created_at = self.created_at.as_deref().and_then(parse_timestamp);

        Ok(Post {
            id,
            category,
            title,
            description,
            image_url: self.image_url.unwrap_or_default(),
            display_date,
            created_at,
        })
    }
}

/// Row sent to the backend on insert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRow {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub date_created: String,
    pub created_at: String,
}

/// Partial row sent on update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PostChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
}

impl PostChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
            && self.image_url.is_none() && self.date_created.is_none()
    }
}
