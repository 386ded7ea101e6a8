use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fixed set of content groupings. Each one is backed by its own table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Arts,
    Gifs,
    Sketches,
    Animes,
}

impl Category {
    pub const ALL: [Category; 4] = [Category::Arts, Category::Gifs, Category::Sketches, Category::Animes];

    /// Name of the backend table holding the posts of this category
    pub fn table_name(&self) -> &'static str {
        match self {
            Category::Arts => "arts",
            Category::Gifs => "gifs",
            Category::Sketches => "sketches",
            Category::Animes => "animes",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Arts => "Arts",
            Category::Gifs => "Gifs",
            Category::Sketches => "Sketches",
            Category::Animes => "Animes",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table_name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnknownCategory(pub String);

impl Display for UnknownCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arts" => Ok(Category::Arts),
            "gifs" => Ok(Category::Gifs),
            "sketches" => Ok(Category::Sketches),
            "animes" => Ok(Category::Animes),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known() {
        for cat in Category::ALL {
            assert_eq!(Category::from_str(cat.table_name()), Ok(cat));
        }
        assert_eq!(Category::from_str("GIFS"), Ok(Category::Gifs));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(Category::from_str("photos"), Err(UnknownCategory("photos".to_string())));
        assert!(Category::from_str("").is_err());
        assert!(Category::from_str("admin").is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Category::Sketches).unwrap();
        assert_eq!(json, "\"sketches\"");
        let cat: Category = serde_json::from_str("\"animes\"").unwrap();
        assert_eq!(cat, Category::Animes);
    }
}
