use serde::Deserialize;
use strum_macros::{AsRefStr, EnumString};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub limit: Option<usize>,
    /// Comma separated genre names; a song matches if it has any of them.
    pub genres: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SearchSort {
    Relevance,
    Streams,
    CreatedAt,
    Title,
}

impl SearchSort {
    /// Column to order by. Relevance ranking is not exposed by the gateway.
    pub fn column(self) -> &'static str {
        match self {
            Self::Relevance | Self::CreatedAt => "created_at",
            Self::Streams => "streams",
            Self::Title => "title",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum GenreSongsSort {
    Streams,
    CreatedAt,
    Title,
    LikeCount,
}

/// Validated search parameters.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: String,
    pub limit: usize,
    pub genres: Vec<String>,
    pub sort_by: SearchSort,
    pub descending: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_names_parse_snake_case() {
        assert_eq!("like_count".parse::<GenreSongsSort>().unwrap(), GenreSongsSort::LikeCount);
        assert_eq!("created_at".parse::<GenreSongsSort>().unwrap(), GenreSongsSort::CreatedAt);
        assert!("likes".parse::<GenreSongsSort>().is_err());

        assert_eq!("relevance".parse::<SearchSort>().unwrap().column(), "created_at");
        assert_eq!(GenreSongsSort::LikeCount.as_ref(), "like_count");
    }
}
