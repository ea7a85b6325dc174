use lazy_regex::regex_is_match;

use crate::error::{Error, Result};

pub const MAX_FEED_GENRES: usize = 3;
pub const MAX_USERNAME_LEN: usize = 10;
pub const MAX_SEARCH_QUERY_LEN: usize = 100;

/// Applies a default then checks `min..=max`.
pub fn bounded(value: Option<usize>, default: usize, min: usize, max: usize, name: &str) -> Result<usize> {
    let value = value.unwrap_or(default);
    if value < min || value > max {
        return Err(Error::InvalidInput {
            reason: format!("{name} must be between {min} and {max}"),
        });
    }
    Ok(value)
}

/// Song ids are numeric, usually zero padded.
pub fn validate_song_id(id: &str) -> Result<()> {
    if regex_is_match!(r"^[0-9]{1,12}$", id) {
        Ok(())
    } else {
        Err(Error::InvalidInput {
            reason: format!("Invalid song id: {id}"),
        })
    }
}

pub fn validate_username(username: &str) -> Result<()> {
    let len = username.chars().count();
    if len == 0 || len > MAX_USERNAME_LEN {
        return Err(Error::InvalidUsername);
    }
    Ok(())
}

/// Splits a comma separated list, trims, lowercases and drops empty entries.
pub fn split_genres(raw: Option<&str>) -> Vec<String> {
    let mut genres: Vec<String> = Vec::new();
    for genre in raw.unwrap_or_default().split(',') {
        let genre = genre.trim().to_lowercase();
        if !genre.is_empty() && !genres.contains(&genre) {
            genres.push(genre);
        }
    }
    genres
}

/// Genre feed accepts one to three genres.
pub fn feed_genres(raw: Option<&str>) -> Result<Vec<String>> {
    let genres = split_genres(raw);
    if genres.is_empty() {
        return Err(Error::InvalidInput {
            reason: "At least one genre is required".to_string(),
        });
    }
    if genres.len() > MAX_FEED_GENRES {
        return Err(Error::InvalidInput {
            reason: format!("Maximum {MAX_FEED_GENRES} genres allowed"),
        });
    }
    Ok(genres)
}

/// `asc` or `desc`, default `desc`.
pub fn is_descending(sort_order: Option<&str>) -> Result<bool> {
    match sort_order.map(str::to_ascii_lowercase).as_deref() {
        None | Some("desc") => Ok(true),
        Some("asc") => Ok(false),
        Some(other) => Err(Error::InvalidInput {
            reason: format!("sort_order must be 'asc' or 'desc', got '{other}'"),
        }),
    }
}
