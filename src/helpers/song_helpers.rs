use crate::clients::storage::StorageConfig;
use crate::models::song::SongRow;

/// Song ids are zero padded to seven digits.
pub fn format_song_id(number: u64) -> String {
    format!("{number:07}")
}

/// Where a song's audio and thumbnail live in the bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLocation {
    pub folder: String,
    pub filename: String,
}

/// Audio location. User uploads keep the file name recorded at upload time,
/// catalog songs are `<id>.mp3` in the catalog folder.
pub fn audio_location(config: &StorageConfig, row: &SongRow) -> AssetLocation {
    locate(
        row.storage_url.as_deref(),
        &config.user_audio_folder,
        &config.audio_folder,
        format!("{}.mp3", row.id),
    )
}

pub fn thumbnail_location(config: &StorageConfig, row: &SongRow) -> AssetLocation {
    locate(
        row.thumbnail_url.as_deref(),
        &config.user_thumbnail_folder,
        &config.thumbnail_folder,
        format!("{}.png", row.id),
    )
}

fn locate(
    persisted_url: Option<&str>,
    user_folder: &str,
    catalog_folder: &str,
    catalog_filename: String,
) -> AssetLocation {
    match persisted_url.and_then(|url| filename_from_url(url, user_folder)) {
        Some(filename) => AssetLocation {
            folder: user_folder.to_string(),
            filename,
        },
        None => AssetLocation {
            folder: catalog_folder.to_string(),
            filename: catalog_filename,
        },
    }
}

/// Text after `/<folder>/` with any query string removed.
pub fn filename_from_url(url: &str, folder: &str) -> Option<String> {
    if folder.is_empty() {
        return None;
    }
    let marker = format!("/{folder}/");
    let start = url.find(&marker)? + marker.len();
    let rest = &url[start..];
    let filename = rest.split(['?', '#']).next().unwrap_or_default();

    if filename.is_empty() {
        return None;
    }

    Some(
        urlencoding::decode(filename)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| filename.to_string()),
    )
}

/// Lowercase ASCII slug for file names, `-` separated.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug.truncate(50);
    slug.trim_end_matches('-').to_string()
}

/// Lowercased extension without the dot.
pub fn file_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
