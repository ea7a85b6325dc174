use crate::{
    error::{Error, Result},
    helpers::song_helpers::file_extension,
    models::upload::UploadedFile,
};

pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "m4a", "aac"];
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Audio,
    Image,
}

impl FileKind {
    fn allowed(self) -> &'static [&'static str] {
        match self {
            Self::Audio => AUDIO_EXTENSIONS,
            Self::Image => IMAGE_EXTENSIONS,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Image => "image",
        }
    }
}

pub struct UploadValidator;

impl UploadValidator {
    /// Returns the normalized extension on success.
    pub fn validate(file: &UploadedFile, kind: FileKind) -> Result<String> {
        if file.bytes.is_empty() {
            return Err(Error::InvalidUpload {
                reason: format!("The {} file is empty", kind.label()),
            });
        }

        if file.bytes.len() > MAX_FILE_SIZE {
            return Err(Error::InvalidUpload {
                reason: format!(
                    "The {} file exceeds the {} MB limit",
                    kind.label(),
                    MAX_FILE_SIZE / (1024 * 1024)
                ),
            });
        }

        let extension = file_extension(&file.filename)
            .filter(|ext| kind.allowed().contains(&ext.as_str()))
            .ok_or_else(|| Error::InvalidUpload {
                reason: format!(
                    "Unsupported {} format. Allowed: {}",
                    kind.label(),
                    kind.allowed().join(", ")
                ),
            })?;

        Ok(extension)
    }

    pub fn content_type(extension: &str) -> &'static str {
        match extension {
            "mp3" => "audio/mpeg",
            "wav" => "audio/wav",
            "flac" => "audio/flac",
            "m4a" => "audio/mp4",
            "aac" => "audio/aac",
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            _ => "application/octet-stream",
        }
    }
}
