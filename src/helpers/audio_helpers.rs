use std::io::Cursor;

use lofty::file::AudioFile;
use lofty::probe::Probe;

use crate::error::{Error, Result};

/// Duration in seconds read from the audio container. Zero-length audio is rejected.
pub fn audio_duration_secs(bytes: &[u8]) -> Result<f64> {
    let tagged_file = Probe::new(Cursor::new(bytes))
        .guess_file_type()
        .map_err(|err| Error::InvalidUpload {
            reason: format!("Unable to detect audio format: {err}"),
        })?
        .read()?;

    let duration = tagged_file.properties().duration().as_secs_f64();
    if duration <= 0.0 {
        return Err(Error::InvalidUpload {
            reason: "Audio file has no playable duration".to_string(),
        });
    }

    Ok(duration)
}
