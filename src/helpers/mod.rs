pub mod audio_helpers;
pub mod song_helpers;
