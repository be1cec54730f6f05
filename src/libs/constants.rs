// Scan and playlist constants

pub const APP_NAME: &str = "shufflist";

// Matched case-insensitively against file extensions during reconciliation
pub const SUPPORTED_AUDIO_EXTENSIONS: [&str; 2] = ["mp3", "wav"];

pub const PLAYLIST_EXTENSION: &str = "m3u";
