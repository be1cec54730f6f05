use ormlite::model::Model;
use serde::{Deserialize, Serialize};

use crate::libs::utils::milli_time_to_string;

/**
 * MusicFile
 * represent a single indexed audio file
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Model)]
#[ormlite(table = "music_files")]
pub struct MusicFile {
    #[ormlite(primary_key)]
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration: i64, // Non-negative milliseconds
    pub file_name: String,
    pub directory_id: String, // References music_directories.id, cascade delete
}

impl MusicFile {
    /// Play time formatted for display, e.g. "02:05".
    pub fn play_time_string(&self) -> String {
        milli_time_to_string(self.duration)
    }
}
