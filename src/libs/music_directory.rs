use ormlite::model::Model;
use serde::{Deserialize, Serialize};

/**
 * MusicDirectory
 * any directory (root or nested) that still held at least one audio file
 * the last time it was scanned
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Model)]
#[ormlite(table = "music_directories")]
pub struct MusicDirectory {
    #[ormlite(primary_key)]
    pub id: String,
    pub directory: String, // Absolute path, unique
    pub last_scanned_at: i64, // Epoch milliseconds of the pass that refreshed this row
}
