use std::path::Path;

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::ItemKey;
use log::warn;

/// Container-level metadata read once per audio file.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub duration_millis: i64,
}

/**
 * Reads metadata out of an audio file. The scanner only consumes this
 * contract, so tests can swap in an extractor with known answers.
 */
pub trait MetadataExtractor: Send + Sync {
    /// Metadata for the file, or `None` when it cannot be used. A `None`
    /// skips that single file and never aborts the directory.
    fn extract(&self, path: &Path) -> Option<TrackMetadata>;
}

/**
 * The real extractor, backed by lofty.
 */
pub struct LoftyExtractor;

impl MetadataExtractor for LoftyExtractor {
    fn extract(&self, path: &Path) -> Option<TrackMetadata> {
        match lofty::read_from_path(path) {
            Ok(tagged_file) => {
                let duration_millis =
                    i64::try_from(tagged_file.properties().duration().as_millis()).ok()?;

                let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

                let title = tag
                    .and_then(|tag| tag.get_string(&ItemKey::TrackTitle))
                    .map(ToString::to_string)
                    .unwrap_or_else(|| default_title(path));

                let artist = tag
                    .and_then(|tag| tag.get_string(&ItemKey::TrackArtist))
                    .unwrap_or("Unknown")
                    .to_string();

                Some(TrackMetadata {
                    title,
                    artist,
                    duration_millis,
                })
            }
            Err(err) => {
                warn!("Failed to read audio metadata: \"{}\". File {:?}", err, path);
                None
            }
        }
    }
}

/// Untagged files fall back to their file name without the extension.
fn default_title(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Unknown".to_string())
}
