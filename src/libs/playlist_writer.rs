use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::info;

use crate::libs::constants::{APP_NAME, PLAYLIST_EXTENSION};
use crate::libs::error::{AnyResult, ShufflistError};
use crate::libs::playlist::Playlist;

/**
 * Serialize a built playlist to an .m3u file, one resolved path per line.
 *
 * Each entry resolves to `directory/file_name`. Absolute mode writes that
 * path as-is; relative mode relativizes it against the playlist file's own
 * parent directory. The target must not exist yet: an existing file fails
 * the write and nothing is produced.
 */
pub fn write_playlist(
    target: &Path,
    playlist: &Playlist,
    use_absolute_path: bool,
) -> AnyResult<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
        .map_err(|err| match err.kind() {
            ErrorKind::AlreadyExists => ShufflistError::PlaylistFileExists(target.to_path_buf()),
            _ => ShufflistError::IO(err),
        })?;

    let playlist_dir_path = target.parent().unwrap_or_else(|| Path::new(""));

    let mut writer = m3u::Writer::new(&mut file);
    for (music_file, music_directory) in playlist {
        let absolute = Path::new(&music_directory.directory).join(&music_file.file_name);
        let path = if use_absolute_path {
            absolute
        } else {
            pathdiff::diff_paths(&absolute, playlist_dir_path).unwrap_or(absolute)
        };
        writer.write_entry(&m3u::path_entry(path))?;
    }

    Ok(())
}

/// Save the playlist under `save_directory` as `shufflist_<YYYYMMDDHHMMSS>.m3u`
pub fn save_playlist(
    save_directory: &Path,
    playlist: &Playlist,
    use_absolute_path: bool,
) -> AnyResult<PathBuf> {
    let date_time = Local::now().format("%Y%m%d%H%M%S");
    let target = save_directory.join(format!("{}_{}.{}", APP_NAME, date_time, PLAYLIST_EXTENSION));

    write_playlist(&target, playlist, use_absolute_path)?;
    info!("Saved playlist to {:?}", target);

    Ok(target)
}
