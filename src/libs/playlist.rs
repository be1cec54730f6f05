use std::collections::HashMap;

use log::info;
use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::libs::database::DB;
use crate::libs::error::AnyResult;
use crate::libs::music_directory::MusicDirectory;
use crate::libs::music_file::MusicFile;
use crate::libs::utils::milli_time_to_string;

/// An ordered random draw of tracks fitting a duration budget
pub type Playlist = Vec<(MusicFile, MusicDirectory)>;

/**
 * Build a randomized playlist whose total duration stays within
 * `budget_millis`, drawing from every directory nested under a selected
 * root.
 *
 * The fill is deliberately approximate: candidates fitting the remaining
 * budget are fetched once per outer round, then drawn uniformly (with
 * repetition allowed) until a draw no longer fits, which triggers the next,
 * tighter round. The loop ends when no candidate fits at all. Allowing the
 * same track to be drawn several times in one round is a behavioral
 * contract, not an accident.
 */
pub async fn build_playlist(db: &mut DB, budget_millis: i64) -> AnyResult<Playlist> {
    let mut remaining = budget_millis;

    // Every indexed directory living under one of the selected roots
    let mut music_directories: Vec<MusicDirectory> = Vec::new();
    for root in db.get_all_selected_directories().await? {
        music_directories.extend(db.get_music_directories_under(&root.directory).await?);
    }

    let directory_ids: Vec<String> = music_directories
        .iter()
        .map(|directory| directory.id.clone())
        .collect();
    let directories_by_id: HashMap<&str, &MusicDirectory> = music_directories
        .iter()
        .map(|directory| (directory.id.as_str(), directory))
        .collect();

    let mut playlist: Playlist = Vec::new();
    let mut rng = thread_rng();

    loop {
        let candidates = db
            .get_music_files_in_directories(&directory_ids, Some(remaining))
            .await?;
        if candidates.is_empty() {
            break;
        }

        loop {
            let file = match candidates.choose(&mut rng) {
                Some(file) => file,
                None => break,
            };
            if file.duration > remaining {
                break;
            }
            // A directory swept away mid-build just drops the draw
            let directory = match directories_by_id.get(file.directory_id.as_str()) {
                Some(directory) => *directory,
                None => continue,
            };
            remaining -= file.duration;
            playlist.push((file.clone(), directory.clone()));
        }
    }

    info!(
        "Built a playlist of {} track(s) filling {} of the requested {}",
        playlist.len(),
        milli_time_to_string(budget_millis - remaining),
        milli_time_to_string(budget_millis),
    );
    Ok(playlist)
}

/// Track count and formatted total duration, for display
pub fn playlist_info(playlist: &Playlist) -> (usize, String) {
    let total: i64 = playlist.iter().map(|(file, _)| file.duration).sum();
    (playlist.len(), milli_time_to_string(total))
}
