use ormlite::Model;

use crate::libs::error::AnyResult;
use crate::libs::music_file::MusicFile;

use super::core::DB;

impl DB {
    /// Insert a batch of music files. Callers are expected to hold the
    /// surrounding transaction; see `replace_music_directory_with_files`.
    pub(crate) async fn insert_music_files(&mut self, files: Vec<MusicFile>) -> AnyResult<()> {
        for file in files {
            file.insert(&mut self.connection).await?;
        }
        Ok(())
    }

    /// Get files under a set of directories, optionally capped by duration
    pub async fn get_music_files_in_directories(
        &mut self,
        directory_ids: &[String],
        max_duration: Option<i64>,
    ) -> AnyResult<Vec<MusicFile>> {
        if directory_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Improve me once https://github.com/launchbadge/sqlx/issues/875 is fixed
        let placeholders = directory_ids
            .iter()
            .map(|_| "?")
            .collect::<Vec<_>>()
            .join(", ");
        let where_statement = match max_duration {
            Some(_) => format!("directory_id IN ({}) AND duration <= ?", placeholders),
            None => format!("directory_id IN ({})", placeholders),
        };

        let mut query_builder = MusicFile::select().dangerous_where(&where_statement);

        for id in directory_ids {
            query_builder = query_builder.bind(id);
        }
        if let Some(duration) = max_duration {
            query_builder = query_builder.bind(duration);
        }

        let files = query_builder.fetch_all(&mut self.connection).await?;
        Ok(files)
    }

    /// Total number of indexed files
    pub async fn count_music_files(&mut self) -> AnyResult<u64> {
        let (count,): (i64,) = ormlite::query_as("SELECT COUNT(*) FROM music_files")
            .fetch_one(&mut self.connection)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::libs::database::DB;
    use crate::libs::music_directory::MusicDirectory;
    use crate::libs::music_file::MusicFile;

    async fn seeded_db() -> (DB, String) {
        let mut db = DB::open_in_memory().await.unwrap();
        db.create_tables().await.unwrap();

        let dir = MusicDirectory {
            id: Uuid::new_v4().to_string(),
            directory: "/music".to_string(),
            last_scanned_at: 1,
        };
        let files = [("short", 60_000), ("medium", 120_000), ("long", 200_000)]
            .iter()
            .map(|(name, duration)| MusicFile {
                id: Uuid::new_v4().to_string(),
                title: name.to_string(),
                artist: "Unknown".to_string(),
                duration: *duration,
                file_name: format!("{name}.mp3"),
                directory_id: dir.id.clone(),
            })
            .collect();

        let id = dir.id.clone();
        db.replace_music_directory_with_files(dir, files)
            .await
            .unwrap();
        (db, id)
    }

    #[tokio::test]
    async fn duration_filter_is_inclusive() {
        let (mut db, dir_id) = seeded_db().await;

        let files = db
            .get_music_files_in_directories(&[dir_id], Some(120_000))
            .await
            .unwrap();
        let mut titles: Vec<&str> = files.iter().map(|f| f.title.as_str()).collect();
        titles.sort();
        assert_eq!(titles, vec!["medium", "short"]);
    }

    #[tokio::test]
    async fn empty_directory_set_yields_no_files() {
        let (mut db, _) = seeded_db().await;
        let files = db.get_music_files_in_directories(&[], None).await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn count_tracks_every_row() {
        let (mut db, _) = seeded_db().await;
        assert_eq!(db.count_music_files().await.unwrap(), 3);
    }
}
