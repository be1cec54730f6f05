use log::warn;
use ormlite::Model;

use crate::libs::error::AnyResult;
use crate::libs::music_directory::MusicDirectory;
use crate::libs::music_file::MusicFile;

use super::core::DB;

impl DB {
    /// Get every indexed directory from the database
    pub async fn get_all_music_directories(&mut self) -> AnyResult<Vec<MusicDirectory>> {
        let directories = MusicDirectory::select()
            .fetch_all(&mut self.connection)
            .await?;
        Ok(directories)
    }

    /// Indexed directories whose path is the given prefix or nested under it
    pub async fn get_music_directories_under(
        &mut self,
        prefix: &str,
    ) -> AnyResult<Vec<MusicDirectory>> {
        let directories = MusicDirectory::select()
            .dangerous_where("directory LIKE ? || '%'")
            .bind(prefix)
            .fetch_all(&mut self.connection)
            .await?;
        Ok(directories)
    }

    /// Refresh one directory and its file set as a single atomic unit.
    ///
    /// INSERT OR REPLACE on the unique `directory` column drops the previous
    /// row for the same path, and the cascade clears its old files, so the
    /// file set is replaced wholesale rather than diffed.
    pub async fn replace_music_directory_with_files(
        &mut self,
        directory: MusicDirectory,
        files: Vec<MusicFile>,
    ) -> AnyResult<()> {
        ormlite::query("BEGIN IMMEDIATE;")
            .execute(&mut self.connection)
            .await?;

        let result = self.upsert_directory_and_files(&directory, files).await;

        match result {
            Ok(()) => {
                ormlite::query("COMMIT;")
                    .execute(&mut self.connection)
                    .await?;
            }
            Err(err) => {
                if let Err(rollback_err) = ormlite::query("ROLLBACK;")
                    .execute(&mut self.connection)
                    .await
                {
                    warn!("Rollback failed after write error: {}", rollback_err);
                }
                return Err(err);
            }
        }

        self.publish_music_file_count().await
    }

    async fn upsert_directory_and_files(
        &mut self,
        directory: &MusicDirectory,
        files: Vec<MusicFile>,
    ) -> AnyResult<()> {
        ormlite::query(
            "INSERT OR REPLACE INTO music_directories (id, directory, last_scanned_at) VALUES (?, ?, ?)",
        )
        .bind(&directory.id)
        .bind(&directory.directory)
        .bind(directory.last_scanned_at)
        .execute(&mut self.connection)
        .await?;

        self.insert_music_files(files).await
    }

    /// Sweep: drop every indexed directory under the prefix whose last scan
    /// predates the given timestamp. The cascade removes their files too.
    pub async fn delete_music_directories_scanned_before(
        &mut self,
        prefix: &str,
        before: i64,
    ) -> AnyResult<()> {
        ormlite::query(
            "DELETE FROM music_directories WHERE directory LIKE ? || '%' AND last_scanned_at < ?",
        )
        .bind(prefix)
        .bind(before)
        .execute(&mut self.connection)
        .await?;

        self.publish_music_file_count().await
    }
}
