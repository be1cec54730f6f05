use std::path::Path;

use log::info;
use ormlite::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode};
use ormlite::Connection;
use tokio::sync::watch;

use crate::libs::error::AnyResult;

/// Core database struct that holds the SQLite connection
pub struct DB {
    pub connection: SqliteConnection,
    pub(crate) file_count: watch::Sender<u64>,
}

impl DB {
    /// Open (or create) the index database at the given path
    pub async fn open(database_path: &Path) -> AnyResult<DB> {
        info!("Opening connection to database: {:?}", database_path);

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            // The schema relies on ON DELETE CASCADE
            .foreign_keys(true);

        let connection = SqliteConnection::connect_with(&options).await?;

        Ok(DB::from_connection(connection))
    }

    /// In-memory database, used by the tests
    pub async fn open_in_memory() -> AnyResult<DB> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);

        let connection = SqliteConnection::connect_with(&options).await?;

        Ok(DB::from_connection(connection))
    }

    fn from_connection(connection: SqliteConnection) -> DB {
        let (file_count, _) = watch::channel(0);
        DB {
            connection,
            file_count,
        }
    }

    /// Create tables within a SQLite connection
    pub async fn create_tables(&mut self) -> AnyResult<()> {
        ormlite::query(
            "CREATE TABLE IF NOT EXISTS selected_directories (
                id TEXT PRIMARY KEY NOT NULL,
                directory TEXT NOT NULL UNIQUE -- Absolute path of the scan root
            );",
        )
        .execute(&mut self.connection)
        .await?;

        ormlite::query(
            "CREATE TABLE IF NOT EXISTS music_directories (
                id TEXT PRIMARY KEY NOT NULL,
                directory TEXT NOT NULL UNIQUE, -- Absolute path
                last_scanned_at INTEGER NOT NULL -- Epoch milliseconds
            );",
        )
        .execute(&mut self.connection)
        .await?;

        ormlite::query(
            "CREATE TABLE IF NOT EXISTS music_files (
                id TEXT PRIMARY KEY NOT NULL,
                title TEXT NOT NULL,
                artist TEXT NOT NULL,
                duration INTEGER NOT NULL, -- Milliseconds
                file_name TEXT NOT NULL,
                directory_id TEXT NOT NULL,
                FOREIGN KEY(directory_id) REFERENCES music_directories(id) ON DELETE CASCADE
            );",
        )
        .execute(&mut self.connection)
        .await?;

        ormlite::query(
            "CREATE INDEX IF NOT EXISTS index_music_file_directory ON music_files (directory_id);",
        )
        .execute(&mut self.connection)
        .await?;

        ormlite::query(
            "CREATE INDEX IF NOT EXISTS index_music_directory_path ON music_directories (directory);",
        )
        .execute(&mut self.connection)
        .await?;

        Ok(())
    }

    /// Change-notification stream on the music file row count. The sender
    /// side re-publishes after every write that can touch the table, which
    /// covers cascades from directory replacement and sweeps.
    pub fn watch_music_file_count(&self) -> watch::Receiver<u64> {
        self.file_count.subscribe()
    }

    pub(crate) async fn publish_music_file_count(&mut self) -> AnyResult<()> {
        let count = self.count_music_files().await?;
        self.file_count.send_if_modified(|current| {
            if *current == count {
                false
            } else {
                *current = count;
                true
            }
        });
        Ok(())
    }
}
