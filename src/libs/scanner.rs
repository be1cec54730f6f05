use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::libs::constants::SUPPORTED_AUDIO_EXTENSIONS;
use crate::libs::database::DB;
use crate::libs::error::AnyResult;
use crate::libs::music_directory::MusicDirectory;
use crate::libs::music_file::MusicFile;
use crate::libs::track::MetadataExtractor;
use crate::libs::utils::TimeLogger;
use crate::libs::walker::DirectoryWalker;

/// Progress events emitted while a scan runs
#[derive(Debug, Clone, PartialEq)]
pub enum ScanProgress {
    /// The directory that was just reconciled
    Directory(PathBuf),
    Succeeded,
    Failed,
}

/// Terminal result of a scan request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed,
    /// Another scan was running; this request coalesced into a no-op
    AlreadyRunning,
    /// Stopped on request, index left in its partial state
    Cancelled,
}

/**
 * Owns one scan run's lifecycle: walks every root in order, reconciles each
 * visited directory against the index, and sweeps stale rows per root.
 * Only one scan may be active at a time.
 */
pub struct Scanner {
    running: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
}

impl Scanner {
    pub fn new() -> Self {
        Scanner {
            running: Arc::new(AtomicBool::new(false)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the in-flight scan to stop after the directory it is processing
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Scan every root in order. A request while a scan is already running
    /// leaves the existing run untouched and returns `AlreadyRunning`.
    pub async fn scan(
        &self,
        db: &mut DB,
        roots: &[PathBuf],
        extractor: &dyn MetadataExtractor,
        progress: &UnboundedSender<ScanProgress>,
    ) -> AnyResult<ScanOutcome> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("A scan is already running, ignoring the new request");
            return Ok(ScanOutcome::AlreadyRunning);
        }
        self.cancelled.store(false, Ordering::SeqCst);

        let result = self.scan_roots(db, roots, extractor, progress).await;
        self.running.store(false, Ordering::SeqCst);

        match result {
            Ok(outcome) => {
                if outcome == ScanOutcome::Completed {
                    let _ = progress.send(ScanProgress::Succeeded);
                }
                Ok(outcome)
            }
            Err(err) => {
                error!("Scan failed: {}", err);
                let _ = progress.send(ScanProgress::Failed);
                Err(err)
            }
        }
    }

    async fn scan_roots(
        &self,
        db: &mut DB,
        roots: &[PathBuf],
        extractor: &dyn MetadataExtractor,
        progress: &UnboundedSender<ScanProgress>,
    ) -> AnyResult<ScanOutcome> {
        let timer = TimeLogger::new("Scanned all roots".into());

        for root in roots {
            info!("Scanning root {:?}", root);
            let scan_started_at = Utc::now().timestamp_millis();

            for directory in DirectoryWalker::new(root.clone()) {
                if self.cancelled.load(Ordering::SeqCst) {
                    info!("Scan cancelled");
                    return Ok(ScanOutcome::Cancelled);
                }
                reconcile_directory(db, &directory, extractor).await?;
                let _ = progress.send(ScanProgress::Directory(directory));
            }

            // The sweep may only run once every directory under this root has
            // been revisited, otherwise not-yet-reached rows would be dropped.
            db.delete_music_directories_scanned_before(&root.to_string_lossy(), scan_started_at)
                .await?;
        }

        timer.complete();
        Ok(ScanOutcome::Completed)
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Scanner::new()
    }
}

/**
 * Refresh the index rows of one directory: its immediate audio files are
 * re-read and the previous file set replaced in one transaction. A directory
 * without any eligible file touches nothing here; the post-walk sweep is
 * what clears its stale row.
 */
pub async fn reconcile_directory(
    db: &mut DB,
    directory: &Path,
    extractor: &dyn MetadataExtractor,
) -> AnyResult<()> {
    let audio_files = list_audio_files(directory);
    if audio_files.is_empty() {
        return Ok(());
    }

    let music_directory = MusicDirectory {
        id: Uuid::new_v4().to_string(),
        directory: directory.to_string_lossy().into_owned(),
        last_scanned_at: Utc::now().timestamp_millis(),
    };

    let mut files = Vec::new();
    for path in &audio_files {
        match extractor.extract(path) {
            Some(metadata) => files.push(MusicFile {
                id: Uuid::new_v4().to_string(),
                title: metadata.title,
                artist: metadata.artist,
                duration: metadata.duration_millis,
                file_name: path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                directory_id: music_directory.id.clone(),
            }),
            None => warn!("Skipping unreadable audio file {:?}", path),
        }
    }

    db.replace_music_directory_with_files(music_directory, files)
        .await
}

/// Immediate regular, readable files with a supported extension
fn list_audio_files(directory: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_audio_file(path) && fs::File::open(path).is_ok())
        .collect();
    files.sort();
    files
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|extension| {
            let extension = extension.to_ascii_lowercase();
            SUPPORTED_AUDIO_EXTENSIONS
                .iter()
                .any(|supported| *supported == extension)
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::mpsc as std_mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    use tempfile::tempdir;
    use tokio::sync::mpsc;

    use crate::libs::track::TrackMetadata;

    /// Maps file stems to fixed durations; files not listed fail extraction.
    struct StubExtractor {
        durations: HashMap<String, i64>,
    }

    impl StubExtractor {
        fn new(durations: &[(&str, i64)]) -> Self {
            StubExtractor {
                durations: durations
                    .iter()
                    .map(|(name, duration)| (name.to_string(), *duration))
                    .collect(),
            }
        }
    }

    impl MetadataExtractor for StubExtractor {
        fn extract(&self, path: &Path) -> Option<TrackMetadata> {
            let stem = path.file_stem()?.to_string_lossy().into_owned();
            let duration_millis = *self.durations.get(&stem)?;
            Some(TrackMetadata {
                title: stem.clone(),
                artist: "Stub Artist".to_string(),
                duration_millis,
            })
        }
    }

    async fn scan_once(db: &mut DB, root: &Path, extractor: &StubExtractor) -> ScanOutcome {
        let (tx, _rx) = mpsc::unbounded_channel();
        Scanner::new()
            .scan(db, &[root.to_path_buf()], extractor, &tx)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn scan_round_trips_files_with_resolvable_durations() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("rock")).unwrap();
        fs::write(root.join("rock/one.mp3"), b"x").unwrap();
        fs::write(root.join("rock/two.WAV"), b"x").unwrap();
        fs::write(root.join("rock/broken.mp3"), b"x").unwrap();
        fs::write(root.join("rock/notes.txt"), b"x").unwrap();

        let extractor = StubExtractor::new(&[("one", 60_000), ("two", 120_000)]);
        let mut db = DB::open_in_memory().await.unwrap();
        db.create_tables().await.unwrap();

        let outcome = scan_once(&mut db, root, &extractor).await;
        assert_eq!(outcome, ScanOutcome::Completed);

        let directories = db.get_all_music_directories().await.unwrap();
        assert_eq!(directories.len(), 1);
        assert_eq!(
            directories[0].directory,
            root.join("rock").to_string_lossy()
        );

        let mut files = db
            .get_music_files_in_directories(&[directories[0].id.clone()], None)
            .await
            .unwrap();
        files.sort_by(|a, b| a.title.cmp(&b.title));
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].title, "one");
        assert_eq!(files[0].duration, 60_000);
        assert_eq!(files[0].artist, "Stub Artist");
        assert_eq!(files[1].file_name, "two.WAV");
        assert_eq!(files[1].duration, 120_000);
    }

    #[tokio::test]
    async fn directories_without_audio_are_never_inserted() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("empty")).unwrap();
        fs::write(root.join("empty/readme.txt"), b"x").unwrap();

        let extractor = StubExtractor::new(&[]);
        let mut db = DB::open_in_memory().await.unwrap();
        db.create_tables().await.unwrap();

        scan_once(&mut db, root, &extractor).await;
        assert!(db.get_all_music_directories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rescanning_an_unchanged_tree_is_idempotent() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("song.mp3"), b"x").unwrap();

        let extractor = StubExtractor::new(&[("song", 90_000)]);
        let mut db = DB::open_in_memory().await.unwrap();
        db.create_tables().await.unwrap();

        scan_once(&mut db, root, &extractor).await;
        let first = db.get_all_music_directories().await.unwrap();

        scan_once(&mut db, root, &extractor).await;
        let second = db.get_all_music_directories().await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].directory, second[0].directory);
        assert!(second[0].last_scanned_at >= first[0].last_scanned_at);

        let files = db
            .get_music_files_in_directories(&[second[0].id.clone()], None)
            .await
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].title, "song");
        assert_eq!(db.count_music_files().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn removed_directories_are_pruned_on_rescan() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("keep")).unwrap();
        fs::create_dir(root.join("gone")).unwrap();
        fs::write(root.join("keep/a.mp3"), b"x").unwrap();
        fs::write(root.join("gone/b.mp3"), b"x").unwrap();

        let extractor = StubExtractor::new(&[("a", 1000), ("b", 2000)]);
        let mut db = DB::open_in_memory().await.unwrap();
        db.create_tables().await.unwrap();

        scan_once(&mut db, root, &extractor).await;
        assert_eq!(db.get_all_music_directories().await.unwrap().len(), 2);

        fs::remove_dir_all(root.join("gone")).unwrap();
        scan_once(&mut db, root, &extractor).await;

        let directories = db.get_all_music_directories().await.unwrap();
        assert_eq!(directories.len(), 1);
        assert_eq!(
            directories[0].directory,
            root.join("keep").to_string_lossy()
        );
        assert_eq!(db.count_music_files().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn directories_that_lost_all_audio_are_swept() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("fading")).unwrap();
        fs::write(root.join("fading/a.mp3"), b"x").unwrap();

        let extractor = StubExtractor::new(&[("a", 1000)]);
        let mut db = DB::open_in_memory().await.unwrap();
        db.create_tables().await.unwrap();

        scan_once(&mut db, root, &extractor).await;
        assert_eq!(db.get_all_music_directories().await.unwrap().len(), 1);

        fs::remove_file(root.join("fading/a.mp3")).unwrap();
        scan_once(&mut db, root, &extractor).await;

        assert!(db.get_all_music_directories().await.unwrap().is_empty());
        assert_eq!(db.count_music_files().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn progress_reports_each_directory_then_the_terminal_state() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("sub")).unwrap();

        let extractor = StubExtractor::new(&[]);
        let mut db = DB::open_in_memory().await.unwrap();
        db.create_tables().await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let outcome = Scanner::new()
            .scan(&mut db, &[root.to_path_buf()], &extractor, &tx)
            .await
            .unwrap();
        assert_eq!(outcome, ScanOutcome::Completed);
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                ScanProgress::Directory(root.to_path_buf()),
                ScanProgress::Directory(root.join("sub")),
                ScanProgress::Succeeded,
            ]
        );
    }

    /// Cancels the running scan the first time metadata is read.
    struct CancellingExtractor {
        scanner: Arc<Scanner>,
        inner: StubExtractor,
    }

    impl MetadataExtractor for CancellingExtractor {
        fn extract(&self, path: &Path) -> Option<TrackMetadata> {
            self.scanner.cancel();
            self.inner.extract(path)
        }
    }

    #[tokio::test]
    async fn a_cancelled_scan_stops_promptly_and_keeps_completed_work() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("later")).unwrap();
        fs::write(root.join("a.mp3"), b"x").unwrap();
        fs::write(root.join("later/b.mp3"), b"x").unwrap();

        let mut db = DB::open_in_memory().await.unwrap();
        db.create_tables().await.unwrap();

        let scanner = Arc::new(Scanner::new());
        let extractor = CancellingExtractor {
            scanner: scanner.clone(),
            inner: StubExtractor::new(&[("a", 1000), ("b", 2000)]),
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let outcome = scanner
            .scan(&mut db, &[root.to_path_buf()], &extractor, &tx)
            .await
            .unwrap();
        assert_eq!(outcome, ScanOutcome::Cancelled);
        drop(tx);

        // The root's transaction completed before the cancellation took
        // effect; the subdirectory was never reached and no sweep ran.
        let directories = db.get_all_music_directories().await.unwrap();
        assert_eq!(directories.len(), 1);
        assert_eq!(directories[0].directory, root.to_string_lossy());

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events, vec![ScanProgress::Directory(root.to_path_buf())]);
    }

    /// Signals when metadata extraction starts, then blocks until released.
    struct BlockingExtractor {
        started: std_mpsc::Sender<()>,
        release: Mutex<std_mpsc::Receiver<()>>,
    }

    impl MetadataExtractor for BlockingExtractor {
        fn extract(&self, path: &Path) -> Option<TrackMetadata> {
            let _ = self.started.send(());
            if let Ok(release) = self.release.lock() {
                let _ = release.recv();
            }
            StubExtractor::new(&[("a", 1000)]).extract(path)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn a_request_while_a_scan_runs_coalesces_into_a_no_op() {
        let dir = tempdir().unwrap();
        let root = dir.path().to_path_buf();
        fs::write(root.join("a.mp3"), b"x").unwrap();

        let (started_tx, started_rx) = std_mpsc::channel();
        let (release_tx, release_rx) = std_mpsc::channel();
        let extractor = Arc::new(BlockingExtractor {
            started: started_tx,
            release: Mutex::new(release_rx),
        });

        let mut first_db = DB::open_in_memory().await.unwrap();
        first_db.create_tables().await.unwrap();

        let scanner = Arc::new(Scanner::new());
        let (first_tx, _first_rx) = mpsc::unbounded_channel();
        let first_scanner = scanner.clone();
        let first_extractor = extractor.clone();
        let first_root = root.clone();
        let first = tokio::spawn(async move {
            first_scanner
                .scan(&mut first_db, &[first_root], &*first_extractor, &first_tx)
                .await
                .unwrap()
        });

        // Held inside the first run's metadata read from here on
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(scanner.is_running());

        let mut second_db = DB::open_in_memory().await.unwrap();
        second_db.create_tables().await.unwrap();

        let stub = StubExtractor::new(&[("a", 1000)]);
        let (second_tx, mut second_rx) = mpsc::unbounded_channel();
        let outcome = scanner
            .scan(&mut second_db, &[root], &stub, &second_tx)
            .await
            .unwrap();
        assert_eq!(outcome, ScanOutcome::AlreadyRunning);

        // The rejected request touched neither the index nor the channel
        drop(second_tx);
        assert!(second_rx.recv().await.is_none());
        assert!(second_db.get_all_music_directories().await.unwrap().is_empty());

        release_tx.send(()).unwrap();
        assert_eq!(first.await.unwrap(), ScanOutcome::Completed);
        assert!(!scanner.is_running());
    }

    #[tokio::test]
    async fn a_failing_write_ends_the_scan_with_failed_and_skips_later_roots() {
        let dir = tempdir().unwrap();
        let first_root = dir.path().join("one");
        let second_root = dir.path().join("two");
        fs::create_dir(&first_root).unwrap();
        fs::create_dir(&second_root).unwrap();
        fs::write(first_root.join("a.mp3"), b"x").unwrap();
        fs::write(second_root.join("b.mp3"), b"x").unwrap();

        let extractor = StubExtractor::new(&[("a", 1000), ("b", 2000)]);
        let mut db = DB::open_in_memory().await.unwrap();
        db.create_tables().await.unwrap();

        // Break the schema so the first directory's replacement fails
        ormlite::query("DROP TABLE music_files;")
            .execute(&mut db.connection)
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let result = Scanner::new()
            .scan(&mut db, &[first_root, second_root], &extractor, &tx)
            .await;
        assert!(result.is_err());
        drop(tx);

        // The failed directory never reported progress and the second root
        // was never reached; the stream ends on the terminal failure.
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events, vec![ScanProgress::Failed]);
    }
}
