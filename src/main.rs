use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::anyhow;
use log::error;

use shufflist::libs::config::{load_settings, save_settings};
use shufflist::libs::constants::APP_NAME;
use shufflist::libs::database::DB;
use shufflist::libs::error::{AnyResult, ShufflistError};
use shufflist::libs::playlist::{build_playlist, playlist_info};
use shufflist::libs::playlist_writer::save_playlist;
use shufflist::libs::scanner::{ScanOutcome, ScanProgress, Scanner};
use shufflist::libs::track::LoftyExtractor;

const USAGE: &str = "\
Usage: shufflist <command>

Commands:
  roots                 List the selected scan roots
  add [directory]       Select a directory as a scan root (defaults to the start directory)
  remove <directory>    Unselect a scan root
  scan                  Walk every root and refresh the index (Ctrl-C cancels)
  tracks                Show how many files are indexed
  make <minutes>        Build a random playlist fitting the duration and save it
  settings              Show the current settings
  set save-dir <path>   Set the playlist save directory
  set start-dir <path>  Set the default directory for `add`
  set absolute <bool>   Emit absolute paths in playlists
";

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn open_db() -> AnyResult<DB> {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME);
    fs::create_dir_all(&data_dir)?;

    let mut db = DB::open(&data_dir.join("index.db")).await?;
    db.create_tables().await?;
    Ok(db)
}

async fn run() -> AnyResult<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("");

    match command {
        "roots" => {
            let mut db = open_db().await?;
            for root in db.get_all_selected_directories().await? {
                println!("{}", root.directory);
            }
        }
        "add" => {
            let directory = match args.get(1) {
                Some(arg) => PathBuf::from(arg),
                None => load_settings().start_directory,
            };
            let directory = fs::canonicalize(&directory)?;
            let mut db = open_db().await?;
            let selected = db
                .insert_selected_directory(&directory.to_string_lossy())
                .await?;
            println!("Added {}", selected.directory);
        }
        "remove" => {
            let directory = args
                .get(1)
                .ok_or_else(|| anyhow!("remove expects a directory"))?;
            let mut db = open_db().await?;
            db.delete_selected_directory(directory).await?;
            println!("Removed {directory}");
        }
        "scan" => {
            let mut db = open_db().await?;
            let roots: Vec<PathBuf> = db
                .get_all_selected_directories()
                .await?
                .into_iter()
                .map(|root| PathBuf::from(root.directory))
                .collect();
            if roots.is_empty() {
                println!("No roots selected, nothing to scan");
                return Ok(());
            }

            let scanner = Arc::new(Scanner::new());
            let cancel_scanner = scanner.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel_scanner.cancel();
                }
            });

            let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
            let printer = tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    match event {
                        ScanProgress::Directory(path) => println!("Scanning {}", path.display()),
                        ScanProgress::Succeeded => println!("Scan finished"),
                        ScanProgress::Failed => println!("Scan failed"),
                    }
                }
            });

            let outcome = scanner.scan(&mut db, &roots, &LoftyExtractor, &tx).await;
            drop(tx);
            let _ = printer.await;

            if let ScanOutcome::Cancelled = outcome? {
                println!("Scan cancelled");
            }
        }
        "tracks" => {
            let mut db = open_db().await?;
            println!("{} track(s) indexed", db.count_music_files().await?);
        }
        "make" => {
            let minutes: i64 = args
                .get(1)
                .and_then(|arg| arg.parse().ok())
                .filter(|minutes| *minutes > 0)
                .ok_or_else(|| anyhow!("make expects a positive number of minutes"))?;

            let mut db = open_db().await?;
            let playlist = build_playlist(&mut db, minutes * 60 * 1000).await?;
            let (count, total) = playlist_info(&playlist);
            println!("{count} track(s), {total}");

            let settings = load_settings();
            let save_directory = settings
                .save_directory
                .ok_or(ShufflistError::NoSaveDirectory)?;
            let saved = save_playlist(&save_directory, &playlist, settings.use_absolute_path)?;
            println!("Saved {}", saved.display());
        }
        "settings" => {
            let settings = load_settings();
            println!(
                "save-dir:  {}",
                settings
                    .save_directory
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "(unset)".to_string())
            );
            println!("start-dir: {}", settings.start_directory.display());
            println!("absolute:  {}", settings.use_absolute_path);
        }
        "set" => {
            let key = args.get(1).map(String::as_str).unwrap_or("");
            let value = args
                .get(2)
                .ok_or_else(|| anyhow!("set expects a key and a value"))?;

            let mut settings = load_settings();
            match key {
                "save-dir" => settings.save_directory = Some(fs::canonicalize(value)?),
                "start-dir" => settings.start_directory = fs::canonicalize(value)?,
                "absolute" => {
                    settings.use_absolute_path = value
                        .parse()
                        .map_err(|_| anyhow!("absolute expects true or false"))?
                }
                _ => return Err(anyhow!("unknown setting {key:?}").into()),
            }
            save_settings(&settings)?;
        }
        _ => {
            print!("{USAGE}");
        }
    }

    Ok(())
}
