pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod music_directory;
pub mod music_file;
pub mod playlist;
pub mod playlist_writer;
pub mod scanner;
pub mod selected_directory;
pub mod track;
pub mod utils;
pub mod walker;
