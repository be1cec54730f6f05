mod core;
mod music_directory;
mod music_file;
mod selected_directory;

pub use self::core::DB;
