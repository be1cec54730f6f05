use anyhow::Result;
use std::path::PathBuf;
use thiserror::Error;

/**
 * Create the error type that represents all errors possible in our program
 */
#[derive(Debug, Error)]
pub enum ShufflistError {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    ORMLite(#[from] ormlite::Error),

    #[error(transparent)]
    ORMLiteSqlx(#[from] ormlite::SqlxError),

    #[error("An error occurred while manipulating the config: {0}")]
    Config(String),

    #[error("No playlist save directory is configured")]
    NoSaveDirectory,

    #[error("A playlist already exists at {0:?}")]
    PlaylistFileExists(PathBuf),

    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

pub type AnyResult<T, E = ShufflistError> = Result<T, E>;
