use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] chatvault_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("No archive data found at {0}. Run `chatvault download` first.")]
    NoArchive(String),
}
