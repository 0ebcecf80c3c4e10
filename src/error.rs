use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Errors that abort a catalog operation.
///
/// Nothing that happens while a run is in progress surfaces here: missing
/// files are treated as non-matching and failed deletions are reported per file.
#[derive(Error, Debug)]
pub enum Error {
    /// The path does not name an existing directory
    #[error("{} is not a valid directory.", .0.display())]
    InvalidDirectory(PathBuf),

    /// The directory exists but its entries cannot be listed
    #[error("Unable to read directory {}: {source}", path.display())]
    UnreadableDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
