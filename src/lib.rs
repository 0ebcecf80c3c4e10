//! Removes byte-identical duplicate files from a single directory.
//!
//! A [`DirectoryCatalog`] snapshots the regular files of one directory, and a
//! [`DuplicateResolver`] walks that snapshot, keeping the first copy of every
//! duplicate group in listing order and deleting the rest.

pub mod catalog;
pub mod digest;
pub mod error;
pub mod logging;
pub mod progress;
pub mod resolver;

pub use catalog::DirectoryCatalog;
pub use digest::{hash_file, ContentDigest, DigestCache};
pub use error::{Error, Result};
pub use progress::{LineWriter, NoProgress, ProgressEvent, ProgressSink};
pub use resolver::{DeletionFailure, DuplicateResolver, ResolverOptions, RunReport};
