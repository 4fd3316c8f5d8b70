//! Failures of the driver itself.
//!
//! Problems in the Python source are diagnostics, never a `DriverError`.
//! These are the things that stop a file from being processed at all.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("{}", read_message(.path, .source))]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot serialize the source map of '{}': {source}", .path.display())]
    SourceMap {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("compilation of '{}' was cancelled", .path.display())]
    Cancelled { path: PathBuf },

    #[error("cannot start {jobs} worker threads: {source}")]
    ThreadPool {
        jobs: usize,
        #[source]
        source: rayon::ThreadPoolBuildError,
    },
}

fn read_message(path: &Path, error: &io::Error) -> String {
    let path = path.display();
    match error.kind() {
        io::ErrorKind::NotFound => format!("cannot find file '{path}'"),
        io::ErrorKind::PermissionDenied => format!("permission denied reading '{path}'"),
        io::ErrorKind::InvalidData => format!("'{path}' contains invalid UTF-8 data"),
        _ => format!("error reading '{path}': {error}"),
    }
}
