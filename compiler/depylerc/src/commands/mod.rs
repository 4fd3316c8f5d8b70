//! Command handlers for the `depyler` CLI.

mod explain;
mod transpile;

pub use explain::explain_error;
pub use transpile::transpile_files;
