//! Depyler driver.
//!
//! Ties the phase crates together into a module pipeline and runs it over
//! files, in parallel when there are several:
//!
//! ```text
//! depyler_parse ──► depyler_pragma ──► depyler_types ──► depyler_ownership ──► depyler_codegen
//!        └────────────── validate: checks at every boundary ──────────────┘
//! ```
//!
//! The library is what the `depyler` binary and the end-to-end tests use;
//! it never prints. Output files and diagnostics rendering belong to the
//! binary.

mod config;
mod error;
mod pipeline;
mod tracing_setup;
pub mod validate;

pub use config::{parse_transpile_args, source_map_path, CompilerConfig, TranspileArgs};
pub use error::DriverError;
pub use pipeline::{
    compile_batch, compile_file, compile_source, CancellationToken, FunctionOutput, ModuleOutput,
};
pub use tracing_setup::init_tracing;
pub use validate::CompileResult;
