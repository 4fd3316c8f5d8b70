//! The `transpile` command: Python files in, Rust files out.
//!
//! Diagnostics go to stderr as text, or to stdout as one JSON array per
//! file with `--format=json`. Rust is written for every file that parses,
//! even when some of its functions failed.

use std::fs;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use depyler_diagnostic::emitter::{
    DiagnosticEmitter, DiagnosticFormat, JsonEmitter, TerminalEmitter,
};
use depylerc::{
    compile_batch, source_map_path, CancellationToken, CompilerConfig, DriverError, ModuleOutput,
    TranspileArgs,
};

/// Run `transpile`; `true` when every function of every file compiled.
pub fn transpile_files(args: &TranspileArgs) -> bool {
    let TranspileArgs { config, files } = args;

    if files.len() > 1 {
        if let Some(dir) = &config.output {
            if let Err(source) = fs::create_dir_all(dir) {
                report(&DriverError::Write {
                    path: dir.clone(),
                    source,
                });
                return false;
            }
        }
    }

    let token = CancellationToken::new();
    let results = match compile_batch(files, config, &token) {
        Ok(results) => results,
        Err(error) => {
            report(&error);
            return false;
        }
    };

    let mut emitter: Box<dyn DiagnosticEmitter> = match config.format {
        DiagnosticFormat::Text => Box::new(TerminalEmitter::stderr(
            config.color,
            io::stderr().is_terminal(),
        )),
        DiagnosticFormat::Json => Box::new(JsonEmitter::new(io::stdout())),
    };

    let mut all_ok = true;
    let (mut errors, mut warnings) = (0, 0);
    for result in results {
        let output = match result {
            Ok(output) => output,
            Err(error) => {
                report(&error);
                all_ok = false;
                continue;
            }
        };
        emitter.emit_all(&output.diagnostics, &output.file);
        if config.format == DiagnosticFormat::Json {
            emitter.flush();
        }
        errors += output.error_count();
        warnings += output.warning_count();
        all_ok &= output.succeeded();

        match write_output(&output, config, files.len()) {
            Ok(Some(written)) => {
                tracing::info!(input = %output.path.display(), output = %written.display(), "wrote");
            }
            Ok(None) => {}
            Err(error) => {
                report(&error);
                all_ok = false;
            }
        }
    }

    if errors + warnings > 0 {
        emitter.emit_summary(errors, warnings);
    }
    emitter.flush();
    all_ok
}

/// Write the Rust (and source map) of one module. `None` when nothing was
/// produced.
fn write_output(
    output: &ModuleOutput,
    config: &CompilerConfig,
    count: usize,
) -> Result<Option<PathBuf>, DriverError> {
    let Some(rust) = &output.rust else {
        return Ok(None);
    };
    let path = config.output_path(&output.path, count);
    fs::write(&path, rust).map_err(|source| DriverError::Write {
        path: path.clone(),
        source,
    })?;

    if let Some(map) = &output.source_map {
        let map_path = source_map_path(&path);
        let json = serde_json::to_string_pretty(map).map_err(|source| DriverError::SourceMap {
            path: map_path.clone(),
            source,
        })?;
        fs::write(&map_path, json).map_err(|source| DriverError::Write {
            path: map_path,
            source,
        })?;
    }
    Ok(Some(path))
}

fn report(error: &DriverError) {
    eprintln!("error: {error}");
}
