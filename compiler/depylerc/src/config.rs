//! Driver configuration, built from command-line flags.
//!
//! Only output concerns live here. What a function compiles to is decided
//! by its pragmas alone.

use std::path::{Path, PathBuf};

use depyler_codegen::CodegenOptions;
use depyler_diagnostic::emitter::{ColorMode, DiagnosticFormat};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Worker threads; `0` lets rayon decide.
    pub jobs: usize,
    /// `// line N: ...` comments before every lowered statement.
    pub debug: bool,
    /// Write a JSON source map next to each output file.
    pub source_map: bool,
    pub format: DiagnosticFormat,
    pub color: ColorMode,
    /// `-o`: the output file for a single input, a directory otherwise.
    pub output: Option<PathBuf>,
}

impl CompilerConfig {
    pub fn codegen_options(&self) -> CodegenOptions {
        CodegenOptions { debug: self.debug }
    }

    /// Where the Rust for `input` goes when `count` files are transpiled.
    pub fn output_path(&self, input: &Path, count: usize) -> PathBuf {
        match &self.output {
            Some(out) if count == 1 && !out.is_dir() => out.clone(),
            Some(dir) => {
                let stem = input.file_stem().unwrap_or(input.as_os_str());
                dir.join(stem).with_extension("rs")
            }
            None => input.with_extension("rs"),
        }
    }
}

/// Source-map file belonging to a Rust output file: `m.rs` maps to
/// `m.sourcemap.json`.
pub fn source_map_path(output: &Path) -> PathBuf {
    output.with_extension("sourcemap.json")
}

/// A parsed `transpile` invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranspileArgs {
    pub config: CompilerConfig,
    pub files: Vec<PathBuf>,
}

/// Parse the arguments following `transpile`.
pub fn parse_transpile_args(args: &[String]) -> Result<TranspileArgs, String> {
    let mut config = CompilerConfig::default();
    let mut files = Vec::new();

    // -o takes the next argument, so walk by index
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        if arg == "-o" {
            let Some(out) = args.get(i + 1) else {
                return Err("`-o` needs a path".to_string());
            };
            config.output = Some(PathBuf::from(out));
            i += 2;
            continue;
        }
        if arg == "--debug" {
            config.debug = true;
        } else if arg == "--source-map" {
            config.source_map = true;
        } else if let Some(value) = arg.strip_prefix("--format=") {
            config.format = DiagnosticFormat::parse(value)
                .ok_or_else(|| format!("unknown format '{value}' (expected text or json)"))?;
        } else if let Some(value) = arg.strip_prefix("--color=") {
            config.color = ColorMode::parse(value).ok_or_else(|| {
                format!("unknown color mode '{value}' (expected auto, always or never)")
            })?;
        } else if let Some(value) = arg.strip_prefix("--jobs=") {
            config.jobs = value
                .parse()
                .map_err(|_| format!("invalid job count '{value}'"))?;
        } else if arg.starts_with('-') {
            return Err(format!("unknown option '{arg}'"));
        } else {
            files.push(PathBuf::from(arg));
        }
        i += 1;
    }

    if files.is_empty() {
        return Err("no input files".to_string());
    }
    Ok(TranspileArgs { config, files })
}

#[cfg(test)]
mod tests;
