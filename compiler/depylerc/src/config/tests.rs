#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::path::{Path, PathBuf};

use depyler_diagnostic::emitter::{ColorMode, DiagnosticFormat};
use pretty_assertions::assert_eq;

use super::{parse_transpile_args, source_map_path, CompilerConfig};

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

#[test]
fn flags_and_files_mix_freely() {
    let parsed = parse_transpile_args(&args(&[
        "--debug",
        "a.py",
        "-o",
        "out",
        "b.py",
        "--source-map",
        "--format=json",
        "--jobs=4",
        "--color=never",
    ]))
    .unwrap();
    assert_eq!(parsed.files, vec![PathBuf::from("a.py"), PathBuf::from("b.py")]);
    assert_eq!(
        parsed.config,
        CompilerConfig {
            jobs: 4,
            debug: true,
            source_map: true,
            format: DiagnosticFormat::Json,
            color: ColorMode::Never,
            output: Some(PathBuf::from("out")),
        }
    );
}

#[test]
fn defaults_without_flags() {
    let parsed = parse_transpile_args(&args(&["m.py"])).unwrap();
    assert_eq!(parsed.config, CompilerConfig::default());
    assert!(!parsed.config.codegen_options().debug);
}

#[test]
fn bad_arguments_are_reported() {
    assert_eq!(
        parse_transpile_args(&args(&["m.py", "-o"])),
        Err("`-o` needs a path".to_string())
    );
    assert_eq!(
        parse_transpile_args(&args(&["m.py", "--format=xml"])),
        Err("unknown format 'xml' (expected text or json)".to_string())
    );
    assert_eq!(
        parse_transpile_args(&args(&["m.py", "--jobs=many"])),
        Err("invalid job count 'many'".to_string())
    );
    assert_eq!(
        parse_transpile_args(&args(&["m.py", "--fast"])),
        Err("unknown option '--fast'".to_string())
    );
    assert_eq!(parse_transpile_args(&args(&["--debug"])), Err("no input files".to_string()));
}

#[test]
fn output_paths() {
    let default = CompilerConfig::default();
    assert_eq!(default.output_path(Path::new("src/m.py"), 1), PathBuf::from("src/m.rs"));

    let single = CompilerConfig {
        output: Some(PathBuf::from("build/lib.rs")),
        ..CompilerConfig::default()
    };
    assert_eq!(single.output_path(Path::new("m.py"), 1), PathBuf::from("build/lib.rs"));

    let many = CompilerConfig {
        output: Some(PathBuf::from("build")),
        ..CompilerConfig::default()
    };
    assert_eq!(many.output_path(Path::new("src/a.py"), 2), PathBuf::from("build/a.rs"));
}

#[test]
fn source_maps_sit_next_to_the_output() {
    assert_eq!(
        source_map_path(Path::new("build/m.rs")),
        PathBuf::from("build/m.sourcemap.json")
    );
    assert_eq!(
        source_map_path(Path::new("t3.rs")),
        PathBuf::from("t3.sourcemap.json")
    );
    assert_eq!(
        source_map_path(Path::new("out/prog")),
        PathBuf::from("out/prog.sourcemap.json")
    );
}
