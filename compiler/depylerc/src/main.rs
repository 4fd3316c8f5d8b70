//! Depyler CLI
//!
//! Ahead-of-time Python to Rust transpiler.

mod commands;

use commands::{explain_error, transpile_files};
use depylerc::{init_tracing, parse_transpile_args};

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    match command.as_str() {
        "transpile" => {
            if args.len() < 3 {
                eprintln!("Usage: depyler transpile <file.py>... [options]");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  -o <path>            Output file (one input) or directory");
                eprintln!("  --debug              Comment each statement with its Python line");
                eprintln!("  --source-map         Write <output stem>.sourcemap.json");
                eprintln!("  --format=<fmt>       Diagnostics: text (default), json");
                eprintln!("  --color=<mode>       Colors: auto (default), always, never");
                eprintln!("  --jobs=<n>           Worker threads (default: all cores)");
                std::process::exit(1);
            }

            let parsed = match parse_transpile_args(&args[2..]) {
                Ok(parsed) => parsed,
                Err(message) => {
                    eprintln!("error: {message}");
                    eprintln!("Usage: depyler transpile <file.py>... [options]");
                    std::process::exit(1);
                }
            };

            if !transpile_files(&parsed) {
                std::process::exit(1);
            }
        }
        "--explain" | "explain" => {
            if args.len() < 3 {
                eprintln!("Usage: depyler explain <CODE>");
                eprintln!("Example: depyler explain E3001");
                std::process::exit(1);
            }
            explain_error(&args[2]);
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-V" => {
            println!("depyler {}", env!("CARGO_PKG_VERSION"));
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Depyler: Python to Rust transpiler");
    println!();
    println!("Usage: depyler <command> [options]");
    println!();
    println!("Commands:");
    println!("  transpile <file.py>...  Transpile Python files to Rust");
    println!("  explain <code>          Explain a diagnostic code (e.g., E3001)");
    println!("  help                    Show this help message");
    println!("  version                 Show version information");
    println!();
    println!("Transpile options:");
    println!("  -o <path>               Output file (one input) or directory (several)");
    println!("  --debug                 Comment each statement with its Python line");
    println!("  --source-map            Write a JSON source map next to each output");
    println!("  --format=<fmt>          Diagnostic format: text (default), json");
    println!("  --color=<mode>          Colors: auto (default), always, never");
    println!("  --jobs=<n>              Worker threads (default: all cores)");
    println!();
    println!("Environment:");
    println!("  RUST_LOG                Enable tracing (e.g., RUST_LOG=depyler_types=debug)");
    println!("  DEPYLER_LOG_TREE        Show tracing as an indented span tree");
    println!();
    println!("Examples:");
    println!("  depyler transpile counter.py                # Writes counter.rs");
    println!("  depyler transpile a.py b.py -o out/ --jobs=4");
    println!("  depyler transpile m.py --source-map --debug");
    println!("  depyler explain E3001");
}
