//! The `explain` command: documentation for a diagnostic code.

use depyler_diagnostic::{DiagnosticKind, ErrorDocs};

pub fn explain_error(code: &str) {
    let Some(kind) = DiagnosticKind::from_code(code) else {
        eprintln!("Unknown diagnostic code: {code}");
        eprintln!();
        eprintln!("Codes have the format EXXXX (errors) or WXXXX (warnings).");
        eprintln!("Known codes:");
        for kind in ErrorDocs::all_kinds() {
            eprintln!("  {}  {}", kind.code(), kind.name());
        }
        std::process::exit(1);
    };

    if let Some(doc) = ErrorDocs::get(kind) {
        println!("{doc}");
    } else {
        eprintln!("No documentation available for {}", kind.code());
        std::process::exit(1);
    }
}
