//! Tracing subscriber for the `depyler` binary.

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install the global subscriber once.
///
/// Nothing is installed unless `RUST_LOG` is set, so the library stays
/// silent by default. `DEPYLER_LOG_TREE` switches to an indented span tree,
/// which reads better when following one function through the phases.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        if std::env::var_os("DEPYLER_LOG_TREE").is_some() {
            tracing_subscriber::registry()
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_bracketed_fields(true)
                        .with_writer(std::io::stderr),
                )
                .with(EnvFilter::from_default_env())
                .init();
        } else {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr),
                )
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}
