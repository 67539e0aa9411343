//! Logging initialisation shared by every server binary, replacing the
//! original's `setDebugPrintsOnToFile`/`printDebug`/`printProgress` global
//! toggles with a single `tracing-subscriber` filter driven by `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Call once at the top of `main`. Defaults to `info` when `RUST_LOG` is unset.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
