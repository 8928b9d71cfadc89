//! Tracing subscriber setup for binaries and tests embedding the pipeline.
//!
//! - `RUST_LOG` filter support, defaulting to `vidspell=info`
//! - JSON output when `RUST_LOG_FORMAT=json`
//! - `log` records from the engine adapters are forwarded into tracing

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "vidspell=info";

fn wants_json() -> bool {
    std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Install the global subscriber.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let installed = if wants_json() {
        tracing::subscriber::set_global_default(builder.json().finish()).is_ok()
    } else {
        tracing::subscriber::set_global_default(builder.finish()).is_ok()
    };

    if installed {
        let _ = tracing_log::LogTracer::init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
    }

    #[test]
    #[serial]
    fn test_json_format_switch() {
        std::env::set_var("RUST_LOG_FORMAT", "JSON");
        assert!(wants_json());
        std::env::set_var("RUST_LOG_FORMAT", "pretty");
        assert!(!wants_json());
        std::env::remove_var("RUST_LOG_FORMAT");
        assert!(!wants_json());
    }
}
