use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// Filter comes from `RUST_LOG` (default `info`). `SEOGAP_LOG_FORMAT=json`
/// switches to one JSON object per line. Logs go to stderr so report output
/// on stdout stays clean.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("SEOGAP_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("warning: tracing already initialized: {e}");
    }
}
