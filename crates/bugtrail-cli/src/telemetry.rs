//! Logging initialization.
//!
//! Controlled by two environment variables:
//! - `BUGTRAIL_LOG` — an `EnvFilter` directive (default `warn`)
//! - `BUGTRAIL_LOG_FORMAT` — `json` for JSON lines, anything else for the
//!   human-readable format
//!
//! Everything goes to stderr so command output on stdout stays scriptable.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

const FILTER_ENV: &str = "BUGTRAIL_LOG";
const FORMAT_ENV: &str = "BUGTRAIL_LOG_FORMAT";

pub fn init() {
    let filter = EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let json = std::env::var(FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
