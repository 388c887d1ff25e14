//! Tracing subscriber initialization.
//!
//! Logs go to stderr so binaries can keep stdout for their own output.
//! Filtering follows `RUST_LOG` when set.

use tracing_subscriber::EnvFilter;

/// Output format of the installed subscriber.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, with timestamps.
    #[default]
    Json,
    /// Human-readable lines.
    Text,
}

impl LogFormat {
    /// `GEOPLACES_LOG_FORMAT=text` selects [`LogFormat::Text`]; anything
    /// else keeps JSON.
    pub fn from_env() -> Self {
        Self::parse(std::env::var("GEOPLACES_LOG_FORMAT").ok().as_deref())
    }

    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("text") => LogFormat::Text,
            _ => LogFormat::Json,
        }
    }
}

/// JSON logs at `info` unless the environment says otherwise.
pub fn init() {
    init_with(LogFormat::from_env(), "info");
}

/// Install the global subscriber. `default_filter` applies when `RUST_LOG`
/// is unset. Returns `false` if a subscriber was already installed.
pub fn init_with(format: LogFormat, default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = match format {
        LogFormat::Json => builder
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .try_init(),
        LogFormat::Text => builder.try_init(),
    };
    installed.is_ok()
}
