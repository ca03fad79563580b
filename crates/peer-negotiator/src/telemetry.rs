//! `tracing` subscriber setup for binaries and tests that embed the
//! negotiator.

use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::SubscriberBuilder;

pub const LOG_FILTER_ENV: &str = "NEGOTIATOR_LOG";
pub const TRACE_DEPS_ENV: &str = "NEGOTIATOR_TRACE_DEPS";

const TRACE_DEP_TARGETS: &[&str] = &[
    "webrtc",
    "webrtc_ice",
    "webrtc_sctp",
    "webrtc_dtls",
    "webrtc_srtp",
    "webrtc_mdns",
    "webrtc_data",
    "turn",
    "stun",
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("failed to configure logger: {0}")]
    Configure(String),
}

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Installs a global `fmt` subscriber. The filter comes from
/// `NEGOTIATOR_LOG`, then `RUST_LOG`, then `info`. Later calls are no-ops.
pub fn init_tracing() -> Result<(), InitError> {
    let filter = match std::env::var(LOG_FILTER_ENV) {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| build_env_filter(LogLevel::default())),
    };
    install(filter, false)
}

/// Like [`init_tracing`] but at a fixed level; `NEGOTIATOR_LOG` still wins.
pub fn init_with_level(level: LogLevel) -> Result<(), InitError> {
    let filter = match std::env::var(LOG_FILTER_ENV) {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) => build_env_filter(level),
    };
    install(filter, level >= LogLevel::Debug)
}

/// Subscriber for `cargo test`: output captured per test, filter from
/// `RUST_LOG`. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = SubscriberBuilder::default()
        .with_test_writer()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

fn install(filter: EnvFilter, with_target: bool) -> Result<(), InitError> {
    INSTALLED
        .get_or_try_init(|| {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(with_target)
                .try_init()
                .map_err(|err| InitError::Configure(err.to_string()))
        })
        .map(|_| ())
}

fn build_env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::new(default_filter_for(level, allow_dependency_traces()))
}

fn default_filter_for(level: LogLevel, dependency_traces: bool) -> String {
    let base = match level {
        LogLevel::Trace => "info,peer_negotiator=trace",
        LogLevel::Debug => "info,peer_negotiator=debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    };
    if level == LogLevel::Trace && !dependency_traces {
        throttle_dependency_traces(base)
    } else {
        base.to_owned()
    }
}

fn allow_dependency_traces() -> bool {
    std::env::var(TRACE_DEPS_ENV)
        .map(|value| matches!(value.trim(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

// The webrtc stack is very chatty at trace level.
fn throttle_dependency_traces(base: &str) -> String {
    let mut filter = base.to_owned();
    for target in TRACE_DEP_TARGETS {
        filter.push(',');
        filter.push_str(target);
        filter.push_str("=info");
    }
    filter
}
