use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

fn level_for(verbosity: u8) -> (LevelFilter, &'static str) {
    match verbosity {
        0 => (LevelFilter::OFF, "off"),
        1 => (LevelFilter::INFO, "info"),
        _ => (LevelFilter::DEBUG, "debug"),
    }
}

/// Installs the global subscriber on stderr so it never mixes with tables on
/// stdout. `-v` enables info, `-vv` debug; `RUST_LOG` takes precedence.
pub fn init_logging(verbosity: u8) {
    let (level_filter, level) = level_for(verbosity);
    let app_filter = Targets::new().with_target("wonspend", level_filter);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(app_filter)
        .with(env_filter)
        .init();
}
