use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the default filter. Logs go to stderr so stdout
/// only carries command output.
pub fn init() {
    let default_level = if cfg!(debug_assertions) {
        "dearsql=debug,dearsql_db=debug,dearsql_ui=debug,info"
    } else {
        "dearsql=info,dearsql_db=info,dearsql_ui=info,warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .init();
}

#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("debug"))
        .with(fmt::layer().with_test_writer())
        .try_init();
}
