use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// The default filter is `info`, or `debug` when verbose output was
/// requested; `RUST_LOG` overrides either. Verbose observability (outbound
/// payloads, response headers) is emitted at `debug` level, so the flag only
/// changes what is visible, never what runs.
pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
