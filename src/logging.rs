use tracing_subscriber::EnvFilter;

/// Initialise logging. Without `debug` the level is pinned to `info`; with it
/// the level starts at `debug` and can be overridden via `RUST_LOG`.
/// Calling this more than once keeps the first subscriber.
pub fn init(debug: bool) {
    // A stray `RUST_LOG` in the user's environment must not turn on verbose
    // dispatcher output unless debug logging was asked for.
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init();
}
