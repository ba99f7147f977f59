use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directive used when RUST_LOG is not set
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "redis_image_check=debug,warn"
    } else {
        "redis_image_check=warn"
    }
}

/// Install the stderr subscriber. With `debug` every runtime invocation is
/// traced, which is the harness's equivalent of running under `set -x`.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    // A second init (tests calling run twice) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}
