//! Tracing initialization for embedders and tests

/// Initialize a plain fmt subscriber.
///
/// Safe to call more than once; later calls are no-ops. Embedders with
/// their own subscriber should skip this and install theirs instead.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
