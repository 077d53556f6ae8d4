/// Initializes structured logging for the scheduler.
///
/// Filtering follows `RUST_LOG` (e.g. `RUST_LOG=scene_ops=debug` to see skipped actions
/// and phase changes). Output is the compact format without targets; every operation's
/// run is nested in a `scene_operation` span carrying its id.
///
/// Calling this more than once is harmless: later calls leave the first subscriber in
/// place.
///
/// # Example
///
/// ```ignore
/// setup_tracing();
/// tracing::info!("Scene system started");
/// ```
pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}
