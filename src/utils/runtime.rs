use anyhow::Result;

/// Handlers for a single shared log are spread over worker threads, so the server always runs
/// on the multi-threaded scheduler.
pub fn multi_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}
