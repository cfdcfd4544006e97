use std::future::Future;

use anyhow::Result;
use tokio::runtime::Runtime;

/// The dashboard is cooperative and single threaded. Fetches and debounce timers are tasks on
/// this one runtime thread.
pub fn single_thread_runtime() -> Result<Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

/// Runs `future` to completion, then drops the runtime without joining the blocking pool.
/// Reads of stdin sit on that pool and only return on the next line of input.
pub fn run_to_completion<F: Future>(runtime: Runtime, future: F) -> F::Output {
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    output
}
