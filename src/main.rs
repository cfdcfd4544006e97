use anyhow::Result;
use flows::{
    cli::run_cli,
    utils::runtime::{run_to_completion, single_thread_runtime},
};
use tracing::error;

fn main() -> Result<()> {
    run_to_completion(single_thread_runtime()?, async {
        run_cli().await.inspect_err(|e| {
            error!("Error running cli {e:?}");
        })
    })
}
