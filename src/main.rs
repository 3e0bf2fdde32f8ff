use anyhow::Result;
use shelftime::cli::run_cli;
use tracing::error;

#[tokio::main]
async fn main() -> Result<()> {
    run_cli().await.inspect_err(|e| {
        error!("Sync run failed {e:?}");
    })
}
