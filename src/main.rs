//! forgeloop - automated enhance-and-sell loop

use forgeloop::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::run().await
}
