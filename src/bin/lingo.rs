use anyhow::Result;
use lingo::cli;

#[tokio::main]
async fn main() -> Result<()> {
    let (action, telemetry) = cli::start()?;

    let result = action.execute().await;

    telemetry.shutdown();

    result
}
