use anyhow::Result;
use detection_configuration::{load_config, setup_logging};
use detection_setup::build_and_run;

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    setup_logging(&config);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "deepfake detection service starting");
    build_and_run(config).await
}
