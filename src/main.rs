use airtable_dataset::config::Config;
use airtable_dataset::{dataset, BuildContext};
use anyhow::{Context, Result};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in CI)
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout stays clean for the dataset
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("airtable_dataset=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    let preferences = config.preferences()?;
    let ctx = BuildContext::new(preferences.primary().code());

    info!("Starting dataset build ({:?} source)", config.source);

    let data = dataset::get_dataset(&config, &preferences, None, &ctx)
        .await
        .context("Dataset build failed")?;

    if dataset::get_customer(&data).is_none() {
        warn!("Dataset has no Customer record");
    }

    match &config.output_path {
        Some(path) => {
            dataset::write_dataset(&data, path)
                .await
                .with_context(|| format!("Failed to write dataset to {}", path))?;
            info!("✓ Wrote {} records to {}", data.len(), path);
        }
        None => {
            let json =
                serde_json::to_string_pretty(&data).context("Failed to serialize dataset")?;
            println!("{}", json);
        }
    }

    Ok(())
}
