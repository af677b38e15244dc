//! volcimg - text-to-image generation against the Volcengine visual API.
//!
//! Runs one generation per invocation: sign, send, normalize, decode, then
//! print one line per image and save the downloadable ones.
//!
//! # Usage
//!
//! ```text
//! VOLCANO_AK=... VOLCANO_SK=... volcimg "a lighthouse at dusk" --ratio 16:9 --out ./renders
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `VOLCANO_AK` | *(placeholder)* | Access key id |
//! | `VOLCANO_SK` | *(placeholder)* | Secret access key |
//! | `VOLC_API_HOST` | `visual.volcengineapi.com` | API host |
//! | `VOLC_API_SCHEME` | `https` | URL scheme |
//! | `VOLC_SERVICE` | `cv` | Service in the credential scope |
//! | `VOLC_REGION` | `cn-north-1` | Region in the credential scope |
//! | `VOLC_ACTION` | `CVProcess` | `Action` query parameter |
//! | `VOLC_API_VERSION` | `2022-08-31` | `Version` query parameter |
//! | `VOLC_REQ_KEY` | `high_aes_general_v30l_zt2i` | Model identifier |
//! | `VOLC_TIMEOUT_SECS` | *(unset)* | Transport timeout |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod cli;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use volcimg_client::{Gallery, ImageCrateDecoder, VolcImageClient};
use volcimg_core::VolcConfig;
use volcimg_model::GenerationRequest;

use crate::cli::Cli;
use crate::output::SaveStatus;

/// Version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

async fn run(cli: Cli, config: VolcConfig) -> Result<()> {
    let (dimensions, ratio) = cli.size();
    let request = GenerationRequest::new(&cli.prompt, dimensions, config.req_key.as_str())?
        .with_aspect_ratio(ratio);
    let client = VolcImageClient::new(config)?;

    let images = client.send(&request).await?.into_images()?;
    if images.is_empty() {
        warn!("Response contained no images");
    }

    let mut gallery = Gallery::new();
    gallery.show(images, &ImageCrateDecoder);

    let statuses = if cli.no_save {
        vec![SaveStatus::NotSaved; gallery.entries().len()]
    } else {
        let stamp = chrono::Utc::now().timestamp_millis();
        output::save_gallery(&client, &gallery, &cli.out, stamp).await?
    };

    for (entry, status) in gallery.entries().iter().zip(&statuses) {
        println!("{}", output::describe(entry, status));
    }

    let failed = statuses
        .iter()
        .filter(|s| matches!(s, SaveStatus::Failed(_)))
        .count();
    info!(
        images = gallery.entries().len(),
        broken = gallery.broken_count(),
        failed,
        "Generation finished"
    );
    if failed > 0 {
        anyhow::bail!("{failed} image(s) could not be saved");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, diagnostics) = VolcConfig::load_from_env();

    init_tracing(&config.log_level)?;
    for diagnostic in &diagnostics {
        diagnostic.log();
    }

    info!(
        host = %config.host,
        region = %config.region,
        service = %config.service,
        req_key = %config.req_key,
        version = VERSION,
        "starting volcimg",
    );

    run(cli, config).await
}
