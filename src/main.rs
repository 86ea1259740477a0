use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use rfwebfonts::{
    AuditConfig, CanonicalFontRecord, NetworkRecord, StaticArtifacts, TraceOfTab, WebFontsAudit,
};
use serde::de::DeserializeOwned;

#[derive(Parser)]
#[command(name = "rfwebfonts", version, about = "Audit web fonts for missing font-display")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score previously gathered fonts against network and trace artifacts
    Audit {
        /// JSON array of canonical font records (output of `gather`)
        #[arg(long)]
        fonts: PathBuf,
        /// JSON array of network records
        #[arg(long)]
        network: PathBuf,
        /// JSON trace-of-tab object with `timestamps`
        #[arg(long)]
        trace: PathBuf,
        /// Rounding granularity for displayed milliseconds
        #[arg(long, default_value_t = 1.0)]
        granularity: f64,
    },
    /// Load a page in headless Chrome and print its canonical font records
    #[cfg(feature = "cdp")]
    Gather {
        url: String,
        /// Post-navigation settle time in milliseconds
        #[arg(long, default_value_t = 500)]
        settle_ms: u64,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Audit {
            fonts,
            network,
            trace,
            granularity,
        } => {
            let fonts: Vec<CanonicalFontRecord> = read_json(&fonts)?;
            let network: Vec<NetworkRecord> = read_json(&network)?;
            let trace: TraceOfTab = read_json(&trace)?;

            let config = AuditConfig {
                display_granularity_ms: granularity,
                ..Default::default()
            };
            let artifacts = StaticArtifacts::new(network, trace);
            let result = WebFontsAudit::new(config).audit(&fonts, &artifacts).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        #[cfg(feature = "cdp")]
        Command::Gather { url, settle_ms } => {
            use rfwebfonts::async_api::Browser;
            use rfwebfonts::{EngineConfig, FontsGatherer};

            let browser = Browser::new(Some(EngineConfig {
                settle_ms,
                ..Default::default()
            }))
            .await?;
            let page = browser.new_page().await?;
            page.goto(&url).await?;

            let fonts = FontsGatherer::new(&AuditConfig::default())
                .after_pass(&page)
                .await?;
            browser.close().await?;
            println!("{}", serde_json::to_string_pretty(&fonts)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("rfwebfonts failed: {:#}", e);
        std::process::exit(1);
    }
}
