use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "cm")]
#[command(about = "ColorMe try-on CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the curated hair-color palette
    Palette {
        /// Print the palette as a JSON array instead of key=value lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print a fresh correlation id in the client's format
    RequestId,

    /// Submit a selfie for a hair-color try-on
    TryOn {
        /// Path to the selfie image
        #[arg(long)]
        selfie: PathBuf,

        /// Palette shade name (defaults to the first palette entry)
        #[arg(long)]
        color: Option<String>,

        /// Intensity 0-100; snapped to steps of 5
        #[arg(long)]
        intensity: Option<f64>,

        /// Use the offline mock gateway instead of the relay
        #[arg(long, default_value_t = false)]
        mock: bool,

        /// Relay base URL (overrides CM_RELAY_BASE_URL)
        #[arg(long)]
        base_url: Option<String>,

        /// Request timeout in milliseconds (overrides CM_REQUEST_TIMEOUT_MS)
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Palette { json } => commands::palette::print_palette(json),
        Commands::RequestId => {
            println!("{}", cm_core::create_request_id());
            Ok(())
        }
        Commands::TryOn {
            selfie,
            color,
            intensity,
            mock,
            base_url,
            timeout_ms,
        } => {
            commands::try_on::run(commands::try_on::TryOnArgs {
                selfie,
                color,
                intensity,
                mock,
                base_url,
                timeout_ms,
            })
            .await
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}
