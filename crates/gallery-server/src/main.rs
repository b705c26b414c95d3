//! Local Lora Gallery server - HTTP backend for the gallery node.
//!
//! This binary serves the `/localloragallery/*` endpoints the gallery front
//! end talks to, on top of the `lora-gallery` library.

mod error;
mod handlers;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use lora_gallery::config::GalleryConfig;
use lora_gallery::GalleryApi;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lora-gallery-server")]
#[command(about = "HTTP server for the Local Lora Gallery")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Folder holding the LoRA files
    #[arg(long, env = "LORA_GALLERY_ROOT")]
    lora_root: PathBuf,

    /// Directory for the gallery's JSON files
    #[arg(long, env = "LORA_GALLERY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Do not contact Civitai
    #[arg(long)]
    disable_civitai: bool,

    /// The accelerated LoRA loader is installed in the host
    #[arg(long)]
    accelerated_loader: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_logging(debug: bool, json: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false);

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug, args.log_json);

    info!("Starting {} server", GalleryConfig::APP_NAME);

    let data_dir = match args.data_dir {
        Some(path) => path,
        None => dirs::data_dir()
            .map(|d| d.join(GalleryConfig::DATA_DIR_NAME))
            .context("No platform data directory; pass --data-dir")?,
    };

    info!("LoRA root: {}", args.lora_root.display());
    info!("Data directory: {}", data_dir.display());

    let api = GalleryApi::builder(&args.lora_root)
        .data_dir(&data_dir)
        .auto_create_dirs(true)
        .with_civitai(!args.disable_civitai)
        .accelerated_loader(args.accelerated_loader)
        .build()?;

    let addr = server::start_server(api, &args.host, args.port).await?;

    // Machine-readable line for launchers that start us with port 0
    println!("GALLERY_PORT={}", addr.port());

    info!("Gallery server running on {}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
