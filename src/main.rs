use clap::{Parser, Subcommand};
use picshelf::api;
use picshelf::catalog::Catalog;
use picshelf::thumbs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "picshelf")]
#[command(about = "Local catalog server for labeled image sets")]
#[command(long_about = "\
Local catalog server for labeled image sets

Your filesystem is the catalog. Directories under the originals root are
folders; each unit is an image file plus an optional same-named .txt label
next to it. Thumbnails are derived into a mirrored cache directory and
invalidated by source modification time.

Layout:

  images/                       # originals root (--root)
  ├── heroes/
  │   ├── blaze.png             # unit image
  │   ├── blaze.txt             # unit label (optional)
  │   └── frost.png
  └── top.jpg
  thumbnails/                   # mirrored cache (--thumbs)
  ├── heroes/
  │   ├── blaze.jpg
  │   └── frost.jpg
  └── top.jpg

Set RUST_LOG to control logging (e.g. RUST_LOG=picshelf=debug).")]
#[command(version)]
struct Cli {
    /// Originals root: the authoritative folder/unit tree
    #[arg(long, default_value = "images", global = true)]
    root: PathBuf,

    /// Thumbnails root: mirrored cache of derived images
    #[arg(long, default_value = "thumbnails", global = true)]
    thumbs: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the catalog server
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind
        #[arg(long, default_value_t = 5000)]
        port: u16,
    },
    /// Pre-generate thumbnails for every catalog image, then exit
    Warm,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "picshelf=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let catalog = Arc::new(Catalog::new(cli.root, cli.thumbs));
    catalog.ensure_roots()?;

    match cli.command {
        Command::Warm => {
            let stats = thumbs::warm_up(&catalog);
            println!("Warm-up: {stats}");
        }
        Command::Serve { host, port } => {
            // Pre-populate the cache without blocking request handling; the
            // lock is taken per file, so requests interleave freely.
            let warm_catalog = catalog.clone();
            tokio::task::spawn_blocking(move || {
                thumbs::warm_up(&warm_catalog);
            });

            let app = api::router(catalog);
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!(%addr, "picshelf listening");
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
