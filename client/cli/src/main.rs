use clap::{Parser, Subcommand};
use picshelf_core::actions::{self, ConfirmAction, Platform, SourceAction};
use picshelf_core::{Capture, Codec, Gallery, GalleryError, HttpImageApi, ImageFile, Notice};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod ui;

use config::Config;

type HttpGallery = Gallery<HttpImageApi>;

#[derive(Parser)]
#[command(name = "picshelf")]
#[command(about = "Picshelf image gallery client", long_about = None)]
struct Cli {
    /// Image store base URL (overrides the saved one)
    #[arg(long, global = true, env = "PICSHELF_SERVER")]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save the image store URL
    Setup {
        /// Base URL, e.g. http://localhost:8080
        url: String,
    },
    /// Show configuration
    Status,
    /// List images
    Ls,
    /// Upload an image file
    Upload {
        path: PathBuf,
    },
    /// Upload a base64 camera capture
    Capture {
        /// Image format, e.g. jpeg or png
        #[arg(short, long)]
        format: String,
        /// File holding the base64 data (default: stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Delete an image
    Rm {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Pick an image source interactively and upload
    Add,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::load()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "picshelf=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Commands that don't talk to the server
    match &cli.command {
        Commands::Setup { url } => {
            setup(config, url)?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Status => {
            status(&config, cli.server.as_deref())?;
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let gallery = Arc::new(open_gallery(&config, cli.server.as_deref())?);

    // Ctrl-C tears the gallery down; whatever is in flight resolves as cancelled
    let teardown = Arc::clone(&gallery);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            teardown.close();
        }
    });

    let code = match cli.command {
        Commands::Ls => list(&gallery).await?,
        Commands::Upload { path } => upload(&gallery, &path).await?,
        Commands::Capture { format, input } => {
            capture(&gallery, &format, input.as_deref()).await?
        }
        Commands::Rm { id, yes } => remove(&gallery, id, yes).await?,
        Commands::Add => add(&gallery).await?,
        Commands::Setup { .. } | Commands::Status => unreachable!(),
    };

    gallery.close();
    Ok(code)
}

fn open_gallery(config: &Config, server: Option<&str>) -> anyhow::Result<HttpGallery> {
    let api_config = config.api_config(server)?;
    let codec = Codec::new(api_config.yield_between_chunks);
    let api = HttpImageApi::new(api_config)?;
    Ok(Gallery::new(api, Arc::new(ui::ConsoleNotifier)).with_codec(codec))
}

/// Errors other than cancellation were already shown by the notifier.
fn exit_code(result: Result<Notice, GalleryError>) -> ExitCode {
    match result {
        Ok(notice) if notice.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e @ (GalleryError::Cancelled | GalleryError::Busy(_))) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
        Err(_) => ExitCode::FAILURE,
    }
}

fn setup(mut config: Config, url: &str) -> anyhow::Result<()> {
    // Validate before saving
    config.api_config(Some(url))?;
    config.server_url = Some(url.trim_end_matches('/').to_string());
    config.save()?;
    println!("server: {}", url);
    Ok(())
}

fn status(config: &Config, server: Option<&str>) -> anyhow::Result<()> {
    println!("config: {}", Config::config_path()?.display());
    match config.api_config(server) {
        Ok(api) => {
            println!("server: {}", api.base_url());
            if let Some(timeout) = api.timeout {
                println!("timeout: {}s", timeout.as_secs());
            }
        }
        Err(_) => {
            println!("not configured");
            println!("run: picshelf setup <url>");
        }
    }
    Ok(())
}

async fn list(gallery: &HttpGallery) -> anyhow::Result<ExitCode> {
    let result = ui::with_spinner("loading images", gallery.refresh()).await;
    let code = exit_code(result);

    let images = gallery.images();
    if images.is_empty() {
        println!("no images");
        return Ok(code);
    }

    let config = gallery.api().config();
    for image in images {
        println!("{:>6}  {:<24}  {}", image.id, image.file_name, config.image_url(&image));
    }
    Ok(code)
}

async fn upload(gallery: &HttpGallery, path: &Path) -> anyhow::Result<ExitCode> {
    let file = ImageFile::open(path).await?;
    let result = ui::with_spinner("uploading", gallery.add_from_file(file)).await;
    Ok(exit_code(result))
}

async fn capture(
    gallery: &HttpGallery,
    format: &str,
    input: Option<&Path>,
) -> anyhow::Result<ExitCode> {
    let base64 = match input {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            text
        }
    };

    let capture = Capture::new(base64, format);
    let result = ui::with_spinner("uploading", gallery.add_from_capture(&capture)).await;
    Ok(exit_code(result))
}

async fn remove(gallery: &HttpGallery, id: i64, yes: bool) -> anyhow::Result<ExitCode> {
    if let Err(e) = ui::with_spinner("loading images", gallery.refresh()).await {
        return Ok(exit_code(Err(e)));
    }

    let image = gallery
        .images()
        .into_iter()
        .find(|image| image.id == id)
        .ok_or_else(|| anyhow::anyhow!("No image with id {}", id))?;

    let action = if yes {
        ConfirmAction::Delete(image)
    } else {
        ui::confirm(&actions::delete_confirmation(&image))?
    };

    match action {
        ConfirmAction::Delete(image) => {
            let result = ui::with_spinner("deleting", gallery.remove(&image)).await;
            Ok(exit_code(result))
        }
        ConfirmAction::Cancel => {
            tracing::debug!("Delete of image {} cancelled by user", id);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn add(gallery: &HttpGallery) -> anyhow::Result<ExitCode> {
    let buttons = actions::image_source_actions(Platform::Desktop);
    let source = ui::choose(actions::SOURCE_SHEET_HEADER, None, &buttons)?;

    match source {
        SourceAction::Camera | SourceAction::Photos => {
            let path = ui::prompt("base64 capture file")?;
            let format = ui::prompt("format (jpeg, png, ...)")?;
            capture(gallery, &format, Some(Path::new(&path))).await
        }
        SourceAction::File => {
            let path = ui::prompt("image file")?;
            upload(gallery, Path::new(&path)).await
        }
    }
}
