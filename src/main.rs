// wavepeek - play 30 second track previews in the terminal, with a live spectrum
// Usage: wavepeek --tracks chart.json   or   wavepeek <preview-url>...

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use wavepeek::audio::{HttpFetcher, RodioOutput};
use wavepeek::catalog::{self, Track};
use wavepeek::config::Config;
use wavepeek::player::Player;
use wavepeek::ui::App;

#[derive(Parser)]
#[command(name = "wavepeek")]
#[command(about = "Preview player with a live frequency visualization")]
struct Args {
    /// Enable developer logging (debug output to the log file)
    #[arg(long)]
    dev: bool,

    /// Use this config file instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Catalog JSON with the tracks to queue
    #[arg(long)]
    tracks: Option<PathBuf>,

    /// Preview URLs to queue after the catalog tracks
    urls: Vec<String>,
}

fn init_logging(dev: bool) -> Result<WorkerGuard> {
    // The terminal belongs to the UI, so logs go to a file
    let log_dir = PathBuf::from("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "wavepeek.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let default_filter = if dev { "debug,wavepeek=trace" } else { "info,wavepeek=debug" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = tracing_subscriber::fmt()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_env_filter(filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if dev {
        eprintln!("Dev mode: verbose logs in {}", log_dir.join("wavepeek.log.<date>").display());
    }

    Ok(guard)
}

fn collect_tracks(args: &Args) -> Result<Vec<Track>> {
    let mut tracks = match &args.tracks {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            catalog::parse_tracks(&json).with_context(|| format!("Bad catalog JSON in {}", path.display()))?
        }
        None => Vec::new(),
    };
    tracks.extend(args.urls.iter().map(Track::from_preview_url));

    if tracks.is_empty() {
        bail!("Nothing to play: pass --tracks <file.json> or one or more preview URLs");
    }
    Ok(tracks)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(args.dev)?;

    info!("wavepeek {} starting up", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let tracks = collect_tracks(&args)?;
    let playable = tracks.iter().filter(|t| t.is_playable()).count();
    if playable < tracks.len() {
        warn!("{} of {} tracks have no preview", tracks.len() - playable, tracks.len());
    }

    let output = RodioOutput::open(&config.audio)?;
    let fetcher = HttpFetcher::new(&config.network)?;
    let player = Player::spawn(Box::new(output), Arc::new(fetcher), &config);
    player.load_playlist(tracks);

    let app = App::new(player, config.sampling.frame_interval())?;
    let result = app.run().await;

    match result {
        Ok(player) => {
            player.shutdown().await;
            info!("wavepeek exiting");
            Ok(())
        }
        Err(e) => {
            // the player handle was dropped with the app, which stops the service
            warn!("UI loop failed: {}", e);
            Err(e)
        }
    }
}
