#![forbid(unsafe_code)]

//! Fetches title, description and transcript for a YouTube video or playlist
//! and saves them as JSON or plain text.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use ytmeta_tools::{
    captions::CleanOptions,
    config::{RuntimeOverrides, RuntimeSettings, resolve_runtime_settings},
    extractor::{MetadataSource, Target, YtDlp},
    fetch::HttpCaptionSource,
    output::{OutputFormat, write_batch, write_single},
    pipeline::{Pipeline, ProcessedVideo},
};

#[derive(Debug, Parser)]
#[command(
    name = "fetch-metadata",
    version,
    about = "Fetch metadata (title, description, transcript) for a YouTube video or playlist."
)]
struct Cli {
    /// Video or playlist URL.
    url: String,

    /// Directory where metadata files will be saved [default: output].
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Output format for the metadata [default: json].
    #[arg(long, value_enum, ignore_case = true)]
    format: Option<OutputFormat>,

    /// Save one file per playlist video instead of one file for the playlist.
    #[arg(long)]
    split: bool,

    /// Drop the repeated lines of rolling auto-generated captions.
    #[arg(long)]
    collapse_repeats: bool,

    /// Netscape cookies file handed to yt-dlp.
    #[arg(long, value_name = "FILE")]
    cookies: Option<PathBuf>,

    /// yt-dlp executable to run.
    #[arg(long = "yt-dlp", value_name = "PATH")]
    yt_dlp: Option<PathBuf>,

    /// Settings file [default: .env].
    #[arg(long, value_name = "FILE")]
    env_file: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> RuntimeOverrides {
        RuntimeOverrides {
            output_dir: self.output_dir.clone(),
            format: self.format,
            yt_dlp: self.yt_dlp.clone(),
            cookies: self.cookies.clone(),
            env_path: self.env_file.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(0) => {
            error!("No metadata was saved.");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "ytmeta_tools=debug,fetch_metadata=debug,info"
    } else {
        "ytmeta_tools=info,fetch_metadata=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns the number of files written. Only setup problems are errors;
/// per-video failures are logged and skipped.
fn run(cli: &Cli) -> Result<usize> {
    let settings = resolve_runtime_settings(cli.overrides()).context("loading settings")?;
    let ytdlp = YtDlp::new(&settings.yt_dlp).with_cookies(settings.cookies.clone());
    ytdlp.ensure_available()?;
    fs::create_dir_all(&settings.output_dir)
        .with_context(|| format!("creating {}", settings.output_dir.display()))?;

    info!(
        yt_dlp = %ytdlp.program().display(),
        output_dir = %settings.output_dir.display(),
        format = %settings.format,
        "fetching {}",
        cli.url
    );

    let captions = HttpCaptionSource::new();
    let options = CleanOptions {
        collapse_repeats: cli.collapse_repeats,
    };
    let pipeline = Pipeline::new(&ytdlp, &captions, options);

    let target = ytdlp
        .resolve(&cli.url)
        .with_context(|| format!("Error fetching metadata for {}", cli.url))?;

    let written = match target {
        Target::Video(info) => usize::from(save_video(&pipeline.process_info(&info), &settings)),
        Target::Collection(collection) if cli.split => {
            let mut written = 0;
            pipeline.process_collection_with(&collection, |video| {
                written += usize::from(save_video(video, &settings));
            });
            written
        }
        Target::Collection(collection) => {
            let batch = pipeline.process_collection(&collection);
            match write_batch(
                &batch.id,
                batch.records(),
                &settings.output_dir,
                settings.format,
            ) {
                Ok(path) => {
                    println!("Metadata saved to: {}", path.display());
                    1
                }
                Err(err) => {
                    error!(playlist = %batch.id, "could not save playlist metadata: {err:#}");
                    0
                }
            }
        }
    };
    Ok(written)
}

fn save_video(video: &ProcessedVideo, settings: &RuntimeSettings) -> bool {
    match write_single(
        &video.id,
        &video.record,
        &settings.output_dir,
        settings.format,
    ) {
        Ok(path) => {
            println!("Metadata saved to: {}", path.display());
            true
        }
        Err(err) => {
            error!(video = %video.id, "could not save metadata: {err:#}");
            false
        }
    }
}
