#![forbid(unsafe_code)]

//! Input boundary: everything we know about a URL comes from `yt-dlp
//! --dump-single-json`.

use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

use crate::metadata::{CollectionInfo, VideoInfo};

/// What a URL resolved to.
#[derive(Debug, Clone)]
pub enum Target {
    Video(VideoInfo),
    Collection(CollectionInfo),
}

/// Source of video and collection metadata.
pub trait MetadataSource {
    /// Resolves a user supplied URL or id. Collections are listed flat, so
    /// their entries only carry ids.
    fn resolve(&self, url: &str) -> Result<Target>;

    /// Full metadata (including caption indexes) for a single video.
    fn video(&self, url: &str) -> Result<VideoInfo>;
}

pub fn video_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Splits a `--dump-single-json` payload into a video or a collection. yt-dlp
/// marks collections with an `entries` array.
pub fn classify(value: Value) -> Result<Target> {
    if value.get("entries").is_some_and(Value::is_array) {
        let collection: CollectionInfo =
            serde_json::from_value(value).context("deserializing collection metadata")?;
        Ok(Target::Collection(collection))
    } else {
        let video: VideoInfo =
            serde_json::from_value(value).context("deserializing video metadata")?;
        Ok(Target::Video(video))
    }
}

/// Thin wrapper around the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
    cookies: Option<PathBuf>,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            cookies: None,
        }
    }

    /// Passes `--cookies` on every call, as long as the file exists.
    pub fn with_cookies(mut self, cookies: Option<PathBuf>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Runs `<program> --version` so a missing binary fails before any work.
    pub fn ensure_available(&self) -> Result<()> {
        ensure_program_available(&self.program)
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        if let Some(cookies) = &self.cookies
            && cookies.exists()
        {
            command
                .arg("--cookies")
                .arg(cookies.to_string_lossy().to_string());
        }
        command
    }

    fn dump_single_json(&self, url: &str, extra: &[&str]) -> Result<Value> {
        let mut command = self.command();
        command
            .arg("--dump-single-json")
            .arg("--skip-download")
            .arg("--no-warnings")
            .arg("--no-progress")
            .args(extra)
            .arg(url);

        debug!(program = %self.program.display(), url, ?extra, "running yt-dlp");
        let output = command
            .output()
            .with_context(|| format!("fetching metadata for {url}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "metadata command failed for {} (status {}): {}",
                url,
                output.status,
                stderr.trim()
            );
        }

        let raw_json =
            String::from_utf8(output.stdout).context("parsing metadata JSON response as UTF-8")?;
        serde_json::from_str(&raw_json).context("deserializing metadata JSON")
    }
}

impl MetadataSource for YtDlp {
    fn resolve(&self, url: &str) -> Result<Target> {
        let value = self.dump_single_json(url, &["--flat-playlist"])?;
        classify(value)
    }

    fn video(&self, url: &str) -> Result<VideoInfo> {
        let value = self.dump_single_json(url, &["--no-playlist"])?;
        serde_json::from_value(value).with_context(|| format!("deserializing metadata for {url}"))
    }
}

/// Runs `<program> --version` to fail loudly when yt-dlp is missing.
pub fn ensure_program_available(program: &Path) -> Result<()> {
    let status = Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => Ok(()),
        Ok(_) => bail!(
            "{} is installed but returned a failure status",
            program.display()
        ),
        Err(err) => bail!(
            "{} is not installed or not in PATH: {}",
            program.display(),
            err
        ),
    }
}
