#![forbid(unsafe_code)]

//! Runtime settings. Precedence: explicit overrides (CLI flags), then the
//! process environment, then a `.env` file, then built-in defaults.

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
};

use crate::output::OutputFormat;

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_YT_DLP: &str = "yt-dlp";

const OUTPUT_DIR_KEY: &str = "YTMETA_OUTPUT_DIR";
const FORMAT_KEY: &str = "YTMETA_FORMAT";
const YT_DLP_KEY: &str = "YTMETA_YT_DLP";
const COOKIES_KEY: &str = "YTMETA_COOKIES";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub yt_dlp: PathBuf,
    pub cookies: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeOverrides {
    pub output_dir: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub yt_dlp: Option<PathBuf>,
    pub cookies: Option<PathBuf>,
    pub env_path: Option<PathBuf>,
}

pub fn resolve_runtime_settings(overrides: RuntimeOverrides) -> Result<RuntimeSettings> {
    let env_path = overrides
        .env_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(&env_path)?;
    build_settings(&file_vars, env_var_string, overrides)
}

fn build_settings(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: RuntimeOverrides,
) -> Result<RuntimeSettings> {
    let lookup = |key: &str| env_lookup(key).or_else(|| file_vars.get(key).cloned());

    let output_dir = overrides
        .output_dir
        .or_else(|| lookup(OUTPUT_DIR_KEY).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    let format = match overrides.format {
        Some(format) => format,
        None => match lookup(FORMAT_KEY) {
            Some(value) => value
                .parse()
                .with_context(|| format!("invalid {FORMAT_KEY}"))?,
            None => OutputFormat::default(),
        },
    };
    let yt_dlp = overrides
        .yt_dlp
        .or_else(|| lookup(YT_DLP_KEY).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_YT_DLP));
    let cookies = overrides
        .cookies
        .or_else(|| lookup(COOKIES_KEY).map(PathBuf::from));

    Ok(RuntimeSettings {
        output_dir,
        format,
        yt_dlp,
        cookies,
    })
}

fn env_var_string(key: &str) -> Option<String> {
    env::var(key).ok().and_then(non_blank)
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parses `KEY=value` lines. Missing files yield an empty map; comments,
/// blank values and lines without `=` are ignored.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    Ok(content.lines().filter_map(parse_env_line).collect())
}

fn parse_env_line(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let line = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (key, raw) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let raw = raw.trim();
    let value = ['"', '\'']
        .into_iter()
        .find_map(|quote| raw.strip_prefix(quote)?.strip_suffix(quote))
        .unwrap_or(raw);
    non_blank(value.to_string()).map(|value| (key.to_string(), value))
}
