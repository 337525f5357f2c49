#![forbid(unsafe_code)]

//! On-disk formats for metadata records.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::metadata::MetadataRecord;

const BATCH_DIVIDER_WIDTH: usize = 50;
const JSON_INDENT: &[u8] = b"    ";
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// Labeled plain text.
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Text => "txt",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "text" => Ok(OutputFormat::Text),
            other => bail!("unknown output format {other:?} (expected json or text)"),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Json => "json",
            OutputFormat::Text => "text",
        })
    }
}

/// `<dir>/<id>.<ext>`
pub fn output_path(directory: &Path, id: &str, format: OutputFormat) -> PathBuf {
    directory.join(format!("{id}.{}", format.extension()))
}

pub fn write_single(
    id: &str,
    record: &MetadataRecord,
    directory: &Path,
    format: OutputFormat,
) -> Result<PathBuf> {
    let contents = match format {
        OutputFormat::Json => to_json(record)?,
        OutputFormat::Text => render_text(record),
    };
    persist(&output_path(directory, id, format), &contents)
}

/// Writes all records of a collection into one file, preserving order.
pub fn write_batch<'r, I>(
    id: &str,
    records: I,
    directory: &Path,
    format: OutputFormat,
) -> Result<PathBuf>
where
    I: IntoIterator<Item = &'r MetadataRecord>,
{
    let records: Vec<&MetadataRecord> = records.into_iter().collect();
    let contents = match format {
        OutputFormat::Json => to_json(&records)?,
        OutputFormat::Text => {
            let divider = "-".repeat(BATCH_DIVIDER_WIDTH);
            records
                .iter()
                .map(|record| render_text(record))
                .collect::<Vec<_>>()
                .join(&format!("{divider}\n"))
        }
    };
    persist(&output_path(directory, id, format), &contents)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(JSON_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value
        .serialize(&mut serializer)
        .context("serializing metadata")?;
    buffer.push(b'\n');
    String::from_utf8(buffer).context("serialized metadata is not UTF-8")
}

fn render_text(record: &MetadataRecord) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "Title: {}", record.title);
    let _ = writeln!(out, "Description: {}", record.description);
    let _ = writeln!(out, "Transcript:\n{}", record.transcript);
    out
}

/// Creates the directory if needed and replaces `path` in one rename, so a
/// failed write never leaves a truncated file behind.
fn persist(path: &Path, contents: &str) -> Result<PathBuf> {
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(directory).with_context(|| format!("creating {}", directory.display()))?;

    let mut builder = tempfile::Builder::new();
    // Temporary files default to owner-only; saved metadata is shared like any
    // other output file (the process umask still applies).
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(FILE_MODE));
    }
    let mut tmp = builder
        .tempfile_in(directory)
        .with_context(|| format!("creating temporary file in {}", directory.display()))?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("writing {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    fn record(title: &str) -> MetadataRecord {
        MetadataRecord {
            title: title.into(),
            description: "A description with \"quotes\" and ünïcödé".into(),
            transcript: "Hello world".into(),
        }
    }

    #[test]
    fn output_path_is_deterministic() {
        let dir = Path::new("/tmp/out");
        assert_eq!(
            output_path(dir, "abc123", OutputFormat::Json),
            PathBuf::from("/tmp/out/abc123.json")
        );
        assert_eq!(
            output_path(dir, "abc123", OutputFormat::Text),
            PathBuf::from("/tmp/out/abc123.txt")
        );
    }

    #[test]
    fn format_parses_case_insensitively() -> Result<()> {
        assert_eq!("JSON".parse::<OutputFormat>()?, OutputFormat::Json);
        assert_eq!(" Text ".parse::<OutputFormat>()?, OutputFormat::Text);
        assert!("xml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Text.to_string(), "text");
        Ok(())
    }

    #[test]
    fn json_single_round_trips() -> Result<()> {
        let dir = tempdir()?;
        let written = record("Title");
        let path = write_single("abc123", &written, dir.path(), OutputFormat::Json)?;
        assert_eq!(path, dir.path().join("abc123.json"));

        let raw = fs::read_to_string(&path)?;
        let title_at = raw.find("\"title\"").unwrap();
        let description_at = raw.find("\"description\"").unwrap();
        let transcript_at = raw.find("\"transcript\"").unwrap();
        assert!(title_at < description_at && description_at < transcript_at);
        assert!(raw.contains("\n    \"title\": \"Title\""));

        let loaded: MetadataRecord = serde_json::from_str(&raw)?;
        assert_eq!(loaded, written);
        Ok(())
    }

    #[test]
    fn rewriting_overwrites_existing_file() -> Result<()> {
        let dir = tempdir()?;
        write_single("abc123", &record("First"), dir.path(), OutputFormat::Json)?;
        let path = write_single("abc123", &record("Second"), dir.path(), OutputFormat::Json)?;
        let loaded: MetadataRecord = serde_json::from_str(&fs::read_to_string(path)?)?;
        assert_eq!(loaded.title, "Second");
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn saved_files_are_readable_by_others() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir()?;
        for format in [OutputFormat::Json, OutputFormat::Text] {
            let path = write_single("abc", &record("T"), dir.path(), format)?;
            let mode = fs::metadata(&path)?.permissions().mode() & 0o777;
            assert_eq!(mode & 0o600, 0o600, "{}: {mode:o}", path.display());
            assert_eq!(mode & 0o044, 0o044, "{}: {mode:o}", path.display());
        }
        let path = write_batch("PL1", &[record("T")], dir.path(), OutputFormat::Json)?;
        let mode = fs::metadata(&path)?.permissions().mode();
        assert_eq!(mode & 0o044, 0o044);
        Ok(())
    }

    #[test]
    fn missing_directories_are_created() -> Result<()> {
        let dir = tempdir()?;
        let nested = dir.path().join("a").join("b");
        let path = write_single("x", &record("T"), &nested, OutputFormat::Text)?;
        assert!(path.exists());
        write_single("y", &record("T"), &nested, OutputFormat::Text)?;
        Ok(())
    }

    #[test]
    fn text_single_uses_labeled_lines() -> Result<()> {
        let dir = tempdir()?;
        let path = write_single("abc", &record("Title"), dir.path(), OutputFormat::Text)?;
        assert_eq!(
            fs::read_to_string(path)?,
            "Title: Title\nDescription: A description with \"quotes\" and ünïcödé\nTranscript:\nHello world\n"
        );
        Ok(())
    }

    #[test]
    fn json_batch_is_ordered_list() -> Result<()> {
        let dir = tempdir()?;
        let records = [record("One"), record("Two")];
        let path = write_batch("PL1", &records, dir.path(), OutputFormat::Json)?;
        let loaded: Vec<MetadataRecord> = serde_json::from_str(&fs::read_to_string(path)?)?;
        assert_eq!(loaded, records.to_vec());
        Ok(())
    }

    #[test]
    fn text_batch_separates_records_with_divider() -> Result<()> {
        let dir = tempdir()?;
        let records = [record("One"), record("Two")];
        let path = write_batch("PL1", &records, dir.path(), OutputFormat::Text)?;
        let contents = fs::read_to_string(path)?;
        let divider = format!("\n{}\n", "-".repeat(50));
        assert_eq!(contents.matches(&divider).count(), 1);
        let (first, second) = contents.split_once(&divider).unwrap();
        assert!(first.starts_with("Title: One\n"));
        assert!(second.starts_with("Title: Two\n"));
        Ok(())
    }

    #[test]
    fn empty_batch_still_writes_file() -> Result<()> {
        let dir = tempdir()?;
        let path = write_batch("PL1", &[], dir.path(), OutputFormat::Json)?;
        assert_eq!(fs::read_to_string(path)?.trim(), "[]");
        Ok(())
    }
}
