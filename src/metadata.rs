#![forbid(unsafe_code)]

//! Metadata model for ytmeta-tools.
//!
//! `VideoInfo` and `CollectionInfo` mirror the subset of yt-dlp's
//! `--dump-single-json` payload we read. `MetadataRecord` is what ends up on
//! disk.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::captions::{
    CaptionTrackIndex, CleanOptions, PLAIN_CUE_FORMAT, TARGET_LANGUAGE, TrackSelection,
    clean_with, select_track,
};
use crate::fetch::CaptionSource;
use crate::text::normalize;

pub const NO_TRACK_TEXT: &str = "No English subtitles available.";
pub const WRONG_FORMAT_TEXT: &str = "Transcript not available in VTT format.";
pub const EMPTY_TRANSCRIPT_TEXT: &str = "No spoken text found in English subtitles.";

/// A single video as reported by yt-dlp. Everything is optional except the id
/// because older or restricted videos may lack metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub fulltitle: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subtitles: Option<CaptionTrackIndex>,
    #[serde(default)]
    pub automatic_captions: Option<CaptionTrackIndex>,
}

impl VideoInfo {
    fn display_title(&self) -> Option<&str> {
        self.title.as_deref().or(self.fulltitle.as_deref())
    }
}

/// A playlist (or channel tab) listed with `--flat-playlist`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionInfo {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// `None` entries are videos yt-dlp could not list (private, removed).
    #[serde(default)]
    pub entries: Vec<Option<CollectionEntry>>,
}

/// A flat-listed playlist entry. The title is only used for progress output.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// How the transcript for a video was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcript {
    /// No caption track for the target language.
    Unavailable,
    /// A track exists but not in the plain-cue format.
    WrongFormat,
    /// Cleaned caption text; never empty.
    Fetched(String),
    /// The payload was fetched but nothing was left after cleaning.
    Empty,
    /// The payload could not be fetched; holds the failure detail.
    FetchFailed(String),
}

impl Transcript {
    /// Wraps cleaned text, mapping an empty result to [`Transcript::Empty`].
    pub fn from_cleaned(text: String) -> Self {
        if text.is_empty() {
            Transcript::Empty
        } else {
            Transcript::Fetched(text)
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Transcript::Fetched(text) => text,
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transcript::Unavailable => f.write_str(NO_TRACK_TEXT),
            Transcript::WrongFormat => f.write_str(WRONG_FORMAT_TEXT),
            Transcript::Fetched(text) => f.write_str(text),
            Transcript::Empty => f.write_str(EMPTY_TRANSCRIPT_TEXT),
            Transcript::FetchFailed(detail) => write!(f, "Error fetching transcript: {detail}"),
        }
    }
}

/// Persisted metadata for one video. Field order is the serialization order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub title: String,
    pub description: String,
    pub transcript: String,
}

/// Looks up the English plain-cue track, fetches and cleans it. Never fails:
/// every problem is folded into the returned variant.
pub fn resolve_transcript(
    info: &VideoInfo,
    captions: &impl CaptionSource,
    options: &CleanOptions,
) -> Transcript {
    let selection = select_track(
        info.subtitles.as_ref(),
        info.automatic_captions.as_ref(),
        TARGET_LANGUAGE,
        PLAIN_CUE_FORMAT,
    );
    match selection {
        TrackSelection::Missing => {
            debug!(video = %info.id, "no {TARGET_LANGUAGE} caption track");
            Transcript::Unavailable
        }
        TrackSelection::NoMatchingFormat => {
            debug!(video = %info.id, "no {PLAIN_CUE_FORMAT} encoding for {TARGET_LANGUAGE}");
            Transcript::WrongFormat
        }
        TrackSelection::Found(url) => match captions.fetch(url) {
            Ok(raw) => Transcript::from_cleaned(clean_with(&raw, options)),
            Err(err) => {
                warn!(video = %info.id, error = %err, "caption fetch failed");
                Transcript::FetchFailed(err.to_string())
            }
        },
    }
}

pub fn assemble(info: &VideoInfo, transcript: Transcript) -> MetadataRecord {
    MetadataRecord {
        title: normalize(info.display_title()),
        description: normalize(info.description.as_deref()),
        transcript: transcript.into_text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::CaptionEncoding;
    use crate::fetch::FetchError;
    use std::cell::Cell;

    const PAYLOAD: &str = "WEBVTT\nKind: captions\nLanguage: en\n\n00:00:00.000 --> 00:00:02.000\n[Music] Hello <c>world</c>\n";

    fn track(ext: &str, url: &str) -> CaptionEncoding {
        CaptionEncoding {
            ext: Some(ext.into()),
            url: Some(url.into()),
        }
    }

    fn sample_video_info() -> VideoInfo {
        VideoInfo {
            id: "abc123".into(),
            title: Some("  Sample   Title ".into()),
            fulltitle: None,
            description: Some("line one\n\nline two".into()),
            subtitles: None,
            automatic_captions: None,
        }
    }

    fn fixed_payload(_url: &str) -> Result<String, FetchError> {
        Ok(PAYLOAD.to_string())
    }

    #[test]
    fn missing_language_yields_fixed_text() {
        let mut info = sample_video_info();
        info.subtitles = Some(CaptionTrackIndex::from([(
            "de".to_string(),
            vec![track("vtt", "https://x/de.vtt")],
        )]));
        let transcript = resolve_transcript(&info, &fixed_payload, &CleanOptions::default());
        assert_eq!(transcript, Transcript::Unavailable);
        let record = assemble(&info, transcript);
        assert_eq!(record.transcript, "No English subtitles available.");
        assert_eq!(record.title, "Sample Title");
        assert_eq!(record.description, "line one line two");
    }

    #[test]
    fn wrong_format_yields_fixed_text() {
        let mut info = sample_video_info();
        info.automatic_captions = Some(CaptionTrackIndex::from([(
            "en".to_string(),
            vec![track("json3", "https://x/en.json3"), track("srv1", "https://x/en.srv1")],
        )]));
        let record = assemble(
            &info,
            resolve_transcript(&info, &fixed_payload, &CleanOptions::default()),
        );
        assert_eq!(record.transcript, "Transcript not available in VTT format.");
    }

    #[test]
    fn matching_track_is_fetched_and_cleaned() {
        let mut info = sample_video_info();
        info.subtitles = Some(CaptionTrackIndex::from([(
            "en".to_string(),
            vec![track("vtt", "https://x/en.vtt")],
        )]));
        let requested = Cell::new(false);
        let source = |url: &str| -> Result<String, FetchError> {
            assert_eq!(url, "https://x/en.vtt");
            requested.set(true);
            Ok(PAYLOAD.to_string())
        };
        let record = assemble(
            &info,
            resolve_transcript(&info, &source, &CleanOptions::default()),
        );
        assert!(requested.get());
        assert_eq!(record.transcript, "Hello world");
    }

    #[test]
    fn fetch_failure_embeds_reason() {
        let mut info = sample_video_info();
        info.subtitles = Some(CaptionTrackIndex::from([(
            "en".to_string(),
            vec![track("vtt", "https://x/en.vtt")],
        )]));
        let source = |url: &str| -> Result<String, FetchError> {
            Err(FetchError::Status {
                status: 429,
                url: url.to_string(),
            })
        };
        let transcript = resolve_transcript(&info, &source, &CleanOptions::default());
        assert!(matches!(transcript, Transcript::FetchFailed(_)));
        let record = assemble(&info, transcript);
        assert_eq!(
            record.transcript,
            "Error fetching transcript: HTTP status 429 for https://x/en.vtt"
        );
    }

    #[test]
    fn empty_cleaned_payload_uses_placeholder() {
        let mut info = sample_video_info();
        info.subtitles = Some(CaptionTrackIndex::from([(
            "en".to_string(),
            vec![track("vtt", "https://x/en.vtt")],
        )]));
        let source = |_: &str| -> Result<String, FetchError> {
            Ok("WEBVTT\n\n00:00:00.000 --> 00:00:01.000\n[Music]\n".into())
        };
        let transcript = resolve_transcript(&info, &source, &CleanOptions::default());
        assert_eq!(transcript, Transcript::Empty);
        assert_eq!(transcript.into_text(), EMPTY_TRANSCRIPT_TEXT);
    }

    #[test]
    fn absent_fields_become_sentinel() {
        let info = VideoInfo {
            id: "x".into(),
            ..VideoInfo::default()
        };
        let record = assemble(&info, Transcript::Unavailable);
        assert_eq!(record.title, "N/A");
        assert_eq!(record.description, "N/A");
    }

    #[test]
    fn fulltitle_backs_up_missing_title() {
        let info = VideoInfo {
            id: "x".into(),
            fulltitle: Some("Full Title".into()),
            ..VideoInfo::default()
        };
        assert_eq!(assemble(&info, Transcript::Unavailable).title, "Full Title");
    }

    #[test]
    fn video_info_parses_ytdlp_json() {
        let json = serde_json::json!({
            "id": "abc123",
            "title": "Alpha",
            "description": null,
            "subtitles": {},
            "automatic_captions": {
                "en": [
                    { "ext": "json3", "url": "https://x/en.json3", "name": "English" },
                    { "ext": "vtt", "url": "https://x/en.vtt", "name": "English" }
                ]
            },
            "formats": [{ "format_id": "18" }]
        });
        let info: VideoInfo = serde_json::from_value(json).unwrap();
        assert_eq!(info.id, "abc123");
        assert!(info.description.is_none());
        let auto = info.automatic_captions.as_ref().unwrap();
        assert_eq!(auto["en"][1].ext.as_deref(), Some("vtt"));
    }

    #[test]
    fn transcript_display_matches_persisted_text() {
        assert_eq!(Transcript::Unavailable.to_string(), NO_TRACK_TEXT);
        assert_eq!(Transcript::WrongFormat.to_string(), WRONG_FORMAT_TEXT);
        assert_eq!(Transcript::Fetched("hi".into()).into_text(), "hi");
        assert_eq!(Transcript::from_cleaned(String::new()), Transcript::Empty);
    }
}
