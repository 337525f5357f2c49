#![forbid(unsafe_code)]

//! Caption-track handling: picking the track to fetch from yt-dlp's caption
//! index and reducing a raw WebVTT payload to one line of transcript prose.
//!
//! Cleaning is an ordered list of [`CaptionPass`]es. Each pass rewrites the
//! whole output of the previous one, so the order is part of the contract.

use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::text::collapse_whitespace;

/// Language whose captions end up in the transcript.
pub const TARGET_LANGUAGE: &str = "en";
/// Format tag (yt-dlp `ext`) of the only caption encoding we parse.
pub const PLAIN_CUE_FORMAT: &str = "vtt";

/// One downloadable encoding of a caption track, as listed by yt-dlp under
/// `subtitles` / `automatic_captions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CaptionEncoding {
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Language code -> encodings available for that language.
pub type CaptionTrackIndex = HashMap<String, Vec<CaptionEncoding>>;

/// Result of looking up the target track in the caption indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSelection<'a> {
    /// Neither index lists the language.
    Missing,
    /// The language is listed but none of its encodings has the wanted format.
    NoMatchingFormat,
    /// Locator of the first encoding in the wanted format.
    Found(&'a str),
}

/// Picks the caption locator for `language` in `format`. Manually authored
/// tracks are consulted before automatic captions.
pub fn select_track<'a>(
    manual: Option<&'a CaptionTrackIndex>,
    automatic: Option<&'a CaptionTrackIndex>,
    language: &str,
    format: &str,
) -> TrackSelection<'a> {
    let tracks: Vec<&'a Vec<CaptionEncoding>> = [manual, automatic]
        .into_iter()
        .flatten()
        .filter_map(|index| index.get(language))
        .collect();

    if tracks.is_empty() {
        return TrackSelection::Missing;
    }

    tracks
        .into_iter()
        .flatten()
        .filter(|encoding| encoding.ext.as_deref() == Some(format))
        .find_map(|encoding| encoding.url.as_deref())
        .map_or(TrackSelection::NoMatchingFormat, TrackSelection::Found)
}

// Header lines are `Key: value` (or `Key=value`) pairs directly under the
// signature; a blank line or a cue timing line ends the block. YouTube tracks
// may follow `Style:` with `::cue` rules closed by a `##` line.
static HEADER_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\A\x{FEFF}?WEBVTT[^\n]*\n(?:[A-Za-z][\w-]*[:=][^\n]*\n)*(?:(?:[^\n]+\n)*?##[^\n]*\n)?",
    )
    .expect("valid header pattern")
});

static TIMESTAMP_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\d{2}:\d{2}:\d{2}\.\d{3}[^\n]*\n").expect("valid timestamp pattern")
});

// A tag never spans lines; an unclosed `<` is left for the stray-angle pass.
static INLINE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<.*?>").expect("valid tag pattern"));

// Annotations may straddle a line break; matching across lines keeps a second
// cleaning run from finding pairs that folding brought together.
static ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*?\]").expect("valid annotation pattern"));

/// A single rewrite step of the cleaning pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionPass {
    /// Drop the `WEBVTT` signature and its `Kind:`/`Language:` header lines.
    StripHeader,
    /// Drop every line that starts with an `HH:MM:SS.mmm` timestamp.
    StripTimestampLines,
    /// Drop `<...>` voice, class and inline timing tags.
    StripInlineTags,
    /// Drop `[...]` non-speech annotations such as `[Music]`.
    StripAnnotations,
    /// Drop `<` left behind by malformed tags.
    StripStrayAngles,
    /// Drop a line repeating the previous non-blank line (rolling captions).
    CollapseRepeats,
    /// Turn every newline into a space.
    FoldLines,
    /// Collapse whitespace runs to one space and trim.
    CollapseWhitespace,
}

/// The default pipeline, in execution order.
pub const STANDARD_PASSES: [CaptionPass; 7] = [
    CaptionPass::StripHeader,
    CaptionPass::StripTimestampLines,
    CaptionPass::StripInlineTags,
    CaptionPass::StripAnnotations,
    CaptionPass::StripStrayAngles,
    CaptionPass::FoldLines,
    CaptionPass::CollapseWhitespace,
];

impl CaptionPass {
    pub fn apply(self, text: &str) -> String {
        match self {
            CaptionPass::StripHeader => HEADER_BLOCK.replace(text, "").into_owned(),
            CaptionPass::StripTimestampLines => TIMESTAMP_LINE.replace_all(text, "").into_owned(),
            CaptionPass::StripInlineTags => INLINE_TAG.replace_all(text, "").into_owned(),
            CaptionPass::StripAnnotations => ANNOTATION.replace_all(text, "").into_owned(),
            CaptionPass::StripStrayAngles => text.replace('<', ""),
            CaptionPass::CollapseRepeats => collapse_repeated_lines(text),
            CaptionPass::FoldLines => text.replace('\n', " "),
            CaptionPass::CollapseWhitespace => collapse_whitespace(text),
        }
    }
}

fn collapse_repeated_lines(text: &str) -> String {
    let mut previous: Option<&str> = None;
    let mut kept = Vec::new();
    for line in text.split('\n') {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            kept.push(line);
            continue;
        }
        if previous == Some(trimmed) {
            continue;
        }
        previous = Some(trimmed);
        kept.push(line);
    }
    kept.join("\n")
}

/// Optional behaviour on top of the standard pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanOptions {
    /// Drop consecutive duplicate cue lines before folding. Auto-generated
    /// captions repeat the previous line in every cue.
    pub collapse_repeats: bool,
}

impl CleanOptions {
    /// Passes to run for these options, in order.
    pub fn passes(&self) -> Vec<CaptionPass> {
        let mut passes = STANDARD_PASSES.to_vec();
        if self.collapse_repeats {
            let fold = passes
                .iter()
                .position(|pass| *pass == CaptionPass::FoldLines)
                .unwrap_or(passes.len());
            passes.insert(fold, CaptionPass::CollapseRepeats);
        }
        passes
    }
}

/// Reduces a raw caption payload to a single line of spoken text. Returns an
/// empty string when nothing survives; substituting a placeholder is left to
/// the caller.
pub fn clean(raw: &str) -> String {
    clean_with(raw, &CleanOptions::default())
}

pub fn clean_with(raw: &str, options: &CleanOptions) -> String {
    options
        .passes()
        .into_iter()
        .fold(raw.to_string(), |text, pass| pass.apply(&text))
}
