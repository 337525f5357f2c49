#![forbid(unsafe_code)]

//! Per-video and per-collection processing. Videos are handled one at a
//! time in source order; a failing video is skipped, never fatal.

use anyhow::Result;
use tracing::{info, warn};

use crate::captions::CleanOptions;
use crate::extractor::{MetadataSource, video_url};
use crate::fetch::CaptionSource;
use crate::metadata::{CollectionInfo, MetadataRecord, VideoInfo, assemble, resolve_transcript};

/// A record together with the platform id it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedVideo {
    pub id: String,
    pub record: MetadataRecord,
}

/// Records for one collection, in discovery order. Videos that failed are
/// absent rather than represented by placeholders.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub id: String,
    pub title: String,
    pub videos: Vec<ProcessedVideo>,
    pub skipped: usize,
}

impl Batch {
    pub fn records(&self) -> impl Iterator<Item = &MetadataRecord> {
        self.videos.iter().map(|video| &video.record)
    }
}

pub struct Pipeline<'a, M, C> {
    source: &'a M,
    captions: &'a C,
    options: CleanOptions,
}

impl<'a, M, C> Pipeline<'a, M, C>
where
    M: MetadataSource,
    C: CaptionSource,
{
    pub fn new(source: &'a M, captions: &'a C, options: CleanOptions) -> Self {
        Self {
            source,
            captions,
            options,
        }
    }

    /// Builds the record for metadata we already hold.
    pub fn process_info(&self, info: &VideoInfo) -> ProcessedVideo {
        let transcript = resolve_transcript(info, self.captions, &self.options);
        ProcessedVideo {
            id: info.id.clone(),
            record: assemble(info, transcript),
        }
    }

    /// Retrieves and processes one video. Retrieval errors are returned so the
    /// caller can decide between skipping and reporting.
    pub fn process_video(&self, url: &str) -> Result<ProcessedVideo> {
        let info = self.source.video(url)?;
        Ok(self.process_info(&info))
    }

    /// Walks a collection in order, calling `on_video` for every record as
    /// soon as it is ready.
    pub fn process_collection_with<F>(&self, collection: &CollectionInfo, mut on_video: F) -> Batch
    where
        F: FnMut(&ProcessedVideo),
    {
        let title = collection
            .title
            .clone()
            .unwrap_or_else(|| collection.id.clone());
        info!(playlist = %collection.id, "Processing playlist: {title}");

        let total = collection.entries.len();
        let mut batch = Batch {
            id: collection.id.clone(),
            title,
            videos: Vec::with_capacity(total),
            skipped: 0,
        };

        for (index, entry) in collection.entries.iter().enumerate() {
            let current = index + 1;
            let Some((video_id, entry)) = entry
                .as_ref()
                .and_then(|entry| Some((entry.id.as_deref()?, entry)))
            else {
                warn!("[{current}/{total}] Skipping unavailable video.");
                batch.skipped += 1;
                continue;
            };

            match entry.title.as_deref() {
                Some(title) => info!("[{current}/{total}] Processing {video_id}: {title}"),
                None => info!("[{current}/{total}] Processing {video_id}"),
            }
            match self.process_video(&video_url(video_id)) {
                Ok(video) => {
                    on_video(&video);
                    batch.videos.push(video);
                }
                Err(err) => {
                    warn!(video = video_id, "failed to process video: {err:#}");
                    batch.skipped += 1;
                }
            }
        }

        info!(
            playlist = %batch.id,
            processed = batch.videos.len(),
            skipped = batch.skipped,
            "playlist complete"
        );
        batch
    }

    pub fn process_collection(&self, collection: &CollectionInfo) -> Batch {
        self.process_collection_with(collection, |_| {})
    }
}
