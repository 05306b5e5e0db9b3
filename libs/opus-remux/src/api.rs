//! Public entry points.
//!
//! [`remux`] is the fixed-behaviour call: read an Ogg Opus file, write a
//! fast-start MP4. [`Remuxer`] exposes the same pipeline with a pinned
//! creation time, arbitrary packet sources and writers, and a dry run.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::classifier::{classify, ClassifiedStream};
use crate::codec::opus::OPUS_SAMPLE_RATE;
use crate::error::{RemuxError, Result};
use crate::layout::{resolve, ResolvedLayout};
use crate::ogg::{OggPacketSource, PacketSource};
use crate::time::Mp4Timestamp;
use crate::writer::{write_file, write_layout};

/// Remux the Ogg Opus file at `source` into an MP4 at `destination`.
///
/// The destination is replaced only after the whole file has been written.
pub fn remux(source: impl AsRef<Path>, destination: impl AsRef<Path>) -> Result<RemuxStats> {
    Remuxer::new().remux_file(source, destination)
}

/// Summary of one remux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemuxStats {
    pub audio_packets: u64,
    pub channels: u8,
    pub pre_skip: u16,
    /// All samples, including pre-skip, at 48 kHz.
    pub total_duration: u64,
    /// Samples left after the edit list trims pre-skip.
    pub playable_duration: u64,
    pub moov_len: u64,
    /// File offset of the first audio byte.
    pub data_offset: u64,
    /// File size; for a dry run, the size that would have been written.
    pub bytes_written: u64,
}

impl RemuxStats {
    fn new(stream: &ClassifiedStream, layout: &ResolvedLayout<'_>, bytes_written: u64) -> Self {
        Self {
            audio_packets: stream.packets.len() as u64,
            channels: stream.config.channels,
            pre_skip: stream.config.pre_skip,
            total_duration: layout.tables.total_duration,
            playable_duration: layout.edit.segment_duration,
            moov_len: layout.moov.len() as u64,
            data_offset: layout.data_offset as u64,
            bytes_written,
        }
    }

    pub fn playable_secs(&self) -> f64 {
        self.playable_duration as f64 / OPUS_SAMPLE_RATE as f64
    }
}

/// Builder for a configurable remux.
#[derive(Debug, Clone, Copy, Default)]
pub struct Remuxer {
    creation_time: Option<u64>,
}

impl Remuxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin creation and modification times (Unix seconds) for reproducible
    /// output. Defaults to the wall clock.
    pub fn with_creation_time(mut self, unix_secs: u64) -> Self {
        self.creation_time = Some(unix_secs);
        self
    }

    fn timestamp(&self) -> Mp4Timestamp {
        self.creation_time
            .map(Mp4Timestamp::from_unix_seconds)
            .unwrap_or_else(Mp4Timestamp::now)
    }

    /// Remux between two files.
    ///
    /// The whole source is read and classified before the destination is
    /// touched; on any error the destination is left as it was.
    pub fn remux_file(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
    ) -> Result<RemuxStats> {
        let (source, destination) = (source.as_ref(), destination.as_ref());
        let stream = read_stream(source)?;
        let layout = resolve(&stream, self.timestamp())?;
        let written = write_file(&layout, destination)?;
        let stats = RemuxStats::new(&stream, &layout, written);
        info!(
            source = %source.display(),
            destination = %destination.display(),
            packets = stats.audio_packets,
            bytes = stats.bytes_written,
            "remux complete"
        );
        Ok(stats)
    }

    /// Remux packets from any source into `writer`.
    pub fn remux_to_writer<S: PacketSource, W: Write>(
        &self,
        source: S,
        writer: &mut W,
    ) -> Result<RemuxStats> {
        let stream = classify(source)?;
        let layout = resolve(&stream, self.timestamp())?;
        let written =
            write_layout(&layout, writer).map_err(|err| RemuxError::destination_io(None, err))?;
        Ok(RemuxStats::new(&stream, &layout, written))
    }

    /// Classify and lay out `source` without writing anything.
    pub fn plan<S: PacketSource>(&self, source: S) -> Result<RemuxStats> {
        let stream = classify(source)?;
        let layout = resolve(&stream, self.timestamp())?;
        Ok(RemuxStats::new(&stream, &layout, layout.total_len()))
    }

    /// [`Remuxer::plan`] for an Ogg file.
    pub fn plan_file(&self, source: impl AsRef<Path>) -> Result<RemuxStats> {
        let stream = read_stream(source.as_ref())?;
        let layout = resolve(&stream, self.timestamp())?;
        Ok(RemuxStats::new(&stream, &layout, layout.total_len()))
    }
}

fn read_stream(path: &Path) -> Result<ClassifiedStream> {
    let file =
        File::open(path).map_err(|err| RemuxError::source_io(Some(path.to_path_buf()), err))?;
    classify(OggPacketSource::new(BufReader::new(file))).map_err(|err| match err {
        RemuxError::SourceUnreadable { path: None, source } => {
            RemuxError::source_io(Some(path.to_path_buf()), source)
        }
        other => other,
    })
}
