//! Two-pass fast-start layout.
//!
//! The chunk offset in `stco` is an absolute file position that depends on the
//! length of `moov`, which contains `stco`. The movie box is therefore built
//! twice: once with zero offsets to measure it, then again with the real
//! offsets. Offset values change between the passes but the table length does
//! not, so both encodings have the same length.

use tracing::debug;

use crate::assert_invariant;
use crate::atom::{
    Atom, ChunkOffsetBox, DataInformation, Edit, EditList, FileType, Handler, Media, MediaData,
    MediaHeader, MediaInformation, Movie, MovieHeader, OpusSampleEntry, SampleDescription,
    SampleSizeBox, SampleTableBox, SampleToChunkBox, SoundMediaHeader, TimeToSampleBox, Track,
    TrackHeader, BOX_HEADER_LEN, LANGUAGE_UNDETERMINED,
};
use crate::classifier::ClassifiedStream;
use crate::codec::opus::{CodecConfig, OPUS_SAMPLE_RATE};
use crate::edit_list::EditListEntry;
use crate::error::{RemuxError, Result};
use crate::sample_table::SampleTables;
use crate::time::Mp4Timestamp;

pub const TRACK_ID: u32 = 1;

/// Everything needed to write the output, with offsets resolved.
#[derive(Debug, Clone)]
pub struct ResolvedLayout<'a> {
    pub ftyp: Vec<u8>,
    pub moov: Vec<u8>,
    pub mdat: MediaData<'a>,
    /// Absolute file offset of the first media byte.
    pub data_offset: u32,
    /// Tables with resolved chunk offsets.
    pub tables: SampleTables,
    pub edit: EditListEntry,
}

impl ResolvedLayout<'_> {
    pub fn total_len(&self) -> u64 {
        self.ftyp.len() as u64 + self.moov.len() as u64 + self.mdat.total_len()
    }
}

/// Build `ftyp` and `moov` for `stream` and resolve the chunk offsets.
pub fn resolve(stream: &ClassifiedStream, time: Mp4Timestamp) -> Result<ResolvedLayout<'_>> {
    let placeholder = SampleTables::from_packets(&stream.packets)?;
    let total_duration = placeholder.total_duration;
    if total_duration > u32::MAX as u64 {
        return Err(RemuxError::DurationOverflow(total_duration));
    }
    let edit = EditListEntry::for_config(total_duration, &stream.config);

    let mdat = MediaData {
        packets: &stream.packets,
    };
    if mdat.total_len() > u32::MAX as u64 {
        return Err(RemuxError::MediaDataTooLarge(mdat.total_len()));
    }

    let ftyp = FileType::default().encode();
    let measured = build_moov(&stream.config, &placeholder, &edit, time);

    let data_offset = ftyp.len() as u64 + measured.len() as u64 + BOX_HEADER_LEN as u64;
    let data_offset =
        u32::try_from(data_offset).map_err(|_| RemuxError::MediaDataTooLarge(data_offset))?;
    debug!(
        ftyp_len = ftyp.len(),
        moov_len = measured.len(),
        data_offset,
        "measured placeholder moov"
    );

    let tables = placeholder.with_chunk_base(data_offset)?;
    let moov = build_moov(&stream.config, &tables, &edit, time);
    assert_invariant!(
        moov.len() == measured.len(),
        "Placeholder and final moov lengths must match",
        "layout::resolve"
    );

    Ok(ResolvedLayout {
        ftyp,
        moov,
        mdat,
        data_offset,
        tables,
        edit,
    })
}

/// Encode the complete `moov` box.
///
/// Durations must already be known to fit in 32 bits.
pub fn build_moov(
    config: &CodecConfig,
    tables: &SampleTables,
    edit: &EditListEntry,
    time: Mp4Timestamp,
) -> Vec<u8> {
    let total = tables.total_duration as u32;
    let playable = edit.segment_duration as u32;
    let (group_description, sample_to_group) = SampleTableBox::roll_boxes(tables.roll.as_ref());

    let movie = Movie {
        header: MovieHeader {
            creation_time: time,
            modification_time: time,
            timescale: OPUS_SAMPLE_RATE,
            duration: total,
            next_track_id: TRACK_ID + 1,
        },
        track: Track {
            header: TrackHeader::audio(TRACK_ID, playable, time),
            edit: Some(Edit {
                list: EditList {
                    entries: vec![*edit],
                },
            }),
            media: Media {
                header: MediaHeader {
                    creation_time: time,
                    modification_time: time,
                    timescale: OPUS_SAMPLE_RATE,
                    duration: total,
                    language: LANGUAGE_UNDETERMINED,
                },
                handler: Handler::sound(),
                info: MediaInformation {
                    sound_header: SoundMediaHeader::default(),
                    data_information: DataInformation::default(),
                    sample_table: SampleTableBox {
                        description: SampleDescription {
                            entry: OpusSampleEntry::new(config),
                        },
                        time_to_sample: TimeToSampleBox {
                            entries: &tables.time_to_sample,
                        },
                        sync_samples: None,
                        sample_to_chunk: SampleToChunkBox {
                            entries: &tables.sample_to_chunk,
                        },
                        sample_sizes: SampleSizeBox {
                            sizes: &tables.sizes,
                        },
                        chunk_offsets: ChunkOffsetBox {
                            offsets: &tables.chunk_offsets,
                        },
                        group_description,
                        sample_to_group,
                    },
                },
            },
        },
    };
    movie.encode()
}
