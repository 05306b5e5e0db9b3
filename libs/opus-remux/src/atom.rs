//! ISOBMFF box tree for a single Opus audio track.
//!
//! Every box is a plain struct implementing the sealed [`Atom`] trait. A box
//! writes only its payload; [`Atom::write_to`] adds the header and patches the
//! big-endian length once the payload (including children) is known.
//!
//! Layout of the tree built by [`crate::layout`]:
//!
//! ```text
//! ftyp
//! moov
//! ├── mvhd
//! └── trak
//!     ├── tkhd
//!     ├── edts
//!     │   └── elst
//!     └── mdia
//!         ├── mdhd
//!         ├── hdlr
//!         └── minf
//!             ├── smhd
//!             ├── dinf
//!             │   └── dref
//!             │       └── url
//!             └── stbl
//!                 ├── stsd
//!                 │   └── Opus
//!                 │       └── dOps
//!                 ├── stts
//!                 ├── stss (optional)
//!                 ├── stsc
//!                 ├── stsz
//!                 ├── stco
//!                 ├── sgpd (optional)
//!                 └── sbgp (optional)
//! mdat
//! ```

use std::io::{self, Write};

use crate::assert_invariant;
use crate::classifier::AudioPacket;
use crate::codec::opus::{ChannelMapping, CodecConfig, OPUS_SAMPLE_RATE};
use crate::edit_list::EditListEntry;
use crate::sample_table::{RollGrouping, SampleToChunk, SampleToGroup, TimeToSample};
use crate::time::Mp4Timestamp;

pub type FourCc = [u8; 4];

/// Size of a compact box header (length + type).
pub const BOX_HEADER_LEN: usize = 8;

pub const MAJOR_BRAND: FourCc = *b"isom";
pub const MINOR_VERSION: u32 = 1;
pub const COMPATIBLE_BRANDS: [FourCc; 4] = [*b"isom", *b"iso2", *b"mp41", *b"mp42"];

/// Identity transform in 16.16 / 2.30 fixed point.
pub const IDENTITY_MATRIX: [u32; 9] = [
    0x0001_0000,
    0,
    0,
    0,
    0x0001_0000,
    0,
    0,
    0,
    0x4000_0000,
];

/// Packed ISO 639-2 code for "und" (0x55C4).
pub const LANGUAGE_UNDETERMINED: u16 = pack_language(b"und");

/// Track header flags: enabled and in movie.
pub const TRACK_ENABLED_IN_MOVIE: u32 = 0x0000_0003;

/// 1.0 in 8.8 fixed point.
const FULL_VOLUME: u16 = 0x0100;

const ROLL: FourCc = *b"roll";

mod sealed {
    pub trait Sealed {}
}

/// A serializable ISOBMFF box.
pub trait Atom: sealed::Sealed {
    const FOURCC: FourCc;

    /// Write everything after the 8-byte header.
    fn write_payload(&self, out: &mut Vec<u8>);

    /// Append the complete box to `out`.
    fn write_to(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&Self::FOURCC);
        self.write_payload(out);

        let len = out.len() - start;
        let declared = len as u32;
        out[start..start + 4].copy_from_slice(&declared.to_be_bytes());
        assert_invariant!(
            declared as usize == len,
            "Box length must equal header + payload",
            "Atom::write_to"
        );
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }

    fn encoded_len(&self) -> usize {
        self.encode().len()
    }
}

fn put_full_box_header(out: &mut Vec<u8>, version: u8, flags: u32) {
    out.extend_from_slice(&(((version as u32) << 24) | (flags & 0x00FF_FFFF)).to_be_bytes());
}

fn put_matrix(out: &mut Vec<u8>) {
    for value in IDENTITY_MATRIX {
        out.extend_from_slice(&value.to_be_bytes());
    }
}

/// `ftyp`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileType {
    pub major_brand: FourCc,
    pub minor_version: u32,
    pub compatible_brands: Vec<FourCc>,
}

impl Default for FileType {
    fn default() -> Self {
        Self {
            major_brand: MAJOR_BRAND,
            minor_version: MINOR_VERSION,
            compatible_brands: COMPATIBLE_BRANDS.to_vec(),
        }
    }
}

impl sealed::Sealed for FileType {}
impl Atom for FileType {
    const FOURCC: FourCc = *b"ftyp";

    fn write_payload(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.major_brand);
        out.extend_from_slice(&self.minor_version.to_be_bytes());
        for brand in &self.compatible_brands {
            out.extend_from_slice(brand);
        }
    }
}

/// `moov`
#[derive(Debug, Clone)]
pub struct Movie<'a> {
    pub header: MovieHeader,
    pub track: Track<'a>,
}

impl sealed::Sealed for Movie<'_> {}
impl Atom for Movie<'_> {
    const FOURCC: FourCc = *b"moov";

    fn write_payload(&self, out: &mut Vec<u8>) {
        self.header.write_to(out);
        self.track.write_to(out);
    }
}

/// `mvhd`, version 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovieHeader {
    pub creation_time: Mp4Timestamp,
    pub modification_time: Mp4Timestamp,
    pub timescale: u32,
    pub duration: u32,
    pub next_track_id: u32,
}

impl sealed::Sealed for MovieHeader {}
impl Atom for MovieHeader {
    const FOURCC: FourCc = *b"mvhd";

    fn write_payload(&self, out: &mut Vec<u8>) {
        put_full_box_header(out, 0, 0);
        out.extend_from_slice(&self.creation_time.as_u32().to_be_bytes());
        out.extend_from_slice(&self.modification_time.as_u32().to_be_bytes());
        out.extend_from_slice(&self.timescale.to_be_bytes());
        out.extend_from_slice(&self.duration.to_be_bytes());
        out.extend_from_slice(&0x0001_0000_u32.to_be_bytes()); // rate 1.0
        out.extend_from_slice(&FULL_VOLUME.to_be_bytes());
        out.extend_from_slice(&[0u8; 10]); // reserved
        put_matrix(out);
        out.extend_from_slice(&[0u8; 24]); // pre_defined
        out.extend_from_slice(&self.next_track_id.to_be_bytes());
    }
}

/// `trak`
#[derive(Debug, Clone)]
pub struct Track<'a> {
    pub header: TrackHeader,
    pub edit: Option<Edit>,
    pub media: Media<'a>,
}

impl sealed::Sealed for Track<'_> {}
impl Atom for Track<'_> {
    const FOURCC: FourCc = *b"trak";

    fn write_payload(&self, out: &mut Vec<u8>) {
        self.header.write_to(out);
        if let Some(edit) = &self.edit {
            edit.write_to(out);
        }
        self.media.write_to(out);
    }
}

/// `tkhd`, version 0, audio only (no width or height).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackHeader {
    pub flags: u32,
    pub creation_time: Mp4Timestamp,
    pub modification_time: Mp4Timestamp,
    pub track_id: u32,
    pub duration: u32,
    pub volume: u16,
}

impl TrackHeader {
    pub fn audio(track_id: u32, duration: u32, time: Mp4Timestamp) -> Self {
        Self {
            flags: TRACK_ENABLED_IN_MOVIE,
            creation_time: time,
            modification_time: time,
            track_id,
            duration,
            volume: FULL_VOLUME,
        }
    }
}

impl sealed::Sealed for TrackHeader {}
impl Atom for TrackHeader {
    const FOURCC: FourCc = *b"tkhd";

    fn write_payload(&self, out: &mut Vec<u8>) {
        put_full_box_header(out, 0, self.flags);
        out.extend_from_slice(&self.creation_time.as_u32().to_be_bytes());
        out.extend_from_slice(&self.modification_time.as_u32().to_be_bytes());
        out.extend_from_slice(&self.track_id.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes()); // reserved
        out.extend_from_slice(&self.duration.to_be_bytes());
        out.extend_from_slice(&[0u8; 8]); // reserved
        out.extend_from_slice(&0u16.to_be_bytes()); // layer
        out.extend_from_slice(&0u16.to_be_bytes()); // alternate_group
        out.extend_from_slice(&self.volume.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // reserved
        put_matrix(out);
        out.extend_from_slice(&0u32.to_be_bytes()); // width
        out.extend_from_slice(&0u32.to_be_bytes()); // height
    }
}

/// `edts`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub list: EditList,
}

impl sealed::Sealed for Edit {}
impl Atom for Edit {
    const FOURCC: FourCc = *b"edts";

    fn write_payload(&self, out: &mut Vec<u8>) {
        self.list.write_to(out);
    }
}

/// `elst`, version 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditList {
    pub entries: Vec<EditListEntry>,
}

impl sealed::Sealed for EditList {}
impl Atom for EditList {
    const FOURCC: FourCc = *b"elst";

    fn write_payload(&self, out: &mut Vec<u8>) {
        put_full_box_header(out, 0, 0);
        out.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for entry in &self.entries {
            assert_invariant!(
                entry.segment_duration <= u32::MAX as u64,
                "Edit segment duration must fit in 32 bits",
                "EditList::write_payload"
            );
            out.extend_from_slice(&(entry.segment_duration as u32).to_be_bytes());
            out.extend_from_slice(&entry.media_time.to_be_bytes());
            out.extend_from_slice(&entry.media_rate_integer.to_be_bytes());
            out.extend_from_slice(&entry.media_rate_fraction.to_be_bytes());
        }
    }
}

/// `mdia`
#[derive(Debug, Clone)]
pub struct Media<'a> {
    pub header: MediaHeader,
    pub handler: Handler,
    pub info: MediaInformation<'a>,
}

impl sealed::Sealed for Media<'_> {}
impl Atom for Media<'_> {
    const FOURCC: FourCc = *b"mdia";

    fn write_payload(&self, out: &mut Vec<u8>) {
        self.header.write_to(out);
        self.handler.write_to(out);
        self.info.write_to(out);
    }
}

/// `mdhd`, version 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaHeader {
    pub creation_time: Mp4Timestamp,
    pub modification_time: Mp4Timestamp,
    pub timescale: u32,
    pub duration: u32,
    pub language: u16,
}

impl sealed::Sealed for MediaHeader {}
impl Atom for MediaHeader {
    const FOURCC: FourCc = *b"mdhd";

    fn write_payload(&self, out: &mut Vec<u8>) {
        put_full_box_header(out, 0, 0);
        out.extend_from_slice(&self.creation_time.as_u32().to_be_bytes());
        out.extend_from_slice(&self.modification_time.as_u32().to_be_bytes());
        out.extend_from_slice(&self.timescale.to_be_bytes());
        out.extend_from_slice(&self.duration.to_be_bytes());
        out.extend_from_slice(&self.language.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // pre_defined
    }
}

/// Pack a three letter ISO 639-2/T code; each letter is stored minus 0x60.
pub const fn pack_language(code: &[u8; 3]) -> u16 {
    let mut packed = 0u16;
    let mut i = 0;
    while i < code.len() {
        packed = (packed << 5) | (code[i].saturating_sub(0x60) as u16 & 0x1F);
        i += 1;
    }
    packed
}

/// `hdlr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handler {
    pub handler_type: FourCc,
    pub name: String,
}

impl Handler {
    pub fn sound() -> Self {
        Self {
            handler_type: *b"soun",
            name: "SoundHandler".to_string(),
        }
    }
}

impl sealed::Sealed for Handler {}
impl Atom for Handler {
    const FOURCC: FourCc = *b"hdlr";

    fn write_payload(&self, out: &mut Vec<u8>) {
        put_full_box_header(out, 0, 0);
        out.extend_from_slice(&0u32.to_be_bytes()); // pre_defined
        out.extend_from_slice(&self.handler_type);
        out.extend_from_slice(&[0u8; 12]);
        out.extend_from_slice(self.name.as_bytes());
        out.push(0);
    }
}

/// `minf`
#[derive(Debug, Clone)]
pub struct MediaInformation<'a> {
    pub sound_header: SoundMediaHeader,
    pub data_information: DataInformation,
    pub sample_table: SampleTableBox<'a>,
}

impl sealed::Sealed for MediaInformation<'_> {}
impl Atom for MediaInformation<'_> {
    const FOURCC: FourCc = *b"minf";

    fn write_payload(&self, out: &mut Vec<u8>) {
        self.sound_header.write_to(out);
        self.data_information.write_to(out);
        self.sample_table.write_to(out);
    }
}

/// `smhd`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoundMediaHeader {
    pub balance: i16,
}

impl sealed::Sealed for SoundMediaHeader {}
impl Atom for SoundMediaHeader {
    const FOURCC: FourCc = *b"smhd";

    fn write_payload(&self, out: &mut Vec<u8>) {
        put_full_box_header(out, 0, 0);
        out.extend_from_slice(&self.balance.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // reserved
    }
}

/// `dinf` with a single self-contained data reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataInformation {
    pub reference: DataReference,
}

impl sealed::Sealed for DataInformation {}
impl Atom for DataInformation {
    const FOURCC: FourCc = *b"dinf";

    fn write_payload(&self, out: &mut Vec<u8>) {
        self.reference.write_to(out);
    }
}

/// `dref`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataReference {
    pub entry: DataEntryUrl,
}

impl sealed::Sealed for DataReference {}
impl Atom for DataReference {
    const FOURCC: FourCc = *b"dref";

    fn write_payload(&self, out: &mut Vec<u8>) {
        put_full_box_header(out, 0, 0);
        out.extend_from_slice(&1u32.to_be_bytes());
        self.entry.write_to(out);
    }
}

/// `url ` with the self-contained flag: media lives in this file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataEntryUrl {
    pub flags: u32,
}

impl Default for DataEntryUrl {
    fn default() -> Self {
        Self { flags: 1 }
    }
}

impl sealed::Sealed for DataEntryUrl {}
impl Atom for DataEntryUrl {
    const FOURCC: FourCc = *b"url ";

    fn write_payload(&self, out: &mut Vec<u8>) {
        put_full_box_header(out, 0, self.flags);
    }
}

/// `stbl`. Children are written in the mandated order.
#[derive(Debug, Clone)]
pub struct SampleTableBox<'a> {
    pub description: SampleDescription,
    pub time_to_sample: TimeToSampleBox<'a>,
    pub sync_samples: Option<SyncSampleBox>,
    pub sample_to_chunk: SampleToChunkBox<'a>,
    pub sample_sizes: SampleSizeBox<'a>,
    pub chunk_offsets: ChunkOffsetBox<'a>,
    pub group_description: Option<SampleGroupDescription>,
    pub sample_to_group: Option<SampleToGroupBox<'a>>,
}

impl<'a> SampleTableBox<'a> {
    /// `roll` grouping boxes, if the track has any samples.
    pub fn roll_boxes(
        roll: Option<&'a RollGrouping>,
    ) -> (Option<SampleGroupDescription>, Option<SampleToGroupBox<'a>>) {
        match roll {
            Some(roll) => (
                Some(SampleGroupDescription::roll(roll.roll_distance)),
                Some(SampleToGroupBox {
                    grouping_type: ROLL,
                    runs: &roll.runs,
                }),
            ),
            None => (None, None),
        }
    }
}

impl sealed::Sealed for SampleTableBox<'_> {}
impl Atom for SampleTableBox<'_> {
    const FOURCC: FourCc = *b"stbl";

    fn write_payload(&self, out: &mut Vec<u8>) {
        self.description.write_to(out);
        self.time_to_sample.write_to(out);
        if let Some(stss) = &self.sync_samples {
            stss.write_to(out);
        }
        self.sample_to_chunk.write_to(out);
        self.sample_sizes.write_to(out);
        self.chunk_offsets.write_to(out);
        if let Some(sgpd) = &self.group_description {
            sgpd.write_to(out);
        }
        if let Some(sbgp) = &self.sample_to_group {
            sbgp.write_to(out);
        }
    }
}

/// `stsd` with one Opus sample entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleDescription {
    pub entry: OpusSampleEntry,
}

impl sealed::Sealed for SampleDescription {}
impl Atom for SampleDescription {
    const FOURCC: FourCc = *b"stsd";

    fn write_payload(&self, out: &mut Vec<u8>) {
        put_full_box_header(out, 0, 0);
        out.extend_from_slice(&1u32.to_be_bytes());
        self.entry.write_to(out);
    }
}

/// `Opus` audio sample entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpusSampleEntry {
    pub data_reference_index: u16,
    pub channel_count: u16,
    pub sample_size: u16,
    pub config: OpusSpecificBox,
}

impl OpusSampleEntry {
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            data_reference_index: 1,
            channel_count: config.channels as u16,
            sample_size: 16,
            config: OpusSpecificBox::from(config),
        }
    }
}

impl sealed::Sealed for OpusSampleEntry {}
impl Atom for OpusSampleEntry {
    const FOURCC: FourCc = *b"Opus";

    fn write_payload(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&[0u8; 6]); // reserved
        out.extend_from_slice(&self.data_reference_index.to_be_bytes());
        out.extend_from_slice(&[0u8; 8]); // reserved
        out.extend_from_slice(&self.channel_count.to_be_bytes());
        out.extend_from_slice(&self.sample_size.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // pre_defined
        out.extend_from_slice(&0u16.to_be_bytes()); // reserved
        out.extend_from_slice(&(OPUS_SAMPLE_RATE << 16).to_be_bytes());
        self.config.write_to(out);
    }
}

/// `dOps`. Unlike `OpusHead`, every field is big-endian and the version is 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpusSpecificBox {
    pub output_channel_count: u8,
    pub pre_skip: u16,
    pub input_sample_rate: u32,
    pub output_gain: i16,
    /// Mapping family with its channel mapping table. `None` is family 0,
    /// which carries no table.
    pub mapping: Option<(u8, ChannelMapping)>,
}

impl From<&CodecConfig> for OpusSpecificBox {
    fn from(config: &CodecConfig) -> Self {
        Self {
            output_channel_count: config.channels,
            pre_skip: config.pre_skip,
            input_sample_rate: config.input_sample_rate,
            output_gain: config.output_gain,
            mapping: match (config.mapping_family, &config.mapping) {
                (0, _) | (_, None) => None,
                (family, Some(mapping)) => Some((family, mapping.clone())),
            },
        }
    }
}

impl sealed::Sealed for OpusSpecificBox {}
impl Atom for OpusSpecificBox {
    const FOURCC: FourCc = *b"dOps";

    fn write_payload(&self, out: &mut Vec<u8>) {
        out.push(0); // version
        out.push(self.output_channel_count);
        out.extend_from_slice(&self.pre_skip.to_be_bytes());
        out.extend_from_slice(&self.input_sample_rate.to_be_bytes());
        out.extend_from_slice(&self.output_gain.to_be_bytes());
        match &self.mapping {
            None => out.push(0),
            Some((family, table)) => {
                out.push(*family);
                out.push(table.stream_count);
                out.push(table.coupled_count);
                out.extend_from_slice(&table.mapping);
            }
        }
    }
}

/// `stts`
#[derive(Debug, Clone, Copy)]
pub struct TimeToSampleBox<'a> {
    pub entries: &'a [TimeToSample],
}

impl sealed::Sealed for TimeToSampleBox<'_> {}
impl Atom for TimeToSampleBox<'_> {
    const FOURCC: FourCc = *b"stts";

    fn write_payload(&self, out: &mut Vec<u8>) {
        put_full_box_header(out, 0, 0);
        out.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for entry in self.entries {
            out.extend_from_slice(&entry.sample_count.to_be_bytes());
            out.extend_from_slice(&entry.sample_delta.to_be_bytes());
        }
    }
}

/// `stss`. Omitted for Opus, where every sample is a sync sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSampleBox {
    /// 1-based sample numbers.
    pub samples: Vec<u32>,
}

impl sealed::Sealed for SyncSampleBox {}
impl Atom for SyncSampleBox {
    const FOURCC: FourCc = *b"stss";

    fn write_payload(&self, out: &mut Vec<u8>) {
        put_full_box_header(out, 0, 0);
        out.extend_from_slice(&(self.samples.len() as u32).to_be_bytes());
        for sample in &self.samples {
            out.extend_from_slice(&sample.to_be_bytes());
        }
    }
}

/// `stsc`
#[derive(Debug, Clone, Copy)]
pub struct SampleToChunkBox<'a> {
    pub entries: &'a [SampleToChunk],
}

impl sealed::Sealed for SampleToChunkBox<'_> {}
impl Atom for SampleToChunkBox<'_> {
    const FOURCC: FourCc = *b"stsc";

    fn write_payload(&self, out: &mut Vec<u8>) {
        put_full_box_header(out, 0, 0);
        out.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for entry in self.entries {
            out.extend_from_slice(&entry.first_chunk.to_be_bytes());
            out.extend_from_slice(&entry.samples_per_chunk.to_be_bytes());
            out.extend_from_slice(&entry.sample_description_index.to_be_bytes());
        }
    }
}

/// `stsz`, always with a per-sample size table.
#[derive(Debug, Clone, Copy)]
pub struct SampleSizeBox<'a> {
    pub sizes: &'a [u32],
}

impl sealed::Sealed for SampleSizeBox<'_> {}
impl Atom for SampleSizeBox<'_> {
    const FOURCC: FourCc = *b"stsz";

    fn write_payload(&self, out: &mut Vec<u8>) {
        put_full_box_header(out, 0, 0);
        out.extend_from_slice(&0u32.to_be_bytes()); // sample_size: variable
        out.extend_from_slice(&(self.sizes.len() as u32).to_be_bytes());
        for size in self.sizes {
            out.extend_from_slice(&size.to_be_bytes());
        }
    }
}

/// `stco`
#[derive(Debug, Clone, Copy)]
pub struct ChunkOffsetBox<'a> {
    pub offsets: &'a [u32],
}

impl sealed::Sealed for ChunkOffsetBox<'_> {}
impl Atom for ChunkOffsetBox<'_> {
    const FOURCC: FourCc = *b"stco";

    fn write_payload(&self, out: &mut Vec<u8>) {
        put_full_box_header(out, 0, 0);
        out.extend_from_slice(&(self.offsets.len() as u32).to_be_bytes());
        for offset in self.offsets {
            out.extend_from_slice(&offset.to_be_bytes());
        }
    }
}

/// `sgpd`, version 1 with a fixed entry length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleGroupDescription {
    pub grouping_type: FourCc,
    pub roll_distances: Vec<i16>,
}

impl SampleGroupDescription {
    pub fn roll(roll_distance: i16) -> Self {
        Self {
            grouping_type: ROLL,
            roll_distances: vec![roll_distance],
        }
    }
}

impl sealed::Sealed for SampleGroupDescription {}
impl Atom for SampleGroupDescription {
    const FOURCC: FourCc = *b"sgpd";

    fn write_payload(&self, out: &mut Vec<u8>) {
        put_full_box_header(out, 1, 0);
        out.extend_from_slice(&self.grouping_type);
        out.extend_from_slice(&2u32.to_be_bytes()); // default_length
        out.extend_from_slice(&(self.roll_distances.len() as u32).to_be_bytes());
        for distance in &self.roll_distances {
            out.extend_from_slice(&distance.to_be_bytes());
        }
    }
}

/// `sbgp`, version 0.
#[derive(Debug, Clone, Copy)]
pub struct SampleToGroupBox<'a> {
    pub grouping_type: FourCc,
    pub runs: &'a [SampleToGroup],
}

impl sealed::Sealed for SampleToGroupBox<'_> {}
impl Atom for SampleToGroupBox<'_> {
    const FOURCC: FourCc = *b"sbgp";

    fn write_payload(&self, out: &mut Vec<u8>) {
        put_full_box_header(out, 0, 0);
        out.extend_from_slice(&self.grouping_type);
        out.extend_from_slice(&(self.runs.len() as u32).to_be_bytes());
        for run in self.runs {
            out.extend_from_slice(&run.sample_count.to_be_bytes());
            out.extend_from_slice(&run.group_description_index.to_be_bytes());
        }
    }
}

/// `mdat` holding the packets back to back.
///
/// Use [`MediaData::write_stream`] to avoid copying the payload into memory.
#[derive(Debug, Clone, Copy)]
pub struct MediaData<'a> {
    pub packets: &'a [AudioPacket],
}

impl MediaData<'_> {
    pub fn payload_len(&self) -> u64 {
        self.packets.iter().map(|p| p.len() as u64).sum()
    }

    /// Header plus payload length.
    pub fn total_len(&self) -> u64 {
        BOX_HEADER_LEN as u64 + self.payload_len()
    }

    /// Stream the box to `writer`; returns the number of bytes written.
    ///
    /// Callers must have checked that [`MediaData::total_len`] fits in 32 bits.
    pub fn write_stream<W: Write>(&self, writer: &mut W) -> io::Result<u64> {
        let total = self.total_len();
        assert_invariant!(
            total <= u32::MAX as u64,
            "Media data box must fit a 32-bit length",
            "MediaData::write_stream"
        );
        writer.write_all(&(total as u32).to_be_bytes())?;
        writer.write_all(&Self::FOURCC)?;
        for packet in self.packets {
            writer.write_all(&packet.data)?;
        }
        Ok(total)
    }
}

impl sealed::Sealed for MediaData<'_> {}
impl Atom for MediaData<'_> {
    const FOURCC: FourCc = *b"mdat";

    fn write_payload(&self, out: &mut Vec<u8>) {
        for packet in self.packets {
            out.extend_from_slice(&packet.data);
        }
    }

    fn encoded_len(&self) -> usize {
        self.total_len() as usize
    }
}
