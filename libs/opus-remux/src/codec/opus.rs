//! Opus header parsing and packet duration decoding.
//!
//! Opus in MP4 follows the Opus-in-ISOBMFF encapsulation: the `Opus` sample
//! entry carries a `dOps` box whose fields are taken from the Ogg `OpusHead`
//! packet. `OpusHead` is little-endian on the wire, while everything written to
//! the MP4 side is big-endian.
//!
//! Packet durations come from the TOC byte (RFC 6716 section 3.1) and are
//! always expressed in 48 kHz samples, whatever the input sample rate was.

use tracing::warn;

use crate::error::{RemuxError, Result};

/// Opus always decodes at 48 kHz; both MP4 timescales use this rate.
pub const OPUS_SAMPLE_RATE: u32 = 48000;

pub const OPUS_HEAD_MAGIC: &[u8; 8] = b"OpusHead";
pub const OPUS_TAGS_MAGIC: &[u8; 8] = b"OpusTags";

/// Shortest `OpusHead` that carries every family 0 field.
pub const OPUS_HEAD_MIN_LEN: usize = 19;

/// Duration assigned to an empty audio packet.
pub const EMPTY_PACKET_SAMPLES: u32 = 960;

pub fn is_opus_head(packet: &[u8]) -> bool {
    packet.starts_with(OPUS_HEAD_MAGIC)
}

pub fn is_opus_tags(packet: &[u8]) -> bool {
    packet.starts_with(OPUS_TAGS_MAGIC)
}

/// Extended channel mapping for mapping families other than 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMapping {
    pub stream_count: u8,
    pub coupled_count: u8,
    /// One entry per output channel.
    pub mapping: Vec<u8>,
}

/// Decoder configuration taken from `OpusHead`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    pub version: u8,
    pub channels: u8,
    /// Priming samples to discard at 48 kHz.
    pub pre_skip: u16,
    /// Informational only.
    pub input_sample_rate: u32,
    /// Q7.8 dB.
    pub output_gain: i16,
    /// 0 = mono/stereo, 1 = Vorbis order, 255 = undefined.
    pub mapping_family: u8,
    /// Present exactly when `mapping_family != 0`.
    pub mapping: Option<ChannelMapping>,
}

impl CodecConfig {
    /// Family 0 configuration for `channels` (1 or 2) with no pre-skip.
    pub fn new(channels: u8) -> Self {
        Self {
            version: 1,
            channels,
            pre_skip: 0,
            input_sample_rate: OPUS_SAMPLE_RATE,
            output_gain: 0,
            mapping_family: 0,
            mapping: None,
        }
    }

    pub fn with_pre_skip(mut self, pre_skip: u16) -> Self {
        self.pre_skip = pre_skip;
        self
    }

    pub fn with_input_sample_rate(mut self, rate: u32) -> Self {
        self.input_sample_rate = rate;
        self
    }

    pub fn with_output_gain(mut self, gain: i16) -> Self {
        self.output_gain = gain;
        self
    }

    /// Parse an `OpusHead` packet.
    ///
    /// Short or inconsistent headers are rejected rather than partially read.
    pub fn parse(packet: &[u8]) -> Result<Self> {
        if !is_opus_head(packet) {
            return Err(RemuxError::MissingConfiguration);
        }
        if packet.len() < OPUS_HEAD_MIN_LEN {
            return Err(RemuxError::MalformedOpusHead {
                len: packet.len(),
                min: OPUS_HEAD_MIN_LEN,
            });
        }

        let version = packet[8];
        // Only the major version (high nibble) signals an incompatible layout.
        if version >> 4 != 0 {
            return Err(RemuxError::UnsupportedOpusVersion(version));
        }

        let channels = packet[9];
        let pre_skip = u16::from_le_bytes([packet[10], packet[11]]);
        let input_sample_rate =
            u32::from_le_bytes([packet[12], packet[13], packet[14], packet[15]]);
        let output_gain = i16::from_le_bytes([packet[16], packet[17]]);
        let mapping_family = packet[18];

        if channels == 0 {
            return Err(RemuxError::InvalidChannelMapping(
                "channel count is zero".to_string(),
            ));
        }

        let mapping = if mapping_family == 0 {
            if channels > 2 {
                return Err(RemuxError::InvalidChannelMapping(format!(
                    "mapping family 0 allows at most 2 channels, found {channels}"
                )));
            }
            None
        } else {
            Some(parse_mapping_table(packet, channels)?)
        };

        Ok(Self {
            version,
            channels,
            pre_skip,
            input_sample_rate,
            output_gain,
            mapping_family,
            mapping,
        })
    }
}

fn parse_mapping_table(packet: &[u8], channels: u8) -> Result<ChannelMapping> {
    let needed = OPUS_HEAD_MIN_LEN + 2 + channels as usize;
    if packet.len() < needed {
        return Err(RemuxError::MalformedOpusHead {
            len: packet.len(),
            min: needed,
        });
    }

    let stream_count = packet[19];
    let coupled_count = packet[20];
    if stream_count == 0 {
        return Err(RemuxError::InvalidChannelMapping(
            "stream count is zero".to_string(),
        ));
    }
    if coupled_count > stream_count {
        return Err(RemuxError::InvalidChannelMapping(format!(
            "{coupled_count} coupled streams exceed {stream_count} streams"
        )));
    }

    let decoded = stream_count as u16 + coupled_count as u16;
    let mapping = packet[21..needed].to_vec();
    // 255 marks a silent channel.
    if let Some(bad) = mapping
        .iter()
        .find(|&&index| index != 255 && index as u16 >= decoded)
    {
        return Err(RemuxError::InvalidChannelMapping(format!(
            "mapping index {bad} out of range for {decoded} decoded channels"
        )));
    }

    Ok(ChannelMapping {
        stream_count,
        coupled_count,
        mapping,
    })
}

/// Frame size selected by the TOC configuration number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDuration {
    /// 2.5ms = 120 samples
    Ms2_5,
    /// 5ms = 240 samples
    Ms5,
    /// 10ms = 480 samples
    Ms10,
    /// 20ms = 960 samples
    Ms20,
    /// 40ms = 1920 samples
    Ms40,
    /// 60ms = 2880 samples
    Ms60,
}

impl FrameDuration {
    pub fn samples(self) -> u32 {
        match self {
            FrameDuration::Ms2_5 => 120,
            FrameDuration::Ms5 => 240,
            FrameDuration::Ms10 => 480,
            FrameDuration::Ms20 => 960,
            FrameDuration::Ms40 => 1920,
            FrameDuration::Ms60 => 2880,
        }
    }

    /// Frame size for the 5-bit configuration number in the TOC byte.
    pub fn from_toc(toc: u8) -> Self {
        use FrameDuration::*;
        const SILK: [FrameDuration; 4] = [Ms10, Ms20, Ms40, Ms60];
        const HYBRID: [FrameDuration; 2] = [Ms10, Ms20];
        const CELT: [FrameDuration; 4] = [Ms2_5, Ms5, Ms10, Ms20];

        let config = (toc >> 3) & 0x1F;
        match config {
            0..=11 => SILK[(config % 4) as usize],
            12..=15 => HYBRID[(config % 2) as usize],
            _ => CELT[(config % 4) as usize],
        }
    }
}

/// Number of frames in `packet`, or `None` when the count cannot be read.
///
/// Code 1 and code 2 packets both hold two frames; their frame sizes only
/// matter to a decoder.
pub fn frame_count(packet: &[u8]) -> Option<u8> {
    let toc = *packet.first()?;
    match toc & 0x03 {
        0 => Some(1),
        1 | 2 => Some(2),
        _ => {
            let count = packet.get(1)? & 0x3F;
            (count != 0).then_some(count)
        }
    }
}

/// Duration of one audio packet in 48 kHz samples. Never zero.
pub fn packet_duration(packet: &[u8]) -> u32 {
    let Some(&toc) = packet.first() else {
        warn!(
            samples = EMPTY_PACKET_SAMPLES,
            "empty opus packet, using fallback duration"
        );
        return EMPTY_PACKET_SAMPLES;
    };

    let frames = frame_count(packet).unwrap_or_else(|| {
        warn!(toc, len = packet.len(), "unreadable frame count, assuming one frame");
        1
    });
    FrameDuration::from_toc(toc).samples() * frames as u32
}
