//! Splits a raw packet stream into Opus headers and audio packets.
//!
//! The stream must open with `OpusHead` followed by `OpusTags`. Only packets
//! after `OpusTags` are audio. Anything else seen while the headers are still
//! incomplete is dropped with a warning.

use tracing::{debug, info, warn};

use crate::codec::opus::{is_opus_head, is_opus_tags, packet_duration, CodecConfig};
use crate::error::{RemuxError, Result};
use crate::ogg::PacketSource;

/// One audio sample of the output track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPacket {
    pub data: Vec<u8>,
    /// 48 kHz samples, always > 0.
    pub duration: u32,
}

impl AudioPacket {
    pub fn new(data: Vec<u8>) -> Self {
        let duration = packet_duration(&data);
        Self { data, duration }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Codec configuration plus every audio packet, in stream order.
#[derive(Debug, Clone)]
pub struct ClassifiedStream {
    pub config: CodecConfig,
    pub packets: Vec<AudioPacket>,
}

impl ClassifiedStream {
    /// Sum of packet durations in 48 kHz samples.
    pub fn total_duration(&self) -> u64 {
        self.packets.iter().map(|p| p.duration as u64).sum()
    }

    /// Sum of packet payload lengths.
    pub fn media_len(&self) -> u64 {
        self.packets.iter().map(|p| p.data.len() as u64).sum()
    }
}

enum State {
    AwaitingHead,
    AwaitingTags(CodecConfig),
    Audio(CodecConfig),
}

/// Drain `source` and classify every packet.
pub fn classify<S: PacketSource>(mut source: S) -> Result<ClassifiedStream> {
    let mut state = State::AwaitingHead;
    let mut packets = Vec::new();
    let mut dropped = 0u64;

    while let Some(data) = source.next_packet()? {
        state = match state {
            State::AwaitingHead if is_opus_head(&data) => {
                let config = CodecConfig::parse(&data)?;
                debug!(
                    channels = config.channels,
                    pre_skip = config.pre_skip,
                    input_sample_rate = config.input_sample_rate,
                    mapping_family = config.mapping_family,
                    "parsed OpusHead"
                );
                State::AwaitingTags(config)
            }
            State::AwaitingHead if is_opus_tags(&data) => {
                return Err(RemuxError::MissingConfiguration);
            }
            State::AwaitingTags(config) if is_opus_tags(&data) => {
                debug!(len = data.len(), "OpusTags seen, headers complete");
                State::Audio(config)
            }
            State::Audio(config) => {
                packets.push(AudioPacket::new(data));
                State::Audio(config)
            }
            other => {
                dropped += 1;
                warn!(len = data.len(), "dropping packet received before headers completed");
                other
            }
        };
    }

    let config = match state {
        State::AwaitingHead => return Err(RemuxError::MissingConfiguration),
        State::AwaitingTags(config) => {
            warn!("stream ended before OpusTags, no audio packets collected");
            config
        }
        State::Audio(config) => config,
    };

    let stream = ClassifiedStream { config, packets };
    info!(
        packets = stream.packets.len(),
        dropped,
        duration = stream.total_duration(),
        "classified opus stream"
    );
    Ok(stream)
}
