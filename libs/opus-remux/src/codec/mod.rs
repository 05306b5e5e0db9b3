//! Codec-level parsing needed to describe the track.
//!
//! Only enough of the bitstream is read to fill the sample entry and compute
//! sample durations. Audio payloads are never decoded.

pub mod opus;

pub use opus::{
    frame_count, is_opus_head, is_opus_tags, packet_duration, ChannelMapping, CodecConfig,
    FrameDuration, OPUS_SAMPLE_RATE,
};
