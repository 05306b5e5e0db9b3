//! Edit list that hides Opus pre-skip from playback.

use crate::codec::opus::CodecConfig;

/// A single `elst` entry, in 48 kHz ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditListEntry {
    pub segment_duration: u64,
    pub media_time: i32,
    pub media_rate_integer: i16,
    pub media_rate_fraction: i16,
}

impl EditListEntry {
    /// Skip `pre_skip` priming samples and play the rest at normal speed.
    ///
    /// The segment saturates at zero when pre-skip exceeds the media.
    pub fn for_pre_skip(total_duration: u64, pre_skip: u16) -> Self {
        Self {
            segment_duration: total_duration.saturating_sub(pre_skip as u64),
            media_time: pre_skip as i32,
            media_rate_integer: 1,
            media_rate_fraction: 0,
        }
    }

    pub fn for_config(total_duration: u64, config: &CodecConfig) -> Self {
        Self::for_pre_skip(total_duration, config.pre_skip)
    }
}
