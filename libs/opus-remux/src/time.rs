//! Timestamps in the ISOBMFF epoch.

use hifitime::Epoch;
use tracing::warn;

/// Seconds between 1904-01-01T00:00:00Z and the Unix epoch.
pub const MP4_EPOCH_OFFSET: u64 = 2_082_844_800;

/// Seconds since 1904-01-01T00:00:00Z, truncated to 32 bits.
///
/// Version 0 headers only have room for 32 bits, so dates after early 2040
/// wrap around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mp4Timestamp(pub u32);

impl Mp4Timestamp {
    pub fn from_unix_seconds(secs: u64) -> Self {
        Mp4Timestamp(secs.wrapping_add(MP4_EPOCH_OFFSET) as u32)
    }

    /// Wall clock time. Falls back to the 1904 epoch if the clock is unreadable.
    pub fn now() -> Self {
        match Epoch::now() {
            Ok(epoch) => {
                let unix = epoch.to_unix_seconds();
                Self::from_unix_seconds(if unix > 0.0 { unix as u64 } else { 0 })
            }
            Err(err) => {
                warn!(?err, "system clock unavailable, using zero timestamp");
                Mp4Timestamp(0)
            }
        }
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_epoch_maps_to_offset() {
        assert_eq!(Mp4Timestamp::from_unix_seconds(0).as_u32(), 2_082_844_800);
    }

    #[test]
    fn known_date() {
        // 2024-01-01T00:00:00Z
        assert_eq!(
            Mp4Timestamp::from_unix_seconds(1_704_067_200).as_u32(),
            3_786_912_000
        );
    }

    #[test]
    fn far_future_wraps() {
        let secs = u32::MAX as u64 - MP4_EPOCH_OFFSET + 1;
        assert_eq!(Mp4Timestamp::from_unix_seconds(secs).as_u32(), 0);
        assert_eq!(Mp4Timestamp::from_unix_seconds(secs + 10).as_u32(), 10);
    }

    #[test]
    fn now_is_after_2020() {
        // 2020-01-01 in the 1904 epoch; holds until the 2040 wrap.
        assert!(Mp4Timestamp::now().as_u32() > 3_660_681_600);
    }
}
