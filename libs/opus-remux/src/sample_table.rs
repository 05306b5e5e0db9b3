//! Sample table derivation for a single-chunk Opus track.
//!
//! Every table is indexed by the same 0-based sample index, one sample per
//! audio packet. All samples live in one chunk, so the chunk offset table has
//! one entry (or none for an empty track).

use crate::assert_invariant;
use crate::classifier::AudioPacket;
use crate::error::{RemuxError, Result};

/// Opus random access pre-roll window: 80 ms at 48 kHz.
pub const PRE_ROLL_SAMPLES: u32 = 3840;

/// One `stts` run: `sample_count` consecutive samples of `sample_delta` ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeToSample {
    pub sample_count: u32,
    pub sample_delta: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleToChunk {
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_index: u32,
}

/// One `sbgp` run. Index 0 means "no group".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleToGroup {
    pub sample_count: u32,
    pub group_description_index: u32,
}

/// `roll` sample grouping: the `sgpd` roll distance and the `sbgp` runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollGrouping {
    /// Negative count of packets that must be decoded before a seek target.
    pub roll_distance: i16,
    pub runs: Vec<SampleToGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleTables {
    pub time_to_sample: Vec<TimeToSample>,
    pub sizes: Vec<u32>,
    pub sample_to_chunk: Vec<SampleToChunk>,
    pub chunk_offsets: Vec<u32>,
    pub roll: Option<RollGrouping>,
    /// Sum of every sample delta, in 48 kHz ticks.
    pub total_duration: u64,
}

impl SampleTables {
    /// Derive every table from the packets. Chunk offsets are left as zero
    /// placeholders until [`SampleTables::with_chunk_base`] resolves them.
    pub fn from_packets(packets: &[AudioPacket]) -> Result<Self> {
        let sizes = packets
            .iter()
            .map(|p| {
                u32::try_from(p.len()).map_err(|_| RemuxError::MediaDataTooLarge(p.len() as u64))
            })
            .collect::<Result<Vec<u32>>>()?;
        let time_to_sample = run_length_encode(packets.iter().map(|p| p.duration));
        let total_duration = packets.iter().map(|p| p.duration as u64).sum();

        let count = u32::try_from(packets.len())
            .map_err(|_| RemuxError::MediaDataTooLarge(packets.len() as u64))?;
        let (sample_to_chunk, chunk_offsets) = if count == 0 {
            (Vec::new(), Vec::new())
        } else {
            (
                vec![SampleToChunk {
                    first_chunk: 1,
                    samples_per_chunk: count,
                    sample_description_index: 1,
                }],
                vec![0],
            )
        };

        let roll = packets
            .first()
            .map(|first| roll_grouping(count, first.duration));

        let tables = Self {
            time_to_sample,
            sizes,
            sample_to_chunk,
            chunk_offsets,
            roll,
            total_duration,
        };
        assert_invariant!(
            tables.run_sample_count() == tables.sizes.len() as u64,
            "Time-to-sample runs must cover every sample",
            "SampleTables::from_packets"
        );
        Ok(tables)
    }

    /// Tables with every chunk offset shifted by `base`.
    pub fn with_chunk_base(&self, base: u32) -> Result<Self> {
        let chunk_offsets = self
            .chunk_offsets
            .iter()
            .map(|&offset| {
                offset
                    .checked_add(base)
                    .ok_or(RemuxError::MediaDataTooLarge(offset as u64 + base as u64))
            })
            .collect::<Result<Vec<u32>>>()?;
        Ok(Self {
            chunk_offsets,
            ..self.clone()
        })
    }

    pub fn sample_count(&self) -> usize {
        self.sizes.len()
    }

    fn run_sample_count(&self) -> u64 {
        self.time_to_sample
            .iter()
            .map(|run| run.sample_count as u64)
            .sum()
    }

    /// Per-sample durations reconstructed from the `stts` runs.
    pub fn durations(&self) -> impl Iterator<Item = u32> + '_ {
        self.time_to_sample
            .iter()
            .flat_map(|run| std::iter::repeat_n(run.sample_delta, run.sample_count as usize))
    }
}

/// Run-length encode sample durations.
pub fn run_length_encode(durations: impl IntoIterator<Item = u32>) -> Vec<TimeToSample> {
    let mut runs: Vec<TimeToSample> = Vec::new();
    for duration in durations {
        if let Some(last) = runs.last_mut() {
            if last.sample_delta == duration {
                last.sample_count += 1;
                continue;
            }
        }
        runs.push(TimeToSample {
            sample_count: 1,
            sample_delta: duration,
        });
    }
    runs
}

/// Packets needed to cover the pre-roll window, given the first packet's
/// duration. Never less than one.
pub fn pre_roll_packets(first_duration: u32) -> u32 {
    PRE_ROLL_SAMPLES.div_ceil(first_duration.max(1)).max(1)
}

/// `roll` grouping for `count` samples.
///
/// The first `pre_roll_packets` samples stay ungrouped; every later sample
/// belongs to group 1.
pub fn roll_grouping(count: u32, first_duration: u32) -> RollGrouping {
    let pre_roll = pre_roll_packets(first_duration);
    let runs = if count > pre_roll {
        vec![
            SampleToGroup {
                sample_count: pre_roll,
                group_description_index: 0,
            },
            SampleToGroup {
                sample_count: count - pre_roll,
                group_description_index: 1,
            },
        ]
    } else {
        vec![SampleToGroup {
            sample_count: count,
            group_description_index: 0,
        }]
    };
    RollGrouping {
        roll_distance: -(pre_roll.min(i16::MAX as u32) as i16),
        runs,
    }
}
