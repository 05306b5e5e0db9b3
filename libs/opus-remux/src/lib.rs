//! # opus-remux
//!
//! Remux an Ogg Opus stream into a fast-start MP4 without touching the audio.
//!
//! The pipeline runs once per call and keeps the whole stream in memory:
//!
//! 1. [`ogg`] isolates one logical bitstream and yields raw packets.
//! 2. [`classifier`] splits off `OpusHead`/`OpusTags` and times every audio
//!    packet from its TOC byte ([`codec::opus`]).
//! 3. [`sample_table`] and [`edit_list`] derive the track indexes.
//! 4. [`layout`] builds the [`atom`] tree twice to resolve the absolute chunk
//!    offset, and [`writer`] emits `ftyp`, `moov`, `mdat` in that order.
//!
//! Output is an ISO BMFF file with a single `Opus` track, both timescales at
//! 48 kHz, pre-skip hidden by an edit list and an 80 ms `roll` pre-roll group.
//!
//! ## What it does NOT do
//!
//! - Decode, encode or resample audio
//! - Multiple tracks, fragmented MP4, or DRM
//! - Read MP4 files
//!
//! # Example
//!
//! ```no_run
//! use opus_remux::Remuxer;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let stats = Remuxer::new()
//!     .with_creation_time(1_700_000_000)
//!     .remux_file("voice.opus", "voice.mp4")?;
//! println!("{} packets, {:.2}s", stats.audio_packets, stats.playable_secs());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod atom;
pub mod classifier;
pub mod codec;
pub mod edit_list;
pub mod error;
pub mod invariant;
pub mod layout;
pub mod ogg;
pub mod sample_table;
pub mod time;
pub mod writer;

pub use api::{remux, RemuxStats, Remuxer};
pub use error::{RemuxError, Result};
