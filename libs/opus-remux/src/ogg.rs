//! Packet source seam between the remuxer and the Ogg demuxer.
//!
//! Page sync, CRC checks and packet reassembly are done by the `ogg` crate.
//! This module only isolates one logical bitstream and maps reader errors
//! onto [`RemuxError`].

use std::io::{Read, Seek};

use ::ogg::{OggReadError, PacketReader};
use tracing::debug;

use crate::error::{RemuxError, Result};

/// Ordered raw packets of a single logical bitstream.
pub trait PacketSource {
    /// Next packet in stream order, or `None` at end of stream.
    fn next_packet(&mut self) -> Result<Option<Vec<u8>>>;
}

impl PacketSource for std::vec::IntoIter<Vec<u8>> {
    fn next_packet(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.next())
    }
}

impl<S: PacketSource + ?Sized> PacketSource for &mut S {
    fn next_packet(&mut self) -> Result<Option<Vec<u8>>> {
        (**self).next_packet()
    }
}

/// Reads the first logical bitstream of an Ogg physical stream.
///
/// The serial of the first packet is latched; packets from any other
/// multiplexed stream are dropped. Input with no Ogg page at all reads as an
/// empty stream.
pub struct OggPacketSource<R: Read + Seek> {
    reader: PacketReader<R>,
    serial: Option<u32>,
    packets_read: u64,
    skipped: u64,
}

impl<R: Read + Seek> OggPacketSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: PacketReader::new(inner),
            serial: None,
            packets_read: 0,
            skipped: 0,
        }
    }

    pub fn serial(&self) -> Option<u32> {
        self.serial
    }

    /// Packets dropped because they belonged to another logical stream.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl<R: Read + Seek> PacketSource for OggPacketSource<R> {
    fn next_packet(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            let packet = match self.reader.read_packet() {
                Ok(Some(packet)) => packet,
                Ok(None) => return Ok(None),
                // The reader only reports this before its first page.
                Err(OggReadError::NoCapturePatternFound) if self.packets_read == 0 => {
                    debug!("no ogg page found, treating source as empty");
                    return Ok(None);
                }
                Err(err) => return Err(err.into()),
            };
            self.packets_read += 1;
            let serial = packet.stream_serial();
            match self.serial {
                None => {
                    debug!(serial, "latched logical stream");
                    self.serial = Some(serial);
                }
                Some(latched) if latched != serial => {
                    self.skipped += 1;
                    debug!(serial, latched, "skipping packet from foreign stream");
                    continue;
                }
                Some(_) => {}
            }
            return Ok(Some(packet.data));
        }
    }
}

impl From<OggReadError> for RemuxError {
    fn from(err: OggReadError) -> Self {
        #[allow(unreachable_patterns)]
        match err {
            OggReadError::ReadError(io) => RemuxError::source_io(None, io),
            OggReadError::NoCapturePatternFound => {
                RemuxError::StreamInitializationFailed("no ogg capture pattern found".to_string())
            }
            OggReadError::InvalidStreamStructVer(ver) => RemuxError::StreamInitializationFailed(
                format!("unsupported ogg stream structure version {ver}"),
            ),
            OggReadError::HashMismatch(expected, actual) => {
                RemuxError::PageChecksumMismatch { expected, actual }
            }
            OggReadError::InvalidData => RemuxError::MalformedContinuation,
            other => RemuxError::StreamInitializationFailed(other.to_string()),
        }
    }
}
