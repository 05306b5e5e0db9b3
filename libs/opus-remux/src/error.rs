use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can end a remux call.
///
/// Every variant is terminal for the current call. Nothing is retried
/// internally and no partial output is ever persisted.
#[derive(Debug, Error)]
pub enum RemuxError {
    #[error("cannot read source {path:?}: {source}")]
    SourceUnreadable {
        path: Option<PathBuf>,
        #[source]
        source: io::Error,
    },
    #[error("cannot write destination {path:?}: {source}")]
    DestinationUnwritable {
        path: Option<PathBuf>,
        #[source]
        source: io::Error,
    },
    #[error("ogg stream could not be initialised: {0}")]
    StreamInitializationFailed(String),
    #[error("packet continues across pages in a way that cannot be reassembled")]
    MalformedContinuation,
    #[error("ogg page checksum mismatch (expected {expected:#010x}, found {actual:#010x})")]
    PageChecksumMismatch { expected: u32, actual: u32 },
    #[error("no OpusHead packet found before audio data or end of stream")]
    MissingConfiguration,
    #[error("OpusHead packet is {len} bytes, shorter than the {min} bytes required")]
    MalformedOpusHead { len: usize, min: usize },
    #[error("unsupported OpusHead version {0}")]
    UnsupportedOpusVersion(u8),
    #[error("invalid channel mapping: {0}")]
    InvalidChannelMapping(String),
    #[error("total duration {0} does not fit in a 32-bit header field")]
    DurationOverflow(u64),
    #[error("media data of {0} bytes exceeds the 32-bit offset range")]
    MediaDataTooLarge(u64),
}

impl RemuxError {
    pub(crate) fn source_io(path: Option<PathBuf>, source: io::Error) -> Self {
        RemuxError::SourceUnreadable { path, source }
    }

    pub(crate) fn destination_io(path: Option<PathBuf>, source: io::Error) -> Self {
        RemuxError::DestinationUnwritable { path, source }
    }
}

pub type Result<T, E = RemuxError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_path_and_cause() {
        let err = RemuxError::source_io(
            Some(PathBuf::from("in.opus")),
            io::Error::new(io::ErrorKind::NotFound, "file not found"),
        );
        let msg = err.to_string();
        assert!(msg.contains("in.opus"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn display_checksum_mismatch_is_hex() {
        let err = RemuxError::PageChecksumMismatch {
            expected: 0xdead_beef,
            actual: 0x1,
        };
        assert_eq!(
            err.to_string(),
            "ogg page checksum mismatch (expected 0xdeadbeef, found 0x00000001)"
        );
    }

    #[test]
    fn display_malformed_head() {
        let err = RemuxError::MalformedOpusHead { len: 12, min: 19 };
        assert_eq!(
            err.to_string(),
            "OpusHead packet is 12 bytes, shorter than the 19 bytes required"
        );
    }

    #[test]
    fn io_source_is_exposed() {
        use std::error::Error as _;
        let err = RemuxError::destination_io(
            None,
            io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
        );
        assert!(err.source().is_some());
    }
}
