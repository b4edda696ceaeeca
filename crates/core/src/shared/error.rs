use std::path::PathBuf;

use thiserror::Error;

use crate::shared::plane::Region;

/// Errors surfaced by the movie format adapters.
///
/// `Native` wraps a failed libav call (open, decode, encode, flush) and
/// covers allocation failures reported by the library. The remaining
/// variants are caller contract violations: wrong index, partial region,
/// missing state. Contract violations are never retryable, and nothing
/// in this crate retries on its own.
#[derive(Error, Debug)]
pub enum MovieError {
    #[error("native multimedia call failed: {0}")]
    Native(#[from] ffmpeg_next::Error),

    #[error("no decodable video stream in {path}")]
    NoVideoStream { path: PathBuf },

    #[error("adapter is not open")]
    NotOpen,

    #[error("metadata must be set before opening a destination")]
    MissingMetadata,

    #[error("no frame left to decode")]
    EndOfStream,

    #[error("out-of-sequence plane index {requested} (expected {expected})")]
    OutOfSequence { requested: usize, expected: usize },

    #[error("illegal image index {0} (movies are a single-image series)")]
    IllegalImageIndex(usize),

    #[error("region {region:?} does not cover the full {width}x{height} frame")]
    PartialRegion {
        region: Region,
        width: u32,
        height: u32,
    },

    #[error("movies can only be written to a filesystem path")]
    UnsupportedDestination,

    #[error("encoder {name:?} is not available in this build")]
    EncoderUnavailable { name: &'static str },

    #[error("plane buffer holds {actual} bytes, expected {expected}")]
    PlaneShape { expected: usize, actual: usize },
}

impl MovieError {
    /// Whether this error reports a caller contract violation rather than
    /// an I/O failure. Usage errors indicate a bug in the calling code.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            MovieError::NotOpen
                | MovieError::MissingMetadata
                | MovieError::OutOfSequence { .. }
                | MovieError::IllegalImageIndex(_)
                | MovieError::PartialRegion { .. }
                | MovieError::UnsupportedDestination
                | MovieError::PlaneShape { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_errors_are_classified() {
        assert!(MovieError::OutOfSequence {
            requested: 3,
            expected: 1
        }
        .is_usage_error());
        assert!(MovieError::IllegalImageIndex(1).is_usage_error());
        assert!(MovieError::UnsupportedDestination.is_usage_error());
        assert!(MovieError::NotOpen.is_usage_error());
    }

    #[test]
    fn test_io_errors_are_not_usage_errors() {
        assert!(!MovieError::EndOfStream.is_usage_error());
        assert!(!MovieError::NoVideoStream {
            path: PathBuf::from("/tmp/a.mp4")
        }
        .is_usage_error());
        assert!(!MovieError::Native(ffmpeg_next::Error::Eof).is_usage_error());
    }

    #[test]
    fn test_out_of_sequence_message_names_both_indices() {
        let e = MovieError::OutOfSequence {
            requested: 7,
            expected: 2,
        };
        let msg = e.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains('2'));
    }
}
