use std::path::Path;

use crate::media::domain::plane_reader::PlaneReader;
use crate::media::domain::plane_writer::PlaneWriter;
use crate::media::infrastructure::ffmpeg_plane_reader::FfmpegPlaneReader;
use crate::media::infrastructure::ffmpeg_plane_writer::FfmpegPlaneWriter;
use crate::shared::metadata::MovieMetadata;

/// Suffixes claimed by the movie format. Dispatch is by path extension
/// alone; container probing is the demuxer's job.
pub const MOVIE_SUFFIXES: &[&str] = &["avi", "mov", "mp4", "flv", "mpg", "ogv"];

/// A pluggable container format: suffix dispatch plus reader/writer
/// factories. The host looks formats up in a
/// [`FormatRegistry`](crate::format::registry::FormatRegistry) before any
/// I/O happens.
pub trait ContainerFormat: Send + Sync {
    fn name(&self) -> &str;

    fn suffixes(&self) -> &[&str];

    /// Whether this format claims `path`, judged by its extension
    /// (case-insensitive).
    fn handles(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.suffixes().iter().any(|s| ext.eq_ignore_ascii_case(s)))
    }

    fn create_reader(&self) -> Box<dyn PlaneReader>;

    fn create_writer(&self) -> Box<dyn PlaneWriter>;

    /// A metadata record with this format's defaults, for callers that
    /// build one up before writing.
    fn default_metadata(&self) -> MovieMetadata;
}

/// Movie containers decoded and encoded through FFmpeg.
#[derive(Clone, Copy, Debug, Default)]
pub struct MovieFormat;

impl ContainerFormat for MovieFormat {
    fn name(&self) -> &str {
        "Movies (FFmpeg)"
    }

    fn suffixes(&self) -> &[&str] {
        MOVIE_SUFFIXES
    }

    fn create_reader(&self) -> Box<dyn PlaneReader> {
        Box::new(FfmpegPlaneReader::new())
    }

    fn create_writer(&self) -> Box<dyn PlaneWriter> {
        Box::new(FfmpegPlaneWriter::new())
    }

    fn default_metadata(&self) -> MovieMetadata {
        MovieMetadata::default()
    }
}
