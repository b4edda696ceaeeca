use std::io::Write;
use std::path::PathBuf;

use crate::shared::error::MovieError;
use crate::shared::metadata::MovieMetadata;
use crate::shared::plane::{Plane, Region};

/// Where encoded output goes.
///
/// The movie writer only accepts filesystem paths; the wrapped encoder
/// cannot target an arbitrary byte sink.
pub enum Destination {
    File(PathBuf),
    /// An in-memory or socket-backed sink.
    Stream(Box<dyn Write + Send>),
}

/// Encodes planes into a movie resource in strict sequence order.
pub trait PlaneWriter: Send {
    /// Stores the record the destination will be configured from.
    /// Width, height and channels must be populated before
    /// [`set_destination`](PlaneWriter::set_destination).
    fn set_metadata(&mut self, metadata: MovieMetadata);

    /// Opens the destination and starts the encode pipeline with the
    /// stored metadata's resolution, frame rate and bit rate.
    /// `image_index` must be 0. The sequence cursor resets to 0.
    fn set_destination(&mut self, dest: Destination, image_index: usize)
        -> Result<(), MovieError>;

    /// Submits the plane at `plane_index` to the encoder.
    ///
    /// `image_index` must be 0, `plane_index` must equal the current
    /// cursor, and `region` must cover the whole frame.
    fn save_plane(
        &mut self,
        image_index: usize,
        plane_index: usize,
        plane: &Plane,
        region: &Region,
    ) -> Result<(), MovieError>;

    /// Flushes the encoder and releases the output. Safe to call any
    /// number of times.
    fn close(&mut self) -> Result<(), MovieError>;
}
