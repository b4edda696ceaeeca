use std::path::Path;

use crate::shared::error::MovieError;
use crate::shared::metadata::MovieMetadata;
use crate::shared::plane::{Plane, Region};

/// Reads decoded planes from a movie resource in strict sequence order.
///
/// Implementations own the native decode state; callers only see
/// [`MovieMetadata`] and [`Plane`] values. There is no random access:
/// every plane must be requested at the current cursor position.
pub trait PlaneReader: Send {
    /// Opens a source, probes it for one decodable video stream and
    /// returns the resulting metadata record. An already-open reader is
    /// closed first. The sequence cursor starts at 0.
    fn set_source(&mut self, path: &Path) -> Result<MovieMetadata, MovieError>;

    /// Decodes and returns the plane at `plane_index`.
    ///
    /// `image_index` must be 0 (movies are a single-image series),
    /// `plane_index` must equal the current cursor, and `region` must
    /// cover the whole frame.
    fn open_plane(
        &mut self,
        image_index: usize,
        plane_index: usize,
        region: &Region,
    ) -> Result<Plane, MovieError>;

    /// Metadata of the open source, if any.
    fn metadata(&self) -> Option<&MovieMetadata>;

    /// Path of the open source, if any.
    fn current_source(&self) -> Option<&Path>;

    /// Releases native resources. Safe to call any number of times.
    fn close(&mut self);
}
