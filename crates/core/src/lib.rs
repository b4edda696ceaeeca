//! Movie containers (avi, mov, mp4, flv, mpg, ogv) exposed as
//! plane-based image I/O, backed by FFmpeg through `ffmpeg-next`.
//!
//! The [`format`] registry maps path suffixes to adapters; the [`media`]
//! adapters decode and encode planes strictly in sequence order; the
//! [`shared`] types carry metadata and pixel buffers between them.

pub mod format;
pub mod media;
pub mod shared;
pub mod testing;
