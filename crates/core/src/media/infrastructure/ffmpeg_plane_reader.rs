use std::path::{Path, PathBuf};

use crate::media::domain::plane_reader::PlaneReader;
use crate::media::infrastructure::loader;
use crate::media::infrastructure::probe::{self, RgbFlagPolicy};
use crate::shared::error::MovieError;
use crate::shared::metadata::MovieMetadata;
use crate::shared::plane::{Plane, Region};

/// Decodes movie planes via ffmpeg-next (libavformat + libavcodec).
///
/// Opening a source probes it for one video stream and decodes a single
/// lead frame to settle the pixel layout; that frame is retained and
/// handed out as plane 0, so the peek never costs the caller a frame.
/// Planes come out strictly in sequence order and always cover the whole
/// frame.
pub struct FfmpegPlaneReader {
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    decoder: Option<ffmpeg_next::decoder::Video>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    path: Option<PathBuf>,
    metadata: Option<MovieMetadata>,
    peeked: Option<Plane>,
    video_stream_index: usize,
    next_plane_index: usize,
    flushing: bool,
    rgb_policy: RgbFlagPolicy,
}

// Safety: FfmpegPlaneReader is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegPlaneReader {}

impl FfmpegPlaneReader {
    pub fn new() -> Self {
        Self::with_rgb_policy(RgbFlagPolicy::default())
    }

    pub fn with_rgb_policy(rgb_policy: RgbFlagPolicy) -> Self {
        Self {
            input_ctx: None,
            decoder: None,
            scaler: None,
            path: None,
            metadata: None,
            peeked: None,
            video_stream_index: 0,
            next_plane_index: 0,
            flushing: false,
            rgb_policy,
        }
    }

    fn open_inner(&mut self, path: &Path) -> Result<MovieMetadata, MovieError> {
        loader::ensure_loaded()?;

        let ictx = ffmpeg_next::format::input(path)?;
        let (video_stream_index, rate, frames, parameters) = {
            let stream = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or_else(|| MovieError::NoVideoStream {
                    path: path.to_path_buf(),
                })?;
            (
                stream.index(),
                stream.rate(),
                stream.frames(),
                stream.parameters(),
            )
        };

        let decoder = ffmpeg_next::codec::context::Context::from_parameters(parameters)?
            .decoder()
            .video()?;

        self.input_ctx = Some(ictx);
        self.decoder = Some(decoder);
        self.video_stream_index = video_stream_index;
        self.flushing = false;

        // One-frame peek: the lead frame settles channel count and sample
        // depth, then doubles as plane 0.
        let lead = self.decode_frame()?.ok_or(MovieError::EndOfStream)?;
        let metadata = probe::build_metadata(
            lead.width(),
            lead.height(),
            rate,
            frames,
            lead.format(),
            self.rgb_policy,
        );

        let mut scaler = ffmpeg_next::software::scaling::Context::get(
            lead.format(),
            metadata.width,
            metadata.height,
            probe::buffer_format(lead.format()),
            metadata.width,
            metadata.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        self.peeked = Some(convert_frame(&mut scaler, &metadata, &lead, 0)?);
        self.scaler = Some(scaler);
        self.metadata = Some(metadata.clone());
        self.path = Some(path.to_path_buf());
        self.next_plane_index = 0;

        Ok(metadata)
    }

    /// Pulls the next decoded frame, feeding packets until the decoder
    /// produces one. Returns `None` once the stream is exhausted.
    fn decode_frame(
        &mut self,
    ) -> Result<Option<ffmpeg_next::util::frame::video::Video>, MovieError> {
        let ictx = self.input_ctx.as_mut().ok_or(MovieError::NotOpen)?;
        let decoder = self.decoder.as_mut().ok_or(MovieError::NotOpen)?;

        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        loop {
            if decoder.receive_frame(&mut decoded).is_ok() {
                return Ok(Some(decoded));
            }
            if self.flushing {
                return Ok(None);
            }
            let Some((stream, packet)) = ictx.packets().next() else {
                decoder.send_eof()?;
                self.flushing = true;
                continue;
            };
            if stream.index() != self.video_stream_index {
                continue;
            }
            decoder.send_packet(&packet)?;
        }
    }
}

impl Default for FfmpegPlaneReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaneReader for FfmpegPlaneReader {
    fn set_source(&mut self, path: &Path) -> Result<MovieMetadata, MovieError> {
        if let Some(open) = &self.path {
            log::debug!("closing {} before opening a new source", open.display());
        }
        self.close();
        match self.open_inner(path) {
            Ok(metadata) => Ok(metadata),
            Err(e) => {
                // Best-effort cleanup of whatever the failed open left behind.
                self.close();
                Err(e)
            }
        }
    }

    fn open_plane(
        &mut self,
        image_index: usize,
        plane_index: usize,
        region: &Region,
    ) -> Result<Plane, MovieError> {
        let metadata = self.metadata.clone().ok_or(MovieError::NotOpen)?;
        if image_index != 0 {
            return Err(MovieError::IllegalImageIndex(image_index));
        }
        if plane_index != self.next_plane_index {
            return Err(MovieError::OutOfSequence {
                requested: plane_index,
                expected: self.next_plane_index,
            });
        }
        if !region.covers(metadata.width, metadata.height) {
            return Err(MovieError::PartialRegion {
                region: *region,
                width: metadata.width,
                height: metadata.height,
            });
        }

        let plane = match self.peeked.take() {
            Some(plane) => plane,
            None => {
                let frame = self.decode_frame()?.ok_or(MovieError::EndOfStream)?;
                let scaler = self.scaler.as_mut().ok_or(MovieError::NotOpen)?;
                convert_frame(scaler, &metadata, &frame, plane_index)?
            }
        };

        self.next_plane_index += 1;
        Ok(plane)
    }

    fn metadata(&self) -> Option<&MovieMetadata> {
        self.metadata.as_ref()
    }

    fn current_source(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn close(&mut self) {
        self.input_ctx = None;
        self.decoder = None;
        self.scaler = None;
        self.path = None;
        self.metadata = None;
        self.peeked = None;
        self.next_plane_index = 0;
        self.flushing = false;
    }
}

/// Converts a decoded frame into the plane buffer layout, stripping any
/// row padding the native frame carries (stride > row bytes).
fn convert_frame(
    scaler: &mut ffmpeg_next::software::scaling::Context,
    metadata: &MovieMetadata,
    frame: &ffmpeg_next::util::frame::video::Video,
    index: usize,
) -> Result<Plane, MovieError> {
    let mut converted = ffmpeg_next::util::frame::video::Video::empty();
    scaler.run(frame, &mut converted)?;

    let row_bytes = metadata.width as usize
        * metadata.channels as usize
        * metadata.pixel_type.bytes_per_sample();
    let stride = converted.stride(0);
    let data = converted.data(0);

    let mut pixels = Vec::with_capacity(row_bytes * metadata.height as usize);
    for row in 0..metadata.height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }

    Ok(Plane::new(
        pixels,
        metadata.width,
        metadata.height,
        metadata.channels,
        metadata.pixel_type.bytes_per_sample() as u8,
        index,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn create_test_video(path: &Path, num_frames: usize, width: u32, height: u32, fps: i32) {
        ffmpeg_next::init().unwrap();

        let mut octx = ffmpeg_next::format::output(path).unwrap();

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
        let mut ost = octx.add_stream(Some(codec)).unwrap();

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();

        encoder_ctx.set_width(width);
        encoder_ctx.set_height(height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let mut encoder = encoder_ctx
            .open_with(ffmpeg_next::Dictionary::new())
            .unwrap();
        ost.set_parameters(&encoder);

        octx.write_header().unwrap();

        let ost_time_base = octx.stream(0).unwrap().time_base();

        let mut scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::format::Pixel::YUV420P,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .unwrap();

        for i in 0..num_frames {
            let mut rgb_frame =
                ffmpeg_next::util::frame::video::Video::new(ffmpeg_next::format::Pixel::RGB24, width, height);
            let stride = rgb_frame.stride(0);
            let data = rgb_frame.data_mut(0);
            let value = ((i * 40) % 256) as u8;
            for row in 0..height as usize {
                for col in 0..width as usize {
                    let offset = row * stride + col * 3;
                    data[offset] = value;
                    data[offset + 1] = value;
                    data[offset + 2] = value;
                }
            }

            let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
            scaler.run(&rgb_frame, &mut yuv_frame).unwrap();
            yuv_frame.set_pts(Some(i as i64));

            encoder.send_frame(&yuv_frame).unwrap();

            let mut encoded = ffmpeg_next::Packet::empty();
            while encoder.receive_packet(&mut encoded).is_ok() {
                encoded.set_stream(0);
                encoded.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
                encoded.write_interleaved(&mut octx).unwrap();
            }
        }

        encoder.send_eof().unwrap();
        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
            encoded.write_interleaved(&mut octx).unwrap();
        }

        octx.write_trailer().unwrap();
    }

    fn test_video_path(dir: &Path) -> PathBuf {
        dir.join("test.mp4")
    }

    fn mean_intensity(plane: &Plane) -> f64 {
        plane.data().iter().map(|&b| b as f64).sum::<f64>() / plane.data().len() as f64
    }

    #[test]
    fn test_set_source_returns_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 5, 160, 120, 30);

        let mut reader = FfmpegPlaneReader::new();
        let meta = reader.set_source(&path).unwrap();
        assert_eq!(meta.width, 160);
        assert_eq!(meta.height, 120);
        assert_eq!(meta.channels, 3);
        assert_eq!(meta.plane_count, 5);
        assert!(meta.frame_rate > 0.0);
        assert_eq!(reader.current_source(), Some(path.as_path()));
    }

    #[test]
    fn test_set_source_nonexistent_fails() {
        let mut reader = FfmpegPlaneReader::new();
        assert!(reader.set_source(Path::new("/nonexistent/test.mp4")).is_err());
        assert!(reader.metadata().is_none());
        assert!(reader.current_source().is_none());
    }

    #[test]
    fn test_set_source_non_movie_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-movie.mp4");
        std::fs::write(&path, b"plain text, no container").unwrap();

        let mut reader = FfmpegPlaneReader::new();
        assert!(reader.set_source(&path).is_err());
    }

    #[test]
    fn test_sequential_read_yields_all_planes_then_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 5, 160, 120, 30);

        let mut reader = FfmpegPlaneReader::new();
        let meta = reader.set_source(&path).unwrap();
        let region = Region::full(meta.width, meta.height);

        for i in 0..5 {
            let plane = reader.open_plane(0, i, &region).unwrap();
            assert_eq!(plane.index(), i);
            assert_eq!(plane.data().len(), meta.plane_len());
        }

        match reader.open_plane(0, 5, &region) {
            Err(MovieError::EndOfStream) => {}
            other => panic!("expected EndOfStream, got {other:?}"),
        }
    }

    #[test]
    fn test_out_of_sequence_index_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 3, 160, 120, 30);

        let mut reader = FfmpegPlaneReader::new();
        let meta = reader.set_source(&path).unwrap();
        let region = Region::full(meta.width, meta.height);

        match reader.open_plane(0, 2, &region) {
            Err(MovieError::OutOfSequence {
                requested: 2,
                expected: 0,
            }) => {}
            other => panic!("expected OutOfSequence, got {other:?}"),
        }

        // The cursor is untouched by the rejected request.
        reader.open_plane(0, 0, &region).unwrap();

        match reader.open_plane(0, 0, &region) {
            Err(MovieError::OutOfSequence {
                requested: 0,
                expected: 1,
            }) => {}
            other => panic!("expected OutOfSequence, got {other:?}"),
        }
    }

    #[test]
    fn test_nonzero_image_index_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 1, 160, 120, 30);

        let mut reader = FfmpegPlaneReader::new();
        let meta = reader.set_source(&path).unwrap();
        let region = Region::full(meta.width, meta.height);

        match reader.open_plane(1, 0, &region) {
            Err(MovieError::IllegalImageIndex(1)) => {}
            other => panic!("expected IllegalImageIndex, got {other:?}"),
        }
    }

    #[test]
    fn test_partial_region_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 1, 160, 120, 30);

        let mut reader = FfmpegPlaneReader::new();
        reader.set_source(&path).unwrap();

        match reader.open_plane(0, 0, &Region::new(0, 0, 80, 60)) {
            Err(MovieError::PartialRegion { .. }) => {}
            other => panic!("expected PartialRegion, got {other:?}"),
        }
    }

    #[test]
    fn test_open_plane_without_source_fails() {
        let mut reader = FfmpegPlaneReader::new();
        match reader.open_plane(0, 0, &Region::full(160, 120)) {
            Err(MovieError::NotOpen) => {}
            other => panic!("expected NotOpen, got {other:?}"),
        }
    }

    #[test]
    fn test_probe_peek_does_not_consume_plane_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        // Frame i is a solid gray of value i * 40: 0, 40, 80, ...
        create_test_video(&path, 3, 160, 120, 30);

        let mut reader = FfmpegPlaneReader::new();
        let meta = reader.set_source(&path).unwrap();
        let region = Region::full(meta.width, meta.height);

        let first = reader.open_plane(0, 0, &region).unwrap();
        let second = reader.open_plane(0, 1, &region).unwrap();

        // Lossy codec, so compare against wide bands around the encoded
        // values. Were the peeked frame dropped, plane 0 would read ~40.
        assert!(
            mean_intensity(&first) < 20.0,
            "plane 0 should be near-black, got {}",
            mean_intensity(&first)
        );
        let second_mean = mean_intensity(&second);
        assert!(
            (20.0..60.0).contains(&second_mean),
            "plane 1 should be near 40, got {second_mean}"
        );
    }

    #[test]
    fn test_rgb_flag_policies() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 1, 160, 120, 30);

        let mut stock = FfmpegPlaneReader::new();
        let meta = stock.set_source(&path).unwrap();
        assert!(!meta.rgb);
        assert_eq!(meta.channels, 3);

        let mut derived = FfmpegPlaneReader::with_rgb_policy(RgbFlagPolicy::FromLayout);
        let meta = derived.set_source(&path).unwrap();
        assert!(meta.rgb);
        assert_eq!(meta.channels, 3);
    }

    #[test]
    fn test_set_source_twice_restarts_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 2, 160, 120, 30);

        let mut reader = FfmpegPlaneReader::new();
        let meta = reader.set_source(&path).unwrap();
        let region = Region::full(meta.width, meta.height);
        reader.open_plane(0, 0, &region).unwrap();
        reader.open_plane(0, 1, &region).unwrap();

        reader.set_source(&path).unwrap();
        let plane = reader.open_plane(0, 0, &region).unwrap();
        assert_eq!(plane.index(), 0);
    }

    #[test]
    fn test_close_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 1, 160, 120, 30);

        let mut reader = FfmpegPlaneReader::new();
        reader.set_source(&path).unwrap();
        reader.close();
        reader.close();
        assert!(reader.metadata().is_none());
        assert!(reader.current_source().is_none());
    }
}
