use crate::media::domain::plane_writer::{Destination, PlaneWriter};
use crate::media::infrastructure::loader;
use crate::media::infrastructure::probe;
use crate::shared::error::MovieError;
use crate::shared::metadata::MovieMetadata;
use crate::shared::plane::{Plane, Region};

/// Encodes movie planes via ffmpeg-next.
///
/// The destination is configured from a previously supplied metadata
/// record: its resolution, frame rate and bit rate drive the encoder.
/// Planes must arrive in strict sequence order and cover the whole frame.
pub struct FfmpegPlaneWriter {
    metadata: Option<MovieMetadata>,
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    next_plane_index: usize,
    fps: i32,
}

// Safety: FfmpegPlaneWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegPlaneWriter {}

impl FfmpegPlaneWriter {
    pub fn new() -> Self {
        Self {
            metadata: None,
            octx: None,
            encoder: None,
            scaler: None,
            next_plane_index: 0,
            fps: 0,
        }
    }

    fn open_inner(&mut self, path: &std::path::Path) -> Result<(), MovieError> {
        let metadata = self.metadata.clone().ok_or(MovieError::MissingMetadata)?;
        loader::ensure_loaded()?;

        let mut octx = ffmpeg_next::format::output(path)?;

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        // MPEG-4 part 2 is accepted by every container this format claims.
        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or(MovieError::EncoderUnavailable { name: "mpeg4" })?;

        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        let fps = metadata.frame_rate.round() as i32;
        let fps = if fps <= 0 {
            log::warn!(
                "non-positive frame rate {}, encoding at 25 fps",
                metadata.frame_rate
            );
            25
        } else {
            fps
        };

        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));
        encoder_ctx.set_bit_rate(metadata.bit_rate as usize);

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);

        octx.write_header()?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            probe::plane_format(&metadata),
            metadata.width,
            metadata.height,
            ffmpeg_next::format::Pixel::YUV420P,
            metadata.width,
            metadata.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = Some(scaler);
        self.fps = fps;
        self.next_plane_index = 0;

        Ok(())
    }

    /// Writes out every packet the encoder has ready.
    fn drain_packets(&mut self) -> Result<(), MovieError> {
        let encoder = self.encoder.as_mut().ok_or(MovieError::NotOpen)?;
        let octx = self.octx.as_mut().ok_or(MovieError::NotOpen)?;
        let ost_time_base = octx.stream(0).ok_or(MovieError::NotOpen)?.time_base();

        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(ffmpeg_next::Rational(1, self.fps), ost_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), MovieError> {
        {
            let encoder = self.encoder.as_mut().ok_or(MovieError::NotOpen)?;
            encoder.send_eof()?;
        }
        self.drain_packets()?;
        let octx = self.octx.as_mut().ok_or(MovieError::NotOpen)?;
        octx.write_trailer()?;
        Ok(())
    }
}

impl Default for FfmpegPlaneWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaneWriter for FfmpegPlaneWriter {
    fn set_metadata(&mut self, metadata: MovieMetadata) {
        self.metadata = Some(metadata);
    }

    fn set_destination(
        &mut self,
        dest: Destination,
        image_index: usize,
    ) -> Result<(), MovieError> {
        if image_index != 0 {
            return Err(MovieError::IllegalImageIndex(image_index));
        }
        let path = match dest {
            Destination::File(path) => path,
            Destination::Stream(_) => return Err(MovieError::UnsupportedDestination),
        };
        match self.open_inner(&path) {
            Ok(()) => Ok(()),
            Err(e) => {
                // Best-effort cleanup; the open error is the one reported.
                self.octx = None;
                self.encoder = None;
                self.scaler = None;
                Err(e)
            }
        }
    }

    fn save_plane(
        &mut self,
        image_index: usize,
        plane_index: usize,
        plane: &Plane,
        region: &Region,
    ) -> Result<(), MovieError> {
        let metadata = self.metadata.clone().ok_or(MovieError::NotOpen)?;
        if self.encoder.is_none() {
            return Err(MovieError::NotOpen);
        }
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
        if plane.data().len() != metadata.plane_len() {
            return Err(MovieError::PlaneShape {
                expected: metadata.plane_len(),
                actual: plane.data().len(),
            });
        }

        let mut src_frame = ffmpeg_next::util::frame::video::Video::new(
            probe::plane_format(&metadata),
            metadata.width,
            metadata.height,
        );

        let row_bytes = metadata.width as usize
            * metadata.channels as usize
            * metadata.pixel_type.bytes_per_sample();
        let stride = src_frame.stride(0);
        let data = src_frame.data_mut(0);
        for row in 0..metadata.height as usize {
            let src_start = row * row_bytes;
            let dst_start = row * stride;
            data[dst_start..dst_start + row_bytes]
                .copy_from_slice(&plane.data()[src_start..src_start + row_bytes]);
        }

        {
            let scaler = self.scaler.as_mut().ok_or(MovieError::NotOpen)?;
            let encoder = self.encoder.as_mut().ok_or(MovieError::NotOpen)?;

            let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
            scaler.run(&src_frame, &mut yuv_frame)?;
            yuv_frame.set_pts(Some(self.next_plane_index as i64));

            encoder.send_frame(&yuv_frame)?;
        }
        self.drain_packets()?;

        self.next_plane_index += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), MovieError> {
        if self.encoder.is_none() {
            return Ok(());
        }
        let result = self.flush();
        self.octx = None;
        self.encoder = None;
        self.scaler = None;
        result
    }
}
