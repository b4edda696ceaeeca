use ffmpeg_next::format::Pixel;

use crate::shared::metadata::{MovieMetadata, PixelType, DEFAULT_FRAME_RATE};

/// Governs how the metadata `rgb` flag is derived during probing.
///
/// The default reports `false` for every source, which is what this
/// adapter has always shipped; `FromLayout` derives the flag from the
/// decoded pixel layout instead. The difference is kept behind this knob
/// pending a product decision, so both behaviors stay testable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RgbFlagPolicy {
    #[default]
    AlwaysOff,
    FromLayout,
}

/// Sample depth for pixel layouts decoded into a single-channel buffer,
/// `None` for everything else. The table is fixed; unlisted layouts are
/// treated as color.
fn grayscale_class(format: Pixel) -> Option<PixelType> {
    match format {
        Pixel::GRAY8 | Pixel::MonoWhite | Pixel::MonoBlack | Pixel::PAL8 => Some(PixelType::U8),
        Pixel::GRAY16BE | Pixel::GRAY16LE => Some(PixelType::U16),
        _ => None,
    }
}

/// The buffer layout decoded frames of `format` are converted into.
pub(crate) fn buffer_format(format: Pixel) -> Pixel {
    match grayscale_class(format) {
        Some(PixelType::U8) => Pixel::GRAY8,
        Some(PixelType::U16) => Pixel::GRAY16BE,
        None => Pixel::RGB24,
    }
}

/// The buffer layout planes described by `metadata` are handed over in.
/// Used on the write path to build encoder input frames.
pub(crate) fn plane_format(metadata: &MovieMetadata) -> Pixel {
    if metadata.channels == 1 {
        match metadata.pixel_type {
            PixelType::U8 => Pixel::GRAY8,
            PixelType::U16 => Pixel::GRAY16BE,
        }
    } else {
        Pixel::RGB24
    }
}

/// Builds the metadata record for a probed source.
///
/// Stream-level properties come from the demuxer; `lead_format` is the
/// pixel layout of the one frame decoded during probing, which settles
/// channel count and sample depth. The frame rate falls back to 25 when
/// the stream reports none. The bit rate keeps its encoding default; the
/// container's own value is not consulted.
pub(crate) fn build_metadata(
    width: u32,
    height: u32,
    rate: ffmpeg_next::Rational,
    frames: i64,
    lead_format: Pixel,
    policy: RgbFlagPolicy,
) -> MovieMetadata {
    let frame_rate = if rate.denominator() != 0 && rate.numerator() > 0 {
        rate.numerator() as f64 / rate.denominator() as f64
    } else {
        DEFAULT_FRAME_RATE
    };

    let class = grayscale_class(lead_format);
    let (channels, pixel_type) = match class {
        Some(pixel_type) => (1u8, pixel_type),
        None => (3u8, PixelType::U8),
    };

    let rgb = match policy {
        RgbFlagPolicy::AlwaysOff => false,
        RgbFlagPolicy::FromLayout => class.is_none(),
    };

    MovieMetadata {
        width,
        height,
        channels,
        pixel_type,
        bits_per_pixel: channels as u32 * pixel_type.bits(),
        interleaved: channels > 1,
        little_endian: false,
        rgb,
        frame_rate,
        plane_count: frames.max(0) as usize,
        ..MovieMetadata::default()
    }
}
