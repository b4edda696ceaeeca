use ndarray::ArrayView3;

/// Rectangular pixel bounds within a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The region spanning a whole `width` x `height` frame.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Whether this region covers the whole frame. The decoder only
    /// yields whole frames, so anything smaller is rejected upstream.
    pub fn covers(&self, width: u32, height: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width == width && self.height == height
    }
}

/// One decoded or to-be-encoded 2-D image buffer.
///
/// Contiguous bytes in row-major order, tagged with the sequence index
/// the plane occupies in its stream. The adapter owns the buffer
/// exclusively between production and hand-off; nothing is shared.
#[derive(Clone, Debug)]
pub struct Plane {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    bytes_per_sample: u8,
    index: usize,
}

impl Plane {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
        bytes_per_sample: u8,
        index: usize,
    ) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize) * (bytes_per_sample as usize),
            "data length must equal width * height * channels * bytes_per_sample"
        );
        Self {
            data,
            width,
            height,
            channels,
            bytes_per_sample,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn bytes_per_sample(&self) -> u8 {
        self.bytes_per_sample
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Sample value at (`x`, `y`, channel `c`), independent of depth.
    /// 16-bit samples are read big-endian.
    pub fn sample(&self, x: u32, y: u32, c: u8) -> f64 {
        let offset = ((y as usize * self.width as usize + x as usize) * self.channels as usize
            + c as usize)
            * self.bytes_per_sample as usize;
        match self.bytes_per_sample {
            1 => self.data[offset] as f64,
            _ => u16::from_be_bytes([self.data[offset], self.data[offset + 1]]) as f64,
        }
    }

    /// View over a byte plane as (height, width, channels).
    /// Only valid for 8-bit planes.
    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        debug_assert_eq!(self.bytes_per_sample, 1, "ndarray view requires 8-bit samples");
        ArrayView3::from_shape(
            (
                self.height as usize,
                self.width as usize,
                self.channels as usize,
            ),
            &self.data,
        )
        .expect("Plane data length must match dimensions")
    }
}
