use std::borrow::Cow;

use ndarray::ArrayView3;

use crate::shared::region::FaceRegion;

/// Byte order of the colour channels in a [`Frame`].
///
/// Decoders in this crate produce RGB; other sources (capture cards,
/// OpenCV-style buffers) may hand over BGR.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

/// A single video/image frame: contiguous 8-bit pixels in row-major order.
///
/// Format conversion happens at I/O boundaries and right before inference;
/// everything else treats pixel data as opaque.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
    order: ChannelOrder,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
            order: ChannelOrder::Rgb,
        }
    }

    pub fn with_channel_order(mut self, order: ChannelOrder) -> Self {
        self.order = order;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
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

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn channel_order(&self) -> ChannelOrder {
        self.order
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Returns the frame in RGB order, borrowing when no swizzle is needed.
    ///
    /// Only the first three channels are swapped; a fourth (alpha) channel
    /// is carried through untouched.
    pub fn to_rgb(&self) -> Cow<'_, Frame> {
        if self.order == ChannelOrder::Rgb || self.channels < 3 {
            return Cow::Borrowed(self);
        }
        let mut rgb = self.clone();
        let step = self.channels as usize;
        for px in rgb.data.chunks_exact_mut(step) {
            px.swap(0, 2);
        }
        rgb.order = ChannelOrder::Rgb;
        Cow::Owned(rgb)
    }

    /// Copies the pixels inside `region` into a new frame.
    ///
    /// The region is clamped to the frame first; a region entirely outside
    /// the frame yields an empty (0×0) frame. The crop keeps this frame's
    /// index and channel order.
    pub fn crop(&self, region: &FaceRegion) -> Frame {
        let clamped = region.clamp_to(self.width, self.height);
        let x1 = clamped.left.max(0) as usize;
        let y1 = clamped.top.max(0) as usize;
        let crop_w = clamped.width().max(0) as usize;
        let crop_h = clamped.height().max(0) as usize;
        let channels = self.channels as usize;
        let row_bytes = self.width as usize * channels;

        let mut data = Vec::with_capacity(crop_w * crop_h * channels);
        for row in y1..y1 + crop_h {
            let start = row * row_bytes + x1 * channels;
            data.extend_from_slice(&self.data[start..start + crop_w * channels]);
        }

        Frame::new(
            data,
            crop_w as u32,
            crop_h as u32,
            self.channels,
            self.index,
        )
        .with_channel_order(self.order)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
