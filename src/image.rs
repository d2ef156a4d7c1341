// image.rs — Interleaved 8-bit RGB raster.
//
// Memory layout (width = 3, channels = 3):
//
//   byte index:  0 1 2 | 3 4 5 | 6 7 8 | 9 10 11 | ...
//   channel:     R G B | R G B | R G B | R  G  B | ...
//   pixel:      (0,0)   (1,0)   (2,0)   (0,1)
//
// No stride padding: rows are packed back to back, so the pixel (x, y) starts
// at byte (y * width + x) * 3. This is the layout every decoder collaborator
// hands us (e.g. `image::RgbImage::into_raw()`) and the layout the GPU path
// packs into one u32 per pixel.
//
// BORDER POLICY
// ─────────────
// Neighborhood filters address outside the image with clamp-to-edge: an
// out-of-range column/row is replaced by the nearest valid one. Both
// `sample_clamped` and `luma_clamped` implement this and are the only
// neighbor accessors the CPU engines use, so the sequential and rayon paths
// pick the same pixel by construction. The WGSL kernel mirrors the same
// clamp.

use std::fmt;

use crate::error::FilterError;
use crate::filter::luma;

/// Number of interleaved channels. Alpha is dropped upstream.
pub const CHANNELS: usize = 3;

// ---------------------------------------------------------------------------
// RgbImage
// ---------------------------------------------------------------------------

/// A row-major interleaved RGB image with 8 bits per channel.
///
/// Invariant: `pixels.len() == width * height * 3`, `width > 0`,
/// `height > 0`. Every constructor enforces it; `validate()` re-checks it
/// at engine entry because `as_mut_slice` hands out the raw buffer.
pub struct RgbImage {
    width: usize,
    height: usize,
    channels: usize,
    pixels: Vec<u8>,
}

// Deep copy of the pixel buffer. The harness relies on this to give each
// engine its own buffer.
impl Clone for RgbImage {
    fn clone(&self) -> Self {
        RgbImage {
            width: self.width,
            height: self.height,
            channels: self.channels,
            pixels: self.pixels.clone(),
        }
    }
}

impl RgbImage {
    // --- Constructors ---

    /// Create a black image.
    ///
    /// # Panics
    /// Panics if either dimension is zero.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, [0, 0, 0])
    }

    /// Create an image where every pixel has the same colour.
    ///
    /// # Panics
    /// Panics if either dimension is zero.
    pub fn filled(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        assert!(width > 0 && height > 0, "image dimensions must be non-zero ({width}×{height})");
        let mut pixels = Vec::with_capacity(width * height * CHANNELS);
        for _ in 0..width * height {
            pixels.extend_from_slice(&rgb);
        }
        RgbImage { width, height, channels: CHANNELS, pixels }
    }

    /// Wrap an already-decoded RGB buffer.
    ///
    /// # Errors
    /// `FilterError::MalformedImage` if the dimensions are zero or
    /// `pixels.len() != width * height * 3`.
    pub fn from_raw(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self, FilterError> {
        Self::from_raw_with_channels(width, height, CHANNELS, pixels)
    }

    /// Wrap a decoded buffer whose channel count is reported by the decoder.
    ///
    /// Only `channels == 3` is accepted; anything else is a malformed image
    /// for this crate (RGBA must be converted upstream).
    pub fn from_raw_with_channels(
        width: usize,
        height: usize,
        channels: usize,
        pixels: Vec<u8>,
    ) -> Result<Self, FilterError> {
        let img = RgbImage { width, height, channels, pixels };
        img.validate()?;
        Ok(img)
    }

    // --- Accessors ---

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of pixels (`width * height`).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Interleaved bytes, row-major.
    pub fn as_slice(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable interleaved bytes. The length cannot change through a slice,
    /// so the shape invariant survives.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Consume the image and return its buffer (for the encode collaborator).
    pub fn into_raw(self) -> Vec<u8> {
        self.pixels
    }

    /// Byte offset of channel 0 of pixel (x, y).
    #[inline]
    pub fn index_of(&self, x: usize, y: usize) -> usize {
        (y * self.width + x) * CHANNELS
    }

    /// Read pixel (x, y) as `[r, g, b]`.
    ///
    /// # Panics
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        self.bounds_check(x, y);
        let i = self.index_of(x, y);
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }

    /// Write pixel (x, y).
    ///
    /// # Panics
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        self.bounds_check(x, y);
        let i = self.index_of(x, y);
        self.pixels[i..i + CHANNELS].copy_from_slice(&rgb);
    }

    /// Channel `c` of the pixel at (x, y), with clamp-to-edge addressing for
    /// coordinates outside the image.
    #[inline]
    pub fn sample_clamped(&self, x: isize, y: isize, c: usize) -> u8 {
        let (cx, cy) = self.clamp_coords(x, y);
        self.pixels[self.index_of(cx, cy) + c]
    }

    /// Luma of the pixel at (x, y) with clamp-to-edge addressing. Computed on
    /// the fly from R, G, B; no grayscale buffer is materialised.
    #[inline]
    pub fn luma_clamped(&self, x: isize, y: isize) -> f32 {
        let (cx, cy) = self.clamp_coords(x, y);
        let i = self.index_of(cx, cy);
        luma(self.pixels[i], self.pixels[i + 1], self.pixels[i + 2])
    }

    /// True if both images have the same width, height and channel count.
    pub fn same_shape(&self, other: &RgbImage) -> bool {
        self.width == other.width && self.height == other.height && self.channels == other.channels
    }

    /// Check the shape invariant.
    ///
    /// # Errors
    /// `FilterError::MalformedImage` describing the offending shape.
    pub fn validate(&self) -> Result<(), FilterError> {
        let expected = self
            .width
            .checked_mul(self.height)
            .and_then(|n| n.checked_mul(self.channels));
        let ok = self.width > 0
            && self.height > 0
            && self.channels == CHANNELS
            && expected == Some(self.pixels.len());
        if ok {
            Ok(())
        } else {
            Err(FilterError::MalformedImage {
                width: self.width,
                height: self.height,
                channels: self.channels,
                len: self.pixels.len(),
            })
        }
    }

    // --- Internal helpers ---

    #[inline]
    fn clamp_coords(&self, x: isize, y: isize) -> (usize, usize) {
        let cx = x.clamp(0, self.width as isize - 1) as usize;
        let cy = y.clamp(0, self.height as isize - 1) as usize;
        (cx, cy)
    }

    #[inline]
    fn bounds_check(&self, x: usize, y: usize) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x},{y}) out of bounds for image {}×{}",
            self.width,
            self.height,
        );
    }
}

impl PartialEq for RgbImage {
    fn eq(&self, other: &Self) -> bool {
        self.same_shape(other) && self.pixels == other.pixels
    }
}

impl Eq for RgbImage {}

// Only the top-left corner is printed; full dumps of real photos are useless
// in test failure output.
impl fmt::Debug for RgbImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RgbImage {{ {}×{}, channels={} }}", self.width, self.height, self.channels)?;
        if self.validate().is_err() {
            return writeln!(f, "  <malformed: {} bytes>", self.pixels.len());
        }
        for y in 0..self.height.min(8) {
            write!(f, "  row {y}: [")?;
            for x in 0..self.width.min(8) {
                if x > 0 {
                    write!(f, " ")?;
                }
                let [r, g, b] = self.pixel(x, y);
                write!(f, "({r},{g},{b})")?;
            }
            if self.width > 8 {
                write!(f, " ...")?;
            }
            writeln!(f, "]")?;
        }
        if self.height > 8 {
            writeln!(f, "  ...")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Index — img[(x, y, c)] syntax
// ---------------------------------------------------------------------------

impl std::ops::Index<(usize, usize, usize)> for RgbImage {
    type Output = u8;

    #[inline]
    fn index(&self, (x, y, c): (usize, usize, usize)) -> &u8 {
        self.bounds_check(x, y);
        assert!(c < CHANNELS, "channel {c} out of range");
        &self.pixels[self.index_of(x, y) + c]
    }
}

impl std::ops::IndexMut<(usize, usize, usize)> for RgbImage {
    #[inline]
    fn index_mut(&mut self, (x, y, c): (usize, usize, usize)) -> &mut u8 {
        self.bounds_check(x, y);
        assert!(c < CHANNELS, "channel {c} out of range");
        let i = self.index_of(x, y) + c;
        &mut self.pixels[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_black() {
        let img = RgbImage::new(5, 4);
        assert_eq!(img.width(), 5);
        assert_eq!(img.height(), 4);
        assert_eq!(img.channels(), 3);
        assert_eq!(img.as_slice().len(), 60);
        assert!(img.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_filled_layout() {
        let img = RgbImage::filled(2, 2, [1, 2, 3]);
        assert_eq!(img.as_slice(), &[1, 2, 3, 1, 2, 3, 1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn test_from_raw_layout() {
        // 2×2: (0,0)=red (1,0)=green (0,1)=blue (1,1)=white
        let data = vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
        let img = RgbImage::from_raw(2, 2, data).unwrap();
        assert_eq!(img.pixel(0, 0), [255, 0, 0]);
        assert_eq!(img.pixel(1, 0), [0, 255, 0]);
        assert_eq!(img.pixel(0, 1), [0, 0, 255]);
        assert_eq!(img.pixel(1, 1), [255, 255, 255]);
        assert_eq!(img[(1, 0, 1)], 255);
    }

    #[test]
    fn test_from_raw_rejects_bad_length() {
        let err = RgbImage::from_raw(2, 2, vec![0; 11]).unwrap_err();
        assert!(matches!(err, FilterError::MalformedImage { len: 11, .. }));
    }

    #[test]
    fn test_from_raw_rejects_rgba() {
        let err = RgbImage::from_raw_with_channels(2, 2, 4, vec![0; 16]).unwrap_err();
        assert!(matches!(err, FilterError::MalformedImage { channels: 4, .. }));
    }

    #[test]
    fn test_from_raw_rejects_zero_dims() {
        assert!(RgbImage::from_raw(0, 3, vec![]).is_err());
        assert!(RgbImage::from_raw(3, 0, vec![]).is_err());
    }

    #[test]
    fn test_set_pixel_and_index_mut() {
        let mut img = RgbImage::new(3, 3);
        img.set_pixel(2, 1, [9, 8, 7]);
        img[(0, 2, 2)] = 42;
        assert_eq!(img.pixel(2, 1), [9, 8, 7]);
        assert_eq!(img.pixel(0, 2), [0, 0, 42]);
    }

    #[test]
    fn test_sample_clamped_replicates_edges() {
        // 3×1 row: channel 0 = 10, 20, 30
        let img = RgbImage::from_raw(3, 1, vec![10, 0, 0, 20, 0, 0, 30, 0, 0]).unwrap();
        assert_eq!(img.sample_clamped(-1, 0, 0), 10);
        assert_eq!(img.sample_clamped(-5, -5, 0), 10);
        assert_eq!(img.sample_clamped(1, 7, 0), 20);
        assert_eq!(img.sample_clamped(3, 0, 0), 30);
        assert_eq!(img.sample_clamped(100, -1, 0), 30);
    }

    #[test]
    fn test_luma_clamped_matches_luma() {
        let img = RgbImage::filled(2, 2, [100, 150, 200]);
        let expected = luma(100, 150, 200);
        assert_eq!(img.luma_clamped(-1, -1), expected);
        assert_eq!(img.luma_clamped(5, 0), expected);
    }

    #[test]
    fn test_clone_is_deep() {
        let a = RgbImage::filled(2, 1, [1, 1, 1]);
        let mut b = a.clone();
        b.set_pixel(0, 0, [2, 2, 2]);
        assert_eq!(a.pixel(0, 0), [1, 1, 1]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_debug_truncates() {
        let img = RgbImage::new(20, 20);
        let s = format!("{img:?}");
        assert!(s.contains("20×20"));
        assert!(s.contains("..."));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_pixel_out_of_bounds() {
        let img = RgbImage::new(4, 4);
        img.pixel(4, 0);
    }
}
