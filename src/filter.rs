// filter.rs — Filter requests and the per-element math shared by every engine.
//
// Each engine (sequential, rayon, wgpu) differs only in HOW it walks the
// output domain. WHAT is computed for one output element lives here, once:
//
//   grayscale_value   — luma of one pixel
//   brightness_value  — one channel, additive in normalised space
//   contrast_value    — one channel, scaled around mid-grey
//   box_blur_at       — one channel, 3×3 clamp-to-edge integer mean
//   sobel_at          — one pixel, 3×3 clamp-to-edge gradient magnitude
//
// The WGSL kernels in src/shaders/filters.wgsl are a line-by-line mirror of
// these functions. Any change here must be made there too, otherwise the
// ±1 equivalence tests in tests/test_equivalence.rs and gpu::filters fail.
//
// ROUNDING
// ────────
// clamp to [0, 255] in f32, add 0.5, truncate. Round-half-up. For the
// non-negative values seen here this equals `f32::round`, but the explicit
// form is what the shader does too.

use std::fmt;
use std::str::FromStr;

use crate::image::RgbImage;

/// Rec.601 luma weights.
pub const LUMA_R: f32 = 0.299;
pub const LUMA_G: f32 = 0.587;
pub const LUMA_B: f32 = 0.114;

/// Horizontal Sobel kernel, indexed `[ky + 1][kx + 1]`.
pub const SOBEL_GX: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];

/// Vertical Sobel kernel, indexed `[ky + 1][kx + 1]`.
pub const SOBEL_GY: [[i32; 3]; 3] = [[1, 2, 1], [0, 0, 0], [-1, -2, -1]];

// ---------------------------------------------------------------------------
// FilterKind
// ---------------------------------------------------------------------------

/// The five supported filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Grayscale,
    Brightness,
    Contrast,
    BoxBlur,
    Sobel,
}

impl FilterKind {
    /// Every filter, in menu order.
    pub const ALL: [FilterKind; 5] = [
        FilterKind::Grayscale,
        FilterKind::Brightness,
        FilterKind::Contrast,
        FilterKind::BoxBlur,
        FilterKind::Sobel,
    ];

    /// True for filters that read a 3×3 neighborhood. These must gather from
    /// the untouched input into a distinct output buffer.
    pub fn is_neighborhood(self) -> bool {
        matches!(self, FilterKind::BoxBlur | FilterKind::Sobel)
    }

    /// Command-line name.
    pub fn name(self) -> &'static str {
        match self {
            FilterKind::Grayscale => "grayscale",
            FilterKind::Brightness => "brightness",
            FilterKind::Contrast => "contrast",
            FilterKind::BoxBlur => "blur",
            FilterKind::Sobel => "sobel",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a filter name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFilter(pub String);

impl fmt::Display for UnknownFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown filter '{}' (expected grayscale, brightness, contrast, blur or sobel)",
            self.0
        )
    }
}

impl std::error::Error for UnknownFilter {}

impl FromStr for FilterKind {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grayscale" | "greyscale" | "gray" => Ok(FilterKind::Grayscale),
            "brightness" => Ok(FilterKind::Brightness),
            "contrast" => Ok(FilterKind::Contrast),
            "blur" | "box_blur" | "boxblur" => Ok(FilterKind::BoxBlur),
            "sobel" | "edge" | "edges" => Ok(FilterKind::Sobel),
            _ => Err(UnknownFilter(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// FilterParams / FilterRequest
// ---------------------------------------------------------------------------

/// Tunable parameters. Only `Brightness` reads `delta` and only `Contrast`
/// reads `factor`; the rest ignore both.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    /// Brightness offset in normalised units. Clamped to [-1, 1].
    pub delta: f32,
    /// Contrast gain around mid-grey. Clamped to >= 0, unbounded above.
    pub factor: f32,
}

impl Default for FilterParams {
    fn default() -> Self {
        FilterParams { delta: 0.0, factor: 1.0 }
    }
}

impl FilterParams {
    /// The parameters actually used by the engines. Out-of-range values are
    /// clamped, never rejected; NaN falls back to the neutral value.
    pub fn clamped(self) -> Self {
        let delta = if self.delta.is_nan() { 0.0 } else { self.delta.clamp(-1.0, 1.0) };
        let factor = if self.factor.is_nan() { 1.0 } else { self.factor.max(0.0) };
        FilterParams { delta, factor }
    }
}

/// One filter invocation: which filter and with what parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterRequest {
    pub kind: FilterKind,
    pub params: FilterParams,
}

impl FilterRequest {
    pub fn new(kind: FilterKind, params: FilterParams) -> Self {
        FilterRequest { kind, params }
    }

    pub fn grayscale() -> Self {
        Self::new(FilterKind::Grayscale, FilterParams::default())
    }

    pub fn brightness(delta: f32) -> Self {
        Self::new(FilterKind::Brightness, FilterParams { delta, ..Default::default() })
    }

    pub fn contrast(factor: f32) -> Self {
        Self::new(FilterKind::Contrast, FilterParams { factor, ..Default::default() })
    }

    pub fn box_blur() -> Self {
        Self::new(FilterKind::BoxBlur, FilterParams::default())
    }

    pub fn sobel() -> Self {
        Self::new(FilterKind::Sobel, FilterParams::default())
    }

    /// Parameters after clamping.
    pub fn effective_params(&self) -> FilterParams {
        self.params.clamped()
    }
}

impl fmt::Display for FilterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.effective_params();
        match self.kind {
            FilterKind::Brightness => write!(f, "brightness({:+.3})", p.delta),
            FilterKind::Contrast => write!(f, "contrast({:.3})", p.factor),
            kind => write!(f, "{kind}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-element math
// ---------------------------------------------------------------------------

/// Clamp to [0, 255], round half up, truncate.
#[inline]
pub fn clamp_byte(v: f32) -> u8 {
    (v.clamp(0.0, 255.0) + 0.5) as u8
}

/// Unrounded Rec.601 luma.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> f32 {
    LUMA_R * r as f32 + LUMA_G * g as f32 + LUMA_B * b as f32
}

/// Grayscale value of one pixel.
#[inline]
pub fn grayscale_value(r: u8, g: u8, b: u8) -> u8 {
    clamp_byte(luma(r, g, b))
}

/// Brightness-adjusted channel. `delta` must already be clamped.
#[inline]
pub fn brightness_value(v: u8, delta: f32) -> u8 {
    let n = v as f32 / 255.0;
    clamp_byte((n + delta).clamp(0.0, 1.0) * 255.0)
}

/// Contrast-adjusted channel. `factor` must already be clamped.
#[inline]
pub fn contrast_value(v: u8, factor: f32) -> u8 {
    let n = v as f32 / 255.0;
    clamp_byte(((n - 0.5) * factor + 0.5).clamp(0.0, 1.0) * 255.0)
}

/// 3×3 box mean of channel `c` around (x, y). Integer sum, truncating
/// division by 9; clamp-to-edge at the border.
#[inline]
pub fn box_blur_at(src: &RgbImage, x: usize, y: usize, c: usize) -> u8 {
    let (x, y) = (x as isize, y as isize);
    let mut sum: u32 = 0;
    for ky in -1..=1 {
        for kx in -1..=1 {
            sum += src.sample_clamped(x + kx, y + ky, c) as u32;
        }
    }
    (sum / 9) as u8
}

/// Sobel gradient magnitude at (x, y) over on-the-fly luma, clamp-to-edge.
#[inline]
pub fn sobel_at(src: &RgbImage, x: usize, y: usize) -> u8 {
    let (x, y) = (x as isize, y as isize);
    let mut gx = 0.0f32;
    let mut gy = 0.0f32;
    for ky in -1..=1isize {
        for kx in -1..=1isize {
            let g = src.luma_clamped(x + kx, y + ky);
            let (ki, kj) = ((ky + 1) as usize, (kx + 1) as usize);
            gx += g * SOBEL_GX[ki][kj] as f32;
            gy += g * SOBEL_GY[ki][kj] as f32;
        }
    }
    clamp_byte((gx * gx + gy * gy).sqrt())
}
