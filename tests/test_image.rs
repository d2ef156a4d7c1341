// tests/test_image.rs — Integration tests for RgbImage through the public API.
//
// Run with `cargo test --test test_image`.

use dualpix::error::FilterError;
use dualpix::image::{RgbImage, CHANNELS};

// ===== Construction =====

#[test]
fn new_is_zeroed_rgb() {
    let img = RgbImage::new(100, 50);
    assert_eq!((img.width(), img.height(), img.channels()), (100, 50, CHANNELS));
    assert_eq!(img.pixel_count(), 5000);
    assert_eq!(img.as_slice().len(), img.pixel_count() * CHANNELS);
    assert_eq!(img.pixel(0, 0), [0, 0, 0]);
    assert_eq!(img.pixel(99, 49), [0, 0, 0]);
}

#[test]
fn from_raw_row_major_interleaved() {
    // 3×2, row-major, RGB interleaved. Channel 0 carries the pixel index.
    let mut data = Vec::new();
    for i in 0..6u8 {
        data.extend_from_slice(&[i, 100 + i, 200 + i]);
    }
    let img = RgbImage::from_raw(3, 2, data).unwrap();
    assert_eq!(img.pixel(0, 0), [0, 100, 200]);
    assert_eq!(img.pixel(2, 0), [2, 102, 202]);
    assert_eq!(img.pixel(0, 1), [3, 103, 203]);
    assert_eq!(img.pixel(2, 1), [5, 105, 205]);
    assert_eq!(img[(1, 1, 2)], 204);
}

// ===== Malformed buffers =====

#[test]
fn from_raw_rejects_short_buffer() {
    let err = RgbImage::from_raw(4, 4, vec![0; 47]).unwrap_err();
    match err {
        FilterError::MalformedImage { width, height, channels, len } => {
            assert_eq!((width, height, channels, len), (4, 4, 3, 47));
        }
        other => panic!("expected MalformedImage, got {other:?}"),
    }
}

#[test]
fn from_raw_rejects_long_buffer() {
    assert!(matches!(
        RgbImage::from_raw(2, 2, vec![0; 13]),
        Err(FilterError::MalformedImage { .. })
    ));
}

#[test]
fn from_raw_rejects_zero_dimensions() {
    assert!(RgbImage::from_raw(0, 5, Vec::new()).is_err());
    assert!(RgbImage::from_raw(5, 0, Vec::new()).is_err());
}

#[test]
fn rgba_buffers_are_rejected() {
    // Four channels: RGBA must be converted before it reaches the engines.
    let err = RgbImage::from_raw_with_channels(2, 2, 4, vec![0; 16]).unwrap_err();
    assert!(matches!(err, FilterError::MalformedImage { channels: 4, .. }));
    assert!(RgbImage::from_raw_with_channels(2, 2, 3, vec![0; 12]).is_ok());
}

// ===== Clamp-to-edge sampling =====

#[test]
fn sample_clamped_replicates_border() {
    let mut img = RgbImage::new(3, 3);
    img.set_pixel(0, 0, [10, 0, 0]);
    img.set_pixel(2, 2, [90, 0, 0]);
    assert_eq!(img.sample_clamped(-1, -1, 0), 10);
    assert_eq!(img.sample_clamped(-50, 0, 0), 10);
    assert_eq!(img.sample_clamped(3, 3, 0), 90);
    assert_eq!(img.sample_clamped(2, 99, 0), 90);
}

#[test]
fn luma_clamped_matches_weights() {
    let img = RgbImage::filled(2, 2, [100, 150, 200]);
    let y = img.luma_clamped(-3, 7);
    assert!((y - 140.75).abs() < 1e-3, "luma {y}");
}

// ===== Ownership =====

#[test]
fn clone_is_independent() {
    let a = RgbImage::filled(4, 4, [1, 2, 3]);
    let mut b = a.clone();
    b.set_pixel(0, 0, [9, 9, 9]);
    assert_eq!(a.pixel(0, 0), [1, 2, 3]);
    assert_ne!(a, b);
}

#[test]
fn into_raw_returns_buffer() {
    let img = RgbImage::filled(2, 1, [7, 8, 9]);
    assert_eq!(img.into_raw(), vec![7, 8, 9, 7, 8, 9]);
}

#[test]
fn same_shape_ignores_content() {
    assert!(RgbImage::new(3, 2).same_shape(&RgbImage::filled(3, 2, [1, 1, 1])));
    assert!(!RgbImage::new(3, 2).same_shape(&RgbImage::new(2, 3)));
}

#[test]
fn debug_prints_corner_only() {
    let img = RgbImage::new(20, 20);
    let s = format!("{img:?}");
    assert!(s.contains("20×20"));
    assert_eq!(s.matches("row ").count(), 8);
}

#[test]
#[should_panic]
fn pixel_out_of_bounds_panics() {
    RgbImage::new(2, 2).pixel(2, 0);
}
