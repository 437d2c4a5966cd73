// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grayscale preparation for boundary detection: percentile contrast
// stretching and Otsu foreground masks.

use image::{GrayImage, Luma};
use tracing::debug;

/// Fraction of pixels clipped at each end of the histogram when stretching.
const CLIP_FRACTION: f64 = 0.01;

/// Stretch the luma range so the 1st and 99th percentiles map to 0 and 255.
///
/// Returns `None` for textureless frames whose usable range is narrower than
/// `min_spread` levels; there is nothing in them to detect.
pub fn normalize_contrast(gray: &GrayImage, min_spread: u8) -> Option<GrayImage> {
    let histogram = histogram(gray);
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return None;
    }

    let clip = (total as f64 * CLIP_FRACTION) as u64;
    let low = percentile_level(&histogram, clip, false);
    let high = percentile_level(&histogram, clip, true);
    debug!(low, high, "Luma percentiles");

    if high <= low || high - low < min_spread {
        return None;
    }

    let scale = 255.0 / (high - low) as f32;
    let mut lut = [0u8; 256];
    for (level, entry) in lut.iter_mut().enumerate() {
        let stretched = (level as f32 - low as f32) * scale;
        *entry = stretched.clamp(0.0, 255.0).round() as u8;
    }

    let (width, height) = gray.dimensions();
    Some(GrayImage::from_fn(width, height, |x, y| {
        Luma([lut[gray.get_pixel(x, y).0[0] as usize]])
    }))
}

/// Foreground mask: pixels brighter than the Otsu level become 255.
pub fn otsu_mask(gray: &GrayImage) -> GrayImage {
    let threshold = otsu_threshold(gray);
    debug!(threshold, "Otsu threshold computed");
    let (width, height) = gray.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let val = gray.get_pixel(x, y).0[0];
        Luma([if val > threshold { 255u8 } else { 0u8 }])
    })
}

fn histogram(gray: &GrayImage) -> [u64; 256] {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }
    histogram
}

/// Smallest level whose cumulative count exceeds `clip` pixels, scanning from
/// the dark end, or from the bright end when `from_top` is set.
fn percentile_level(histogram: &[u64; 256], clip: u64, from_top: bool) -> u8 {
    let mut cumulative = 0u64;
    let levels: Box<dyn Iterator<Item = usize>> = if from_top {
        Box::new((0..256).rev())
    } else {
        Box::new(0..256)
    };
    for level in levels {
        cumulative += histogram[level];
        if cumulative > clip {
            return level as u8;
        }
    }
    if from_top { 0 } else { 255 }
}

/// Compute the Otsu threshold for a grayscale image.
///
/// Finds the threshold value that maximises the between-class variance of
/// the dark and bright pixel groups.
fn otsu_threshold(gray: &GrayImage) -> u8 {
    let histogram = histogram(gray);

    let total_pixels = gray.width() as u64 * gray.height() as u64;
    if total_pixels == 0 {
        return 128;
    }

    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_background = 0.0f64;
    let mut weight_background = 0u64;
    let mut max_variance = 0.0f64;
    let mut best_threshold = 0u8;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;

        let between_variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between_variance > max_variance {
            max_variance = between_variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tone(dark: u8, bright: u8) -> GrayImage {
        GrayImage::from_fn(100, 10, |x, _| Luma([if x < 40 { dark } else { bright }]))
    }

    #[test]
    fn uniform_image_has_no_contrast() {
        let gray = GrayImage::from_pixel(50, 50, Luma([128u8]));
        assert!(normalize_contrast(&gray, 16).is_none());
    }

    #[test]
    fn stretch_maps_extremes_to_full_range() {
        let stretched = normalize_contrast(&two_tone(60, 140), 16).expect("enough contrast");
        assert_eq!(stretched.get_pixel(0, 0).0[0], 0);
        assert_eq!(stretched.get_pixel(99, 0).0[0], 255);
    }

    #[test]
    fn otsu_separates_two_tones() {
        let threshold = otsu_threshold(&two_tone(30, 220));
        assert!((30..220).contains(&threshold), "threshold {threshold}");
        let mask = otsu_mask(&two_tone(30, 220));
        assert_eq!(mask.get_pixel(10, 5).0[0], 0);
        assert_eq!(mask.get_pixel(90, 5).0[0], 255);
    }

    #[test]
    fn otsu_empty_image_is_midpoint() {
        assert_eq!(otsu_threshold(&GrayImage::new(0, 0)), 128);
    }
}
