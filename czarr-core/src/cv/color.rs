// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::collections::BTreeMap;

use crate::constant::{LABEL_COLORS, LABEL_OVERLAY_ALPHA};
use crate::error::CzarrError;

/// Colour a label image as a (height, width, 3) RGB image in [0, 1]
///
/// Non-background labels are assigned colours from `LABEL_COLORS` in
/// ascending label order, wrapping around after ten labels. Background pixels
/// are black. When an intensity image is given (already scaled to [0, 1]) the
/// colours are blended over it with `LABEL_OVERLAY_ALPHA`, otherwise they
/// are drawn opaque.
///
/// # Arguments
///
/// * `labels` - Row-major label image
/// * `width` - Width of label image
/// * `height` - Height of label image
/// * `image` - Optional grayscale image of the same size
/// * `bg_label` - Label treated as background
///
/// # Examples
///
/// ```
/// use czarr_core::cv::label_to_rgb;
///
/// let rgb = label_to_rgb(&[0, 1, 2, 2], 2, 2, None, 0).unwrap();
///
/// assert_eq!(rgb.len(), 12);
/// assert_eq!(&rgb[0..3], &[0.0, 0.0, 0.0]);
/// assert_eq!(&rgb[3..6], &[1.0, 0.0, 0.0]);
/// assert_eq!(&rgb[6..9], &[0.0, 0.0, 1.0]);
/// ```
pub fn label_to_rgb(
    labels: &[u32],
    width: usize,
    height: usize,
    image: Option<&[f64]>,
    bg_label: u32,
) -> Result<Vec<f64>, CzarrError> {
    if labels.len() != width * height {
        return Err(CzarrError::BufferSizeError);
    }

    if let Some(image) = image {
        if image.len() != labels.len() {
            return Err(CzarrError::ShapeError(format!(
                "Overlay image has {} pixels but the label image has {}.",
                image.len(),
                labels.len()
            )));
        }
    }

    let mut palette: BTreeMap<u32, [f64; 3]> = BTreeMap::new();
    for &label in labels {
        if label != bg_label {
            palette.entry(label).or_insert([0.0; 3]);
        }
    }

    for (i, color) in palette.values_mut().enumerate() {
        let [r, g, b] = LABEL_COLORS[i % LABEL_COLORS.len()];
        *color = [r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0];
    }

    let alpha = if image.is_some() {
        LABEL_OVERLAY_ALPHA
    } else {
        1.0
    };

    let mut rgb = Vec::with_capacity(labels.len() * 3);
    for (i, label) in labels.iter().enumerate() {
        let color = palette.get(label).copied().unwrap_or([0.0; 3]);
        let gray = image.map(|im| im[i]).unwrap_or(0.0);

        rgb.extend(color.iter().map(|c| c * alpha + gray * (1.0 - alpha)));
    }

    Ok(rgb)
}
