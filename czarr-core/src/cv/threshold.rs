// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use crate::constant::{HISTOGRAM_BINS, INTEGER_HISTOGRAM_MAX_BINS};
use crate::error::CzarrError;

/// Pixel counts and the value at the centre of each bin
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub counts: Vec<f64>,
    pub centers: Vec<f64>,
}

impl Histogram {
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// One bin per integer value between the image minimum and maximum
fn integer_histogram(values: &[f64], min: f64, max: f64) -> Histogram {
    let nbins = (max - min) as usize + 1;
    let mut counts = vec![0.0; nbins];

    for &v in values {
        counts[(v - min) as usize] += 1.0;
    }

    let centers = (0..nbins).map(|i| min + i as f64).collect();
    Histogram { counts, centers }
}

/// `nbins` equal-width bins spanning the image minimum and maximum
fn float_histogram(values: &[f64], min: f64, max: f64, nbins: usize) -> Histogram {
    let (first, last) = if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };

    let step = (last - first) / nbins as f64;
    let edges: Vec<f64> = (0..=nbins)
        .map(|i| {
            if i == nbins {
                last
            } else {
                first + i as f64 * step
            }
        })
        .collect();

    let norm = nbins as f64 / (last - first);
    let mut counts = vec![0.0; nbins];

    for &v in values {
        let mut index = (((v - first) * norm) as usize).min(nbins - 1);

        // Rounding can land a value one bin off its edges
        if index > 0 && v < edges[index] {
            index -= 1;
        } else if index + 1 < nbins && v >= edges[index + 1] {
            index += 1;
        }

        counts[index] += 1.0;
    }

    let centers = edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
    Histogram { counts, centers }
}

/// Histogram used by the global threshold methods
///
/// Integer images get one bin per value from the minimum to the maximum
/// (falling back to float binning for very wide ranges). Float images get
/// `HISTOGRAM_BINS` equal-width bins over their range.
///
/// # Arguments
///
/// * `values` - Pixel values
/// * `integer` - True if the values come from an integer or boolean image
///
/// # Examples
///
/// ```
/// use czarr_core::cv::histogram;
///
/// let hist = histogram(&[2.0, 3.0, 3.0, 5.0], true).unwrap();
///
/// assert_eq!(hist.counts, vec![1.0, 2.0, 0.0, 1.0]);
/// assert_eq!(hist.centers, vec![2.0, 3.0, 4.0, 5.0]);
/// ```
pub fn histogram(values: &[f64], integer: bool) -> Result<Histogram, CzarrError> {
    if values.is_empty() {
        return Err(CzarrError::ThresholdError(
            "Cannot compute a histogram of an empty image.",
        ));
    }

    let (min, max) = min_max(values);
    if !min.is_finite() || !max.is_finite() {
        return Err(CzarrError::ThresholdError(
            "Image contains non-finite values.",
        ));
    }

    if integer && (max - min) < INTEGER_HISTOGRAM_MAX_BINS as f64 {
        Ok(integer_histogram(values, min, max))
    } else {
        Ok(float_histogram(values, min, max, HISTOGRAM_BINS))
    }
}

/// Otsu's threshold maximizing the between-class variance
///
/// A constant image returns its single value.
///
/// # Arguments
///
/// * `values` - Pixel values
/// * `integer` - True if the values come from an integer or boolean image
///
/// # Examples
///
/// ```
/// use czarr_core::cv::threshold_otsu;
///
/// let values = [10.0, 10.0, 11.0, 200.0, 201.0, 201.0];
/// let threshold = threshold_otsu(&values, true).unwrap();
///
/// assert!(threshold >= 11.0 && threshold < 200.0);
/// ```
pub fn threshold_otsu(values: &[f64], integer: bool) -> Result<f64, CzarrError> {
    let first = *values.first().ok_or(CzarrError::ThresholdError(
        "Cannot threshold an empty image.",
    ))?;

    if values.iter().all(|&v| v == first) {
        return Ok(first);
    }

    let hist = histogram(values, integer)?;
    let n = hist.len();

    let mut weight1 = Vec::with_capacity(n);
    let mut mean1 = Vec::with_capacity(n);
    let (mut count, mut moment) = (0.0, 0.0);
    for (c, x) in hist.counts.iter().zip(&hist.centers) {
        count += c;
        moment += c * x;
        weight1.push(count);
        mean1.push(moment / count);
    }

    let mut weight2 = vec![0.0; n];
    let mut mean2 = vec![0.0; n];
    let (mut count, mut moment) = (0.0, 0.0);
    for i in (0..n).rev() {
        count += hist.counts[i];
        moment += hist.counts[i] * hist.centers[i];
        weight2[i] = count;
        mean2[i] = moment / count;
    }

    let mut best = 0;
    let mut best_variance = f64::NEG_INFINITY;
    for i in 0..n - 1 {
        let variance = weight1[i] * weight2[i + 1] * (mean1[i] - mean2[i + 1]).powi(2);
        if variance > best_variance {
            best_variance = variance;
            best = i;
        }
    }

    Ok(hist.centers[best])
}

/// Triangle threshold from the line joining the histogram peak and tail
///
/// The histogram is flipped when the tail below the peak is the shorter one.
/// A constant image returns its single value.
///
/// # Arguments
///
/// * `values` - Pixel values
/// * `integer` - True if the values come from an integer or boolean image
///
/// # Examples
///
/// ```
/// use czarr_core::cv::threshold_triangle;
///
/// let mut values = vec![0.0; 100];
/// values.extend((1..40).map(|v| v as f64));
///
/// let threshold = threshold_triangle(&values, true).unwrap();
/// assert!(threshold > 0.0 && threshold < 39.0);
/// ```
pub fn threshold_triangle(values: &[f64], integer: bool) -> Result<f64, CzarrError> {
    let hist = histogram(values, integer)?;
    let nbins = hist.len();

    let mut arg_peak = 0;
    for (i, &c) in hist.counts.iter().enumerate() {
        if c > hist.counts[arg_peak] {
            arg_peak = i;
        }
    }
    let peak_height = hist.counts[arg_peak];

    let populated = |c: &f64| *c > 0.0;
    let arg_low = hist.counts.iter().position(populated).unwrap_or(0);
    let arg_high = hist.counts.iter().rposition(populated).unwrap_or(0);

    if arg_low == arg_high {
        return Ok(values[0]);
    }

    let flip = arg_peak - arg_low < arg_high - arg_peak;
    let counts: Vec<f64> = if flip {
        hist.counts.iter().rev().copied().collect()
    } else {
        hist.counts.clone()
    };

    let (arg_low, arg_peak) = if flip {
        (nbins - arg_high - 1, nbins - arg_peak - 1)
    } else {
        (arg_low, arg_peak)
    };

    let width = arg_peak - arg_low;
    if width == 0 {
        return Err(CzarrError::ThresholdError(
            "Histogram peak coincides with its tail.",
        ));
    }

    let norm = (peak_height * peak_height + (width * width) as f64).sqrt();
    let height = peak_height / norm;
    let run = width as f64 / norm;

    let mut best = 0;
    let mut best_length = f64::NEG_INFINITY;
    for x in 0..width {
        let length = height * x as f64 - run * counts[x + arg_low];
        if length > best_length {
            best_length = length;
            best = x;
        }
    }

    let mut arg_level = best + arg_low;
    if flip {
        arg_level = nbins - arg_level - 1;
    }

    Ok(hist.centers[arg_level])
}

#[cfg(test)]
mod test {

    use super::*;

    fn bimodal() -> Vec<f64> {
        let mut values = Vec::new();
        for v in 0..20 {
            values.extend(std::iter::repeat_n(10.0 + (v % 5) as f64, 10));
            values.extend(std::iter::repeat_n(100.0 + (v % 5) as f64, 10));
        }
        values
    }

    #[test]
    fn test_histogram_float_bins() {
        let values: Vec<f64> = (0..=255).map(|v| v as f64 / 255.0).collect();
        let hist = histogram(&values, false).unwrap();

        assert_eq!(hist.len(), 256);
        assert!(hist.counts.iter().all(|&c| c == 1.0));
        assert!((hist.centers[0] - 0.5 / 256.0).abs() < 1e-12);
    }

    #[test]
    fn test_histogram_constant_float() {
        let hist = histogram(&[0.25; 10], false).unwrap();

        assert_eq!(hist.len(), 256);
        assert_eq!(hist.counts.iter().sum::<f64>(), 10.0);
    }

    #[test]
    fn test_histogram_empty() {
        assert!(matches!(
            histogram(&[], true),
            Err(CzarrError::ThresholdError(_))
        ));
    }

    #[test]
    fn test_otsu_separates_modes() {
        let values = bimodal();

        let threshold = threshold_otsu(&values, true).unwrap();
        assert!((14.0..100.0).contains(&threshold));

        let threshold = threshold_otsu(&values, false).unwrap();
        assert!(threshold > 13.0 && threshold < 100.0);
    }

    #[test]
    fn test_otsu_constant() {
        assert_eq!(threshold_otsu(&[42.0; 9], true).unwrap(), 42.0);
        assert!(threshold_otsu(&[], true).is_err());
    }

    #[test]
    fn test_otsu_binary() {
        let values = [0.0, 0.0, 1.0, 1.0, 1.0];
        assert_eq!(threshold_otsu(&values, true).unwrap(), 0.0);
    }

    #[test]
    fn test_triangle_long_right_tail() {
        let mut values = vec![5.0; 200];
        for v in 6..60 {
            values.push(v as f64);
        }

        let threshold = threshold_triangle(&values, true).unwrap();
        assert!(threshold > 5.0 && threshold < 60.0);
    }

    #[test]
    fn test_triangle_flips_for_long_left_tail() {
        let mut values = vec![250.0; 200];
        for v in 190..250 {
            values.push(v as f64);
        }

        let threshold = threshold_triangle(&values, true).unwrap();
        assert!(threshold > 190.0 && threshold < 250.0);
    }

    #[test]
    fn test_triangle_constant() {
        assert_eq!(threshold_triangle(&[3.0; 4], true).unwrap(), 3.0);
        assert!(threshold_triangle(&[], false).is_err());
    }
}
