// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use rayon::prelude::*;

use crate::constant::GAUSSIAN_TRUNCATE;
use crate::cv::morphology::Footprint;

/// Normalized 1-D Gaussian kernel truncated at `GAUSSIAN_TRUNCATE` sigma
///
/// # Arguments
///
/// * `sigma` - Standard deviation of the kernel
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (GAUSSIAN_TRUNCATE * sigma + 0.5) as isize;
    let denom = 2.0 * sigma * sigma;

    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|x| (-((x * x) as f64) / denom).exp())
        .collect();

    let total: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= total);
    kernel
}

#[inline]
fn clamp_index(index: isize, len: usize) -> usize {
    index.clamp(0, len as isize - 1) as usize
}

/// Gaussian smoothing of a 2-D image with edge replication
///
/// The filter is applied separably, first along columns then along rows.
/// Pixels outside the image take the value of the nearest edge pixel.
///
/// # Arguments
///
/// * `values` - Row-major image values
/// * `width` - Width of image
/// * `height` - Height of image
/// * `sigma` - Standard deviation of the Gaussian kernel
///
/// # Examples
///
/// ```
/// use czarr_core::cv::gaussian_filter;
///
/// let values = vec![7.0; 16];
/// let smoothed = gaussian_filter(&values, 4, 4, 2.0);
///
/// assert!(smoothed.iter().all(|v| (v - 7.0).abs() < 1e-9));
/// ```
pub fn gaussian_filter(values: &[f64], width: usize, height: usize, sigma: f64) -> Vec<f64> {
    if values.is_empty() || width == 0 || height == 0 {
        return values.to_vec();
    }

    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;

    // Vertical pass
    let mut vertical = vec![0.0; values.len()];
    vertical
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (k, weight) in kernel.iter().enumerate() {
                let sy = clamp_index(y as isize + k as isize - radius, height);
                let source = &values[sy * width..(sy + 1) * width];
                for (out, value) in row.iter_mut().zip(source) {
                    *out += weight * value;
                }
            }
        });

    // Horizontal pass
    let mut output = vec![0.0; values.len()];
    output
        .par_chunks_mut(width)
        .zip(vertical.par_chunks(width))
        .for_each(|(row, source)| {
            for (x, out) in row.iter_mut().enumerate() {
                *out = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, weight)| {
                        weight * source[clamp_index(x as isize + k as isize - radius, width)]
                    })
                    .sum();
            }
        });

    output
}

/// Median filter of a 2-D image over a flat footprint with edge replication
///
/// For a footprint with `n` offsets the output is element `n / 2` of the
/// sorted neighbourhood.
///
/// # Arguments
///
/// * `values` - Row-major image values
/// * `width` - Width of image
/// * `height` - Height of image
/// * `footprint` - A 2-D structuring element (e.g. `Footprint::disk`)
///
/// # Examples
///
/// ```
/// use czarr_core::cv::{Footprint, median_filter};
///
/// let mut values = vec![1.0; 25];
/// values[12] = 100.0;
///
/// let filtered = median_filter(&values, 5, 5, &Footprint::disk(1));
/// assert_eq!(filtered[12], 1.0);
/// ```
pub fn median_filter(values: &[f64], width: usize, height: usize, footprint: &Footprint) -> Vec<f64> {
    if values.is_empty() || width == 0 || height == 0 {
        return values.to_vec();
    }

    let offsets = footprint.offsets_2d();
    let rank = offsets.len() / 2;

    let mut output = vec![0.0; values.len()];
    output
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let mut neighbourhood = Vec::with_capacity(offsets.len());
            for (x, out) in row.iter_mut().enumerate() {
                neighbourhood.clear();
                neighbourhood.extend(offsets.iter().map(|&(dy, dx)| {
                    let sy = clamp_index(y as isize + dy, height);
                    let sx = clamp_index(x as isize + dx, width);
                    values[sy * width + sx]
                }));

                let (_, median, _) =
                    neighbourhood.select_nth_unstable_by(rank, |a, b| a.total_cmp(b));
                *out = *median;
            }
        });

    output
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_gaussian_kernel() {
        let kernel = gaussian_kernel(2.0);

        assert_eq!(kernel.len(), 17);
        assert!((kernel.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(kernel[8] > kernel[7]);
        assert_eq!(kernel[0], kernel[16]);
    }

    #[test]
    fn test_gaussian_spreads_impulse() {
        let mut values = vec![0.0; 121];
        values[60] = 100.0;

        let smoothed = gaussian_filter(&values, 11, 11, 2.0);
        let total: f64 = smoothed.iter().sum();

        assert!(smoothed[60] < 100.0);
        assert!(smoothed[61] > 0.0);
        assert!((smoothed[59] - smoothed[61]).abs() < 1e-12);
        assert!((smoothed[49] - smoothed[71]).abs() < 1e-12);
        assert!(total > 95.0 && total <= 100.0 + 1e-9);
    }

    #[test]
    fn test_gaussian_non_square() {
        let values: Vec<f64> = (0..12).map(|v| v as f64).collect();
        let smoothed = gaussian_filter(&values, 4, 3, 2.0);

        assert_eq!(smoothed.len(), 12);
        assert!(smoothed[0] < smoothed[11]);
    }

    #[test]
    fn test_median_removes_salt() {
        let mut values = vec![5.0; 49];
        values[10] = 255.0;
        values[30] = 0.0;

        let filtered = median_filter(&values, 7, 7, &Footprint::disk(2));
        assert!(filtered.iter().all(|&v| v == 5.0));
    }

    #[test]
    fn test_median_radius_zero_is_identity() {
        let values: Vec<f64> = (0..20).map(|v| (v * 7 % 11) as f64).collect();
        let filtered = median_filter(&values, 5, 4, &Footprint::disk(0));

        assert_eq!(filtered, values);
    }

    #[test]
    fn test_median_edge_replication() {
        #[rustfmt::skip]
        let values = vec![
            9.0, 9.0, 0.0,
            9.0, 0.0, 0.0,
            0.0, 0.0, 0.0,
        ];

        // Every offset around the top-left corner lands on a 9
        let filtered = median_filter(&values, 3, 3, &Footprint::disk(1));
        assert_eq!(filtered[0], 9.0);
        assert_eq!(filtered[8], 0.0);
    }
}
