// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::collections::VecDeque;

use rayon::prelude::*;

use crate::cv::connected::{Connectivity, component_sizes, label_components};
use crate::error::CzarrError;

/// Remove connected components with fewer than `min_size` pixels
///
/// # Arguments
///
/// * `width` - Width of mask
/// * `height` - Height of mask
/// * `mask` - A row-major foreground mask, modified in place
/// * `min_size` - Components smaller than this are set to background
/// * `connectivity` - Connectivity used to group pixels
///
/// # Examples
///
/// ```
/// use czarr_core::cv::{Connectivity, remove_small_objects};
///
/// // A two pixel object at the top left and a lone pixel at the bottom right
/// let mut mask = vec![true, true, false, false, false, true];
/// remove_small_objects(3, 2, &mut mask, 2, Connectivity::Four);
///
/// assert_eq!(mask, [true, true, false, false, false, false]);
/// ```
pub fn remove_small_objects(
    width: usize,
    height: usize,
    mask: &mut [bool],
    min_size: usize,
    connectivity: Connectivity,
) {
    let (labels, count) = label_components(width, height, mask, connectivity);
    let sizes = component_sizes(&labels, count);

    for (pixel, &label) in mask.iter_mut().zip(labels.iter()) {
        if label != 0 && sizes[label as usize] < min_size {
            *pixel = false;
        }
    }
}

/// Fill background components with at most `max_holesize` pixels
///
/// Any background component is a hole candidate, including background that
/// touches the image border.
///
/// # Arguments
///
/// * `width` - Width of mask
/// * `height` - Height of mask
/// * `mask` - A row-major foreground mask, modified in place
/// * `max_holesize` - Largest hole area that is filled
/// * `connectivity` - Connectivity used to group background pixels
///
/// # Examples
///
/// ```
/// use czarr_core::cv::{Connectivity, remove_small_holes};
///
/// let mut mask = vec![true; 9];
/// mask[4] = false;
///
/// remove_small_holes(3, 3, &mut mask, 1, Connectivity::Four);
/// assert!(mask.iter().all(|&m| m));
/// ```
pub fn remove_small_holes(
    width: usize,
    height: usize,
    mask: &mut [bool],
    max_holesize: usize,
    connectivity: Connectivity,
) {
    let inverted: Vec<bool> = mask.iter().map(|&m| !m).collect();
    let (labels, count) = label_components(width, height, &inverted, connectivity);
    let sizes = component_sizes(&labels, count);

    for (pixel, &label) in mask.iter_mut().zip(labels.iter()) {
        if label != 0 && sizes[label as usize] <= max_holesize {
            *pixel = true;
        }
    }
}

/// Set every 8-connected component touching the image border to `bgval`
///
/// # Arguments
///
/// * `width` - Width of mask
/// * `height` - Height of mask
/// * `mask` - A row-major foreground mask, modified in place
/// * `bgval` - Value assigned to pixels of border components
///
/// # Examples
///
/// ```
/// use czarr_core::cv::clear_border;
///
/// let mut mask = vec![false; 25];
/// mask[0] = true;
/// mask[12] = true;
///
/// clear_border(5, 5, &mut mask, false);
///
/// assert!(!mask[0]);
/// assert!(mask[12]);
/// ```
pub fn clear_border(width: usize, height: usize, mask: &mut [bool], bgval: bool) {
    if width == 0 || height == 0 {
        return;
    }

    let (labels, count) = label_components(width, height, mask, Connectivity::Eight);
    let mut touches_border = vec![false; count + 1];

    for x in 0..width {
        touches_border[labels[x] as usize] = true;
        touches_border[labels[(height - 1) * width + x] as usize] = true;
    }

    for y in 0..height {
        touches_border[labels[y * width] as usize] = true;
        touches_border[labels[y * width + width - 1] as usize] = true;
    }

    for (pixel, &label) in mask.iter_mut().zip(labels.iter()) {
        if label != 0 && touches_border[label as usize] {
            *pixel = bgval;
        }
    }
}

/// Integer square root (floor)
fn isqrt(value: usize) -> usize {
    let mut root = (value as f64).sqrt() as usize;
    while root * root > value {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= value {
        root += 1;
    }
    root
}

/// A row of a flat structuring element
///
/// The row sits at `(dz, dy)` relative to the centre and covers the columns
/// `-half_width..=half_width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FootprintRow {
    pub dz: isize,
    pub dy: isize,
    pub half_width: usize,
}

/// A symmetric flat structuring element stored as horizontal runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footprint {
    ndim: usize,
    rows: Vec<FootprintRow>,
}

impl Footprint {
    /// A 2-D disk containing every offset with `dy^2 + dx^2 <= radius^2`
    ///
    /// # Examples
    ///
    /// ```
    /// use czarr_core::cv::Footprint;
    ///
    /// assert_eq!(Footprint::disk(1).size(), 5);
    /// assert_eq!(Footprint::disk(2).size(), 13);
    /// ```
    pub fn disk(radius: usize) -> Self {
        let r = radius as isize;
        let rows = (-r..=r)
            .map(|dy| FootprintRow {
                dz: 0,
                dy,
                half_width: isqrt(radius * radius - (dy * dy) as usize),
            })
            .collect();

        Footprint { ndim: 2, rows }
    }

    /// A 3-D ball containing every offset with `dz^2 + dy^2 + dx^2 <= radius^2`
    ///
    /// # Examples
    ///
    /// ```
    /// use czarr_core::cv::Footprint;
    ///
    /// assert_eq!(Footprint::ball(1).size(), 7);
    /// ```
    pub fn ball(radius: usize) -> Self {
        let r = radius as isize;
        let mut rows = Vec::new();

        for dz in -r..=r {
            for dy in -r..=r {
                let used = (dz * dz + dy * dy) as usize;
                if used <= radius * radius {
                    rows.push(FootprintRow {
                        dz,
                        dy,
                        half_width: isqrt(radius * radius - used),
                    });
                }
            }
        }

        Footprint { ndim: 3, rows }
    }

    /// Rank of the arrays this footprint applies to
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Horizontal runs making up the footprint
    pub fn rows(&self) -> &[FootprintRow] {
        &self.rows
    }

    /// Number of offsets in the footprint
    pub fn size(&self) -> usize {
        self.rows.iter().map(|row| 2 * row.half_width + 1).sum()
    }

    /// Every (dy, dx) offset of a 2-D footprint
    pub fn offsets_2d(&self) -> Vec<(isize, isize)> {
        self.rows
            .iter()
            .filter(|row| row.dz == 0)
            .flat_map(|row| {
                let hw = row.half_width as isize;
                (-hw..=hw).map(move |dx| (row.dy, dx))
            })
            .collect()
    }
}

/// Running minimum or maximum over a window of `2 * half_width + 1` pixels
///
/// Pixels outside the row are ignored. Results are combined into `out`.
fn sliding_extreme(row: &[f64], half_width: usize, take_max: bool, out: &mut [f64]) {
    let n = row.len();
    if n == 0 {
        return;
    }

    let dominates = |a: f64, b: f64| if take_max { a >= b } else { a <= b };

    let mut window: VecDeque<usize> = VecDeque::with_capacity(2 * half_width + 2);
    let mut next = 0;

    for x in 0..n {
        let hi = (x + half_width).min(n - 1);
        while next <= hi {
            while let Some(&back) = window.back() {
                if dominates(row[next], row[back]) {
                    window.pop_back();
                } else {
                    break;
                }
            }
            window.push_back(next);
            next += 1;
        }

        let lo = x.saturating_sub(half_width);
        while let Some(&front) = window.front() {
            if front < lo {
                window.pop_front();
            } else {
                break;
            }
        }

        if let Some(&front) = window.front() {
            let value = row[front];
            out[x] = if take_max {
                out[x].max(value)
            } else {
                out[x].min(value)
            };
        }
    }
}

/// Interpret a 2-D or 3-D shape as (depth, height, width)
fn volume_shape(shape: &[usize], footprint: &Footprint) -> Result<(usize, usize, usize), CzarrError> {
    if shape.len() != footprint.ndim() {
        return Err(CzarrError::ValueError(format!(
            "A {}-D structuring element cannot be applied to a {}-D image.",
            footprint.ndim(),
            shape.len()
        )));
    }

    match shape {
        [h, w] => Ok((1, *h, *w)),
        [d, h, w] => Ok((*d, *h, *w)),
        _ => Err(CzarrError::ValueError(
            "Morphological filters only support 2-D and 3-D images.".to_string(),
        )),
    }
}

fn rank_filter(
    values: &[f64],
    shape: &[usize],
    footprint: &Footprint,
    take_max: bool,
) -> Result<Vec<f64>, CzarrError> {
    let (depth, height, width) = volume_shape(shape, footprint)?;
    if values.len() != depth * height * width {
        return Err(CzarrError::BufferSizeError);
    }

    let init = if take_max {
        f64::NEG_INFINITY
    } else {
        f64::INFINITY
    };

    let mut output = vec![init; values.len()];
    if values.is_empty() {
        return Ok(output);
    }

    output
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(row_idx, out)| {
            let z = (row_idx / height) as isize;
            let y = (row_idx % height) as isize;

            for row in footprint.rows() {
                let sz = z + row.dz;
                let sy = y + row.dy;

                if sz < 0 || sy < 0 || sz >= depth as isize || sy >= height as isize {
                    continue;
                }

                let start = (sz as usize * height + sy as usize) * width;
                sliding_extreme(&values[start..start + width], row.half_width, take_max, out);
            }
        });

    Ok(output)
}

/// Flat grey-level erosion (local minimum over the footprint)
///
/// # Arguments
///
/// * `values` - Row-major image values
/// * `shape` - Image shape, (height, width) or (depth, height, width)
/// * `footprint` - Structuring element with the same rank as the image
pub fn erosion(values: &[f64], shape: &[usize], footprint: &Footprint) -> Result<Vec<f64>, CzarrError> {
    rank_filter(values, shape, footprint, false)
}

/// Flat grey-level dilation (local maximum over the footprint)
///
/// # Arguments
///
/// * `values` - Row-major image values
/// * `shape` - Image shape, (height, width) or (depth, height, width)
/// * `footprint` - Structuring element with the same rank as the image
pub fn dilation(values: &[f64], shape: &[usize], footprint: &Footprint) -> Result<Vec<f64>, CzarrError> {
    rank_filter(values, shape, footprint, true)
}

/// Erosion followed by dilation
pub fn opening(values: &[f64], shape: &[usize], footprint: &Footprint) -> Result<Vec<f64>, CzarrError> {
    dilation(&erosion(values, shape, footprint)?, shape, footprint)
}

/// Dilation followed by erosion
pub fn closing(values: &[f64], shape: &[usize], footprint: &Footprint) -> Result<Vec<f64>, CzarrError> {
    erosion(&dilation(values, shape, footprint)?, shape, footprint)
}

/// Image minus its opening: keeps bright features smaller than the footprint
///
/// # Examples
///
/// ```
/// use czarr_core::cv::{Footprint, white_tophat};
///
/// let mut values = vec![10.0; 49];
/// values[24] = 15.0;
///
/// let tophat = white_tophat(&values, &[7, 7], &Footprint::disk(1)).unwrap();
///
/// assert_eq!(tophat[24], 5.0);
/// assert_eq!(tophat[0], 0.0);
/// ```
pub fn white_tophat(
    values: &[f64],
    shape: &[usize],
    footprint: &Footprint,
) -> Result<Vec<f64>, CzarrError> {
    let opened = opening(values, shape, footprint)?;
    Ok(values.iter().zip(opened).map(|(v, o)| v - o).collect())
}

/// Closing minus the image: keeps dark features smaller than the footprint
pub fn black_tophat(
    values: &[f64],
    shape: &[usize],
    footprint: &Footprint,
) -> Result<Vec<f64>, CzarrError> {
    let closed = closing(values, shape, footprint)?;
    Ok(closed.iter().zip(values).map(|(c, v)| c - v).collect())
}
