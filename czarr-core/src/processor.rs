// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use crate::constant;
use crate::cv::{
    Connectivity, Footprint, black_tophat, clear_border, gaussian_filter, label_components,
    label_to_rgb, median_filter, remove_small_holes, remove_small_objects, threshold_otsu,
    threshold_triangle, white_tophat,
};
use crate::error::CzarrError;
use crate::im::{PixelArray, PixelBuffer};
use crate::mp::{parse_properties, region_table, regionprops};

/// Parameters of `ArrayProcessor::label_objects`
///
/// Sizes are signed so that negative values coming from configuration files
/// are reported as value errors instead of failing to parse.
///
/// # Examples
///
/// ```
/// use czarr_core::LabelParams;
///
/// let params = LabelParams {
///     min_size: 1,
///     fill_holes: false,
///     ..Default::default()
/// };
///
/// assert_eq!(params.max_holesize, 1);
/// assert!(params.label_rgb);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabelParams {
    pub min_size: i64,
    pub max_size: i64,
    /// Accepted and type checked, holes up to `max_holesize` are always filled
    pub fill_holes: bool,
    pub max_holesize: i64,
    pub label_rgb: bool,
    pub bg_label: i64,
    pub measure_params: bool,
    pub measure_properties: Vec<String>,
}

impl Default for LabelParams {
    fn default() -> Self {
        LabelParams {
            min_size: constant::DEFAULT_MIN_SIZE,
            max_size: constant::DEFAULT_MAX_SIZE,
            fill_holes: true,
            max_holesize: constant::DEFAULT_MAX_HOLESIZE,
            label_rgb: true,
            bg_label: 0,
            measure_params: false,
            measure_properties: constant::DEFAULT_MEASURE_PROPERTIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Output of `ArrayProcessor::label_objects`
#[derive(Debug, Clone)]
pub struct LabeledObjects {
    /// RGB overlay `(height, width, 3)` if requested, otherwise the label image
    pub image: PixelArray,
    /// The `u32` label image, background 0
    pub labels: PixelArray,
    /// Number of labelled objects before the measurement size filter
    pub count: usize,
    /// Per-object measurements if requested
    pub table: Option<DataFrame>,
}

/// Integer pixels are compared exactly, floating point ones as `f64`
fn at_least(array: &PixelArray, value: i64) -> Vec<bool> {
    fn exact<T: crate::im::Pixel + Into<i128>>(buffer: &PixelBuffer<T>, value: i64) -> Vec<bool> {
        let value = i128::from(value);
        buffer.iter().map(|&v| v.into() >= value).collect()
    }

    match array {
        PixelArray::Bool(buffer) => exact(buffer, value),
        PixelArray::U8(buffer) => exact(buffer, value),
        PixelArray::U16(buffer) => exact(buffer, value),
        PixelArray::U32(buffer) => exact(buffer, value),
        PixelArray::I32(buffer) => exact(buffer, value),
        PixelArray::I64(buffer) => exact(buffer, value),
        PixelArray::F32(_) | PixelArray::F64(_) => {
            let threshold = value as f64;
            array.to_f64().iter().map(|&v| v >= threshold).collect()
        }
    }
}

fn check_non_negative(name: &str, value: i64) -> Result<usize, CzarrError> {
    usize::try_from(value).map_err(|_| {
        CzarrError::ValueError(format!(
            "{} must be a non-negative integer, got {}.",
            name, value
        ))
    })
}

fn check_at_least(name: &str, value: i64, minimum: i64) -> Result<usize, CzarrError> {
    if value < minimum {
        return Err(CzarrError::ValueError(format!(
            "{} must be an integer >= {}, got {}.",
            name, minimum, value
        )));
    }

    check_non_negative(name, value)
}

/// Processes a single two-dimensional array into filtered, thresholded and
/// labelled outputs
///
/// The processor owns exactly one 2-D array. Filters and automatic thresholds
/// return new arrays, while `apply_threshold` and `label_objects` replace the
/// stored array.
///
/// # Examples
///
/// ```
/// use czarr_core::{ArrayProcessor, LabelParams};
/// use czarr_core::im::{PixelArray, PixelBuffer};
///
/// let mut values = vec![0u8; 100];
/// for r in 3..7 {
///     for c in 3..7 {
///         values[r * 10 + c] = 200;
///     }
/// }
///
/// let array = PixelArray::from(PixelBuffer::new(&[10, 10], values).unwrap());
/// let mut processor = ArrayProcessor::new(array).unwrap();
///
/// processor.apply_threshold(100, false).unwrap();
/// let objects = processor.label_objects(&LabelParams::default(), None).unwrap();
///
/// assert_eq!(objects.count, 1);
/// assert_eq!(objects.image.shape(), vec![10, 10, 3]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayProcessor {
    array: PixelArray,
}

impl ArrayProcessor {
    /// Take ownership of a 2-D array
    ///
    /// # Arguments
    ///
    /// * `array` - A two-dimensional array of any supported dtype
    pub fn new(array: PixelArray) -> Result<Self, CzarrError> {
        if array.ndim() != 2 {
            return Err(CzarrError::TypeError("Input should be a 2D array"));
        }

        Ok(ArrayProcessor { array })
    }

    /// The currently stored array
    pub fn array(&self) -> &PixelArray {
        &self.array
    }

    pub fn into_array(self) -> PixelArray {
        self.array
    }

    fn integer_valued(&self) -> bool {
        !self.array.dtype().is_float()
    }

    fn mask_array(&self, mask: Vec<bool>) -> Result<PixelArray, CzarrError> {
        Ok(PixelArray::from(PixelBuffer::new(&self.array.shape(), mask)?))
    }

    /// Gaussian smoothing with edge replication, cast back to the input dtype
    ///
    /// # Arguments
    ///
    /// * `sigma` - Standard deviation of the kernel, an integer greater than 1
    pub fn apply_gaussian_filter(&self, sigma: i64) -> Result<PixelArray, CzarrError> {
        if sigma <= 1 {
            return Err(CzarrError::ValueError(format!(
                "Sigma must be an integer greater than 1, got {}.",
                sigma
            )));
        }

        let smoothed = gaussian_filter(
            &self.array.to_f64(),
            self.array.width(),
            self.array.height(),
            sigma as f64,
        );

        self.array.with_f64(&smoothed)
    }

    /// Median over a disk of radius `filter_size`, cast back to the input dtype
    ///
    /// # Arguments
    ///
    /// * `filter_size` - Radius of the disk footprint, a non-negative integer
    pub fn apply_median_filter(&self, filter_size: i64) -> Result<PixelArray, CzarrError> {
        let radius = check_non_negative("Filter size", filter_size)?;

        let filtered = median_filter(
            &self.array.to_f64(),
            self.array.width(),
            self.array.height(),
            &Footprint::disk(radius),
        );

        self.array.with_f64(&filtered)
    }

    /// Boolean mask of pixels at or above the triangle threshold
    pub fn apply_triangle_threshold(&self) -> Result<PixelArray, CzarrError> {
        let values = self.array.to_f64();
        let threshold = threshold_triangle(&values, self.integer_valued())?;

        self.mask_array(values.iter().map(|&v| v >= threshold).collect())
    }

    /// Boolean mask of pixels at or above the Otsu threshold
    pub fn apply_otsu_threshold(&self) -> Result<PixelArray, CzarrError> {
        let values = self.array.to_f64();
        let threshold = threshold_otsu(&values, self.integer_valued())?;

        self.mask_array(values.iter().map(|&v| v >= threshold).collect())
    }

    /// Replace the stored array with the mask of pixels `>= value`
    ///
    /// # Arguments
    ///
    /// * `value` - Threshold, a non-negative integer
    /// * `invert_result` - Invert the mask after thresholding
    pub fn apply_threshold(
        &mut self,
        value: i64,
        invert_result: bool,
    ) -> Result<&PixelArray, CzarrError> {
        if value < 0 {
            return Err(CzarrError::ValueError(format!(
                "Threshold value must be a non-negative integer, got {}.",
                value
            )));
        }

        let mask = at_least(&self.array, value)
            .into_iter()
            .map(|m| m != invert_result)
            .collect();

        self.array = self.mask_array(mask)?;
        Ok(&self.array)
    }

    /// Clean, label and optionally measure the objects of the stored array
    ///
    /// The stored array is treated as a mask (non-zero is foreground). Holes
    /// are filled and small objects removed with 4-connectivity, then objects
    /// touching the border are cleared and the rest labelled with
    /// 8-connectivity. The stored array is replaced by the `u32` label image.
    ///
    /// # Arguments
    ///
    /// * `params` - Label and measurement parameters
    /// * `orig_image` - Optional 2-D intensity image used for intensity
    ///   measurements and as the background of the RGB overlay
    pub fn label_objects(
        &mut self,
        params: &LabelParams,
        orig_image: Option<&PixelArray>,
    ) -> Result<LabeledObjects, CzarrError> {
        let min_size = check_at_least("min_size", params.min_size, 1)?;
        let max_holesize = check_at_least("max_holesize", params.max_holesize, 1)?;
        let max_size = check_non_negative("max_size", params.max_size)?;
        let bg_label = u32::try_from(params.bg_label).map_err(|_| {
            CzarrError::ValueError(format!(
                "bg_label must be a non-negative 32-bit integer, got {}.",
                params.bg_label
            ))
        })?;

        let properties = if params.measure_params {
            let properties = parse_properties(&params.measure_properties)?;
            if orig_image.is_none() {
                if let Some((name, _)) = properties.iter().find(|(_, p)| p.requires_intensity()) {
                    return Err(CzarrError::ValueError(format!(
                        "Property '{}' requires an intensity image.",
                        name
                    )));
                }
            }
            properties
        } else {
            Vec::new()
        };

        if let Some(image) = orig_image {
            if image.shape() != self.array.shape() {
                return Err(CzarrError::ValueError(format!(
                    "Intensity image shape {:?} does not match array shape {:?}.",
                    image.shape(),
                    self.array.shape()
                )));
            }
        }

        let (width, height) = (self.array.width(), self.array.height());
        let mut mask = self.array.to_bool();

        remove_small_holes(width, height, &mut mask, max_holesize, Connectivity::Four);

        remove_small_objects(width, height, &mut mask, min_size, Connectivity::Four);
        clear_border(width, height, &mut mask, bg_label != 0);

        let foreground: Vec<bool> = mask.iter().map(|&m| m as u32 != bg_label).collect();
        let (labels, count) = label_components(width, height, &foreground, Connectivity::Eight);

        let table = if params.measure_params {
            let intensity = orig_image.map(|image| image.to_f64());
            let mut regions = regionprops(&labels, width, intensity.as_deref(), 0);
            regions.retain(|r| r.area() >= min_size && r.area() <= max_size);

            Some(region_table(&regions, &properties)?)
        } else {
            None
        };

        let image = if params.label_rgb {
            let overlay = orig_image.map(|image| image.to_unit_f64());
            let rgb = label_to_rgb(&labels, width, height, overlay.as_deref(), bg_label)?;

            Some(PixelArray::from(PixelBuffer::new(&[height, width, 3], rgb)?))
        } else {
            None
        };

        self.array = PixelArray::from(PixelBuffer::new(&[height, width], labels)?);

        Ok(LabeledObjects {
            image: image.unwrap_or_else(|| self.array.clone()),
            labels: self.array.clone(),
            count,
            table,
        })
    }
}

/// Remove a smooth background with a morphological top-hat
///
/// A white top-hat (image minus opening) keeps bright objects on a dark
/// background. With `light_bg` a black top-hat (closing minus image) keeps
/// dark objects on a light background. The output keeps the input's shape
/// and dtype.
///
/// # Arguments
///
/// * `image` - A 2-D image for `disk` or a 3-D volume for `ball`
/// * `elem` - Structuring element, `disk` or `ball`
/// * `radius` - Radius of the structuring element, a positive integer
/// * `light_bg` - True if the background is lighter than the objects
///
/// # Examples
///
/// ```
/// use czarr_core::subtract_background;
/// use czarr_core::im::{PixelArray, PixelBuffer};
///
/// let mut values = vec![50u8; 81];
/// values[40] = 80;
///
/// let image = PixelArray::from(PixelBuffer::new(&[9, 9], values).unwrap());
/// let subtracted = subtract_background(&image, "disk", 2, false).unwrap();
///
/// assert_eq!(subtracted.to_f64()[40], 30.0);
/// assert_eq!(subtracted.to_f64()[0], 0.0);
///
/// assert!(subtract_background(&image, "cube", 2, false).is_err());
/// ```
pub fn subtract_background(
    image: &PixelArray,
    elem: &str,
    radius: i64,
    light_bg: bool,
) -> Result<PixelArray, CzarrError> {
    let radius = check_at_least("Radius", radius, 1)?;

    let footprint = match elem {
        "disk" => Footprint::disk(radius),
        "ball" => Footprint::ball(radius),
        _ => {
            return Err(CzarrError::ValueError(format!(
                "Structuring element must be 'disk' or 'ball', got '{}'.",
                elem
            )));
        }
    };

    let values = image.to_f64();
    let shape = image.shape();

    let subtracted = if light_bg {
        black_tophat(&values, &shape, &footprint)?
    } else {
        white_tophat(&values, &shape, &footprint)?
    };

    image.with_f64(&subtracted)
}
