// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constant;
use crate::error::CzarrError;
use crate::im::PixelArray;
use crate::mp::parse_properties;
use crate::processor::{ArrayProcessor, LabelParams, LabeledObjects, subtract_background};

/// Global threshold applied before labelling
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum ThresholdMethod {
    #[default]
    Otsu,
    Triangle,
    Value {
        value: i64,
        #[serde(default)]
        invert_result: bool,
    },
}

/// Top-hat background subtraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackgroundParams {
    pub elem: String,
    pub radius: i64,
    pub light_bg: bool,
}

impl Default for BackgroundParams {
    fn default() -> Self {
        BackgroundParams {
            elem: "disk".to_string(),
            radius: constant::DEFAULT_BACKGROUND_RADIUS,
            light_bg: false,
        }
    }
}

/// Steps run on every image, in order: median filter, Gaussian filter,
/// background subtraction, threshold and object labelling
///
/// # Examples
///
/// ```
/// use czarr_core::config::{PipelineConfig, ThresholdMethod};
///
/// let config = PipelineConfig::from_json(r#"{
///     "gaussian_sigma": 2,
///     "threshold": {"method": "value", "value": 30},
///     "label": {"min_size": 4, "measure_params": true}
/// }"#).unwrap();
///
/// assert_eq!(config.gaussian_sigma, Some(2));
/// assert_eq!(config.threshold, ThresholdMethod::Value { value: 30, invert_result: false });
/// assert_eq!(config.label.max_holesize, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Radius of the median filter disk
    pub median_filter: Option<i64>,
    /// Sigma of the Gaussian filter
    pub gaussian_sigma: Option<i64>,
    pub background: Option<BackgroundParams>,
    pub threshold: ThresholdMethod,
    /// Pass the unfiltered input as the intensity image of `label_objects`
    pub use_intensity: bool,
    pub label: LabelParams,
}

impl PipelineConfig {
    /// Parse and validate a configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, CzarrError> {
        let config: PipelineConfig = serde_json::from_str(json)
            .map_err(|e| CzarrError::ValueError(format!("Invalid pipeline configuration. {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    ///
    /// ```no_run
    /// use czarr_core::PipelineConfig;
    ///
    /// let config = PipelineConfig::open("pipeline.json").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CzarrError> {
        let json = std::fs::read_to_string(&path)
            .map_err(|_| CzarrError::NoFileError(path.as_ref().display().to_string()))?;

        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, CzarrError> {
        serde_json::to_string_pretty(self).map_err(|e| CzarrError::OtherError(e.to_string()))
    }

    /// Check every parameter that can be checked without an image
    pub fn validate(&self) -> Result<(), CzarrError> {
        let invalid = |message: String| Err(CzarrError::ValueError(message));

        if let Some(radius) = self.median_filter {
            if radius < 0 {
                return invalid(format!("median_filter must be non-negative, got {}.", radius));
            }
        }

        if let Some(sigma) = self.gaussian_sigma {
            if sigma <= 1 {
                return invalid(format!("gaussian_sigma must be greater than 1, got {}.", sigma));
            }
        }

        if let Some(background) = &self.background {
            if background.elem != "disk" {
                return invalid(format!(
                    "Background element must be 'disk' for 2-D images, got '{}'.",
                    background.elem
                ));
            }

            if background.radius < 1 {
                return invalid(format!(
                    "Background radius must be positive, got {}.",
                    background.radius
                ));
            }
        }

        if let ThresholdMethod::Value { value, .. } = self.threshold {
            if value < 0 {
                return invalid(format!("Threshold value must be non-negative, got {}.", value));
            }
        }

        let label = &self.label;
        if label.min_size < 1 || label.max_holesize < 1 || label.max_size < 0 || label.bg_label < 0
        {
            return invalid("Label sizes must be positive and bg_label non-negative.".to_string());
        }

        if label.measure_params {
            let properties = parse_properties(&label.measure_properties)?;
            if !self.use_intensity {
                if let Some((name, _)) = properties.iter().find(|(_, p)| p.requires_intensity()) {
                    return invalid(format!(
                        "Property '{}' requires use_intensity to be enabled.",
                        name
                    ));
                }
            }
        }

        Ok(())
    }

    /// Run the configured steps on a 2-D array
    ///
    /// # Arguments
    ///
    /// * `array` - A two-dimensional image
    ///
    /// # Examples
    ///
    /// ```
    /// use czarr_core::config::{PipelineConfig, ThresholdMethod};
    /// use czarr_core::im::{PixelArray, PixelBuffer};
    ///
    /// let mut values = vec![5u8; 144];
    /// for r in 4..8 {
    ///     for c in 4..8 {
    ///         values[r * 12 + c] = 90;
    ///     }
    /// }
    ///
    /// let array = PixelArray::from(PixelBuffer::new(&[12, 12], values).unwrap());
    /// let config = PipelineConfig {
    ///     threshold: ThresholdMethod::Value { value: 50, invert_result: false },
    ///     ..Default::default()
    /// };
    ///
    /// let objects = config.run(array).unwrap();
    ///
    /// assert_eq!(objects.count, 1);
    /// ```
    pub fn run(&self, array: PixelArray) -> Result<LabeledObjects, CzarrError> {
        let original = if self.use_intensity {
            Some(array.clone())
        } else {
            None
        };

        let mut processor = ArrayProcessor::new(array)?;

        if let Some(radius) = self.median_filter {
            processor = ArrayProcessor::new(processor.apply_median_filter(radius)?)?;
        }

        if let Some(sigma) = self.gaussian_sigma {
            processor = ArrayProcessor::new(processor.apply_gaussian_filter(sigma)?)?;
        }

        if let Some(background) = &self.background {
            let subtracted = subtract_background(
                processor.array(),
                &background.elem,
                background.radius,
                background.light_bg,
            )?;
            processor = ArrayProcessor::new(subtracted)?;
        }

        match self.threshold {
            ThresholdMethod::Otsu => {
                processor = ArrayProcessor::new(processor.apply_otsu_threshold()?)?;
            }
            ThresholdMethod::Triangle => {
                processor = ArrayProcessor::new(processor.apply_triangle_threshold()?)?;
            }
            ThresholdMethod::Value {
                value,
                invert_result,
            } => {
                processor.apply_threshold(value, invert_result)?;
            }
        }

        processor.label_objects(&self.label, original.as_ref())
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::im::PixelBuffer;

    fn spots() -> PixelArray {
        let mut values = vec![10u16; 400];
        for (r0, c0) in [(3, 3), (3, 12), (12, 7)] {
            for r in r0..r0 + 4 {
                for c in c0..c0 + 4 {
                    values[r * 20 + c] = 500;
                }
            }
        }

        PixelArray::from(PixelBuffer::new(&[20, 20], values).unwrap())
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = PipelineConfig::from_json("{}").unwrap();

        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.threshold, ThresholdMethod::Otsu);
        assert_eq!(config.label.min_size, 10);
    }

    #[test]
    fn test_invert_result_must_be_bool() {
        let json = r#"{"threshold": {"method": "value", "value": 3, "invert_result": "yes"}}"#;

        assert!(matches!(
            PipelineConfig::from_json(json),
            Err(CzarrError::ValueError(_))
        ));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(PipelineConfig::from_json(r#"{"sigma": 2}"#).is_err());
        assert!(PipelineConfig::from_json(r#"{"label": {"minsize": 2}}"#).is_err());
    }

    #[test]
    fn test_validate_ranges() {
        assert!(PipelineConfig::from_json(r#"{"gaussian_sigma": 1}"#).is_err());
        assert!(PipelineConfig::from_json(r#"{"median_filter": -2}"#).is_err());
        assert!(PipelineConfig::from_json(r#"{"threshold": {"method": "value", "value": -1}}"#).is_err());
        assert!(PipelineConfig::from_json(r#"{"background": {"elem": "ball"}}"#).is_err());
        assert!(PipelineConfig::from_json(r#"{"background": {"radius": 0}}"#).is_err());
        assert!(
            PipelineConfig::from_json(
                r#"{"label": {"measure_params": true, "measure_properties": ["intensity_mean"]}}"#
            )
            .is_err()
        );
    }

    #[test]
    fn test_json_round_trip() {
        let config = PipelineConfig {
            median_filter: Some(1),
            background: Some(BackgroundParams::default()),
            threshold: ThresholdMethod::Triangle,
            ..Default::default()
        };

        let parsed = PipelineConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_run_counts_spots() {
        let config = PipelineConfig::from_json(
            r#"{
                "median_filter": 1,
                "threshold": {"method": "value", "value": 100},
                "label": {"measure_params": true}
            }"#,
        )
        .unwrap();

        let objects = config.run(spots()).unwrap();

        assert_eq!(objects.count, 3);
        assert_eq!(objects.table.unwrap().height(), 3);
    }

    #[test]
    fn test_run_with_intensity() {
        let config = PipelineConfig::from_json(
            r#"{
                "background": {"radius": 5},
                "threshold": {"method": "value", "value": 100},
                "use_intensity": true,
                "label": {
                    "measure_params": true,
                    "measure_properties": ["area", "intensity_mean"],
                    "label_rgb": false
                }
            }"#,
        )
        .unwrap();

        let objects = config.run(spots()).unwrap();
        let table = objects.table.unwrap();

        assert_eq!(objects.count, 3);
        assert_eq!(
            table.get_column_names_str(),
            ["label", "area", "intensity_mean"]
        );
    }
}
