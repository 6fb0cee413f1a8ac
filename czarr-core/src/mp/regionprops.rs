// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::str::FromStr;

use polars::prelude::*;

use crate::error::CzarrError;

/// A per-object measurement that can be requested as table columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionProperty {
    Label,
    Area,
    AreaBbox,
    Bbox,
    Centroid,
    CentroidWeighted,
    EquivalentDiameterArea,
    Extent,
    Eccentricity,
    Orientation,
    AxisMajorLength,
    AxisMinorLength,
    IntensityMean,
    IntensityMax,
    IntensityMin,
}

impl FromStr for RegionProperty {
    type Err = CzarrError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "label" => Ok(RegionProperty::Label),
            "area" => Ok(RegionProperty::Area),
            "area_bbox" | "bbox_area" => Ok(RegionProperty::AreaBbox),
            "bbox" => Ok(RegionProperty::Bbox),
            "centroid" => Ok(RegionProperty::Centroid),
            "centroid_weighted" | "weighted_centroid" => Ok(RegionProperty::CentroidWeighted),
            "equivalent_diameter_area" | "equivalent_diameter" => {
                Ok(RegionProperty::EquivalentDiameterArea)
            }
            "extent" => Ok(RegionProperty::Extent),
            "eccentricity" => Ok(RegionProperty::Eccentricity),
            "orientation" => Ok(RegionProperty::Orientation),
            "axis_major_length" | "major_axis_length" => Ok(RegionProperty::AxisMajorLength),
            "axis_minor_length" | "minor_axis_length" => Ok(RegionProperty::AxisMinorLength),
            "intensity_mean" | "mean_intensity" => Ok(RegionProperty::IntensityMean),
            "intensity_max" | "max_intensity" => Ok(RegionProperty::IntensityMax),
            "intensity_min" | "min_intensity" => Ok(RegionProperty::IntensityMin),
            _ => Err(CzarrError::ValueError(format!(
                "Unknown measurement property '{}'.",
                name
            ))),
        }
    }
}

impl RegionProperty {
    /// True if the property is computed from an intensity image
    pub fn requires_intensity(&self) -> bool {
        matches!(
            self,
            RegionProperty::CentroidWeighted
                | RegionProperty::IntensityMean
                | RegionProperty::IntensityMax
                | RegionProperty::IntensityMin
        )
    }

    /// Number of table columns the property expands to
    pub fn columns(&self) -> usize {
        match self {
            RegionProperty::Bbox => 4,
            RegionProperty::Centroid | RegionProperty::CentroidWeighted => 2,
            _ => 1,
        }
    }
}

/// Parse and deduplicate property names, keeping the first spelling seen
///
/// # Arguments
///
/// * `names` - Property names (aliases accepted)
///
/// # Examples
///
/// ```
/// use czarr_core::mp::{RegionProperty, parse_properties};
///
/// let names = vec!["area".to_string(), "mean_intensity".to_string()];
/// let properties = parse_properties(&names).unwrap();
///
/// assert_eq!(properties[1], ("mean_intensity".to_string(), RegionProperty::IntensityMean));
/// assert!(parse_properties(&["roundness".to_string()]).is_err());
/// ```
pub fn parse_properties(names: &[String]) -> Result<Vec<(String, RegionProperty)>, CzarrError> {
    let mut properties: Vec<(String, RegionProperty)> = Vec::with_capacity(names.len());

    for name in names {
        let property = name.parse::<RegionProperty>()?;
        if !properties.iter().any(|(_, p)| *p == property) {
            properties.push((name.clone(), property));
        }
    }

    Ok(properties)
}

/// Accumulated pixel statistics of one labelled object
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub label: u32,
    area: usize,
    min_row: usize,
    min_col: usize,
    max_row: usize,
    max_col: usize,
    sum_r: f64,
    sum_c: f64,
    sum_rr: f64,
    sum_cc: f64,
    sum_rc: f64,
    intensity_sum: f64,
    intensity_min: f64,
    intensity_max: f64,
    weighted_r: f64,
    weighted_c: f64,
}

impl Region {
    fn new(label: u32, row: usize, col: usize) -> Self {
        Region {
            label,
            area: 0,
            min_row: row,
            min_col: col,
            max_row: row,
            max_col: col,
            sum_r: 0.0,
            sum_c: 0.0,
            sum_rr: 0.0,
            sum_cc: 0.0,
            sum_rc: 0.0,
            intensity_sum: 0.0,
            intensity_min: f64::INFINITY,
            intensity_max: f64::NEG_INFINITY,
            weighted_r: 0.0,
            weighted_c: 0.0,
        }
    }

    #[inline]
    fn push(&mut self, row: usize, col: usize, intensity: Option<f64>) {
        let (r, c) = (row as f64, col as f64);

        self.area += 1;
        self.min_row = self.min_row.min(row);
        self.min_col = self.min_col.min(col);
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
        self.sum_r += r;
        self.sum_c += c;
        self.sum_rr += r * r;
        self.sum_cc += c * c;
        self.sum_rc += r * c;

        if let Some(value) = intensity {
            self.intensity_sum += value;
            self.intensity_min = self.intensity_min.min(value);
            self.intensity_max = self.intensity_max.max(value);
            self.weighted_r += r * value;
            self.weighted_c += c * value;
        }
    }

    /// Number of pixels
    pub fn area(&self) -> usize {
        self.area
    }

    /// (min_row, min_col, max_row, max_col) with exclusive maxima
    pub fn bbox(&self) -> [usize; 4] {
        [
            self.min_row,
            self.min_col,
            self.max_row + 1,
            self.max_col + 1,
        ]
    }

    pub fn area_bbox(&self) -> usize {
        (self.max_row + 1 - self.min_row) * (self.max_col + 1 - self.min_col)
    }

    /// (row, col) centre of mass
    pub fn centroid(&self) -> [f64; 2] {
        let n = self.area as f64;
        [self.sum_r / n, self.sum_c / n]
    }

    /// (row, col) centre of mass weighted by intensity
    pub fn centroid_weighted(&self) -> [f64; 2] {
        [
            self.weighted_r / self.intensity_sum,
            self.weighted_c / self.intensity_sum,
        ]
    }

    pub fn equivalent_diameter_area(&self) -> f64 {
        (4.0 * self.area as f64 / PI).sqrt()
    }

    pub fn extent(&self) -> f64 {
        self.area as f64 / self.area_bbox() as f64
    }

    /// Inertia tensor entries (a, b, c) of [[a, b], [b, c]]
    fn inertia_tensor(&self) -> (f64, f64, f64) {
        let n = self.area as f64;
        let [mr, mc] = self.centroid();

        let mu_rr = self.sum_rr / n - mr * mr;
        let mu_cc = self.sum_cc / n - mc * mc;
        let mu_rc = self.sum_rc / n - mr * mc;

        (mu_cc, -mu_rc, mu_rr)
    }

    /// Eigenvalues of the inertia tensor, largest first, clipped at zero
    fn inertia_eigenvalues(&self) -> (f64, f64) {
        let (a, b, c) = self.inertia_tensor();

        let mean = (a + c) / 2.0;
        let spread = (((a - c) / 2.0).powi(2) + b * b).sqrt();

        ((mean + spread).max(0.0), (mean - spread).max(0.0))
    }

    pub fn axis_major_length(&self) -> f64 {
        4.0 * self.inertia_eigenvalues().0.sqrt()
    }

    pub fn axis_minor_length(&self) -> f64 {
        4.0 * self.inertia_eigenvalues().1.sqrt()
    }

    pub fn eccentricity(&self) -> f64 {
        let (l1, l2) = self.inertia_eigenvalues();
        if l1 == 0.0 {
            return 0.0;
        }

        (1.0 - l2 / l1).sqrt()
    }

    /// Angle in radians between the row axis and the major axis
    pub fn orientation(&self) -> f64 {
        let (a, b, c) = self.inertia_tensor();

        if a - c == 0.0 {
            if b < 0.0 { PI / 4.0 } else { -PI / 4.0 }
        } else {
            0.5 * (-2.0 * b).atan2(c - a)
        }
    }

    pub fn intensity_mean(&self) -> f64 {
        self.intensity_sum / self.area as f64
    }

    pub fn intensity_max(&self) -> f64 {
        self.intensity_max
    }

    pub fn intensity_min(&self) -> f64 {
        self.intensity_min
    }
}

/// Collect per-label statistics from a label image, sorted by label
///
/// # Arguments
///
/// * `labels` - Row-major label image
/// * `width` - Width of label image
/// * `intensity` - Optional intensity image of the same size
/// * `bg_label` - Label excluded from measurement
///
/// # Examples
///
/// ```
/// use czarr_core::mp::regionprops;
///
/// let labels = vec![0, 1, 1, 0, 2, 2];
/// let regions = regionprops(&labels, 3, None, 0);
///
/// assert_eq!(regions.len(), 2);
/// assert_eq!(regions[0].area(), 2);
/// assert_eq!(regions[1].bbox(), [1, 1, 2, 3]);
/// ```
pub fn regionprops(
    labels: &[u32],
    width: usize,
    intensity: Option<&[f64]>,
    bg_label: u32,
) -> Vec<Region> {
    let mut regions: BTreeMap<u32, Region> = BTreeMap::new();

    if width == 0 {
        return Vec::new();
    }

    for (idx, &label) in labels.iter().enumerate() {
        if label == bg_label {
            continue;
        }

        let (row, col) = (idx / width, idx % width);
        regions
            .entry(label)
            .or_insert_with(|| Region::new(label, row, col))
            .push(row, col, intensity.map(|im| im[idx]));
    }

    regions.into_values().collect()
}

fn float_column(name: String, regions: &[Region], f: impl Fn(&Region) -> f64) -> Column {
    Column::new(name.into(), regions.iter().map(f).collect::<Vec<f64>>())
}

fn index_column(name: String, regions: &[Region], f: impl Fn(&Region) -> usize) -> Column {
    Column::new(
        name.into(),
        regions.iter().map(|r| f(r) as u64).collect::<Vec<u64>>(),
    )
}

/// Build a measurement table with one row per region
///
/// The `label` column always comes first. Multi-valued properties are split
/// into suffixed columns (`centroid-0`, `centroid-1`, `bbox-0` .. `bbox-3`).
///
/// # Arguments
///
/// * `regions` - Regions returned by `regionprops`
/// * `properties` - Parsed properties returned by `parse_properties`
///
/// # Examples
///
/// ```
/// use czarr_core::mp::{parse_properties, region_table, regionprops};
///
/// let labels = vec![1, 1, 0, 2];
/// let regions = regionprops(&labels, 2, None, 0);
///
/// let properties = parse_properties(&["area".to_string(), "centroid".to_string()]).unwrap();
/// let df = region_table(&regions, &properties).unwrap();
///
/// assert_eq!(df.get_column_names_str(), ["label", "area", "centroid-0", "centroid-1"]);
/// assert_eq!(df.height(), 2);
/// ```
pub fn region_table(
    regions: &[Region],
    properties: &[(String, RegionProperty)],
) -> Result<DataFrame, CzarrError> {
    let mut columns = vec![Column::new(
        "label".into(),
        regions.iter().map(|r| r.label).collect::<Vec<u32>>(),
    )];

    for (name, property) in properties {
        match property {
            RegionProperty::Label => {}
            RegionProperty::Area => {
                columns.push(float_column(name.clone(), regions, |r| r.area() as f64))
            }
            RegionProperty::AreaBbox => {
                columns.push(float_column(name.clone(), regions, |r| r.area_bbox() as f64))
            }
            RegionProperty::Bbox => {
                for i in 0..4 {
                    columns.push(index_column(format!("{}-{}", name, i), regions, |r| {
                        r.bbox()[i]
                    }));
                }
            }
            RegionProperty::Centroid => {
                for i in 0..2 {
                    columns.push(float_column(format!("{}-{}", name, i), regions, |r| {
                        r.centroid()[i]
                    }));
                }
            }
            RegionProperty::CentroidWeighted => {
                for i in 0..2 {
                    columns.push(float_column(format!("{}-{}", name, i), regions, |r| {
                        r.centroid_weighted()[i]
                    }));
                }
            }
            RegionProperty::EquivalentDiameterArea => columns.push(float_column(
                name.clone(),
                regions,
                Region::equivalent_diameter_area,
            )),
            RegionProperty::Extent => {
                columns.push(float_column(name.clone(), regions, Region::extent))
            }
            RegionProperty::Eccentricity => {
                columns.push(float_column(name.clone(), regions, Region::eccentricity))
            }
            RegionProperty::Orientation => {
                columns.push(float_column(name.clone(), regions, Region::orientation))
            }
            RegionProperty::AxisMajorLength => {
                columns.push(float_column(name.clone(), regions, Region::axis_major_length))
            }
            RegionProperty::AxisMinorLength => {
                columns.push(float_column(name.clone(), regions, Region::axis_minor_length))
            }
            RegionProperty::IntensityMean => {
                columns.push(float_column(name.clone(), regions, Region::intensity_mean))
            }
            RegionProperty::IntensityMax => {
                columns.push(float_column(name.clone(), regions, Region::intensity_max))
            }
            RegionProperty::IntensityMin => {
                columns.push(float_column(name.clone(), regions, Region::intensity_min))
            }
        }
    }

    DataFrame::new(columns).map_err(|e| CzarrError::TableError(e.to_string()))
}

#[cfg(test)]
mod test {

    use super::*;

    fn square(size: usize, offset: usize, width: usize) -> Vec<u32> {
        let mut labels = vec![0u32; width * width];
        for r in offset..offset + size {
            for c in offset..offset + size {
                labels[r * width + c] = 1;
            }
        }
        labels
    }

    #[test]
    fn test_square_region() {
        let labels = square(5, 2, 9);
        let regions = regionprops(&labels, 9, None, 0);

        assert_eq!(regions.len(), 1);

        let region = &regions[0];
        assert_eq!(region.area(), 25);
        assert_eq!(region.bbox(), [2, 2, 7, 7]);
        assert_eq!(region.centroid(), [4.0, 4.0]);
        assert_eq!(region.extent(), 1.0);
        assert!(region.eccentricity().abs() < 1e-9);
        assert!((region.axis_major_length() - 4.0 * 2f64.sqrt()).abs() < 1e-9);
        assert!((region.equivalent_diameter_area() - (100.0 / PI).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_bar_orientation() {
        // A horizontal bar 1 pixel tall and 5 pixels wide
        let labels = vec![1u32; 5];
        let regions = regionprops(&labels, 5, None, 0);
        let region = &regions[0];

        assert!((region.orientation().abs() - PI / 2.0).abs() < 1e-9);
        assert!((region.eccentricity() - 1.0).abs() < 1e-9);
        assert_eq!(region.axis_minor_length(), 0.0);

        // The same bar standing vertically
        let regions = regionprops(&labels, 1, None, 0);
        assert!(regions[0].orientation().abs() < 1e-9);
    }

    #[test]
    fn test_intensity_properties() {
        let labels = vec![1, 1, 0, 2];
        let intensity = vec![2.0, 6.0, 100.0, 3.0];
        let regions = regionprops(&labels, 2, Some(&intensity), 0);

        assert_eq!(regions[0].intensity_mean(), 4.0);
        assert_eq!(regions[0].intensity_max(), 6.0);
        assert_eq!(regions[0].intensity_min(), 2.0);
        assert_eq!(regions[0].centroid_weighted(), [0.0, 0.75]);
        assert_eq!(regions[1].intensity_mean(), 3.0);
    }

    #[test]
    fn test_custom_background() {
        let labels = vec![5, 5, 0, 0];
        let regions = regionprops(&labels, 2, None, 5);

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].label, 0);
        assert_eq!(regions[0].area(), 2);
    }

    #[test]
    fn test_parse_aliases() {
        let names: Vec<String> = ["bbox_area", "area_bbox", "major_axis_length", "label"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let properties = parse_properties(&names).unwrap();
        assert_eq!(properties.len(), 3);
        assert_eq!(properties[0].0, "bbox_area");
        assert!(!properties[1].1.requires_intensity());
        assert!(RegionProperty::IntensityMax.requires_intensity());
    }

    #[test]
    fn test_region_table_columns() {
        let labels = square(3, 1, 5);
        let regions = regionprops(&labels, 5, None, 0);

        let names: Vec<String> = ["label", "bbox", "weighted_centroid", "extent"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let properties = parse_properties(&names).unwrap();
        let df = region_table(&regions, &properties).unwrap();

        assert_eq!(
            df.get_column_names_str(),
            [
                "label",
                "bbox-0",
                "bbox-1",
                "bbox-2",
                "bbox-3",
                "weighted_centroid-0",
                "weighted_centroid-1",
                "extent"
            ]
        );
        assert_eq!(df.height(), 1);
        assert_eq!(
            properties.iter().map(|(_, p)| p.columns()).sum::<usize>(),
            8
        );
    }

    #[test]
    fn test_region_table_empty() {
        let properties = parse_properties(&["area".to_string()]).unwrap();
        let df = region_table(&[], &properties).unwrap();

        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 2);
    }
}
