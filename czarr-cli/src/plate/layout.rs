// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::ops::Range;

use serde_json::{Map, Value};
use zarrs::array::{Array, DataType};
use zarrs::array_subset::ArraySubset;
use zarrs::group::Group;
use zarrs::storage::ReadableListableStorage;

use czarr_core::CzarrError;
use czarr_core::im::{PixelArray, PixelBuffer};

/// Axis order assumed when an image carries no axes metadata
fn default_axes(ndim: usize) -> Option<&'static [&'static str]> {
    match ndim {
        2 => Some(&["y", "x"]),
        3 => Some(&["c", "y", "x"]),
        4 => Some(&["c", "z", "y", "x"]),
        5 => Some(&["t", "c", "z", "y", "x"]),
        _ => None,
    }
}

/// One imaged field of a well
#[derive(Debug, Clone, PartialEq)]
pub struct FieldLayout {
    /// Group path relative to the plate root (e.g. `A/1/0`)
    pub path: String,
    /// Field name within the well (e.g. `0`)
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WellLayout {
    pub path: String,
    pub row: String,
    pub column: String,
    pub fields: Vec<FieldLayout>,
}

/// Rows, columns and wells of an HCS plate
#[derive(Debug, Clone, PartialEq)]
pub struct PlateLayout {
    pub name: Option<String>,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub wells: Vec<WellLayout>,
}

/// A well as listed in the plate metadata, before its fields are known
#[derive(Debug, Clone, PartialEq)]
pub struct WellEntry {
    pub path: String,
    pub row: String,
    pub column: String,
}

/// Look up an attribute under `ome` (NGFF 0.5) or at the top level (NGFF 0.4)
fn ome_attribute<'a>(attributes: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    attributes
        .get("ome")
        .and_then(|ome| ome.get(key))
        .or_else(|| attributes.get(key))
}

fn names(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| match entry {
                    Value::String(name) => Some(name.to_owned()),
                    Value::Object(object) => object
                        .get("name")
                        .and_then(Value::as_str)
                        .map(str::to_owned),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn missing(key: &str, path: &str) -> CzarrError {
    CzarrError::ZarrError(format!("Missing '{}' metadata at '/{}'", key, path))
}

/// Parse plate rows, columns and well entries from root group attributes
///
/// Row and column names come from `rowIndex`/`columnIndex` when present,
/// otherwise from the two components of the well path.
pub fn parse_plate(
    attributes: &Map<String, Value>,
) -> Result<(Option<String>, Vec<String>, Vec<String>, Vec<WellEntry>), CzarrError> {
    let plate = ome_attribute(attributes, "plate").ok_or_else(|| missing("plate", ""))?;

    let name = plate.get("name").and_then(Value::as_str).map(str::to_owned);
    let rows = names(plate.get("rows"));
    let columns = names(plate.get("columns"));

    let wells = plate
        .get("wells")
        .and_then(Value::as_array)
        .ok_or_else(|| missing("plate.wells", ""))?;

    let mut entries = Vec::with_capacity(wells.len());

    for well in wells {
        let path = well
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| missing("plate.wells.path", ""))?
            .trim_matches('/')
            .to_string();

        let mut parts = path.split('/');
        let (path_row, path_column) = match (parts.next(), parts.next(), parts.next()) {
            (Some(row), Some(column), None) => (row.to_string(), column.to_string()),
            _ => {
                return Err(CzarrError::ZarrError(format!(
                    "Well path '{}' is not of the form row/column",
                    path
                )));
            }
        };

        let lookup = |key: &str, axis: &[String], fallback: String| {
            well.get(key)
                .and_then(Value::as_u64)
                .and_then(|idx| axis.get(idx as usize).cloned())
                .unwrap_or(fallback)
        };

        entries.push(WellEntry {
            row: lookup("rowIndex", &rows, path_row),
            column: lookup("columnIndex", &columns, path_column),
            path,
        });
    }

    Ok((name, rows, columns, entries))
}

/// Field group names listed in well attributes
pub fn parse_well(attributes: &Map<String, Value>, path: &str) -> Result<Vec<String>, CzarrError> {
    let images = ome_attribute(attributes, "well")
        .and_then(|well| well.get("images"))
        .and_then(Value::as_array)
        .ok_or_else(|| missing("well.images", path))?;

    Ok(images
        .iter()
        .filter_map(|image| image.get("path").and_then(Value::as_str))
        .map(|p| p.trim_matches('/').to_string())
        .collect())
}

/// Full resolution dataset path and axis names from image attributes
pub fn parse_multiscales(
    attributes: &Map<String, Value>,
    path: &str,
) -> Result<(String, Vec<String>), CzarrError> {
    let multiscale = ome_attribute(attributes, "multiscales")
        .and_then(Value::as_array)
        .and_then(|multiscales| multiscales.first())
        .ok_or_else(|| missing("multiscales", path))?;

    let dataset = multiscale
        .get("datasets")
        .and_then(Value::as_array)
        .and_then(|datasets| datasets.first())
        .and_then(|dataset| dataset.get("path"))
        .and_then(Value::as_str)
        .ok_or_else(|| missing("multiscales.datasets", path))?
        .trim_matches('/')
        .to_string();

    Ok((dataset, names(multiscale.get("axes"))))
}

/// Index ranges selecting the (y, x) plane of `channel` at t = 0, z = 0
pub fn plane_ranges(
    shape: &[u64],
    axes: &[String],
    channel: u64,
) -> Result<Vec<Range<u64>>, CzarrError> {
    let axes: Vec<String> = match default_axes(shape.len()) {
        _ if axes.len() == shape.len() => axes.iter().map(|a| a.to_lowercase()).collect(),
        Some(fallback) if axes.is_empty() => fallback.iter().map(|a| a.to_string()).collect(),
        _ => {
            return Err(CzarrError::ZarrError(format!(
                "Axes {:?} do not match array shape {:?}",
                axes, shape
            )));
        }
    };

    if channel > 0 && !axes.iter().any(|a| a == "c") {
        return Err(CzarrError::ValueError(format!(
            "Channel {} requested but the image has no channel axis.",
            channel
        )));
    }

    if !axes.iter().any(|a| a == "y") || !axes.iter().any(|a| a == "x") {
        return Err(CzarrError::ZarrError(format!(
            "Image axes {:?} must include y and x",
            axes
        )));
    }

    axes.iter()
        .zip(shape)
        .map(|(axis, &size)| match axis.as_str() {
            "y" | "x" => Ok(0..size),
            "c" => {
                if channel >= size {
                    Err(CzarrError::ValueError(format!(
                        "Channel {} is out of range for an image with {} channels.",
                        channel, size
                    )))
                } else {
                    Ok(channel..channel + 1)
                }
            }
            _ => {
                if size == 0 {
                    Err(CzarrError::ZarrError(format!("Axis '{}' is empty", axis)))
                } else {
                    Ok(0..1)
                }
            }
        })
        .collect()
}

/// Shape of the plane selected by `plane_ranges`, (y, x) are the last two
/// axes with more than one element, or the last two axes otherwise
fn axes_plane(ranges: &[Range<u64>]) -> Vec<usize> {
    let sizes: Vec<usize> = ranges.iter().map(|r| (r.end - r.start) as usize).collect();
    let wide: Vec<usize> = sizes.iter().copied().filter(|&s| s > 1).collect();

    if wide.len() == 2 {
        wide
    } else {
        sizes[sizes.len() - 2..].to_vec()
    }
}

fn group_attributes(
    store: &ReadableListableStorage,
    path: &str,
) -> Result<Map<String, Value>, CzarrError> {
    let group = Group::open(store.clone(), &format!("/{}", path))
        .map_err(|e| CzarrError::ZarrError(e.to_string()))?;

    Ok(group.attributes().clone())
}

impl PlateLayout {
    /// Read plate, well and field metadata from a plate store
    pub fn open(store: &ReadableListableStorage) -> Result<Self, CzarrError> {
        let (name, rows, columns, entries) = parse_plate(&group_attributes(store, "")?)?;

        let mut wells = Vec::with_capacity(entries.len());

        for entry in entries {
            let fields = parse_well(&group_attributes(store, &entry.path)?, &entry.path)?
                .into_iter()
                .map(|field| FieldLayout {
                    path: format!("{}/{}", entry.path, field),
                    name: field,
                })
                .collect();

            wells.push(WellLayout {
                path: entry.path,
                row: entry.row,
                column: entry.column,
                fields,
            });
        }

        Ok(PlateLayout {
            name,
            rows,
            columns,
            wells,
        })
    }

    /// Every (well, field) pair in plate order
    pub fn fields(&self) -> Vec<(&WellLayout, &FieldLayout)> {
        self.wells
            .iter()
            .flat_map(|well| well.fields.iter().map(move |field| (well, field)))
            .collect()
    }
}

fn retrieve<T>(
    array: &Array<dyn zarrs::storage::ReadableListableStorageTraits>,
    subset: &ArraySubset,
    shape: &[usize],
) -> Result<PixelBuffer<T>, CzarrError>
where
    T: zarrs::array::ElementOwned,
{
    let values = array
        .retrieve_array_subset_elements::<T>(subset)
        .map_err(|e| CzarrError::ZarrError(e.to_string()))?;

    PixelBuffer::new(shape, values)
}

/// Read the (y, x) plane of one channel of a field's full resolution image
pub fn read_plane(
    store: &ReadableListableStorage,
    field: &FieldLayout,
    channel: u64,
) -> Result<PixelArray, CzarrError> {
    let (dataset, axes) = parse_multiscales(&group_attributes(store, &field.path)?, &field.path)?;

    let array = Array::open(store.clone(), &format!("/{}/{}", field.path, dataset))
        .map_err(|e| CzarrError::ZarrError(e.to_string()))?;

    let ranges = plane_ranges(array.shape(), &axes, channel)?;

    let shape: Vec<usize> = axes_plane(&ranges);

    let subset = ArraySubset::new_with_ranges(&ranges);

    Ok(match array.data_type() {
        DataType::UInt8 => PixelArray::from(retrieve::<u8>(&array, &subset, &shape)?),
        DataType::UInt16 => PixelArray::from(retrieve::<u16>(&array, &subset, &shape)?),
        DataType::UInt32 => PixelArray::from(retrieve::<u32>(&array, &subset, &shape)?),
        DataType::Int32 => PixelArray::from(retrieve::<i32>(&array, &subset, &shape)?),
        DataType::Int64 => PixelArray::from(retrieve::<i64>(&array, &subset, &shape)?),
        DataType::Float32 => PixelArray::from(retrieve::<f32>(&array, &subset, &shape)?),
        DataType::Float64 => PixelArray::from(retrieve::<f64>(&array, &subset, &shape)?),
        other => {
            return Err(CzarrError::ZarrError(format!(
                "Unsupported image data type {:?}",
                other
            )));
        }
    })
}
