// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::collections::HashMap;

use polars::prelude::*;

use czarr_core::CzarrError;

use crate::{stack_tables, tag_table};

/// Objects found in one field of a well
#[derive(Debug, Clone)]
pub struct FieldResult {
    pub well: String,
    pub row: String,
    pub column: String,
    pub field: String,
    pub objects: u64,
    pub table: Option<DataFrame>,
}

fn table_error(err: PolarsError) -> CzarrError {
    CzarrError::TableError(err.to_string())
}

fn text<'a, I, F>(results: I, key: F) -> Vec<String>
where
    I: IntoIterator<Item = &'a FieldResult>,
    F: Fn(&'a FieldResult) -> &'a String,
{
    results.into_iter().map(|r| key(r).to_owned()).collect()
}

/// Distinct values in order of first appearance
fn distinct<'a, I, F>(results: I, key: F) -> Vec<String>
where
    I: IntoIterator<Item = &'a FieldResult>,
    F: Fn(&'a FieldResult) -> &'a String,
{
    let mut names: Vec<String> = Vec::new();

    for result in results {
        if !names.contains(key(result)) {
            names.push(key(result).to_owned());
        }
    }

    names
}

/// One row per processed field
pub fn fields_table(results: &[FieldResult]) -> Result<DataFrame, CzarrError> {
    DataFrame::new(vec![
        Column::new("well".into(), text(results, |r| &r.well)),
        Column::new("row".into(), text(results, |r| &r.row)),
        Column::new("column".into(), text(results, |r| &r.column)),
        Column::new("field".into(), text(results, |r| &r.field)),
        Column::new(
            "objects".into(),
            results.iter().map(|r| r.objects).collect::<Vec<u64>>(),
        ),
    ])
    .map_err(table_error)
}

/// Per-well totals keyed by well path, in order of first appearance
fn well_totals(results: &[FieldResult]) -> Vec<(&FieldResult, u64, u64)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut totals: Vec<(&FieldResult, u64, u64)> = Vec::new();

    for result in results {
        match index.get(result.well.as_str()) {
            Some(&i) => {
                totals[i].1 += 1;
                totals[i].2 += result.objects;
            }
            None => {
                index.insert(result.well.as_str(), totals.len());
                totals.push((result, 1, result.objects));
            }
        }
    }

    totals
}

/// One row per well with the number of processed fields and summed objects
pub fn wells_table(results: &[FieldResult]) -> Result<DataFrame, CzarrError> {
    let totals = well_totals(results);

    DataFrame::new(vec![
        Column::new("well".into(), text(totals.iter().map(|t| t.0), |r| &r.well)),
        Column::new("row".into(), text(totals.iter().map(|t| t.0), |r| &r.row)),
        Column::new("column".into(), text(totals.iter().map(|t| t.0), |r| &r.column)),
        Column::new("fields".into(), totals.iter().map(|t| t.1).collect::<Vec<u64>>()),
        Column::new("objects".into(), totals.iter().map(|t| t.2).collect::<Vec<u64>>()),
    ])
    .map_err(table_error)
}

/// Plate-shaped grid of per-well object counts
///
/// Rows and columns follow the plate metadata. When the metadata lists none
/// they are taken from the results in order of appearance. Wells without a
/// processed field are left empty.
pub fn heatmap_table(
    rows: &[String],
    columns: &[String],
    results: &[FieldResult],
) -> Result<DataFrame, CzarrError> {
    let totals = well_totals(results);

    let wells: Vec<&FieldResult> = totals.iter().map(|t| t.0).collect();

    let rows = if rows.is_empty() {
        distinct(wells.iter().copied(), |r| &r.row)
    } else {
        rows.to_vec()
    };

    let columns = if columns.is_empty() {
        distinct(wells.iter().copied(), |r| &r.column)
    } else {
        columns.to_vec()
    };

    let counts: HashMap<(&str, &str), u64> = totals
        .iter()
        .map(|(r, _, objects)| ((r.row.as_str(), r.column.as_str()), *objects))
        .collect();

    let mut grid = vec![Column::new("row".into(), rows.clone())];

    for column in &columns {
        let values: Vec<Option<u64>> = rows
            .iter()
            .map(|row| counts.get(&(row.as_str(), column.as_str())).copied())
            .collect();

        grid.push(Column::new(column.as_str().into(), values));
    }

    DataFrame::new(grid).map_err(table_error)
}

/// Per-object measurements of every field with well and field columns first
pub fn objects_table(results: &[FieldResult]) -> Result<Option<DataFrame>, CzarrError> {
    let mut tables = Vec::new();

    for result in results {
        if let Some(table) = &result.table {
            let mut table = table.clone();
            tag_table(&mut table, "field", &result.field)?;
            tag_table(&mut table, "well", &result.well)?;
            tables.push(table);
        }
    }

    stack_tables(tables)
}

#[cfg(test)]
mod test {

    use super::*;

    fn result(well: &str, field: &str, objects: u64) -> FieldResult {
        let (row, column) = well.split_once('/').unwrap();
        FieldResult {
            well: well.to_string(),
            row: row.to_string(),
            column: column.to_string(),
            field: field.to_string(),
            objects,
            table: Some(
                DataFrame::new(vec![
                    Column::new("label".into(), (1..=objects as u32).collect::<Vec<u32>>()),
                    Column::new("area".into(), vec![12.0; objects as usize]),
                ])
                .unwrap(),
            ),
        }
    }

    fn results() -> Vec<FieldResult> {
        vec![
            result("A/1", "0", 2),
            result("A/1", "1", 3),
            result("B/2", "0", 4),
        ]
    }

    fn u64_at(df: &DataFrame, name: &str, idx: usize) -> Option<u64> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .u64()
            .unwrap()
            .get(idx)
    }

    #[test]
    fn test_fields_table() {
        let df = fields_table(&results()).unwrap();

        assert_eq!(df.shape(), (3, 5));
        assert_eq!(
            df.get_column_names_str(),
            ["well", "row", "column", "field", "objects"]
        );
        assert_eq!(u64_at(&df, "objects", 2), Some(4));
    }

    #[test]
    fn test_wells_table_sums_fields() {
        let df = wells_table(&results()).unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(u64_at(&df, "fields", 0), Some(2));
        assert_eq!(u64_at(&df, "objects", 0), Some(5));
        assert_eq!(u64_at(&df, "objects", 1), Some(4));
    }

    #[test]
    fn test_heatmap_table_leaves_missing_wells_empty() {
        let rows = vec!["A".to_string(), "B".to_string()];
        let columns = vec!["1".to_string(), "2".to_string()];

        let df = heatmap_table(&rows, &columns, &results()).unwrap();

        assert_eq!(df.get_column_names_str(), ["row", "1", "2"]);
        assert_eq!(u64_at(&df, "1", 0), Some(5));
        assert_eq!(u64_at(&df, "2", 0), None);
        assert_eq!(u64_at(&df, "1", 1), None);
        assert_eq!(u64_at(&df, "2", 1), Some(4));
    }

    #[test]
    fn test_heatmap_table_without_plate_names() {
        let df = heatmap_table(&[], &[], &results()).unwrap();

        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.get_column_names_str(), ["row", "1", "2"]);
    }

    #[test]
    fn test_objects_table_prepends_well_and_field() {
        let df = objects_table(&results()).unwrap().unwrap();

        assert_eq!(df.height(), 9);
        assert_eq!(
            df.get_column_names_str(),
            ["well", "field", "label", "area"]
        );
    }

    #[test]
    fn test_objects_table_without_measurements() {
        let mut results = results();
        for result in results.iter_mut() {
            result.table = None;
        }

        assert!(objects_table(&results).unwrap().is_none());
    }
}
