// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::error::CzarrError;

/// Write a table to a CSV file
///
/// # Arguments
///
/// * `df` - A DataFrame
/// * `path` - Path of the output file
/// * `header` - A boolean indicating whether the output file should contain a header
///
/// # Examples
///
/// ```no_run
/// use polars::prelude::*;
/// use czarr_core::io::write_table_csv;
///
/// let column = vec![Column::new("area".into(), [25.0, 31.0, 34.0])];
/// let mut df: DataFrame = DataFrame::new(column).unwrap();
///
/// write_table_csv(&mut df, "objects.csv", true).unwrap()
/// ```
pub fn write_table_csv<P: AsRef<Path>>(
    df: &mut DataFrame,
    path: P,
    header: bool,
) -> Result<(), CzarrError> {
    let mut output: File = File::create(&path).map_err(|_| {
        CzarrError::TableError(format!(
            "Failed to create CSV file: {}",
            path.as_ref().display()
        ))
    })?;

    CsvWriter::new(&mut output)
        .include_header(header)
        .finish(df)
        .map_err(|_| CzarrError::TableError("Failed to write CSV file".to_string()))
}

/// Write a table to a TSV file
///
/// # Arguments
///
/// * `df` - A DataFrame
/// * `path` - Path of the output file
/// * `header` - A boolean indicating whether the output file should contain a header
///
/// # Examples
///
/// ```no_run
/// use polars::prelude::*;
/// use czarr_core::io::write_table_tsv;
///
/// let column = vec![Column::new("area".into(), [25.0, 31.0, 34.0])];
/// let mut df: DataFrame = DataFrame::new(column).unwrap();
///
/// write_table_tsv(&mut df, "objects.tsv", true).unwrap()
/// ```
pub fn write_table_tsv<P: AsRef<Path>>(
    df: &mut DataFrame,
    path: P,
    header: bool,
) -> Result<(), CzarrError> {
    let mut output: File = File::create(&path).map_err(|_| {
        CzarrError::TableError(format!(
            "Failed to create TSV file: {}",
            path.as_ref().display()
        ))
    })?;

    CsvWriter::new(&mut output)
        .include_header(header)
        .with_separator(b'\t')
        .finish(df)
        .map_err(|_| CzarrError::TableError("Failed to write TSV file".to_string()))
}

/// Write a table to a parquet file
///
/// # Arguments
///
/// * `df` - A DataFrame
/// * `path` - Path of the output file
///
/// # Examples
///
/// ```no_run
/// use polars::prelude::*;
/// use czarr_core::io::write_table_pq;
///
/// let column = vec![Column::new("area".into(), [25.0, 31.0, 34.0])];
/// let mut df: DataFrame = DataFrame::new(column).unwrap();
///
/// write_table_pq(&mut df, "objects.pq").unwrap()
/// ```
pub fn write_table_pq<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> Result<(), CzarrError> {
    let mut output: File = File::create(&path).map_err(|_| {
        CzarrError::TableError(format!(
            "Failed to create parquet file: {}",
            path.as_ref().display()
        ))
    })?;

    ParquetWriter::new(&mut output)
        .finish(df)
        .map(|_| ())
        .map_err(|_| CzarrError::TableError("Failed to write parquet file".to_string()))
}

/// Write a DataFrame to disk with the format chosen by file extension
///
/// # Arguments
///
/// * `df` - A DataFrame
/// * `path` - Path ending in csv, tsv, txt, parquet or pq
///
/// # Examples
///
/// ```no_run
/// use polars::prelude::*;
/// use czarr_core::io::write_table;
///
/// let column = vec![Column::new("objects".into(), [12u32, 7, 0])];
/// let mut df: DataFrame = DataFrame::new(column).unwrap();
///
/// write_table(&mut df, "wells.csv").unwrap()
/// ```
pub fn write_table<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> Result<(), CzarrError> {
    let extension = path
        .as_ref()
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());

    if let Some(ext) = extension {
        match ext.as_str() {
            "csv" => write_table_csv(df, path, true),
            "tsv" => write_table_tsv(df, path, true),
            "txt" => write_table_tsv(df, path, true),
            "parquet" => write_table_pq(df, path),
            "pq" => write_table_pq(df, path),
            _ => Err(CzarrError::TableError(format!(
                "Unsupported table extension .{}",
                ext
            ))),
        }
    } else {
        Err(CzarrError::TableError(
            "Provided table path has an invalid extension. Must be one of: csv, tsv, txt, parquet, or pq".to_string()
        ))
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_write_table_csv() {
        let path = std::env::temp_dir().join("CZARR_TEST_WRITE_TABLE.csv");

        let mut df = DataFrame::new(vec![
            Column::new("label".into(), [1u32, 2]),
            Column::new("area".into(), [25.0, 9.0]),
        ])
        .unwrap();

        write_table(&mut df, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("label,area"));
        assert_eq!(lines.next(), Some("1,25.0"));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_table_tsv() {
        let path = std::env::temp_dir().join("CZARR_TEST_WRITE_TABLE.tsv");

        let mut df = DataFrame::new(vec![Column::new("objects".into(), [3u32])]).unwrap();
        write_table(&mut df, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().collect::<Vec<&str>>(), vec!["objects", "3"]);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_table_invalid_extension() {
        let mut df = DataFrame::new(vec![Column::new("objects".into(), [3u32])]).unwrap();
        assert!(write_table(&mut df, "CZARR_TEST_TABLE.json").is_err());
        assert!(write_table(&mut df, "CZARR_TEST_TABLE").is_err());
    }
}
