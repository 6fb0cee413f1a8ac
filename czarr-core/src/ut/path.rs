// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::path::{Path, PathBuf};

use crate::error::CzarrError;

/// Collect file paths from a directory with an optional substring filter
///
/// Files are returned sorted by name so that downstream tables have a stable
/// row order.
///
/// # Arguments
///
/// * `directory` - Path to directory containing files
/// * `valid_ext` - Only include files with one of these extensions
/// * `substring` - Only include files containing this substring
///
/// # Examples
///
/// ```no_run
/// use czarr_core::ut::path::collect_file_paths;
/// use czarr_core::constant::SUPPORTED_IMAGE_FORMATS;
/// let files = collect_file_paths("directory/", SUPPORTED_IMAGE_FORMATS.as_slice(), None);
/// ```
pub fn collect_file_paths<P>(
    directory: P,
    valid_ext: &[&str],
    substring: Option<String>,
) -> Result<Vec<PathBuf>, CzarrError>
where
    P: AsRef<Path>,
{
    let message = directory.as_ref().display().to_string();

    let mut files: Vec<PathBuf> = std::fs::read_dir(directory)
        .map_err(|_| CzarrError::DirError(message))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.to_lowercase())
                    .is_some_and(|ext| valid_ext.contains(&ext.as_str()))
        })
        .collect();

    if let Some(substring) = substring {
        files.retain(|f| {
            f.file_name()
                .map(|name| name.to_string_lossy().contains(&substring))
                .unwrap_or(false)
        });
    }

    files.sort();

    Ok(files)
}

/// Create an output directory (and its parents) if it does not exist yet
///
/// # Arguments
///
/// * `directory` - Path of the output directory
pub fn create_directory<P: AsRef<Path>>(directory: P) -> Result<PathBuf, CzarrError> {
    let directory = directory.as_ref();

    if directory.is_file() {
        return Err(CzarrError::DirError(format!(
            "Output path is an existing file: {}",
            directory.display()
        )));
    }

    std::fs::create_dir_all(directory).map_err(|err| CzarrError::DirError(err.to_string()))?;

    Ok(directory.to_path_buf())
}

/// File stem of a path as an owned string
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_collect_file_paths() {
        let directory = std::env::temp_dir().join("CZARR_TEST_COLLECT_FILE_PATHS");
        std::fs::create_dir_all(&directory).unwrap();

        for name in ["b_image.npy", "a_image.png", "a_mask.png", "notes.txt"] {
            std::fs::write(directory.join(name), b"").unwrap();
        }

        let files = collect_file_paths(&directory, &["npy", "png"], None).unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(file_stem(&files[0]), "a_image");

        let files =
            collect_file_paths(&directory, &["npy", "png"], Some("_image".to_string())).unwrap();
        assert_eq!(files.len(), 2);

        std::fs::remove_dir_all(&directory).unwrap();
    }

    #[test]
    fn test_create_directory() {
        let directory = std::env::temp_dir().join("CZARR_TEST_CREATE_DIRECTORY");
        let nested = directory.join("nested");

        assert_eq!(create_directory(&nested).unwrap(), nested);
        assert!(nested.is_dir());
        assert!(create_directory(&nested).is_ok());

        let file = directory.join("file.txt");
        std::fs::write(&file, b"").unwrap();
        assert!(create_directory(&file).is_err());

        std::fs::remove_dir_all(&directory).unwrap();
    }

    #[test]
    fn test_collect_file_paths_missing_directory() {
        let files = collect_file_paths("CZARR_DIRECTORY_THAT_DOES_NOT_EXIST", &["npy"], None);
        assert!(files.is_err());
    }
}
