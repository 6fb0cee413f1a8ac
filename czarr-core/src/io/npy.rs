// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::path::Path;

use npyz::{self, WriterBuilder};

use crate::error::CzarrError;

/// Write a numpy file from a slice of specified shape
///
/// # Arguments
///
/// * `path` - Path to output numpy file
/// * `data` - Row-major slice of a numeric or boolean type
/// * `shape` - Shape of the array (shape product must equal length of data)
///
/// # Examples
///
/// ```no_run
/// use czarr_core::io::write_numpy;
///
/// write_numpy("labels.npy", &[0u32, 1, 1, 0], &[2, 2]).unwrap();
/// ```
pub fn write_numpy<T, P: AsRef<Path>>(path: P, data: &[T], shape: &[u64]) -> Result<(), CzarrError>
where
    T: npyz::Serialize + npyz::AutoSerialize,
{
    if shape.iter().product::<u64>() != data.len() as u64 {
        return Err(CzarrError::BufferSizeError);
    }

    let mut buffer = vec![];
    let mut writer = npyz::WriteOptions::<T>::new()
        .default_dtype()
        .shape(shape)
        .writer(&mut buffer)
        .begin_nd()
        .map_err(|_| CzarrError::ImageWriteError)?;

    for d in data {
        writer.push(d).map_err(|_| CzarrError::ImageWriteError)?;
    }

    writer.finish().map_err(|_| CzarrError::ImageWriteError)?;
    std::fs::write(path, buffer).map_err(|_| CzarrError::ImageWriteError)?;
    Ok(())
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_write_numpy_shape_mismatch() {
        let result = write_numpy("CZARR_TEST_NEVER_WRITTEN.npy", &[0u8, 1, 2], &[2, 2]);
        assert_eq!(result, Err(CzarrError::BufferSizeError));
    }

    #[test]
    fn test_write_numpy_header() {
        let path = std::env::temp_dir().join("CZARR_TEST_WRITE_NUMPY.npy");
        write_numpy(&path, &[1.5f32, 2.5, 3.5, 4.5, 5.5, 6.5], &[3, 2]).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let npy = npyz::NpyFile::new(&bytes[..]).unwrap();

        assert_eq!(npy.shape(), &[3, 2]);
        assert_eq!(npy.into_vec::<f32>().unwrap(), vec![1.5, 2.5, 3.5, 4.5, 5.5, 6.5]);

        std::fs::remove_file(&path).unwrap();
    }
}
