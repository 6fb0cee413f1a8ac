// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::iter::Iterator;

use crate::error::CzarrError;
use crate::im::Pixel;

/// A row-major container storing an n-dimensional grid of pixels.
///
/// The last axis is the fastest varying one. Two-dimensional arrays are
/// shaped `(height, width)`, colour images `(height, width, 3)` and volumes
/// `(depth, height, width)`. The length of the container must be equal to
/// the product of the shape.
///
/// # Examples
///
/// ```
/// use czarr_core::im::PixelBuffer;
///
/// let buffer = PixelBuffer::new(&[4, 5], vec![0u16; 20]);
/// assert_eq!(buffer.unwrap().len(), 20);
/// ```
///
/// ```
/// use czarr_core::im::PixelBuffer;
///
/// let buffer = PixelBuffer::new(&[4, 5], vec![0u16; 21]);
/// assert!(buffer.is_err()); // Buffer size does not match dimensions
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer<T> {
    shape: Vec<usize>,
    pub buffer: Vec<T>,
}

impl<T> PixelBuffer<T> {
    /// Initializes a buffer from a row-major vector
    ///
    /// # Arguments
    ///
    /// * `shape` - Extent of each axis, slowest varying first
    /// * `buffer` - Row-major pixel data
    pub fn new(shape: &[usize], buffer: Vec<T>) -> Result<PixelBuffer<T>, CzarrError> {
        if shape.iter().product::<usize>() == buffer.len() {
            Ok(PixelBuffer {
                shape: shape.to_vec(),
                buffer,
            })
        } else {
            Err(CzarrError::BufferSizeError)
        }
    }
}

// >>> PROPERTY METHODS

impl<T> PixelBuffer<T> {
    /// Extent of each axis
    pub fn shape(&self) -> Vec<usize> {
        self.shape.clone()
    }

    /// Number of axes
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Width of a 2-D array (the extent of the second axis)
    pub fn width(&self) -> usize {
        self.shape.get(1).copied().unwrap_or(1)
    }

    /// Height of a 2-D array (the extent of the first axis)
    pub fn height(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    /// Number of pixels
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

// <<< PROPERTY METHODS

// >>> CONVERSION METHODS

impl<T: Pixel> PixelBuffer<T> {
    /// Returns the raw buffer
    pub fn into_raw(self) -> Vec<T> {
        self.buffer
    }

    /// Returns a reference to the raw buffer
    pub fn as_raw(&self) -> &Vec<T> {
        &self.buffer
    }

    /// An iterator over the raw buffer
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }

    /// Cast subpixels to f64 and return the buffer
    pub fn to_f64(&self) -> Vec<f64> {
        self.buffer.iter().map(|x| x.to_f64()).collect()
    }

    /// Cast subpixels to bool (non-zero is true) and return the buffer
    pub fn to_bool(&self) -> Vec<bool> {
        self.buffer.iter().map(|x| x.is_nonzero()).collect()
    }

    /// Rescale subpixels to a unit range based on the element type
    ///
    /// Integer types are divided by their maximum value, floats are kept
    /// as they are and booleans become 0.0 or 1.0.
    pub fn to_unit_f64(&self) -> Vec<f64> {
        let scale = T::unit_max();
        self.buffer.iter().map(|x| x.to_f64() / scale).collect()
    }

    /// A buffer of the same shape built from f64 values cast to `T`
    pub fn with_f64(&self, values: &[f64]) -> Result<PixelBuffer<T>, CzarrError> {
        PixelBuffer::new(&self.shape, values.iter().map(|&v| T::from_f64(v)).collect())
    }

    /// The same pixels viewed with a different shape of equal size
    pub fn reshape(&self, shape: &[usize]) -> Result<PixelBuffer<T>, CzarrError> {
        PixelBuffer::new(shape, self.buffer.clone())
    }

    /// Pixel at (row, column) of a 2-D buffer
    pub fn get(&self, row: usize, column: usize) -> Option<T> {
        if self.ndim() != 2 || row >= self.height() || column >= self.width() {
            return None;
        }

        self.buffer.get(row * self.width() + column).copied()
    }
}

// <<< CONVERSION METHODS

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_buffer_new_success() {
        let buffer = PixelBuffer::new(&[3, 2], vec![1u8, 2, 3, 4, 5, 6]);
        assert!(buffer.is_ok());
    }

    #[test]
    fn test_buffer_new_error() {
        let buffer = PixelBuffer::new(&[3, 3], vec![1u8, 2, 3, 4, 5, 6]);
        assert!(buffer.is_err());
    }

    #[test]
    fn test_buffer_dimensions() {
        let buffer = PixelBuffer::new(&[3, 2], vec![1u8, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(buffer.height(), 3);
        assert_eq!(buffer.width(), 2);
        assert_eq!(buffer.ndim(), 2);
        assert_eq!(buffer.shape(), vec![3, 2]);
        assert_eq!(buffer.len(), 6);
    }

    #[test]
    fn test_buffer_get() {
        let buffer = PixelBuffer::new(&[3, 2], vec![1u8, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(buffer.get(0, 1), Some(2));
        assert_eq!(buffer.get(2, 0), Some(5));
        assert_eq!(buffer.get(3, 0), None);
    }

    #[test]
    fn test_buffer_to_unit_f64() {
        let buffer = PixelBuffer::new(&[1, 3], vec![0u8, 51, 255]).unwrap();
        assert_eq!(buffer.to_unit_f64(), vec![0.0, 0.2, 1.0]);
    }

    #[test]
    fn test_buffer_reshape() {
        let buffer = PixelBuffer::new(&[3, 2, 1], vec![1u8, 2, 3, 4, 5, 6]).unwrap();
        let reshaped = buffer.reshape(&[3, 2]).unwrap();

        assert_eq!(reshaped.get(1, 1), Some(4));
        assert!(buffer.reshape(&[4, 2]).is_err());
    }

    #[test]
    fn test_buffer_with_f64() {
        let buffer = PixelBuffer::new(&[2, 2], vec![0u16; 4]).unwrap();
        let cast = buffer.with_f64(&[1.9, 2.1, -4.0, 70000.0]).unwrap();
        assert_eq!(cast.into_raw(), vec![1, 2, 0, 65535]);
    }
}
