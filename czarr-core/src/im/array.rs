// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::path::Path;

use image::{DynamicImage, ImageBuffer, Luma, Rgb, open as open_dynamic};
use npyz::{DType as NpyDType, NpyFile, TypeChar};

use crate::constant;
use crate::error::CzarrError;
use crate::im::{DType, PixelBuffer};
use crate::impl_enum_dispatch;
use crate::io::write_numpy;

/// A wrapper for representing and storing array-shaped pixels
///
/// The enum holds every supported element type. All external image types
/// (e.g. `DynamicImage`, numpy arrays, zarr chunks) should be converted to a
/// `PixelArray` via a method on this enum.
///
/// # Examples
///
/// ```
/// use czarr_core::im::{DType, PixelArray, PixelBuffer};
///
/// let array = PixelArray::from(PixelBuffer::new(&[2, 3], vec![0u16; 6]).unwrap());
///
/// assert_eq!(array.shape(), vec![2, 3]);
/// assert_eq!(array.dtype(), DType::U16);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum PixelArray {
    Bool(PixelBuffer<bool>),
    U8(PixelBuffer<u8>),
    U16(PixelBuffer<u16>),
    U32(PixelBuffer<u32>),
    I32(PixelBuffer<i32>),
    I64(PixelBuffer<i64>),
    F32(PixelBuffer<f32>),
    F64(PixelBuffer<f64>),
}

macro_rules! impl_from_buffer {
    ($($t:ty => $variant:ident),*) => {
        $(
            impl From<PixelBuffer<$t>> for PixelArray {
                fn from(buffer: PixelBuffer<$t>) -> Self {
                    PixelArray::$variant(buffer)
                }
            }
        )*
    };
}

impl_from_buffer!(
    bool => Bool,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64
);

// >>> I/O METHODS

impl PixelArray {
    /// Open a new array from a provided path
    ///
    /// # Arguments
    ///
    /// * `path` - A path to an image or numpy array with a valid extension
    ///
    /// ```no_run
    /// use czarr_core::im::PixelArray;
    /// let array = PixelArray::open("image.npy");
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<PixelArray, CzarrError> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        if let Some(ext) = extension {
            if ext == "npy" {
                let bytes = std::fs::read(&path).map_err(|_| CzarrError::ImageReadError)?;
                let npy = NpyFile::new(&bytes[..]).map_err(|_| CzarrError::ImageReadError)?;
                return Self::new_from_numpy(npy);
            }

            if constant::IMAGE_DYNAMIC_FORMATS.iter().any(|e| e == &ext) {
                let image = open_dynamic(&path).map_err(|_| CzarrError::ImageReadError)?;
                return Self::new_from_dynamic(image);
            }
        }

        Err(CzarrError::ImageExtensionError)
    }

    /// Initialize a new array from a DynamicImage
    ///
    /// Grayscale images become `(height, width)` arrays and colour images
    /// `(height, width, 3)` arrays. Alpha channels are dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use image::{GrayImage, DynamicImage};
    /// use czarr_core::im::PixelArray;
    ///
    /// let gray = GrayImage::new(10, 8);
    /// let array = PixelArray::new_from_dynamic(DynamicImage::ImageLuma8(gray)).unwrap();
    /// assert_eq!(array.shape(), vec![8, 10]);
    /// ```
    pub fn new_from_dynamic(image: DynamicImage) -> Result<PixelArray, CzarrError> {
        let width = image.width() as usize;
        let height = image.height() as usize;
        let gray = [height, width];
        let rgb = [height, width, 3];

        match image {
            DynamicImage::ImageLuma8(buffer) => {
                Ok(PixelArray::U8(PixelBuffer::new(&gray, buffer.into_raw())?))
            }
            DynamicImage::ImageLumaA8(buffer) => Ok(PixelArray::U8(PixelBuffer::new(
                &gray,
                buffer
                    .into_raw()
                    .chunks_exact(2)
                    .map(|pixel| pixel[0])
                    .collect(),
            )?)),
            DynamicImage::ImageLuma16(buffer) => {
                Ok(PixelArray::U16(PixelBuffer::new(&gray, buffer.into_raw())?))
            }
            DynamicImage::ImageLumaA16(buffer) => Ok(PixelArray::U16(PixelBuffer::new(
                &gray,
                buffer
                    .into_raw()
                    .chunks_exact(2)
                    .map(|pixel| pixel[0])
                    .collect(),
            )?)),
            DynamicImage::ImageRgb8(buffer) => {
                Ok(PixelArray::U8(PixelBuffer::new(&rgb, buffer.into_raw())?))
            }
            DynamicImage::ImageRgba8(buffer) => Ok(PixelArray::U8(PixelBuffer::new(
                &rgb,
                buffer
                    .into_raw()
                    .chunks_exact(4)
                    .flat_map(|pixel| [pixel[0], pixel[1], pixel[2]])
                    .collect(),
            )?)),
            DynamicImage::ImageRgb16(buffer) => {
                Ok(PixelArray::U16(PixelBuffer::new(&rgb, buffer.into_raw())?))
            }
            DynamicImage::ImageRgba16(buffer) => Ok(PixelArray::U16(PixelBuffer::new(
                &rgb,
                buffer
                    .into_raw()
                    .chunks_exact(4)
                    .flat_map(|pixel| [pixel[0], pixel[1], pixel[2]])
                    .collect(),
            )?)),
            DynamicImage::ImageRgb32F(buffer) => {
                Ok(PixelArray::F32(PixelBuffer::new(&rgb, buffer.into_raw())?))
            }
            DynamicImage::ImageRgba32F(buffer) => Ok(PixelArray::F32(PixelBuffer::new(
                &rgb,
                buffer
                    .into_raw()
                    .chunks_exact(4)
                    .flat_map(|pixel| [pixel[0], pixel[1], pixel[2]])
                    .collect(),
            )?)),
            _ => Err(CzarrError::ImageFormatError(
                "A dynamic image with a valid data type was not detected.",
            )),
        }
    }

    /// Initialize a new array from a numpy array buffer
    ///
    /// The numpy shape is kept as is, so rank checks are left to the caller.
    ///
    /// # Arguments
    ///
    /// * `npy` - A numpy array buffer in C order
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use npyz::NpyFile;
    /// use czarr_core::im::PixelArray;
    ///
    /// let bytes = std::fs::read("image.npy").unwrap();
    /// let npy = NpyFile::new(&bytes[..]).unwrap();
    /// let array = PixelArray::new_from_numpy(npy);
    /// ```
    pub fn new_from_numpy(npy: NpyFile<&[u8]>) -> Result<PixelArray, CzarrError> {
        if npy.order() != npyz::Order::C {
            return Err(CzarrError::ImageFormatError(
                "Only C-ordered numpy arrays are currently supported.",
            ));
        }

        let shape: Vec<usize> = npy.shape().iter().map(|&s| s as usize).collect();

        match npy.dtype() {
            NpyDType::Plain(x) => match (x.type_char(), x.size_field()) {
                (TypeChar::Bool, 1) => Ok(PixelArray::Bool(PixelBuffer::new(
                    &shape,
                    npy.into_vec().map_err(|_| CzarrError::ImageReadError)?,
                )?)),
                (TypeChar::Uint, 1) => Ok(PixelArray::U8(PixelBuffer::new(
                    &shape,
                    npy.into_vec().map_err(|_| CzarrError::ImageReadError)?,
                )?)),
                (TypeChar::Uint, 2) => Ok(PixelArray::U16(PixelBuffer::new(
                    &shape,
                    npy.into_vec().map_err(|_| CzarrError::ImageReadError)?,
                )?)),
                (TypeChar::Uint, 4) => Ok(PixelArray::U32(PixelBuffer::new(
                    &shape,
                    npy.into_vec().map_err(|_| CzarrError::ImageReadError)?,
                )?)),
                (TypeChar::Int, 4) => Ok(PixelArray::I32(PixelBuffer::new(
                    &shape,
                    npy.into_vec().map_err(|_| CzarrError::ImageReadError)?,
                )?)),
                (TypeChar::Int, 8) => Ok(PixelArray::I64(PixelBuffer::new(
                    &shape,
                    npy.into_vec().map_err(|_| CzarrError::ImageReadError)?,
                )?)),
                (TypeChar::Float, 4) => Ok(PixelArray::F32(PixelBuffer::new(
                    &shape,
                    npy.into_vec().map_err(|_| CzarrError::ImageReadError)?,
                )?)),
                (TypeChar::Float, 8) => Ok(PixelArray::F64(PixelBuffer::new(
                    &shape,
                    npy.into_vec().map_err(|_| CzarrError::ImageReadError)?,
                )?)),
                _ => Err(CzarrError::ImageFormatError(
                    "A numpy array with a valid data type was not detected.",
                )),
            },
            _ => Err(CzarrError::ImageFormatError(
                "Only plain numpy arrays are currently supported.",
            )),
        }
    }

    /// Save array
    ///
    /// # Arguments
    ///
    /// * `path` - A path to an image or numpy array with a valid extension
    ///
    /// ```no_run
    /// use czarr_core::im::PixelArray;
    /// let array = PixelArray::open("image.png").unwrap();
    /// array.save("image.npy").unwrap();
    /// ```
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CzarrError> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        if let Some(ext) = extension {
            if ext == "npy" {
                return self.save_as_numpy(path);
            }

            if constant::IMAGE_DYNAMIC_FORMATS.iter().any(|e| e == &ext) {
                return self.save_as_default(path);
            }
        }

        Err(CzarrError::ImageExtensionError)
    }

    /// Save array as a default image format
    ///
    /// Boolean masks are written as 0/255 grayscale, label images as 16-bit
    /// grayscale when every label fits, and floating point colour images
    /// (e.g. coloured labels in `[0, 1]`) as 8-bit RGB.
    pub fn save_as_default<P: AsRef<Path>>(&self, path: P) -> Result<(), CzarrError> {
        let shape = self.shape();
        let (height, width) = (self.height() as u32, self.width() as u32);
        let channels = match shape.len() {
            2 => 1,
            3 => shape[2],
            _ => 0,
        };

        match (self, channels) {
            (PixelArray::Bool(buffer), 1) => {
                ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(
                    width,
                    height,
                    buffer.iter().map(|&p| if p { 255u8 } else { 0u8 }).collect(),
                )
                .ok_or(CzarrError::ImageWriteError)?
                .save(path)
                .map_err(|_| CzarrError::ImageWriteError)
            }
            (PixelArray::U8(buffer), 1) => {
                ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(width, height, buffer.as_raw().clone())
                    .ok_or(CzarrError::ImageWriteError)?
                    .save(path)
                    .map_err(|_| CzarrError::ImageWriteError)
            }
            (PixelArray::U16(buffer), 1) => {
                ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(
                    width,
                    height,
                    buffer.as_raw().clone(),
                )
                .ok_or(CzarrError::ImageWriteError)?
                .save(path)
                .map_err(|_| CzarrError::ImageWriteError)
            }
            (PixelArray::U32(buffer), 1) => {
                if buffer.iter().any(|&p| p > u16::MAX as u32) {
                    return Err(CzarrError::ImageFormatError(
                        "Label images with more than 65535 labels must be saved as .npy.",
                    ));
                }

                ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(
                    width,
                    height,
                    buffer.iter().map(|&p| p as u16).collect(),
                )
                .ok_or(CzarrError::ImageWriteError)?
                .save(path)
                .map_err(|_| CzarrError::ImageWriteError)
            }
            (PixelArray::U8(buffer), 3) => {
                ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(width, height, buffer.as_raw().clone())
                    .ok_or(CzarrError::ImageWriteError)?
                    .save(path)
                    .map_err(|_| CzarrError::ImageWriteError)
            }
            (PixelArray::U16(buffer), 3) => {
                ImageBuffer::<Rgb<u16>, Vec<u16>>::from_raw(
                    width,
                    height,
                    buffer.as_raw().clone(),
                )
                .ok_or(CzarrError::ImageWriteError)?
                .save(path)
                .map_err(|_| CzarrError::ImageWriteError)
            }
            (PixelArray::F32(_), 3) | (PixelArray::F64(_), 3) => {
                ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(
                    width,
                    height,
                    self.to_f64()
                        .iter()
                        .map(|&v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
                        .collect(),
                )
                .ok_or(CzarrError::ImageWriteError)?
                .save(path)
                .map_err(|_| CzarrError::ImageWriteError)
            }
            _ => Err(CzarrError::ImageFormatError(
                "Only 1 or 3 channel images can be saved as a default image format (e.g. png).",
            )),
        }
    }

    /// Save array in numpy format keeping its shape and element type
    pub fn save_as_numpy<P: AsRef<Path>>(&self, path: P) -> Result<(), CzarrError> {
        let shape: Vec<u64> = self.shape().iter().map(|&s| s as u64).collect();

        match self {
            PixelArray::Bool(buffer) => write_numpy(path, buffer.as_raw(), &shape),
            PixelArray::U8(buffer) => write_numpy(path, buffer.as_raw(), &shape),
            PixelArray::U16(buffer) => write_numpy(path, buffer.as_raw(), &shape),
            PixelArray::U32(buffer) => write_numpy(path, buffer.as_raw(), &shape),
            PixelArray::I32(buffer) => write_numpy(path, buffer.as_raw(), &shape),
            PixelArray::I64(buffer) => write_numpy(path, buffer.as_raw(), &shape),
            PixelArray::F32(buffer) => write_numpy(path, buffer.as_raw(), &shape),
            PixelArray::F64(buffer) => write_numpy(path, buffer.as_raw(), &shape),
        }
    }
}

// <<< I/O METHODS

// >>> PROPERTY METHODS

impl_enum_dispatch!(PixelArray, Bool, U8, U16, U32, I32, I64, F32, F64; shape(&self) -> Vec<usize>);
impl_enum_dispatch!(PixelArray, Bool, U8, U16, U32, I32, I64, F32, F64; ndim(&self) -> usize);
impl_enum_dispatch!(PixelArray, Bool, U8, U16, U32, I32, I64, F32, F64; width(&self) -> usize);
impl_enum_dispatch!(PixelArray, Bool, U8, U16, U32, I32, I64, F32, F64; height(&self) -> usize);
impl_enum_dispatch!(PixelArray, Bool, U8, U16, U32, I32, I64, F32, F64; len(&self) -> usize);
impl_enum_dispatch!(PixelArray, Bool, U8, U16, U32, I32, I64, F32, F64; is_empty(&self) -> bool);

impl PixelArray {
    /// Element type of the array
    pub fn dtype(&self) -> DType {
        match self {
            PixelArray::Bool(_) => DType::Bool,
            PixelArray::U8(_) => DType::U8,
            PixelArray::U16(_) => DType::U16,
            PixelArray::U32(_) => DType::U32,
            PixelArray::I32(_) => DType::I32,
            PixelArray::I64(_) => DType::I64,
            PixelArray::F32(_) => DType::F32,
            PixelArray::F64(_) => DType::F64,
        }
    }
}

// <<< PROPERTY METHODS

// >>> CONVERSION METHODS

impl_enum_dispatch!(PixelArray, Bool, U8, U16, U32, I32, I64, F32, F64; to_f64(&self) -> Vec<f64>);
impl_enum_dispatch!(PixelArray, Bool, U8, U16, U32, I32, I64, F32, F64; to_bool(&self) -> Vec<bool>);
impl_enum_dispatch!(PixelArray, Bool, U8, U16, U32, I32, I64, F32, F64; to_unit_f64(&self) -> Vec<f64>);

impl_enum_dispatch!(
    /// An array with this array's shape and dtype holding `values` cast back
    ///
    /// # Arguments
    ///
    /// * `values` - Row-major values, one per element of this array
    ///
    /// # Examples
    ///
    /// ```
    /// use czarr_core::im::{DType, PixelArray, PixelBuffer};
    ///
    /// let array = PixelArray::from(PixelBuffer::new(&[1, 2], vec![0u8, 0]).unwrap());
    /// let cast = array.with_f64(&[3.7, 300.0]).unwrap();
    ///
    /// assert_eq!(cast.dtype(), DType::U8);
    /// assert_eq!(cast.to_f64(), vec![3.0, 255.0]);
    /// ```
    PixelArray, Bool, U8, U16, U32, I32, I64, F32, F64;
    with_f64(&self, values: &[f64]) -> Result<Self, CzarrError>
);

impl_enum_dispatch!(
    /// The same pixels viewed with a different shape of equal size
    PixelArray, Bool, U8, U16, U32, I32, I64, F32, F64;
    reshape(&self, shape: &[usize]) -> Result<Self, CzarrError>
);

impl PixelArray {
    /// Drop the length-one channel axis of a `(1, H, W)` or `(H, W, 1)` array
    ///
    /// Any other array, including single-row 2-D images, is returned as is.
    ///
    /// # Examples
    ///
    /// ```
    /// use czarr_core::im::{PixelArray, PixelBuffer};
    ///
    /// let array = PixelArray::from(PixelBuffer::new(&[4, 5, 1], vec![0u8; 20]).unwrap());
    /// assert_eq!(array.squeeze().shape(), vec![4, 5]);
    ///
    /// let row = PixelArray::from(PixelBuffer::new(&[1, 5], vec![0u8; 5]).unwrap());
    /// assert_eq!(row.squeeze().shape(), vec![1, 5]);
    /// ```
    pub fn squeeze(self) -> PixelArray {
        let plane = match self.shape().as_slice() {
            [1, height, width] | [height, width, 1] => vec![*height, *width],
            _ => return self,
        };

        self.reshape(&plane).unwrap_or(self)
    }
}

// <<< CONVERSION METHODS
