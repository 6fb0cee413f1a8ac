// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::fmt;

use num::{Bounded, NumCast, ToPrimitive};

/// Element types that can be held by a `PixelArray`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    Bool,
    U8,
    U16,
    U32,
    I32,
    I64,
    F32,
    F64,
}

impl DType {
    /// True for the integer subpixel types (booleans excluded)
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DType::U8 | DType::U16 | DType::U32 | DType::I32 | DType::I64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            DType::Bool => "bool",
            DType::U8 => "u8",
            DType::U16 => "u16",
            DType::U32 => "u32",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::F32 => "f32",
            DType::F64 => "f64",
        };

        write!(f, "{}", name)
    }
}

/// A single array element that can round-trip through `f64`
///
/// Casting back from `f64` follows numpy `astype` semantics: integers are
/// truncated toward zero and saturate at the type bounds, NaN becomes zero,
/// and booleans are true for any non-zero value.
pub trait Pixel: Copy + Send + Sync + PartialEq + fmt::Debug + 'static {
    const DTYPE: DType;

    fn to_f64(self) -> f64;

    fn from_f64(value: f64) -> Self;

    /// The value mapped to 1.0 when rescaling to a unit range
    fn unit_max() -> f64;

    #[inline]
    fn is_nonzero(self) -> bool {
        self.to_f64() != 0.0
    }
}

impl Pixel for bool {
    const DTYPE: DType = DType::Bool;

    #[inline]
    fn to_f64(self) -> f64 {
        if self { 1.0 } else { 0.0 }
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value != 0.0
    }

    fn unit_max() -> f64 {
        1.0
    }

    #[inline]
    fn is_nonzero(self) -> bool {
        self
    }
}

macro_rules! impl_pixel_integer {
    ($($t:ty => $dtype:ident),*) => {
        $(
            impl Pixel for $t {
                const DTYPE: DType = DType::$dtype;

                #[inline]
                fn to_f64(self) -> f64 {
                    ToPrimitive::to_f64(&self).unwrap_or(0.0)
                }

                #[inline]
                fn from_f64(value: f64) -> Self {
                    if value.is_nan() {
                        return 0;
                    }

                    <$t as NumCast>::from(value.trunc()).unwrap_or(if value > 0.0 {
                        <$t as Bounded>::max_value()
                    } else {
                        <$t as Bounded>::min_value()
                    })
                }

                fn unit_max() -> f64 {
                    <$t as Bounded>::max_value() as f64
                }
            }
        )*
    };
}

impl_pixel_integer!(u8 => U8, u16 => U16, u32 => U32, i32 => I32, i64 => I64);

impl Pixel for f32 {
    const DTYPE: DType = DType::F32;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn unit_max() -> f64 {
        1.0
    }
}

impl Pixel for f64 {
    const DTYPE: DType = DType::F64;

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    fn unit_max() -> f64 {
        1.0
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_integer_cast_truncates() {
        assert_eq!(u8::from_f64(2.9), 2);
        assert_eq!(u16::from_f64(65534.7), 65534);
        assert_eq!(i32::from_f64(-3.7), -3);
    }

    #[test]
    fn test_integer_cast_saturates() {
        assert_eq!(u8::from_f64(300.0), 255);
        assert_eq!(u8::from_f64(-1.0), 0);
        assert_eq!(u16::from_f64(f64::NAN), 0);
    }

    #[test]
    fn test_bool_cast() {
        assert!(bool::from_f64(0.2));
        assert!(!bool::from_f64(0.0));
        assert_eq!(true.to_f64(), 1.0);
    }

    #[test]
    fn test_dtype_kind() {
        assert!(DType::U16.is_integer());
        assert!(!DType::Bool.is_integer());
        assert!(DType::F32.is_float());
        assert_eq!(DType::I64.to_string(), "i64");
    }
}
