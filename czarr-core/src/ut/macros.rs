// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

/// Forward a method call to the buffer held by every variant of a dtype enum
#[macro_export]
macro_rules! impl_enum_dispatch {
    // Match arms of a rebuilding method, with the call arguments as one group
    (@rebuild $value:expr, $fn_name:ident, $args:tt, $($variant:ident),*) => {
        Ok(match $value {
            $(Self::$variant(v) => Self::$variant(v.$fn_name $args ?),)*
        })
    };

    // Case when the method rebuilds a buffer of the same element type
    ($(#[$attr:meta])* $enum_name:ident, $($variant:ident),*; $fn_name:ident(&self, $($arg:ident : $arg_ty:ty),+) -> Result<Self, $err:ty>) => {
        impl $enum_name {
            $(#[$attr])*
            pub fn $fn_name(&self, $($arg: $arg_ty),+) -> Result<Self, $err> {
                $crate::impl_enum_dispatch!(@rebuild self, $fn_name, ($($arg),+), $($variant),*)
            }
        }
    };

    // Case when the method takes &self and has no arguments
    ($enum_name:ident, $($variant:ident),*; $fn_name:ident(&self) -> $ret:ty) => {
        impl $enum_name {
            pub fn $fn_name(&self) -> $ret {
                match self {
                    $(Self::$variant(v) => v.$fn_name(),)*
                }
            }
        }
    };
}
