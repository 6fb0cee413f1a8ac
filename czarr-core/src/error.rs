// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CzarrError {
    TypeError(&'static str),
    ValueError(String),
    BufferSizeError,
    ShapeError(String),
    ThresholdError(&'static str),
    ImageReadError,
    ImageWriteError,
    ImageExtensionError,
    ImageFormatError(&'static str),
    TableError(String),
    ZarrError(String),
    NoFileError(String),
    DirError(String),
    OtherError(String),
}

impl fmt::Display for CzarrError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CzarrError::TypeError(message) => {
                write!(f, "[czarr::TypeError] {}", message)
            }
            CzarrError::ValueError(message) => {
                write!(f, "[czarr::ValueError] {}", message)
            }
            CzarrError::BufferSizeError => {
                write!(
                    f,
                    "[czarr::BufferSizeError] The buffer length does not match the product of the provided shape."
                )
            }
            CzarrError::ShapeError(message) => {
                write!(f, "[czarr::ShapeError] Array shapes are incompatible. {}", message)
            }
            CzarrError::ThresholdError(message) => {
                write!(
                    f,
                    "[czarr::ThresholdError] Failed to compute threshold. {}",
                    message
                )
            }
            CzarrError::ImageReadError => {
                write!(f, "[czarr::ImageReadError] Failed to read image.")
            }
            CzarrError::ImageWriteError => {
                write!(f, "[czarr::ImageWriteError] Failed to write image.")
            }
            CzarrError::ImageExtensionError => {
                write!(
                    f,
                    "[czarr::ImageExtensionError] Could not detect a valid image extension for input."
                )
            }
            CzarrError::ImageFormatError(message) => {
                write!(
                    f,
                    "[czarr::ImageFormatError] Unsupported image format. {}",
                    message
                )
            }
            CzarrError::TableError(message) => {
                write!(f, "[czarr::TableError] {}.", message)
            }
            CzarrError::ZarrError(message) => {
                write!(f, "[czarr::ZarrError] {}.", message)
            }
            CzarrError::NoFileError(message) => {
                write!(
                    f,
                    "[czarr::NoFileError] File could not be found. {}.",
                    message
                )
            }
            CzarrError::DirError(message) => {
                write!(
                    f,
                    "[czarr::DirError] Directory could not be read. {}.",
                    message
                )
            }
            CzarrError::OtherError(message) => {
                write!(f, "[czarr::OtherError] Error: {}.", message)
            }
        }
    }
}

impl std::error::Error for CzarrError {}
