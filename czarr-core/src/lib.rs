// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

pub mod config;
pub mod constant;
pub mod cv;
pub mod error;
pub mod im;
pub mod io;
pub mod mp;
pub mod processor;
pub mod ut;

pub use config::PipelineConfig;
pub use error::CzarrError;
pub use processor::{ArrayProcessor, LabelParams, LabeledObjects, subtract_background};
