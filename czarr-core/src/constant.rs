// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

// All currently supported image formats
pub const SUPPORTED_IMAGE_FORMATS: [&str; 11] = [
    "bmp", "jpeg", "jpg", "png", "pbm", "pgm", "ppm", "tif", "tiff", "webp", "npy",
];

// The currently supported common image formats
pub const IMAGE_DYNAMIC_FORMATS: [&str; 10] = [
    "bmp", "jpeg", "jpg", "png", "pbm", "pgm", "ppm", "tif", "tiff", "webp",
];

// Table formats accepted by `io::write_table`
pub const SUPPORTED_TABLE_FORMATS: [&str; 5] = ["csv", "tsv", "txt", "parquet", "pq"];

// Number of bins used when computing histograms of floating point images
pub const HISTOGRAM_BINS: usize = 256;

// Integer images use one bin per value unless the value range exceeds this
pub const INTEGER_HISTOGRAM_MAX_BINS: usize = 1 << 20;

// Gaussian kernels are truncated at this many standard deviations
pub const GAUSSIAN_TRUNCATE: f64 = 4.0;

// Opacity of label colours when overlaid on an intensity image
pub const LABEL_OVERLAY_ALPHA: f64 = 0.3;

// Colour cycle for labelled objects: red, blue, yellow, magenta, green,
// indigo, darkorange, cyan, pink, yellowgreen
pub const LABEL_COLORS: [[u8; 3]; 10] = [
    [0xff, 0x00, 0x00],
    [0x00, 0x00, 0xff],
    [0xff, 0xff, 0x00],
    [0xff, 0x00, 0xff],
    [0x00, 0x80, 0x00],
    [0x4b, 0x00, 0x82],
    [0xff, 0x8c, 0x00],
    [0x00, 0xff, 0xff],
    [0xff, 0xc0, 0xcb],
    [0x9a, 0xcd, 0x32],
];

// Default parameters of `ArrayProcessor::label_objects`
pub const DEFAULT_MIN_SIZE: i64 = 10;
pub const DEFAULT_MAX_SIZE: i64 = 100_000_000;
pub const DEFAULT_MAX_HOLESIZE: i64 = 1;
pub const DEFAULT_MEASURE_PROPERTIES: [&str; 4] = ["label", "area", "centroid", "bbox"];

// Default radius of the background subtraction structuring element
pub const DEFAULT_BACKGROUND_RADIUS: i64 = 50;
