pub mod color;
pub mod connected;
pub mod filter;
pub mod morphology;
pub mod threshold;

pub use color::label_to_rgb;
pub use connected::{Connectivity, UnionFind, component_sizes, label_components};
pub use filter::{gaussian_filter, gaussian_kernel, median_filter};
pub use morphology::{
    Footprint, FootprintRow, black_tophat, clear_border, closing, dilation, erosion, opening,
    remove_small_holes, remove_small_objects, white_tophat,
};
pub use threshold::{Histogram, histogram, threshold_otsu, threshold_triangle};
