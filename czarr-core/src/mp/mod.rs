pub mod regionprops;

pub use regionprops::{Region, RegionProperty, parse_properties, region_table, regionprops};
