mod array;
mod buffer;
mod pixel;

pub use array::PixelArray;
pub use buffer::PixelBuffer;
pub use pixel::{DType, Pixel};
