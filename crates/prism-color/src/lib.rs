//! Prism Color - YUV→RGB conversion parameters and display colorspace.

pub mod display;
pub mod yuv;

pub use display::DisplayColorspace;
pub use yuv::{
    range_index, range_offset, ColorConversionMatrix, ColorConversionTable, ConversionParams, SampleShift,
    YuvStandard,
};
