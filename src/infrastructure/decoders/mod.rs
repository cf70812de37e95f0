//! Default decoders.

pub mod drain;
pub mod image_decoder;

pub use drain::DrainDecoder;
pub use image_decoder::ImageDecoder;
