#[macro_use]
extern crate log;
extern crate custom_error;

use pixelbox_core::{plugins::ImageFormatSupportPlugin, models::{ImageReader, ImageWriter}};

use reader::GIFReader;
use writer::GIFWriter;

pub mod common;
pub mod lzw;
pub mod quantization;
pub mod reader;
pub mod writer;

pub use lzw::lzw_encode;
pub use quantization::quantize;
pub use writer::{build_gif, GIFWriterError};

pub struct GIFFormatSupportPlugin {
}

impl GIFFormatSupportPlugin {

    pub fn new() -> Self {
        GIFFormatSupportPlugin {}
    }
}

impl ImageFormatSupportPlugin for GIFFormatSupportPlugin {

    fn format_name(&self) -> String {
        "GIF".to_string()
    }

    fn reader(&self) -> Option<Box<dyn ImageReader>> {
        Some(Box::new(GIFReader::new()))
    }

    fn writer(&self) -> Option<Box<dyn ImageWriter>> {
        Some(Box::new(GIFWriter::new()))
    }
}
