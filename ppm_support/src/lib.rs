#[macro_use]
extern crate log;
extern crate custom_error;

use pixelbox_core::{plugins::ImageFormatSupportPlugin, models::io::{ImageReader, ImageWriter}};

use reader::PPMReader;

pub mod reader;

pub struct PPMFormatSupportPlugin {
}

impl PPMFormatSupportPlugin {

    pub fn new() -> Self {
        PPMFormatSupportPlugin {}
    }
}

impl ImageFormatSupportPlugin for PPMFormatSupportPlugin {

    fn format_name(&self) -> String {
        "PPM".to_string()
    }

    fn reader(&self) -> Option<Box<dyn ImageReader>> {
        Some(Box::new(PPMReader::new()))
    }

    fn writer(&self) -> Option<Box<dyn ImageWriter>> {
        None
    }
}
