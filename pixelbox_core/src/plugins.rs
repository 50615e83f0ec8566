use crate::models::io::{ImageReader, ImageWriter};

pub trait ImageFormatSupportPlugin: Send + Sync {

    fn format_name(&self) -> String;

    fn reader(&self) -> Option<Box<dyn ImageReader>>;
    fn writer(&self) -> Option<Box<dyn ImageWriter>>;
}

pub type Plugins = Vec<Box<dyn ImageFormatSupportPlugin>>;

pub fn find_plugin<'a>(plugins: &'a Plugins, format_name: &str) -> Option<&'a dyn ImageFormatSupportPlugin> {
    plugins.iter()
        .find(|v| v.format_name().eq_ignore_ascii_case(format_name))
        .map(|v| v.as_ref())
}
