use std::str::from_utf8;

use byteorder::{BigEndian, ByteOrder};
use custom_error::custom_error;

use pixelbox_core::models::{Image, ImageIOError, ImageReader, Pixel};

// see http://netpbm.sourceforge.net/doc/ppm.html

custom_error! {pub PPMReaderError
    InvalidHeader {description: String} = "Invalid header: {description}",
    InvalidRaster {description: String} = "Invalid raster: {description}",
    NotImplemented {description: String} = "Not implemented: {description}"
}

#[derive(Debug)]
struct Header {
    magic_number: String,
    width: usize,
    height: usize,
    max_color_value: usize,
}

trait RasterReader {
    fn read_raster(&self, header: &Header, data: &[u8]) -> Result<Vec<Pixel>, PPMReaderError>;
}

struct P3RasterReader {
}

impl RasterReader for P3RasterReader {
    fn read_raster(&self, header: &Header, mut data: &[u8]) -> Result<Vec<Pixel>, PPMReaderError> {
        let mut pixels = Vec::new();

        for _ in 0..header.width * header.height {
            let mut channels = [0u8; 3];

            for channel in channels.iter_mut() {
                data = skip_whitespaces_and_comments(data);
                let (value, rest) = read_number(data, "color value")
                    .map_err(|err| PPMReaderError::InvalidRaster { description: err.to_string() })?;
                *channel = normalize(value, header.max_color_value)?;
                data = rest;
            }

            pixels.push(Pixel::from_rgb(channels[0], channels[1], channels[2]));
        }

        Ok(pixels)
    }
}

struct P6RasterReader {
}

impl RasterReader for P6RasterReader {
    fn read_raster(&self, header: &Header, data: &[u8]) -> Result<Vec<Pixel>, PPMReaderError> {
        // exactly one whitespace separates the header from binary data
        match data.first() {
            Some(v) if is_whitespace(*v) => {},
            _ => return Err(PPMReaderError::InvalidHeader {
                description: "expected whitespace after max color value".to_string(),
            }),
        };
        let data = &data[1..];

        let bytes_per_sample = if header.max_color_value < 256 { 1 } else { 2 };
        let expected = header.width * header.height * 3 * bytes_per_sample;
        if data.len() < expected {
            return Err(PPMReaderError::InvalidRaster {
                description: format!("expected {} bytes of raster data, got {}", expected, data.len()),
            });
        }

        let samples: Vec<usize> = if bytes_per_sample == 1 {
            data[..expected].iter().map(|v| *v as usize).collect()
        } else {
            data[..expected].chunks_exact(2).map(|v| BigEndian::read_u16(v) as usize).collect()
        };

        samples.chunks_exact(3)
            .map(|v| -> Result<Pixel, PPMReaderError> {
                Ok(Pixel::from_rgb(
                    normalize(v[0], header.max_color_value)?,
                    normalize(v[1], header.max_color_value)?,
                    normalize(v[2], header.max_color_value)?,
                ))
            })
            .collect()
    }
}

fn get_raster_reader(magic_number: &str) -> Result<Box<dyn RasterReader>, PPMReaderError> {
    match magic_number {
        "P3" => Ok(Box::new(P3RasterReader {})),
        "P6" => Ok(Box::new(P6RasterReader {})),
        other => Err(PPMReaderError::NotImplemented {
            description: format!("Current PPM reader does not support {:?} magic number", other),
        }),
    }
}

fn normalize(value: usize, max_value: usize) -> Result<u8, PPMReaderError> {
    if value > max_value {
        return Err(PPMReaderError::InvalidRaster {
            description: format!("color value {} is above max color value {}", value, max_value),
        });
    }

    Ok((255 * value / max_value) as u8)
}

fn is_whitespace(char: u8) -> bool {
    // 9 - TAB; 10 - LF; 11 - VT; 12 - FF; 13 - CR; 32 - SPACE;
    matches!(char, 9..=13 | 32)
}

fn read_number<'a>(data: &'a [u8], description: &str) -> Result<(usize, &'a [u8]), PPMReaderError> {
    let end = data.iter()
        .position(|v| is_whitespace(*v) || *v == b'#')
        .unwrap_or_else(|| data.len());

    let text = from_utf8(&data[..end]).map_err(|err| PPMReaderError::InvalidHeader {
        description: format!("{} is not valid utf-8: {}", description, err),
    })?;

    let value = text.parse::<usize>().map_err(|err| PPMReaderError::InvalidHeader {
        description: format!("failed to parse {} from {:?}: {}", description, text, err),
    })?;

    Ok((value, &data[end..]))
}

fn skip_whitespaces_and_comments(mut data: &[u8]) -> &[u8] {
    loop {
        match data.first() {
            Some(v) if is_whitespace(*v) => data = &data[1..],
            Some(b'#') => {
                data = match data.iter().position(|v| *v == b'\n') {
                    Some(i) => &data[i + 1..],
                    None => &[],
                };
            },
            _ => return data,
        }
    }
}

fn read_header(data: &[u8]) -> Result<(Header, &[u8]), PPMReaderError> {
    if data.len() < 2 {
        return Err(PPMReaderError::InvalidHeader {
            description: "file is too short for magic number".to_string(),
        });
    }

    let magic_number = from_utf8(&data[0..2]).map_err(|err| PPMReaderError::InvalidHeader {
        description: format!("bad magic number: {}", err),
    })?;

    let data = skip_whitespaces_and_comments(&data[2..]);
    let (width, data) = read_number(data, "width")?;
    let data = skip_whitespaces_and_comments(data);
    let (height, data) = read_number(data, "height")?;
    let data = skip_whitespaces_and_comments(data);
    let (max_color_value, data) = read_number(data, "max color value")?;

    if max_color_value == 0 || max_color_value > u16::MAX as usize {
        return Err(PPMReaderError::InvalidHeader {
            description: format!("max color value should be in 1..=65535, got {}", max_color_value),
        });
    }

    if width.checked_mul(height).and_then(|v| v.checked_mul(6)).is_none() {
        return Err(PPMReaderError::InvalidHeader {
            description: format!("image of {}x{} is too large", width, height),
        });
    }

    Ok((Header {
        magic_number: magic_number.to_owned(),
        width,
        height,
        max_color_value,
    }, data))
}

fn read_ppm(data: &[u8]) -> Result<Image, PPMReaderError> {
    let (header, data) = read_header(data)?;
    debug!("ppm header: {:?}", header);

    let raster_reader = get_raster_reader(&header.magic_number)?;
    let pixels = raster_reader.read_raster(&header, data)?;

    Ok(Image {
        width: header.width,
        height: header.height,
        pixels,
    })
}

pub struct PPMReader {
}

impl PPMReader {

    pub const fn new() -> Self {
        PPMReader {}
    }
}

impl ImageReader for PPMReader {

    fn read(&self, data: &[u8]) -> Result<Image, ImageIOError> {
        read_ppm(data).map_err(|err| ImageIOError::FailedToRead {
            description: format!("failed to read ppm: {}", err),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs::read;

    use super::*;

    #[test]
    fn test_read_simple() {
        let simple_ppm = read("assets/simple.ppm")
            .expect("Failed to load assets/simple.ppm");
        let image = PPMReader::new().read(&simple_ppm).expect("Failed to read the image");

        assert_eq!(image.width, 4);
        assert_eq!(image.height, 4);
        assert_eq!(image.pixels, Image::test_image().pixels);
    }

    #[test]
    fn test_read_low_max_value() {
        let ppm = read("assets/low_maxval.ppm")
            .expect("Failed to load assets/low_maxval.ppm");
        let image = PPMReader::new().read(&ppm).expect("Failed to read the image");

        assert_eq!(image.pixels, vec![Pixel::from_rgb(255, 0, 0), Pixel::from_rgb(0, 255, 51)]);
    }

    #[test]
    fn test_read_binary() {
        let mut data = b"P6 # binary\n2 1\n255\n".to_vec();
        data.extend_from_slice(&[1, 2, 3, 32, 10, 35]);

        let image = read_ppm(&data).expect("Failed to read binary ppm");

        assert_eq!(image.pixels, vec![Pixel::from_rgb(1, 2, 3), Pixel::from_rgb(32, 10, 35)]);
    }

    #[test]
    fn test_read_binary_16_bit() {
        let mut data = b"P6\n1 1\n65535\n".to_vec();
        data.extend_from_slice(&[0xFF, 0xFF, 0x00, 0x00, 0x80, 0x00]);

        let image = read_ppm(&data).expect("Failed to read 16 bit ppm");

        assert_eq!(image.pixels, vec![Pixel::from_rgb(255, 0, 127)]);
    }

    #[test]
    fn test_truncated_binary() {
        let mut data = b"P6\n2 2\n255\n".to_vec();
        data.extend_from_slice(&[1, 2, 3]);

        assert!(matches!(read_ppm(&data), Err(PPMReaderError::InvalidRaster { .. })));
    }

    #[test]
    fn test_unsupported_magic_number() {
        assert!(matches!(read_ppm(b"P5\n1 1\n255\n\x00"), Err(PPMReaderError::NotImplemented { .. })));
    }

    #[test]
    fn test_invalid_header() {
        assert!(matches!(read_ppm(b"P3\nfour 4\n255\n"), Err(PPMReaderError::InvalidHeader { .. })));
        assert!(matches!(read_ppm(b"P3\n1 1\n0\n0 0 0"), Err(PPMReaderError::InvalidHeader { .. })));
        assert!(matches!(read_ppm(b"P"), Err(PPMReaderError::InvalidHeader { .. })));
    }

    #[test]
    fn test_value_above_max() {
        assert!(matches!(read_ppm(b"P3\n1 1\n15\n16 0 0"), Err(PPMReaderError::InvalidRaster { .. })));
    }
}
