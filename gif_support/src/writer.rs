use pixelbox_core::models::{image::CHANNELS, Image, ImageIOError, ImageWriter, ImageWriterOptions};

use byteorder::{ByteOrder, LittleEndian};
use custom_error::custom_error;

use crate::{
    common::{
        ColorTable, EXTENSION_INTRODUCER, GRAPHIC_CONTROL_LABEL, IMAGE_SEPARATOR, LZW_MIN_CODE_SIZE,
        MAX_SUB_BLOCK_SIZE, PALETTE_SIZE, SIGNATURE, TRAILER,
    },
    lzw::lzw_encode,
    quantization::quantize,
};

pub const OPTION_MAX_PIXELS: &str = "max_pixels";

custom_error! {pub GIFWriterError
    EmptyImage {width: usize, height: usize} = "Image has no pixels: {width}x{height}",
    InvalidInputShape {expected: usize, actual: usize} = "Expected {expected} bytes of rgba data, got {actual}",
    DimensionsTooLarge {width: usize, height: usize} = "Image of {width}x{height} does not fit into gif logical screen",
}

pub struct GIFWriter {
}

impl GIFWriter {

    pub fn new() -> Self {
        GIFWriter {
        }
    }
}

impl ImageWriter for GIFWriter {

    fn write(&self, image: &Image, options: &ImageWriterOptions) -> Result<Vec<u8>, ImageIOError> {
        let max_pixels = options.get_u32(OPTION_MAX_PIXELS, 0)? as usize;
        let total_pixels = image.width * image.height;

        if max_pixels > 0 && total_pixels > max_pixels {
            return Err(ImageIOError::InvalidInput {
                description: format!("image has {} pixels, limit is {}", total_pixels, max_pixels),
            });
        }

        build_gif(&image.to_rgba(), image.width, image.height).map_err(|err| ImageIOError::FailedToWrite {
            description: format!("failed to write gif: {}", err),
        })
    }
}

/// Encodes packed RGBA pixels as a single frame, opaque, non-interlaced GIF89a file.
pub fn build_gif(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>, GIFWriterError> {
    let (width, height) = validate_input(pixels, width, height)?;

    info!("reducing colors of {}x{} image to {}", width, height, PALETTE_SIZE);
    let (color_table, indices) = quantize(pixels);

    let compressed_data = lzw_encode(&indices, LZW_MIN_CODE_SIZE);
    debug!("compressed {} indices into {} bytes", indices.len(), compressed_data.len());

    let mut data = Vec::with_capacity(compressed_data.len() + compressed_data.len() / MAX_SUB_BLOCK_SIZE + 820);
    data.extend_from_slice(&write_header(width, height));
    data.extend_from_slice(&write_color_table(&color_table));
    data.extend_from_slice(&write_graphic_control_extension());
    data.extend_from_slice(&write_image_descriptor(width, height));
    data.push(LZW_MIN_CODE_SIZE);
    data.extend_from_slice(&write_sub_blocks(&compressed_data));
    data.push(TRAILER);

    Ok(data)
}

fn validate_input(pixels: &[u8], width: usize, height: usize) -> Result<(u16, u16), GIFWriterError> {
    if width == 0 || height == 0 {
        return Err(GIFWriterError::EmptyImage { width, height });
    }

    if width > u16::MAX as usize || height > u16::MAX as usize {
        return Err(GIFWriterError::DimensionsTooLarge { width, height });
    }

    let expected = width * height * CHANNELS;
    if pixels.len() != expected {
        return Err(GIFWriterError::InvalidInputShape { expected, actual: pixels.len() });
    }

    Ok((width as u16, height as u16))
}

fn write_header(width: u16, height: u16) -> Vec<u8> {
    let mut data: Vec<u8> = vec![0; 13];
    data[0..6].copy_from_slice(SIGNATURE);

    LittleEndian::write_u16(&mut data[6..8], width);
    LittleEndian::write_u16(&mut data[8..10], height);

    let size_of_global_color_table = (PALETTE_SIZE.trailing_zeros() - 1) as u8;

    let mut packed: u8 = 0;
    packed |= size_of_global_color_table;
    packed |= 7 << 4; // color resolution, 8 bits per channel
    packed |= 0b10000000; // use global color table
    data[10] = packed;

    // data[11] is background color index, data[12] is aspect ratio: both stay 0

    data
}

fn write_color_table(color_table: &ColorTable) -> Vec<u8> {
    let mut data = color_table.to_bytes();
    data.resize(PALETTE_SIZE * 3, 0);
    data
}

// Transparency is explicitly off, so viewers do not treat background index 0 as transparent.
fn write_graphic_control_extension() -> Vec<u8> {
    let mut data: Vec<u8> = vec![0; 8];
    data[0] = EXTENSION_INTRODUCER;
    data[1] = GRAPHIC_CONTROL_LABEL;
    data[2] = 4; // block size

    data[3] = 0; // packed: no disposal, no user input, no transparency
    LittleEndian::write_u16(&mut data[4..6], 0); // delay
    data[6] = 0; // transparent color index
    data[7] = 0; // block terminator

    data
}

fn write_image_descriptor(width: u16, height: u16) -> Vec<u8> {
    let mut data: Vec<u8> = vec![0; 10];
    data[0] = IMAGE_SEPARATOR;

    LittleEndian::write_u16(&mut data[1..3], 0); // left
    LittleEndian::write_u16(&mut data[3..5], 0); // top
    LittleEndian::write_u16(&mut data[5..7], width);
    LittleEndian::write_u16(&mut data[7..9], height);

    data[9] = 0; // no local color table, not interlaced

    data
}

/// Splits data into length-prefixed sub-blocks followed by a zero length terminator.
pub fn write_sub_blocks(data: &[u8]) -> Vec<u8> {
    let mut blocks = Vec::with_capacity(data.len() + data.len() / MAX_SUB_BLOCK_SIZE + 2);

    for chunk in data.chunks(MAX_SUB_BLOCK_SIZE) {
        blocks.push(chunk.len() as u8);
        blocks.extend_from_slice(chunk);
    }

    blocks.push(0);
    blocks
}

#[cfg(test)]
mod tests {
    use pixelbox_core::models::{ImageReader, Pixel};

    use crate::reader::{read_gif, GIFReader};

    use super::*;

    const COLOR_TABLE_START: usize = 13;
    const GRAPHIC_CONTROL_START: usize = COLOR_TABLE_START + PALETTE_SIZE * 3;
    const IMAGE_DESCRIPTOR_START: usize = GRAPHIC_CONTROL_START + 8;
    const IMAGE_DATA_START: usize = IMAGE_DESCRIPTOR_START + 10;

    fn noise_image(width: usize, height: usize) -> Vec<u8> {
        let mut state: u32 = 12345;

        (0..width * height * CHANNELS).map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        }).collect()
    }

    // walks sub-blocks starting at the lzw code size byte, returns the trailer position
    fn check_sub_blocks(data: &[u8]) -> usize {
        let mut offset = IMAGE_DATA_START + 1;

        loop {
            let length = data[offset] as usize;
            if length == 0 {
                return offset + 1;
            }

            assert!(length <= MAX_SUB_BLOCK_SIZE);
            offset += 1 + length;
        }
    }

    #[test]
    fn test_write_header() {
        assert_eq!(write_header(2, 3), vec![0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 2, 0, 3, 0, 0xF7, 0, 0]);
        assert_eq!(&write_header(300, 1)[6..10], &[0x2C, 0x01, 0x01, 0x00]);
    }

    #[test]
    fn test_write_sub_blocks() {
        assert_eq!(write_sub_blocks(&[]), vec![0]);
        assert_eq!(write_sub_blocks(&[1, 2, 3]), vec![3, 1, 2, 3, 0]);

        let blocks = write_sub_blocks(&vec![7; 600]);
        assert_eq!(blocks.len(), 600 + 3 + 1);
        assert_eq!(blocks[0], 255);
        assert_eq!(blocks[256], 255);
        assert_eq!(blocks[512], 90);
        assert_eq!(blocks[603], 0);
    }

    #[test]
    fn test_write_image_layout() {
        let image = Image::test_image();
        let data = build_gif(&image.to_rgba(), image.width, image.height)
            .expect("failed to write test image");

        assert_eq!(&data[0..6], b"GIF89a");
        assert_eq!(&data[6..13], &[4, 0, 4, 0, 0xF7, 0, 0]);
        assert_eq!(
            &data[GRAPHIC_CONTROL_START..IMAGE_DESCRIPTOR_START],
            &[0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            &data[IMAGE_DESCRIPTOR_START..IMAGE_DATA_START],
            &[0x2C, 0, 0, 0, 0, 4, 0, 4, 0, 0]
        );
        assert_eq!(data[IMAGE_DATA_START], 8);

        let trailer = check_sub_blocks(&data);
        assert_eq!(trailer, data.len() - 1);
        assert_eq!(data[trailer], 0x3B);
    }

    #[test]
    fn test_solid_image_keeps_full_color_table() {
        let image = Image::new(7, 5);
        let data = build_gif(&image.to_rgba(), 7, 5).expect("failed to write solid image");

        let gif = read_gif(&data).expect("failed to read solid image");
        assert_eq!(gif.global_color_table.colors.len(), PALETTE_SIZE);
        assert_eq!(gif.global_color_table.size(), 768);
        assert!(data[COLOR_TABLE_START..GRAPHIC_CONTROL_START].iter().all(|v| *v == 0));
        assert_eq!(data[GRAPHIC_CONTROL_START], 0x21);
    }

    #[test]
    fn test_write_is_deterministic() {
        let pixels = noise_image(40, 30);

        let first = build_gif(&pixels, 40, 30).expect("failed to write image");
        let second = build_gif(&pixels, 40, 30).expect("failed to write image");

        assert_eq!(first, second);
    }

    #[test]
    fn test_write_in_parallel() {
        let pixels = noise_image(32, 32);
        let expected = build_gif(&pixels, 32, 32).expect("failed to write image");

        let handles: Vec<_> = (0..4).map(|_| {
            let pixels = pixels.clone();
            std::thread::spawn(move || build_gif(&pixels, 32, 32))
        }).collect();

        for handle in handles {
            let data = handle.join()
                .expect("encoder thread panicked")
                .expect("failed to write image");
            assert_eq!(data, expected);
        }
    }

    #[test]
    fn test_invalid_input() {
        match build_gif(&[0; 15], 2, 2) {
            Err(GIFWriterError::InvalidInputShape { expected, actual }) => {
                assert_eq!(expected, 16);
                assert_eq!(actual, 15);
            },
            other => panic!("expected invalid input shape, got {:?}", other),
        }

        assert!(matches!(build_gif(&[], 0, 10), Err(GIFWriterError::EmptyImage { .. })));
        assert!(matches!(build_gif(&[], 70_000, 1), Err(GIFWriterError::DimensionsTooLarge { .. })));
    }

    #[test]
    fn test_write_two_by_two() {
        let red = Pixel::from_rgb(255, 0, 0);
        let blue = Pixel::from_rgb(0, 0, 255);
        let green = Pixel::from_rgb(0, 255, 0);

        let mut image = Image::new(2, 2);
        image.set_pixel(0, 0, red);
        image.set_pixel(1, 0, red.with_alpha_channel(0));
        image.set_pixel(0, 1, blue);
        image.set_pixel(1, 1, green);

        let data = GIFWriter::new().write(&image, &ImageWriterOptions::default())
            .expect("failed to write image");
        let image_read = GIFReader::new().read(&data).expect("failed to read image");

        assert_eq!(image_read.width, 2);
        assert_eq!(image_read.height, 2);
        assert!(image_read.get_pixel(0, 0).same_rgb(&red));
        assert!(image_read.get_pixel(1, 0).same_rgb(&red));
        assert!(image_read.get_pixel(0, 1).same_rgb(&blue));
        assert!(image_read.get_pixel(1, 1).same_rgb(&green));
    }

    #[test]
    fn test_write_noise_round_trip() {
        let (width, height) = (320, 240);
        let pixels = noise_image(width, height);

        let data = build_gif(&pixels, width, height).expect("failed to write noise image");
        assert_eq!(check_sub_blocks(&data), data.len() - 1);

        let gif = read_gif(&data).expect("failed to read noise image");
        let (color_table, indices) = quantize(&pixels);

        assert_eq!(gif.global_color_table, color_table);
        assert_eq!(gif.indices, indices);

        let graphic_control = gif.graphic_control.expect("graphic control extension should be present");
        assert!(!graphic_control.transparent);
        assert_eq!(graphic_control.transparent_index, 0);
        assert_eq!(graphic_control.delay, 0);
    }

    #[test]
    fn test_write_sampled_image() {
        // above the sampling threshold, every pixel is still mapped
        let (width, height) = (400, 260);
        let mut image = Image::new(width, height);
        for y in 0..height {
            for x in 0..width {
                image.set_pixel(x, y, Pixel::from_rgb((y % 256) as u8, (x / 2 % 256) as u8, 128));
            }
        }

        let data = GIFWriter::new().write(&image, &ImageWriterOptions::default())
            .expect("failed to write image");
        let gif = read_gif(&data).expect("failed to read image");

        assert_eq!(gif.header.screen_width as usize, width);
        assert_eq!(gif.header.screen_height as usize, height);
        assert_eq!(gif.indices, quantize(&image.to_rgba()).1);
    }

    #[test]
    fn test_max_pixels_option() {
        let image = Image::test_image();
        let options = ImageWriterOptions::default().with_option_u32(OPTION_MAX_PIXELS, 15);

        match GIFWriter::new().write(&image, &options) {
            Err(ImageIOError::InvalidInput { description }) => assert!(description.contains("limit is 15")),
            other => panic!("expected image to be rejected, got {:?}", other.map(|v| v.len())),
        }

        let options = ImageWriterOptions::default().with_option_u32(OPTION_MAX_PIXELS, 16);
        assert!(GIFWriter::new().write(&image, &options).is_ok());
    }
}
