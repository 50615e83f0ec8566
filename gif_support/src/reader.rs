use bit_vec::BitVec;
use byteorder::{ByteOrder, LittleEndian};
use custom_error::custom_error;

use pixelbox_core::models::{Image, ImageIOError, ImageReader, Pixel};

use crate::common::{
    init_dictionary, should_increase_code_size, ColorTable, EXTENSION_INTRODUCER, GRAPHIC_CONTROL_LABEL,
    IMAGE_SEPARATOR, MAX_DICTIONARY_SIZE, TRAILER,
};

// see https://www.fileformat.info/format/gif/egff.htm

custom_error! {pub GIFReaderError
    InvalidHeader {description: String} = "Invalid header: {description}",
    InvalidBlock {description: String} = "Invalid block: {description}",
    InvalidCode {description: String} = "Invalid lzw code: {description}",
    UnexpectedEnd {description: String} = "Unexpected end of data while reading {description}",
    NotImplemented {description: String} = "Not implemented: {description}"
}

pub struct GIFReader {
}

pub struct GIF {
    pub header: Header,
    pub global_color_table: ColorTable,
    pub graphic_control: Option<GraphicControl>,
    pub descriptor: ImageDescriptor,
    pub indices: Vec<u8>,
}

pub struct Header {
    pub screen_width: u16,
    pub screen_height: u16,
    pub background_color: u8,

    number_of_global_color_table_entries: usize,
}

#[derive(Debug, PartialEq)]
pub struct GraphicControl {
    pub disposal_method: u8,
    pub transparent: bool,
    pub delay: u16, // hundredths of a second
    pub transparent_index: u8,
}

pub struct ImageDescriptor {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
}

impl GIFReader {

    pub fn new() -> Self {
        GIFReader {}
    }
}

impl ImageReader for GIFReader {

    fn read(&self, data: &[u8]) -> Result<Image, ImageIOError> {
        let gif = read_gif(data).map_err(|err| ImageIOError::FailedToRead {
            description: format!("failed to read gif: {}", err)
        })?;

        let colors = &gif.global_color_table.colors;
        let pixels = gif.indices.iter()
            .map(|v| colors.get(*v as usize).copied().ok_or_else(|| ImageIOError::FailedToRead {
                description: format!("color index {} is outside of color table with {} entries", v, colors.len()),
            }))
            .collect::<Result<Vec<Pixel>, ImageIOError>>()?;

        Ok(Image {
            width: gif.descriptor.width as usize,
            height: gif.descriptor.height as usize,
            pixels,
        })
    }
}

/// Reads the first image of a gif file, keeping raw color table indices.
pub fn read_gif(data: &[u8]) -> Result<GIF, GIFReaderError> {
    let mut data = data;

    let header = read_header(&mut data)?;
    let global_color_table = read_color_table(&mut data, header.number_of_global_color_table_entries)?;
    let mut graphic_control = None;

    loop {
        match take_byte(&mut data, "block introducer")? {
            EXTENSION_INTRODUCER => {
                let label = take_byte(&mut data, "extension label")?;

                if label == GRAPHIC_CONTROL_LABEL {
                    graphic_control = Some(read_graphic_control(&mut data)?);
                } else {
                    trace!("skipping extension block {:#x}", label);
                    read_sub_blocks(&mut data)?;
                }
            },
            IMAGE_SEPARATOR => break,
            TRAILER => return Err(GIFReaderError::InvalidBlock {
                description: "reached trailer before any image data".to_string(),
            }),
            other => return Err(GIFReaderError::InvalidBlock {
                description: format!("unexpected block introducer: {:#x}", other),
            }),
        }
    }

    let descriptor = read_image_descriptor(&mut data)?;
    let indices = read_image_data(&mut data, &descriptor)?;

    if data.first() != Some(&TRAILER) {
        warn!("gif has more blocks after the first image, ignoring them");
    }

    Ok(GIF {
        header,
        global_color_table,
        graphic_control,
        descriptor,
        indices,
    })
}

fn take<'a>(data: &mut &'a [u8], total: usize, description: &str) -> Result<&'a [u8], GIFReaderError> {
    if data.len() < total {
        return Err(GIFReaderError::UnexpectedEnd {
            description: description.to_string(),
        });
    }

    let (taken, rest) = data.split_at(total);
    *data = rest;
    Ok(taken)
}

fn take_byte(data: &mut &[u8], description: &str) -> Result<u8, GIFReaderError> {
    Ok(take(data, 1, description)?[0])
}

fn read_header(data: &mut &[u8]) -> Result<Header, GIFReaderError> {
    let header = take(data, 13, "header")?;

    match &header[0..3] {
        b"GIF" => {},
        signature => return Err(GIFReaderError::InvalidHeader {
            description: format!("Unexpected signature for GIF: {:x?}", signature),
        })
    };

    match &header[3..6] {
        b"89a" | b"87a" => {},
        version => return Err(GIFReaderError::NotImplemented {
            description: format!("Support for GIF version {:x?} not implemented", version)
        })
    };

    let screen_width = LittleEndian::read_u16(&header[6..8]);
    let screen_height = LittleEndian::read_u16(&header[8..10]);

    let packed: u8 = header[10];

    let size_of_global_color_table = packed & 0b111;
    let color_resolution = (packed & 0b1110000) >> 4;
    let global_color_table = (packed & 0b10000000) >> 7 == 1;
    let number_of_global_color_table_entries = 1 << (size_of_global_color_table + 1);

    trace!("packed is {:#010b}", packed);
    trace!("color resolution: {}", color_resolution);
    trace!("number of global color table entries: {}", number_of_global_color_table_entries);

    if !global_color_table {
        return Err(GIFReaderError::NotImplemented {
            description: "this gif does not use global color table".to_string(),
        });
    }

    Ok(Header {
        screen_width,
        screen_height,
        background_color: header[11],

        number_of_global_color_table_entries,
    })
}

fn read_color_table(data: &mut &[u8], number_of_entries: usize) -> Result<ColorTable, GIFReaderError> {
    let table = take(data, number_of_entries * 3, "global color table")?;

    Ok(ColorTable {
        colors: table.chunks_exact(3)
            .map(|v| Pixel::from_rgb(v[0], v[1], v[2]))
            .collect(),
    })
}

fn read_graphic_control(data: &mut &[u8]) -> Result<GraphicControl, GIFReaderError> {
    let block = take(data, 6, "graphic control extension")?;

    if block[0] != 4 {
        return Err(GIFReaderError::InvalidBlock {
            description: format!("unexpected size of graphic control extension: {}", block[0]),
        });
    }

    if block[5] != 0 {
        return Err(GIFReaderError::InvalidBlock {
            description: format!("unexpected block terminator for graphic control extension: {}", block[5]),
        });
    }

    let packed = block[1];

    Ok(GraphicControl {
        disposal_method: (packed & 0b11100) >> 2,
        transparent: packed & 0b1 == 1,
        delay: LittleEndian::read_u16(&block[2..4]),
        transparent_index: block[4],
    })
}

fn read_image_descriptor(data: &mut &[u8]) -> Result<ImageDescriptor, GIFReaderError> {
    let block = take(data, 9, "image descriptor")?;

    let packed = block[8];
    if packed & 0b10000000 != 0 {
        return Err(GIFReaderError::NotImplemented {
            description: "Local color tables are not supported".to_string(),
        });
    }

    if packed & 0b1000000 != 0 {
        return Err(GIFReaderError::NotImplemented {
            description: "Interlaced images are not supported".to_string(),
        });
    }

    Ok(ImageDescriptor {
        left: LittleEndian::read_u16(&block[0..2]),
        top: LittleEndian::read_u16(&block[2..4]),
        width: LittleEndian::read_u16(&block[4..6]),
        height: LittleEndian::read_u16(&block[6..8]),
    })
}

fn read_sub_blocks(data: &mut &[u8]) -> Result<Vec<u8>, GIFReaderError> {
    let mut result = Vec::new();

    loop {
        let length = take_byte(data, "sub-block length")? as usize;
        if length == 0 {
            return Ok(result);
        }

        result.extend_from_slice(take(data, length, "sub-block")?);
    }
}

fn read_image_data(data: &mut &[u8], descriptor: &ImageDescriptor) -> Result<Vec<u8>, GIFReaderError> {
    let min_code_size = take_byte(data, "lzw minimum code size")?;
    if !(2..=8).contains(&min_code_size) {
        return Err(GIFReaderError::InvalidBlock {
            description: format!("unsupported lzw minimum code size: {}", min_code_size),
        });
    }

    let compressed_data = read_sub_blocks(data)?;
    let mut indices = lzw_decode(&compressed_data, min_code_size)?;

    let total_pixels = descriptor.width as usize * descriptor.height as usize;
    if indices.len() < total_pixels {
        return Err(GIFReaderError::InvalidBlock {
            description: format!("expected {} pixels in image data, got {}", total_pixels, indices.len()),
        });
    }

    indices.truncate(total_pixels);
    Ok(indices)
}

/// Standard GIF LZW decoder.
pub fn lzw_decode(data: &[u8], min_code_size: u8) -> Result<Vec<u8>, GIFReaderError> {
    let bits = bit_vec_for_source_bytes(data);

    let mut indices: Vec<u8> = Vec::new();
    let mut dictionary: Vec<Vec<u8>> = Vec::new(); // index is a key
    let (clear_index, end_index) = init_dictionary(&mut dictionary, min_code_size);
    let mut code_size = min_code_size + 1;
    let mut offset = 0;
    let mut prev_code: Option<usize> = None;

    while offset + code_size as usize <= bits.len() {
        let code = read_bits(&bits, offset, code_size) as usize;
        offset += code_size as usize;

        if code == clear_index {
            init_dictionary(&mut dictionary, min_code_size);
            code_size = min_code_size + 1;
            prev_code = None;
            continue;
        }

        if code == end_index {
            return Ok(indices);
        }

        let entry = if code < dictionary.len() {
            let entry = dictionary[code].clone();

            if let Some(prev_code) = prev_code {
                let mut new_entry = dictionary[prev_code].clone();
                new_entry.push(entry[0]);
                push_entry(&mut dictionary, new_entry);
            }

            entry
        } else if code == dictionary.len() {
            // match to an entry that is being defined right now
            let prev_code = prev_code.ok_or_else(|| GIFReaderError::InvalidCode {
                description: format!("code {} refers to undefined entry without previous code", code),
            })?;

            let mut entry = dictionary[prev_code].clone();
            entry.push(entry[0]);
            push_entry(&mut dictionary, entry.clone());

            entry
        } else {
            return Err(GIFReaderError::InvalidCode {
                description: format!("code {} is outside of dictionary with {} entries", code, dictionary.len()),
            });
        };

        indices.extend_from_slice(&entry);
        prev_code = Some(code);

        if should_increase_code_size(dictionary.len(), code_size) {
            code_size += 1;
        }
    }

    warn!("lzw stream has no end of information code");
    Ok(indices)
}

fn push_entry(dictionary: &mut Vec<Vec<u8>>, entry: Vec<u8>) {
    if dictionary.len() < MAX_DICTIONARY_SIZE {
        dictionary.push(entry);
    }
}

pub(crate) fn read_bits(bits: &BitVec, offset: usize, total: u8) -> u16 {
    let mut result = 0;

    for i in 0..total {
        result <<= 1;
        let bit = if bits[offset + (total as usize - 1 - i as usize)] { 1 } else { 0 };
        result |= bit;
    }

    result
}

pub(crate) fn bit_vec_for_source_bytes(data: &[u8]) -> BitVec {
    BitVec::from_fn(data.len() * 8, |x| (data[x / 8] >> (x % 8)) & 0b1 == 1)
}
