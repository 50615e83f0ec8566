use pixelbox_core::models::Pixel;

// see https://www.w3.org/Graphics/GIF/spec-gif89a.txt

pub const SIGNATURE: &[u8; 6] = b"GIF89a";

pub const EXTENSION_INTRODUCER: u8 = 0x21;
pub const GRAPHIC_CONTROL_LABEL: u8 = 0xF9;
pub const IMAGE_SEPARATOR: u8 = 0x2C;
pub const TRAILER: u8 = 0x3B;

pub const PALETTE_SIZE: usize = 256;
pub const LZW_MIN_CODE_SIZE: u8 = 8;
pub const MAX_CODE_SIZE: u8 = 12;
pub const MAX_DICTIONARY_SIZE: usize = 1 << MAX_CODE_SIZE;
pub const MAX_SUB_BLOCK_SIZE: usize = 255;

pub type Rgb = (u8, u8, u8);

#[derive(Clone, Debug, PartialEq)]
pub struct ColorTable {

    pub colors: Vec<Pixel>,
}

impl ColorTable {

    pub fn from_rgb(colors: &[Rgb]) -> Self {
        ColorTable {
            colors: colors.iter().map(|v| Pixel::from_rgb(v.0, v.1, v.2)).collect(),
        }
    }

    // size of table in bytes
    pub fn size(&self) -> usize {
        self.colors.len() * 3
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.size());

        for color in &self.colors {
            data.push(color.red);
            data.push(color.green);
            data.push(color.blue);
        }

        data
    }
}

pub fn clear_code(min_code_size: u8) -> u16 {
    1 << min_code_size
}

pub fn end_code(min_code_size: u8) -> u16 {
    clear_code(min_code_size) + 1
}

/// Seeds a decoding dictionary: one literal per root code, then empty clear and end entries.
pub fn init_dictionary(dictionary: &mut Vec<Vec<u8>>, min_code_size: u8) -> (usize, usize) {
    dictionary.clear();

    for i in 0..clear_code(min_code_size) {
        dictionary.push(vec![i as u8]);
    }

    let clear_index = dictionary.len();
    dictionary.push(Vec::new());

    let end_index = dictionary.len();
    dictionary.push(Vec::new());

    (clear_index, end_index)
}

pub fn should_increase_code_size(dictionary_size: usize, code_size: u8) -> bool {
    dictionary_size == 1 << code_size && code_size < MAX_CODE_SIZE
}
