use std::collections::HashMap;

use crate::common::{clear_code, end_code, MAX_CODE_SIZE, MAX_DICTIONARY_SIZE};

// see https://www.w3.org/Graphics/GIF/spec-gif89a.txt, appendix F

/// Packs variable width codes least significant bit first.
pub struct BitWriter {
    buffer: u32,
    filled: u8,
    output: Vec<u8>,
}

impl BitWriter {

    pub fn new() -> Self {
        BitWriter {
            buffer: 0,
            filled: 0,
            output: Vec::new(),
        }
    }

    pub fn write_code(&mut self, code: u16, code_size: u8) {
        self.buffer |= (code as u32) << self.filled;
        self.filled += code_size;

        while self.filled >= 8 {
            self.output.push(self.buffer as u8);
            self.buffer >>= 8;
            self.filled -= 8;
        }
    }

    pub fn finish(mut self) -> Vec<u8> {
        if self.filled > 0 {
            self.output.push(self.buffer as u8);
        }

        self.output
    }
}

struct LZWEncoder {
    min_code_size: u8,
    code_size: u8,
    clear_code: u16,
    end_code: u16,
    next_code: u16,
    dictionary: HashMap<(u16, u8), u16>, // (prefix code, next index) -> code
    bits: BitWriter,
}

impl LZWEncoder {

    fn new(min_code_size: u8) -> Self {
        let clear_code = clear_code(min_code_size);
        let end_code = end_code(min_code_size);

        LZWEncoder {
            min_code_size,
            code_size: min_code_size + 1,
            clear_code,
            end_code,
            next_code: end_code + 1,
            dictionary: HashMap::new(),
            bits: BitWriter::new(),
        }
    }

    fn emit(&mut self, code: u16) {
        self.bits.write_code(code, self.code_size);
    }

    fn reset(&mut self) {
        self.dictionary.clear();
        self.next_code = self.end_code + 1;
        self.code_size = self.min_code_size + 1;
    }

    fn add_entry(&mut self, prefix: u16, index: u8) {
        if (self.next_code as usize) < MAX_DICTIONARY_SIZE {
            self.dictionary.insert((prefix, index), self.next_code);
            self.next_code += 1;

            if self.next_code > 1 << self.code_size && self.code_size < MAX_CODE_SIZE {
                self.code_size += 1;
            }
        } else {
            trace!("lzw dictionary is full, emitting clear code");
            self.emit(self.clear_code);
            self.reset();
        }
    }
}

/// Compresses color table indices with the variable width LZW used by GIF.
/// Every index must be below `1 << min_code_size`.
pub fn lzw_encode(indices: &[u8], min_code_size: u8) -> Vec<u8> {
    debug_assert!(indices.iter().all(|v| (*v as u16) < clear_code(min_code_size)));

    let mut encoder = LZWEncoder::new(min_code_size);
    encoder.emit(encoder.clear_code);

    let mut indices = indices.iter();
    let mut prefix = match indices.next() {
        Some(v) => *v as u16,
        None => {
            encoder.emit(encoder.end_code);
            return encoder.bits.finish();
        }
    };

    for &index in indices {
        if let Some(code) = encoder.dictionary.get(&(prefix, index)) {
            prefix = *code;
            continue;
        }

        encoder.emit(prefix);
        encoder.add_entry(prefix, index);
        prefix = index as u16;
    }

    encoder.emit(prefix);
    encoder.emit(encoder.end_code);

    encoder.bits.finish()
}
