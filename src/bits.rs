use std::io::Write;

use log::trace;

use crate::error::{HuffmanError, Result};

const BYTE_SIZE: u8 = 8;

/// Accumulates '0'/'1' bits MSB-first and hands every complete byte to the sink.
pub struct BitWriter<'a, W: Write> {
    sink: &'a mut W,
    current_byte: u8,
    bit_count: u8,
    bytes_written: u64,
}

impl<'a, W: Write> BitWriter<'a, W> {
    pub fn new(sink: &'a mut W) -> Self {
        Self {
            sink,
            current_byte: 0,
            bit_count: 0,
            bytes_written: 0,
        }
    }

    pub fn push_bit(&mut self, bit: char) -> Result<()> {
        let value = match bit {
            '0' => 0,
            '1' => 1,
            other => return Err(HuffmanError::InvalidBit(other)),
        };

        self.current_byte = (self.current_byte << 1) | value;
        self.bit_count += 1;

        if self.bit_count == BYTE_SIZE {
            self.sink.write_all(&[self.current_byte])?;
            self.bytes_written += 1;
            self.current_byte = 0;
            self.bit_count = 0;
        }
        Ok(())
    }

    pub fn push_code(&mut self, code: &str) -> Result<()> {
        for bit in code.chars() {
            self.push_bit(bit)?;
        }
        Ok(())
    }

    /// Flushes a partial byte (zero-filled on the right) and returns how many
    /// padding bits that took, 0 when the stream ended on a byte boundary.
    pub fn finish(mut self) -> Result<u8> {
        let mut padding = 0;
        if self.bit_count > 0 {
            padding = BYTE_SIZE - self.bit_count;
            self.sink.write_all(&[self.current_byte << padding])?;
            self.bytes_written += 1;
        }
        trace!(
            "Packed {} bytes with {} padding bits",
            self.bytes_written, padding
        );
        Ok(padding)
    }
}

pub fn pack_bits<W: Write>(bits: &str, sink: &mut W) -> Result<u8> {
    let mut writer = BitWriter::new(sink);
    writer.push_code(bits)?;
    writer.finish()
}

/// Expands every byte into eight 0/1 values, most significant bit first.
pub fn unpack_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * BYTE_SIZE as usize);
    for &byte in bytes {
        for i in (0..BYTE_SIZE).rev() {
            bits.push((byte >> i) & 1);
        }
    }
    trace!("Expanded {} bytes into {} bits.", bytes.len(), bits.len());
    bits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(bits: &str) -> (Vec<u8>, u8) {
        let mut out = Vec::new();
        let padding = pack_bits(bits, &mut out).unwrap();
        (out, padding)
    }

    #[test]
    fn partial_byte_is_left_aligned() {
        assert_eq!(pack("1110"), (vec![0b1110_0000], 4));
        assert_eq!(pack("1"), (vec![0b1000_0000], 7));
    }

    #[test]
    fn full_bytes_need_no_padding() {
        assert_eq!(pack("0100000101000010"), (vec![0x41, 0x42], 0));
        assert_eq!(pack(""), (vec![], 0));
    }

    #[test]
    fn padding_matches_bit_count() {
        for len in 0..40usize {
            let bits: String = (0..len).map(|i| if i % 3 == 0 { '1' } else { '0' }).collect();
            let (bytes, padding) = pack(&bits);
            assert_eq!(padding as usize, (8 - len % 8) % 8);
            assert_eq!(bytes.len(), len.div_ceil(8));
        }
    }

    #[test]
    fn rejects_non_binary_characters() {
        let mut out = Vec::new();
        assert!(matches!(
            pack_bits("01x1", &mut out),
            Err(HuffmanError::InvalidBit('x'))
        ));
    }

    #[test]
    fn unpack_is_msb_first() {
        assert_eq!(unpack_bits(&[0b1010_0001]), vec![1, 0, 1, 0, 0, 0, 0, 1]);
        assert!(unpack_bits(&[]).is_empty());
    }

    #[test]
    fn unpack_reverses_pack() {
        let bits = "1101001110001";
        let (bytes, padding) = pack(bits);
        let mut unpacked = unpack_bits(&bytes);
        unpacked.truncate(unpacked.len() - padding as usize);
        let restored: String = unpacked.iter().map(|b| if *b == 1 { '1' } else { '0' }).collect();
        assert_eq!(restored, bits);
    }
}
