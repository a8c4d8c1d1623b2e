//! The `.graba` archive: a little-endian header followed by the packed bitstream.
//!
//! ```text
//! u32 padding_bits | u32 ext_len | ext bytes | u32 pair_count | (u8 symbol, u32 count)* | payload
//! ```
//!
//! The Huffman tree itself is never stored. Both sides rebuild it from the
//! frequency table, which is written in ascending symbol order.

use std::io::{self, Read, Seek, SeekFrom, Write};

use log::{debug, info};

use crate::bits::{BitWriter, pack_bits, unpack_bits};
use crate::error::{HuffmanError, Result};
use crate::huffman::{
    CodeTable, FreqTable, Node, build_code_table, build_huffman_tree, count_frequencies,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedContainer {
    /// Zero bits appended to the last payload byte, 0..=7.
    pub padding_bits: u32,
    /// Original file extension without the leading dot.
    pub extension: String,
    pub frequencies: FreqTable,
    pub payload: Vec<u8>,
}

impl CompressedContainer {
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_header(writer, self.padding_bits, &self.extension, &self.frequencies)?;
        writer.write_all(&self.payload)?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let padding_bits = read_u32(reader, "padding count")?;
        if padding_bits > 7 {
            return Err(HuffmanError::corrupt(format!(
                "padding count {} is out of range",
                padding_bits
            )));
        }

        let ext_len = read_u32(reader, "extension length")? as u64;
        let mut ext_bytes = Vec::new();
        reader.by_ref().take(ext_len).read_to_end(&mut ext_bytes)?;
        if ext_bytes.len() as u64 != ext_len {
            return Err(HuffmanError::corrupt("truncated header: extension"));
        }
        let extension = String::from_utf8(ext_bytes)
            .map_err(|_| HuffmanError::corrupt("extension is not valid UTF-8"))?;

        let pair_count = read_u32(reader, "frequency count")?;
        let mut frequencies = FreqTable::new();
        for _ in 0..pair_count {
            let mut symbol = [0u8; 1];
            read_exact_or_corrupt(reader, &mut symbol, "frequency table")?;
            let count = read_u32(reader, "frequency table")?;
            if count == 0 {
                return Err(HuffmanError::corrupt(format!(
                    "symbol {:#04x} has a zero count",
                    symbol[0]
                )));
            }
            if frequencies.insert(symbol[0], count as u64).is_some() {
                return Err(HuffmanError::corrupt(format!(
                    "symbol {:#04x} listed twice",
                    symbol[0]
                )));
            }
        }

        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;

        debug!(
            "Read container: ext '{}', {} symbols, {} payload bytes, {} padding bits",
            extension,
            frequencies.len(),
            payload.len(),
            padding_bits
        );

        Ok(Self {
            padding_bits,
            extension,
            frequencies,
            payload,
        })
    }
}

pub fn compress(data: &[u8], extension: &str) -> Result<CompressedContainer> {
    let frequencies = count_frequencies(data);
    let codes = build_code_table(&*build_huffman_tree(&frequencies)?);

    let bits = encode_data(data, &codes);
    let mut payload = Vec::with_capacity(bits.len().div_ceil(8));
    let padding_bits = pack_bits(&bits, &mut payload)? as u32;

    info!(
        "Compressed {} bytes into {} payload bytes ({} padding bits)",
        data.len(),
        payload.len(),
        padding_bits
    );

    Ok(CompressedContainer {
        padding_bits,
        extension: extension.to_owned(),
        frequencies,
        payload,
    })
}

/// Writes the archive for `data` straight into `sink`, packing codes as it
/// goes, then seeks back to patch the padding count. Leaves the sink
/// positioned at the end of the archive and returns the padding count.
pub fn compress_into<W: Write + Seek>(data: &[u8], extension: &str, sink: &mut W) -> Result<u32> {
    let frequencies = count_frequencies(data);
    let codes = build_code_table(&*build_huffman_tree(&frequencies)?);

    let start = sink.stream_position()?;
    write_header(sink, 0, extension, &frequencies)?;

    let mut writer = BitWriter::new(sink);
    for byte in data {
        writer.push_code(&codes[byte])?;
    }
    let padding_bits = writer.finish()? as u32;

    sink.seek(SeekFrom::Start(start))?;
    sink.write_all(&padding_bits.to_le_bytes())?;
    let end = sink.seek(SeekFrom::End(0))?;

    info!(
        "Compressed {} bytes into a {} byte archive ({} padding bits)",
        data.len(),
        end - start,
        padding_bits
    );
    Ok(padding_bits)
}

/// Returns the decoded bytes and the stored extension.
pub fn decompress(container: CompressedContainer) -> Result<(Vec<u8>, String)> {
    let CompressedContainer {
        padding_bits,
        extension,
        frequencies,
        payload,
    } = container;

    if frequencies.values().any(|&count| count == 0) {
        return Err(HuffmanError::corrupt("frequency table contains a zero count"));
    }
    let total = frequencies
        .values()
        .try_fold(0u64, |acc, &count| acc.checked_add(count))
        .ok_or_else(|| HuffmanError::corrupt("frequency total overflows"))?;
    if total == 0 {
        return Err(HuffmanError::corrupt("frequency table is empty"));
    }
    if padding_bits > 7 {
        return Err(HuffmanError::corrupt(format!(
            "padding count {} is out of range",
            padding_bits
        )));
    }

    let tree = build_huffman_tree(&frequencies)?;

    let mut bits = unpack_bits(&payload);
    let padding = padding_bits as usize;
    if padding > bits.len() {
        return Err(HuffmanError::corrupt(format!(
            "{} padding bits but only {} payload bits",
            padding,
            bits.len()
        )));
    }
    bits.truncate(bits.len() - padding);

    let data = decode_data(&bits, &tree)?;
    if data.len() as u64 != total {
        return Err(HuffmanError::corrupt(format!(
            "decoded {} symbols, frequency table accounts for {}",
            data.len(),
            total
        )));
    }

    info!(
        "Decompressed {} payload bytes into {} bytes (ext '{}')",
        payload.len(),
        data.len(),
        extension
    );
    Ok((data, extension))
}

fn encode_data(data: &[u8], codes: &CodeTable) -> String {
    let mut bits = String::new();
    for byte in data {
        bits.push_str(&codes[byte]);
    }
    debug!("Encoded {} symbols into {} bits", data.len(), bits.len());
    bits
}

fn decode_data(bits: &[u8], root: &Node) -> Result<Vec<u8>> {
    let mut result = Vec::new();
    let mut current = root;
    let mut in_path = false;

    for &bit in bits {
        let next = match current {
            Node::Internal { left, right, .. } => {
                if bit == 0 {
                    left.as_ref()
                } else {
                    right.as_ref()
                }
            }
            // Single-symbol archive: every code is "0".
            Node::Leaf { byte, .. } => {
                if bit != 0 {
                    return Err(HuffmanError::corrupt(
                        "unexpected 1 bit in a single-symbol archive",
                    ));
                }
                result.push(*byte);
                continue;
            }
        };

        match next {
            Node::Leaf { byte, .. } => {
                result.push(*byte);
                current = root;
                in_path = false;
            }
            Node::Internal { .. } => {
                current = next;
                in_path = true;
            }
        }
    }

    if in_path {
        return Err(HuffmanError::corrupt(
            "payload ends in the middle of a code",
        ));
    }
    Ok(result)
}

fn write_header<W: Write>(
    writer: &mut W,
    padding_bits: u32,
    extension: &str,
    frequencies: &FreqTable,
) -> Result<()> {
    writer.write_all(&padding_bits.to_le_bytes())?;
    writer.write_all(&to_u32(extension.len() as u64, "extension length")?.to_le_bytes())?;
    writer.write_all(extension.as_bytes())?;
    writer.write_all(&to_u32(frequencies.len() as u64, "frequency count")?.to_le_bytes())?;
    for (&symbol, &count) in frequencies {
        writer.write_all(&[symbol])?;
        writer.write_all(&to_u32(count, "symbol count")?.to_le_bytes())?;
    }
    Ok(())
}

fn to_u32(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        HuffmanError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} {} does not fit the archive format", what, value),
        ))
    })
}

fn read_u32<R: Read>(reader: &mut R, field: &str) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_exact_or_corrupt(reader, &mut buf, field)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_exact_or_corrupt<R: Read>(reader: &mut R, buf: &mut [u8], field: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => {
            HuffmanError::corrupt(format!("truncated header: {}", field))
        }
        _ => HuffmanError::Io(e),
    })
}
