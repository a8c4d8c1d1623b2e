//! Huffman file compression into the `.graba` archive format.
//!
//! ```
//! use huffman_graba::{compress, decompress};
//!
//! let archive = compress(b"aaab", "txt")?;
//! assert_eq!(archive.payload, vec![0b1110_0000]);
//!
//! let (data, extension) = decompress(archive)?;
//! assert_eq!(data, b"aaab");
//! assert_eq!(extension, "txt");
//! # Ok::<(), huffman_graba::HuffmanError>(())
//! ```
//!
//! Inputs and outputs are held in memory in full.

pub mod bits;
pub mod container;
pub mod error;
pub mod huffman;

pub use container::{CompressedContainer, compress, compress_into, decompress};
pub use error::{HuffmanError, Result};

/// Extension given to archives by the `encode` binary.
pub const ARCHIVE_EXTENSION: &str = "graba";
