use thiserror::Error;

/// Everything that can go wrong while building, packing or reading an archive.
#[derive(Debug, Error)]
pub enum HuffmanError {
    #[error("nothing to compress: input is empty")]
    EmptyInput,

    /// The bit packer was handed something other than '0' or '1'.
    /// This is a bug in the caller, not a property of the input data.
    #[error("invalid bit {0:?} in code stream")]
    InvalidBit(char),

    #[error("corrupt archive: {0}")]
    CorruptStream(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HuffmanError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        HuffmanError::CorruptStream(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, HuffmanError>;
