//! Error types.
//!
//! Only structural problems are errors. Per-pixel and per-row damage is
//! reported as a [`Warning`](crate::decode::Warning) next to the partial
//! image, and skipped byte literals as a
//! [`ParseIssue`](crate::source::ParseIssue) on the parse result.

use alloc::string::String;

/// Pixel data does not match the declared geometry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SizeError {
    #[error("expected {expected} pixels, got {found}")]
    PixelCountMismatch { expected: usize, found: usize },
    #[error("byte length {0} is not a whole number of RGBA pixels")]
    NotPixelAligned(usize),
    #[error("{width}x{height} does not fit 32-bit dimensions")]
    TooLarge { width: usize, height: usize },
}

/// Raised when ingesting hex pixel text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PixelDataError {
    #[error("`{0}` is not a hex byte")]
    BadToken(String),
    #[error("pixel data must be RGBA (4 bytes per pixel), got {0} values")]
    NotRgba(usize),
}

/// Fatal encode conditions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// A packed bit width other than 1, 2, 4 or 8 was requested.
    #[error("invalid bit depth {0}: expected 1, 2, 4 or 8")]
    InvalidBitDepth(u8),
    /// A caller-supplied palette does not have exactly `2^bits` entries.
    #[error("palette has {found} entries, format needs exactly {expected}")]
    PaletteSize { expected: usize, found: usize },
    /// A requested row stride is shorter than one packed row.
    #[error("row stride {stride} is shorter than the minimal row of {min} bytes")]
    InvalidStride { stride: u32, min: u32 },
    /// The value sequence handed to the packer does not cover the geometry.
    #[error("expected {expected} values, got {found}")]
    ValueCount { expected: usize, found: usize },
}

/// Fatal decode conditions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Width or height is absent or zero.
    #[error("image geometry is missing or zero")]
    MissingGeometry,
    /// Width or height does not fit an LVGL image header.
    #[error("{width}x{height} exceeds the 2047x2047 header limit")]
    TooLarge { width: u32, height: u32 },
    /// The color format tag names nothing this crate can decode.
    #[error("unsupported color format {0}")]
    UnsupportedFormat(String),
    /// Only raised by [`Decoded::into_complete`](crate::decode::Decoded::into_complete);
    /// plain decoding returns the complete rows instead.
    #[error("packed data ends after {complete_rows} of {height} rows")]
    TruncatedData { complete_rows: u32, height: u32 },
}

/// Raised when a palette cannot be loaded from raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaletteError {
    #[error("palette table needs {expected} bytes, got {found}")]
    TooShort { expected: usize, found: usize },
    #[error("palette has {found} entries, format needs exactly {expected}")]
    WrongSize { expected: usize, found: usize },
}

impl From<PaletteError> for EncodeError {
    fn from(e: PaletteError) -> Self {
        match e {
            PaletteError::TooShort { expected, found }
            | PaletteError::WrongSize { expected, found } => {
                EncodeError::PaletteSize { expected, found }
            }
        }
    }
}

/// Fatal parse condition for one textual artifact.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Neither an image descriptor nor a byte array was found.
    #[error("no image descriptor or byte array found")]
    StructuralParseFailure,
}

/// Raised by the expression evaluator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    #[error("unknown symbol `{0}`")]
    UnknownSymbol(String),
    #[error("unexpected token `{0}`")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("division by zero")]
    DivisionByZero,
    #[error("bad number `{0}`")]
    BadNumber(String),
    #[error("expression nested deeper than {0} levels")]
    TooDeep(u32),
}
