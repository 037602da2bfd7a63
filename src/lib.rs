//! # lvpack
//!
//! *Pack your pixels for the panel.*
//!
//! Bit-exact encoding and decoding of LVGL image descriptors: RGB332,
//! RGB565 with or without a trailing alpha byte, RGB888, 32-bit BGRA/RGBA,
//! alpha-only and palette-indexed layouts of 1, 2, 4 or 8 bits per pixel.
//! Every path starts or ends at a [`PixelBuffer`] of `Rgba<u8>`.
//!
//! ```
//! use lvpack::{EncodeOptions, ImageDescriptor, PixelBuffer, PixelFormat, decode, encode};
//! use rgb::Rgba;
//!
//! let img = PixelBuffer::filled(2, 2, Rgba::new(255, 0, 0, 255));
//! let packed = encode(&img, PixelFormat::Rgb565A8, &EncodeOptions::default()).unwrap();
//! assert_eq!(&packed.bytes[..3], &[0x00, 0xf8, 0xff]);
//!
//! let back = decode(&packed, &ImageDescriptor::new(PixelFormat::Rgb565A8, 2, 2)).unwrap();
//! assert_eq!(back.image, img);
//! ```
//!
//! The [`source`] module writes packed variants as one C listing with an
//! `#if` per color depth and parses such listings back.
//!
//! ## Feature flags
//!
//! - **`std`** (default): `std::error::Error` for the error types.
//! - **`imgref`**: conversions between [`PixelBuffer`] and [`imgref`] images.

#![no_std]
#![forbid(unsafe_code)]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod bits;
pub mod decode;
pub mod encode;
pub mod error;
pub mod expr;
pub mod format;
pub mod palette;
pub mod pixel;
pub mod source;
mod swizzle;

#[cfg(feature = "imgref")]
pub mod imgref;


pub use decode::{Comparison, Decoded, ImageDescriptor, MAX_DIMENSION, Warning, compare, decode};
pub use encode::{EncodeOptions, PackedBuffer, encode, encode_values};
pub use error::{
    DecodeError, EncodeError, ExprError, PaletteError, ParseError, PixelDataError, SizeError,
};
pub use expr::{Symbols, eval};
pub use format::{
    BitDepth, Branch, ColorDepth, ColorFormatTag, FormatInfo, Guard, Layout, PixelFormat,
    SourceVersion,
};
pub use palette::Palette;
pub use pixel::PixelBuffer;
