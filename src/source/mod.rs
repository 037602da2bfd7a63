//! LVGL image C sources: writing and reading them back.
//!
//! A source holds one `uint8_t NAME_map[]` array per icon and an
//! `lv_img_dsc_t NAME` descriptor pointing at it. The array may carry
//! several encodings of the same image, each under an `#if` on the build's
//! color depth and byte order, so one file serves every configuration:
//!
//! ```c
//! const LV_ATTRIBUTE_MEM_ALIGN LV_ATTRIBUTE_IMG_DOT uint8_t dot_map[] = {
//! #if LV_COLOR_DEPTH == 1 || LV_COLOR_DEPTH == 8
//!   /*Pixel format: Alpha 8 bit, Red: 3 bit, Green: 3 bit, Blue: 2 bit*/
//!   0xe0, 0xff,
//! #elif LV_COLOR_DEPTH == 16
//! #if LV_COLOR_16_SWAP == 0
//!   /*Pixel format: Alpha 8 bit, Red: 5 bit, Green: 6 bit, Blue: 5 bit*/
//!   0x00, 0xf8, 0xff,
//! #else
//!   ...
//! #endif
//! #endif
//! };
//! ```
//!
//! [`parse`] keys each byte run by its guard: the condition text for
//! `#if`/`#elif`, `!(A) && !(B)` for an `#else` after `A` and `B`, nested
//! levels joined with ` && `, and [`DEFAULT_GUARD`] outside any block. The
//! keys match [`Guard::key`](crate::format::Guard::key), so a written
//! listing can be looked up by the guard of each format.

pub(crate) mod lexer;
mod parse;
mod write;

pub use parse::{DEFAULT_GUARD, GuardedBytes, ParseIssue, ParsedImage, parse};
pub use write::{Grouping, Icon, IconListing, Variant, WriteOptions};
