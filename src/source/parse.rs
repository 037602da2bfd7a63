use alloc::borrow::ToOwned;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::decode::{Decoded, ImageDescriptor, MAX_DIMENSION, decode};
use crate::encode::PackedBuffer;
use crate::error::{DecodeError, ParseError};
use crate::expr::Symbols;
use crate::format::{
    ColorDepth, ColorFormatTag, PixelFormat, SourceVersion, join_conditions, negate,
};
use crate::source::lexer::{self, Token, squash};

/// Key of bytes that sit outside any conditional block.
pub const DEFAULT_GUARD: &str = "default";

/// The bytes of one array compiled in under `condition`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardedBytes {
    pub condition: String,
    pub bytes: Vec<u8>,
}

impl GuardedBytes {
    pub fn packed(&self, format: PixelFormat, row_stride: Option<u32>) -> PackedBuffer {
        PackedBuffer {
            format,
            bytes: self.bytes.clone(),
            row_stride,
        }
    }
}

/// Something skipped while reading an array body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseIssue {
    /// A numeric literal that is not a byte value.
    MalformedLiteral { token: String },
}

/// One image found in a source file: descriptor fields as written, plus
/// the referenced array split by compilation guard.
///
/// An array no descriptor points at comes back with only `name`,
/// `array_name` and its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedImage {
    pub name: String,
    /// The `header.cf` initializer text.
    pub cf_name: Option<String>,
    pub cf: Option<ColorFormatTag>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// `header.stride`, written by newer descriptor layouts.
    pub row_stride: Option<u32>,
    pub data_size_expr: Option<String>,
    pub array_name: Option<String>,
    /// In order of first appearance.
    pub buffers: Vec<GuardedBytes>,
    pub issues: Vec<ParseIssue>,
}

impl ParsedImage {
    /// The buffer stored under exactly this guard key.
    pub fn buffer(&self, condition: &str) -> Option<&GuardedBytes> {
        self.buffers.iter().find(|b| b.condition == condition)
    }

    /// The first buffer whose guard holds under `symbols`. Guards that
    /// cannot be evaluated count as false.
    pub fn select(&self, symbols: &Symbols) -> Option<&GuardedBytes> {
        self.buffers.iter().find(|b| {
            b.condition == DEFAULT_GUARD
                || symbols.test(&b.condition).unwrap_or_else(|e| {
                    log::debug!("guard `{}` not evaluated: {e}", b.condition);
                    false
                })
        })
    }

    /// Evaluates the `data_size` initializer.
    pub fn data_size(&self, symbols: &Symbols) -> Option<u32> {
        let expr = self.data_size_expr.as_deref()?;
        match symbols.eval(expr) {
            Ok(v) => u32::try_from(v).ok(),
            Err(e) => {
                log::debug!("data_size `{expr}` not evaluated: {e}");
                None
            }
        }
    }

    /// Descriptor for a build with the given settings.
    pub fn descriptor(
        &self,
        depth: ColorDepth,
        swap16: bool,
        version: SourceVersion,
    ) -> Result<ImageDescriptor, DecodeError> {
        let (Some(width), Some(height)) = (self.width, self.height) else {
            return Err(DecodeError::MissingGeometry);
        };
        let Some(cf) = self.cf else {
            let name = self.cf_name.clone().unwrap_or_else(|| "unknown".to_owned());
            return Err(DecodeError::UnsupportedFormat(name));
        };
        let mut desc = ImageDescriptor::from_tag(cf, width, height, depth, swap16)?
            .with_source_version(version);
        desc.data_size = self.data_size(&Symbols::lvgl(depth, swap16));
        Ok(desc)
    }

    /// Decodes the bytes a build with the given settings would compile in.
    pub fn decode(
        &self,
        depth: ColorDepth,
        swap16: bool,
        version: SourceVersion,
    ) -> Result<Decoded, DecodeError> {
        let desc = self.descriptor(depth, swap16, version)?;
        let symbols = Symbols::lvgl(depth, swap16);
        let packed = match self.select(&symbols) {
            Some(b) => b.packed(desc.format, self.row_stride),
            None => {
                log::debug!("{}: no byte run for depth {}", self.name, depth.bits());
                PackedBuffer::new(desc.format, Vec::new())
            }
        };
        decode(&packed, &desc)
    }
}

/// Finds every image descriptor and byte array in `text`.
///
/// Descriptors come first, in source order, each with the array it names.
/// Arrays no descriptor references follow as geometry-less images. Text
/// with neither fails.
pub fn parse(text: &str) -> Result<Vec<ParsedImage>, ParseError> {
    let tokens: Vec<Token<'_>> = lexer::tokenize(text).collect();
    let mut arrays = Vec::new();
    let mut descriptors = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if let Some((array, next)) = array_at(&tokens, i) {
            arrays.push(array);
            i = next;
        } else if let Some((desc, next)) = descriptor_at(&tokens, i) {
            descriptors.push(desc);
            i = next;
        } else {
            i += 1;
        }
    }
    if arrays.is_empty() && descriptors.is_empty() {
        return Err(ParseError::StructuralParseFailure);
    }

    let mut used = alloc::vec![false; arrays.len()];
    let mut images = Vec::with_capacity(descriptors.len() + arrays.len());
    for mut image in descriptors {
        let found = image
            .array_name
            .as_deref()
            .and_then(|n| arrays.iter().position(|a: &ArrayBody| a.name == n));
        match found {
            Some(k) => {
                used[k] = true;
                image.buffers = arrays[k].buffers.clone();
                image.issues = arrays[k].issues.clone();
            }
            None => log::debug!("descriptor {} points at no array in this text", image.name),
        }
        images.push(image);
    }
    for (array, _) in arrays.into_iter().zip(used).filter(|(_, u)| !u) {
        images.push(ParsedImage {
            name: array.name.clone(),
            array_name: Some(array.name),
            buffers: array.buffers,
            issues: array.issues,
            ..ParsedImage::default()
        });
    }
    Ok(images)
}

// ===========================================================================
// Arrays
// ===========================================================================

struct ArrayBody {
    name: String,
    buffers: Vec<GuardedBytes>,
    issues: Vec<ParseIssue>,
}

/// One open `#if` chain: every condition so far and the live branch key.
struct Frame {
    conds: Vec<String>,
    current: String,
}

/// Matches `uint8_t NAME[...] = {` or `unsigned char NAME[...] = {` at `i`
/// and reads up to the closing brace.
fn array_at(tokens: &[Token<'_>], i: usize) -> Option<(ArrayBody, usize)> {
    let name_at = match (tokens.get(i), tokens.get(i + 1)) {
        (Some(Token::Ident("uint8_t")), _) => i + 1,
        (Some(Token::Ident("unsigned")), Some(Token::Ident("char"))) => i + 2,
        _ => return None,
    };
    let Some(Token::Ident(name)) = tokens.get(name_at) else {
        return None;
    };
    let mut j = name_at + 1;
    if !tokens.get(j)?.is_punct("[") {
        return None;
    }
    while !tokens.get(j)?.is_punct("]") {
        j += 1;
    }
    if !(tokens.get(j + 1)?.is_punct("=") && tokens.get(j + 2)?.is_punct("{")) {
        return None;
    }
    let mut array = ArrayBody {
        name: name.to_string(),
        buffers: Vec::new(),
        issues: Vec::new(),
    };
    let end = read_body(tokens, j + 3, &mut array);
    Some((array, end))
}

fn read_body(tokens: &[Token<'_>], start: usize, array: &mut ArrayBody) -> usize {
    let mut frames: Vec<Frame> = Vec::new();
    // Index into `array.buffers` for the live guard, resolved lazily.
    let mut live: Option<usize> = None;
    let mut depth = 1usize;
    let mut i = start;
    while let Some(tok) = tokens.get(i) {
        i += 1;
        match tok {
            Token::Directive { name, body } => {
                if guard_directive(&mut frames, name, body) {
                    live = None;
                }
            }
            Token::Number(text) => {
                let value = lexer::parse_int(text).and_then(|v| u8::try_from(v).ok());
                let Some(value) = value else {
                    log::debug!("skipping literal `{text}` in {}", array.name);
                    array.issues.push(ParseIssue::MalformedLiteral {
                        token: text.to_string(),
                    });
                    continue;
                };
                let k = match live {
                    Some(k) => k,
                    None => {
                        let key = guard_key(&frames);
                        let k = match array.buffers.iter().position(|b| b.condition == key) {
                            Some(k) => k,
                            None => {
                                array.buffers.push(GuardedBytes {
                                    condition: key,
                                    bytes: Vec::new(),
                                });
                                array.buffers.len() - 1
                            }
                        };
                        live = Some(k);
                        k
                    }
                };
                array.buffers[k].bytes.push(value);
            }
            Token::Punct("{") => depth += 1,
            Token::Punct("}") => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
    }
    if !frames.is_empty() {
        log::debug!("{}: {} conditional blocks left open", array.name, frames.len());
    }
    i
}

/// Applies one directive to the guard stack. Returns whether the live key
/// may have changed.
fn guard_directive(frames: &mut Vec<Frame>, name: &str, body: &str) -> bool {
    let open = |frames: &mut Vec<Frame>, cond: String| {
        frames.push(Frame {
            conds: alloc::vec![cond.clone()],
            current: cond,
        })
    };
    match name {
        "if" => open(frames, squash(body)),
        "ifdef" => open(frames, format!("defined({})", squash(body))),
        "ifndef" => open(frames, format!("!defined({})", squash(body))),
        "elif" => {
            if let Some(f) = frames.last_mut() {
                let cond = squash(body);
                f.conds.push(cond.clone());
                f.current = cond;
            }
        }
        "else" => {
            if let Some(f) = frames.last_mut() {
                let negated: Vec<String> = f.conds.iter().map(|c| negate(c)).collect();
                f.current = negated.join(" && ");
            }
        }
        "endif" => {
            frames.pop();
        }
        _ => return false,
    }
    true
}

fn guard_key(frames: &[Frame]) -> String {
    if frames.is_empty() {
        return DEFAULT_GUARD.to_string();
    }
    join_conditions(frames.iter().map(|f| f.current.as_str()))
}

// ===========================================================================
// Descriptors
// ===========================================================================

/// A designated initializer value: its text and the identifiers in it.
struct Value<'a> {
    text: String,
    idents: Vec<&'a str>,
}

/// Matches `lv_img_dsc_t NAME = {` at `i` and reads the initializer.
fn descriptor_at(tokens: &[Token<'_>], i: usize) -> Option<(ParsedImage, usize)> {
    if !matches!(tokens.get(i), Some(Token::Ident("lv_img_dsc_t" | "lv_image_dsc_t"))) {
        return None;
    }
    let Some(Token::Ident(name)) = tokens.get(i + 1) else {
        return None;
    };
    if !(tokens.get(i + 2)?.is_punct("=") && tokens.get(i + 3)?.is_punct("{")) {
        return None;
    }
    let mut fields = Vec::new();
    let end = initializer(tokens, i + 4, "", 0, &mut fields);

    let plain = Symbols::new();
    let number = |v: &Value<'_>| plain.eval(&v.text).ok().and_then(|n| u32::try_from(n).ok());
    let side = |v: &Value<'_>| number(v).filter(|&n| n <= MAX_DIMENSION);
    let mut image = ParsedImage {
        name: name.to_string(),
        ..ParsedImage::default()
    };
    for (path, v) in &fields {
        match path.as_str() {
            "header.cf" => {
                image.cf = ColorFormatTag::from_name(&v.text).or_else(|| {
                    number(v)
                        .and_then(|c| u8::try_from(c).ok())
                        .and_then(ColorFormatTag::from_code)
                });
                image.cf_name = Some(v.text.clone());
            }
            "header.w" => image.width = side(v),
            "header.h" => image.height = side(v),
            "header.stride" => image.row_stride = number(v).filter(|&s| s > 0),
            "data_size" => image.data_size_expr = Some(v.text.clone()),
            "data" => {
                image.array_name = v
                    .idents
                    .iter()
                    .rev()
                    .find(|id| !matches!(**id, "const" | "uint8_t" | "void" | "char" | "unsigned"))
                    .map(|id| id.to_string());
            }
            _ => {}
        }
    }
    Some((image, end))
}

/// Braced sub-initializers read as fields; deeper ones are skipped whole.
const MAX_INITIALIZER_DEPTH: usize = 16;

/// Reads designated fields up to the closing brace, flattening nested
/// braces into dotted paths. Returns the index after the brace.
fn initializer<'a>(
    tokens: &[Token<'a>],
    mut i: usize,
    prefix: &str,
    depth: usize,
    fields: &mut Vec<(String, Value<'a>)>,
) -> usize {
    loop {
        let Some(tok) = tokens.get(i) else {
            return i;
        };
        if tok.is_punct("}") {
            return i + 1;
        }
        if tok.is_punct(",") || matches!(tok, Token::Directive { .. }) {
            i += 1;
            continue;
        }
        if !tok.is_punct(".") {
            // Positional initializer: not something we can name.
            i = value(tokens, i).1;
            continue;
        }
        let mut path = String::from(prefix);
        while let (Some(dot), Some(Token::Ident(seg))) = (tokens.get(i), tokens.get(i + 1)) {
            if !dot.is_punct(".") {
                break;
            }
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(seg);
            i += 2;
        }
        if tokens.get(i).is_some_and(|t| t.is_punct("=")) {
            i += 1;
        }
        if tokens.get(i).is_some_and(|t| t.is_punct("{")) && depth < MAX_INITIALIZER_DEPTH {
            i = initializer(tokens, i + 1, &path, depth + 1, fields);
        } else {
            let (v, next) = value(tokens, i);
            fields.push((path, v));
            i = next;
        }
    }
}

/// Collects tokens up to a `,` or `}` outside any bracket.
fn value<'a>(tokens: &[Token<'a>], mut i: usize) -> (Value<'a>, usize) {
    let mut parts: Vec<&str> = Vec::new();
    let mut idents = Vec::new();
    let mut nesting = 0usize;
    while let Some(tok) = tokens.get(i) {
        match tok {
            Token::Punct("(" | "[" | "{") => nesting += 1,
            Token::Punct(")" | "]") => nesting = nesting.saturating_sub(1),
            Token::Punct("}") if nesting > 0 => nesting -= 1,
            Token::Punct("," | "}") if nesting == 0 => break,
            Token::Ident(id) => idents.push(*id),
            Token::Directive { .. } => {
                i += 1;
                continue;
            }
            _ => {}
        }
        parts.push(tok.text());
        i += 1;
    }
    let text = squash(&parts.join(" "));
    (Value { text, idents }, i)
}
