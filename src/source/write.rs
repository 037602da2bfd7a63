use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{self, Write};

use crate::encode::{EncodeOptions, PackedBuffer, encode};
use crate::error::EncodeError;
use crate::format::{Branch, ColorDepth, ColorFormatTag, Guard, Layout, PixelFormat, negate};
use crate::pixel::PixelBuffer;

/// Bytes per line fallback when a row length is not known.
const FALLBACK_LINE: usize = 24;

/// How byte literals are broken into lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Grouping {
    /// One pixel row per line, or 24 bytes when the row size is unknown.
    #[default]
    PerRow,
    /// A fixed number of bytes per line.
    Fixed(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    pub grouping: Grouping,
    /// Keep the comma after the last byte of each run.
    pub trailing_comma: bool,
    /// Emit the `lvgl.h` include and attribute boilerplate.
    pub header: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            grouping: Grouping::PerRow,
            trailing_comma: true,
            header: true,
        }
    }
}

impl WriteOptions {
    pub fn with_grouping(mut self, grouping: Grouping) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn with_trailing_comma(mut self, trailing_comma: bool) -> Self {
        self.trailing_comma = trailing_comma;
        self
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }
}

/// One byte run of an icon's array, compiled in under `guard`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub guard: Option<Guard>,
    pub buffer: PackedBuffer,
    /// Palette entry stride of indexed data.
    pub color_depth: ColorDepth,
}

impl Variant {
    /// A run guarded the way its format is usually guarded.
    pub fn new(buffer: PackedBuffer) -> Self {
        Variant {
            guard: buffer.format.guard(),
            buffer,
            color_depth: ColorDepth::default(),
        }
    }

    pub fn with_guard(mut self, guard: Option<Guard>) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_color_depth(mut self, depth: ColorDepth) -> Self {
        self.color_depth = depth;
        self
    }
}

/// An image array plus the descriptor that points at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub name: String,
    pub tag: ColorFormatTag,
    pub width: u32,
    pub height: u32,
    /// `data_size` initializer; derived from the tag when absent.
    pub data_size: Option<String>,
    pub variants: Vec<Variant>,
}

impl Icon {
    pub fn new(name: impl Into<String>, tag: ColorFormatTag, width: u32, height: u32) -> Self {
        Icon {
            name: name.into(),
            tag,
            width,
            height,
            data_size: None,
            variants: Vec::new(),
        }
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variants.push(variant);
        self
    }

    pub fn with_data_size(mut self, expr: impl Into<String>) -> Self {
        self.data_size = Some(expr.into());
        self
    }

    /// The multi-depth true-color-alpha icon: A8R3G3B2 for depth 1/8,
    /// RGB565 + alpha in both byte orders for depth 16, RGB888 for depth
    /// 24 and ARGB8888 for depth 32.
    pub fn standard(
        name: impl Into<String>,
        image: &PixelBuffer,
        options: &EncodeOptions,
    ) -> Result<Self, EncodeError> {
        const FORMATS: [PixelFormat; 5] = [
            PixelFormat::A8R3G3B2,
            PixelFormat::Rgb565A8,
            PixelFormat::Rgb565A8Swapped,
            PixelFormat::Rgb888,
            PixelFormat::Argb8888,
        ];
        // Both byte orders are emitted explicitly.
        let options = EncodeOptions {
            swap16: false,
            ..options.clone()
        };
        let mut icon =
            Icon::new(name, ColorFormatTag::TrueColorAlpha, image.width(), image.height());
        for format in FORMATS {
            let buffer = encode(image, format, &options)?;
            icon.variants.push(Variant::new(buffer).with_color_depth(options.color_depth));
        }
        Ok(icon)
    }

    fn data_size_expr(&self) -> String {
        match &self.data_size {
            Some(expr) => expr.clone(),
            None => {
                let len = self.variants.first().map_or(0, |v| v.buffer.bytes.len());
                self.tag.data_size_expr(self.width, self.height, len)
            }
        }
    }

    fn write_to(&self, opts: &WriteOptions, w: &mut impl Write) -> fmt::Result {
        let name = &self.name;
        let attr = format!("LV_ATTRIBUTE_IMG_{}", name.to_ascii_uppercase());
        writeln!(w, "#ifndef {attr}")?;
        writeln!(w, "#define {attr}")?;
        writeln!(w, "#endif")?;
        writeln!(w, "const LV_ATTRIBUTE_MEM_ALIGN {attr} uint8_t {name}_map[] = {{")?;
        self.write_body(opts, w)?;
        writeln!(w, "}};")?;
        writeln!(w)?;
        writeln!(w, "const lv_img_dsc_t {name} = {{")?;
        writeln!(w, "  .header.cf = {},", self.tag)?;
        writeln!(w, "  .header.always_zero = 0,")?;
        writeln!(w, "  .header.reserved = 0,")?;
        writeln!(w, "  .header.w = {},", self.width)?;
        writeln!(w, "  .header.h = {},", self.height)?;
        writeln!(w, "  .data_size = {},", self.data_size_expr())?;
        writeln!(w, "  .data = {name}_map,")?;
        writeln!(w, "}};")
    }

    /// Unguarded runs first, then one `#if`/`#elif` chain over the outer
    /// guards with nested chains for the inner ones.
    fn write_body(&self, opts: &WriteOptions, w: &mut impl Write) -> fmt::Result {
        let mut groups: Vec<(&str, Vec<&Variant>)> = Vec::new();
        for v in &self.variants {
            let Some(guard) = &v.guard else {
                self.write_run(v, opts, w)?;
                continue;
            };
            match groups.iter_mut().find(|(outer, _)| *outer == guard.outer.as_ref()) {
                Some((_, members)) => members.push(v),
                None => groups.push((guard.outer.as_ref(), alloc::vec![v])),
            }
        }

        for (i, (outer, members)) in groups.iter().enumerate() {
            let keyword = if i == 0 { "if" } else { "elif" };
            writeln!(w, "#{keyword} {outer}")?;
            let nested: Vec<(&Branch, &Variant)> = members
                .iter()
                .filter_map(|&v| v.guard.as_ref()?.inner.as_ref().map(|b| (b, v)))
                .collect();
            let flat = members
                .iter()
                .filter(|v| v.guard.as_ref().is_some_and(|g| g.inner.is_none()));
            for v in flat {
                self.write_run(v, opts, w)?;
            }
            for (j, (branch, v)) in nested.iter().enumerate() {
                match (branch, j) {
                    (Branch::If(c), 0) => writeln!(w, "#if {c}")?,
                    (Branch::If(c), _) => writeln!(w, "#elif {c}")?,
                    (Branch::Else(c), 0) => writeln!(w, "#if {}", negate(c))?,
                    (Branch::Else(_), _) => writeln!(w, "#else")?,
                }
                self.write_run(v, opts, w)?;
            }
            if !nested.is_empty() {
                writeln!(w, "#endif")?;
            }
        }
        if !groups.is_empty() {
            writeln!(w, "#endif")?;
        }
        Ok(())
    }

    fn write_run(&self, v: &Variant, opts: &WriteOptions, w: &mut impl Write) -> fmt::Result {
        let format = v.buffer.format;
        writeln!(w, "  /*{}*/", format.info().description)?;
        let mut bytes = v.buffer.bytes.as_slice();

        if let Layout::Indexed(_) = format.layout() {
            let table_len = format.data_offset(v.color_depth).min(bytes.len());
            let (table, rest) = bytes.split_at(table_len);
            for (i, entry) in table.chunks(v.color_depth.palette_stride()).enumerate() {
                w.write_str("  ")?;
                write_hex(entry, w)?;
                writeln!(w, ",\t/*Color of index {i}*/")?;
            }
            bytes = rest;
        }

        let per_line = match opts.grouping {
            Grouping::PerRow => v.buffer.row_len(self.width).unwrap_or(FALLBACK_LINE),
            Grouping::Fixed(n) => n,
        }
        .max(1);
        let lines = bytes.len().div_ceil(per_line);
        for (i, line) in bytes.chunks(per_line).enumerate() {
            w.write_str("  ")?;
            write_hex(line, w)?;
            if opts.trailing_comma || i + 1 < lines {
                w.write_char(',')?;
            }
            w.write_char('\n')?;
        }
        Ok(())
    }
}

fn write_hex(bytes: &[u8], w: &mut impl Write) -> fmt::Result {
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            w.write_str(", ")?;
        }
        write!(w, "0x{b:02x}")?;
    }
    Ok(())
}

/// A complete source file holding one or more icons.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IconListing {
    pub icons: Vec<Icon>,
}

impl IconListing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_icon(mut self, icon: Icon) -> Self {
        self.icons.push(icon);
        self
    }

    pub fn push(&mut self, icon: Icon) {
        self.icons.push(icon);
    }

    /// A listing of one [`Icon::standard`] icon.
    pub fn standard(
        name: impl Into<String>,
        image: &PixelBuffer,
        options: &EncodeOptions,
    ) -> Result<Self, EncodeError> {
        Ok(Self::new().with_icon(Icon::standard(name, image, options)?))
    }

    /// Streams the listing into `w`.
    pub fn write_to(&self, opts: &WriteOptions, w: &mut impl Write) -> fmt::Result {
        if opts.header {
            w.write_str(concat!(
                "#ifdef LV_LVGL_H_INCLUDE_SIMPLE\n",
                "#include \"lvgl.h\"\n",
                "#else\n",
                "#include \"lvgl/lvgl.h\"\n",
                "#endif\n",
                "\n",
                "#ifndef LV_ATTRIBUTE_MEM_ALIGN\n",
                "#define LV_ATTRIBUTE_MEM_ALIGN\n",
                "#endif\n",
            ))?;
        }
        for (i, icon) in self.icons.iter().enumerate() {
            if i > 0 {
                writeln!(w)?;
            }
            icon.write_to(opts, w)?;
        }
        Ok(())
    }

    pub fn to_source(&self, opts: &WriteOptions) -> String {
        let mut out = String::new();
        // Writing into a String never fails.
        let _ = self.write_to(opts, &mut out);
        out
    }
}

impl fmt::Display for IconListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(&WriteOptions::default(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use crate::format::BitDepth;
    use crate::palette::Palette;
    use rgb::Rgba;

    fn red_dot() -> PixelBuffer {
        PixelBuffer::new(
            2,
            1,
            alloc::vec![Rgba::new(255, 0, 0, 255), Rgba::new(0, 0, 0, 0)],
        )
        .unwrap()
    }

    #[test]
    fn standard_listing_layout() {
        let src = IconListing::standard("icon_dot", &red_dot(), &EncodeOptions::default())
            .unwrap()
            .to_source(&WriteOptions::default());
        let expected = "\
#ifdef LV_LVGL_H_INCLUDE_SIMPLE
#include \"lvgl.h\"
#else
#include \"lvgl/lvgl.h\"
#endif

#ifndef LV_ATTRIBUTE_MEM_ALIGN
#define LV_ATTRIBUTE_MEM_ALIGN
#endif
#ifndef LV_ATTRIBUTE_IMG_ICON_DOT
#define LV_ATTRIBUTE_IMG_ICON_DOT
#endif
const LV_ATTRIBUTE_MEM_ALIGN LV_ATTRIBUTE_IMG_ICON_DOT uint8_t icon_dot_map[] = {
#if LV_COLOR_DEPTH == 1 || LV_COLOR_DEPTH == 8
  /*Pixel format: Alpha 8 bit, Red: 3 bit, Green: 3 bit, Blue: 2 bit*/
  0xe0, 0xff, 0x00, 0x00,
#elif LV_COLOR_DEPTH == 16
#if LV_COLOR_16_SWAP == 0
  /*Pixel format: Alpha 8 bit, Red: 5 bit, Green: 6 bit, Blue: 5 bit*/
  0x00, 0xf8, 0xff, 0x00, 0x00, 0x00,
#else
  /*Pixel format: Alpha 8 bit, Red: 5 bit, Green: 6 bit, Blue: 5 bit  BUT the 2 color bytes are swapped*/
  0xf8, 0x00, 0xff, 0x00, 0x00, 0x00,
#endif
#elif LV_COLOR_DEPTH == 24
  /*Pixel format: Red: 8 bit, Green: 8 bit, Blue: 8 bit*/
  0xff, 0x00, 0x00, 0x00, 0x00, 0x00,
#elif LV_COLOR_DEPTH == 32
  /*Pixel format: Alpha 8 bit, Red: 8 bit, Green: 8 bit, Blue: 8 bit*/
  0xff, 0x00, 0x00, 0xff, 0x00, 0x00, 0x00, 0x00,
#endif
};

const lv_img_dsc_t icon_dot = {
  .header.cf = LV_IMG_CF_TRUE_COLOR_ALPHA,
  .header.always_zero = 0,
  .header.reserved = 0,
  .header.w = 2,
  .header.h = 1,
  .data_size = 2 * 1 * LV_IMG_PX_SIZE_ALPHA_BYTE,
  .data = icon_dot_map,
};
";
        assert_eq!(src, expected);
    }

    #[test]
    fn grouping_and_last_comma() {
        let img = PixelBuffer::filled(3, 2, Rgba::new(0, 0, 0, 255));
        let packed =
            encode(&img, PixelFormat::Alpha(BitDepth::Eight), &EncodeOptions::default()).unwrap();
        let icon = Icon::new("a", ColorFormatTag::Alpha(BitDepth::Eight), 3, 2)
            .with_variant(Variant::new(packed));
        let listing = IconListing::new().with_icon(icon);

        let opts = WriteOptions::default().with_header(false).with_trailing_comma(false);
        let src = listing.to_source(&opts);
        assert!(src.contains("  0xff, 0xff, 0xff,\n  0xff, 0xff, 0xff\n};"));
        assert!(src.contains(".data_size = 6,"));

        let src = listing.to_source(&opts.with_grouping(Grouping::Fixed(4)));
        assert!(src.contains("  0xff, 0xff, 0xff, 0xff,\n  0xff, 0xff\n};"));
    }

    #[test]
    fn palette_entries_one_per_line() {
        let img = PixelBuffer::new(
            2,
            1,
            alloc::vec![Rgba::new(0, 0, 0, 255), Rgba::new(255, 255, 255, 255)],
        )
        .unwrap();
        let pal = Palette::new(alloc::vec![Rgba::new(0, 0, 0, 255), Rgba::new(255, 255, 255, 255)]);
        let opts = EncodeOptions::default()
            .with_color_depth(ColorDepth::ThirtyTwo)
            .with_palette(pal);
        let packed = encode(&img, PixelFormat::Indexed(BitDepth::One), &opts).unwrap();
        let icon = Icon::new("p", ColorFormatTag::Indexed(BitDepth::One), 2, 1)
            .with_variant(Variant::new(packed).with_color_depth(ColorDepth::ThirtyTwo));
        let src = IconListing::new()
            .with_icon(icon)
            .to_source(&WriteOptions::default().with_header(false));
        assert!(src.contains("  0x00, 0x00, 0x00, 0xff,\t/*Color of index 0*/\n"));
        assert!(src.contains("  0xff, 0xff, 0xff, 0xff,\t/*Color of index 1*/\n  0x40,\n"));
        assert!(!src.contains("#if "));
    }

    #[test]
    fn several_icons_share_one_header() {
        let img = red_dot();
        let listing = IconListing::standard("one", &img, &EncodeOptions::default())
            .unwrap()
            .with_icon(Icon::standard("two", &img, &EncodeOptions::default()).unwrap());
        let src = listing.to_string();
        assert_eq!(src.matches("#include \"lvgl.h\"").count(), 1);
        assert!(src.contains("uint8_t one_map[]"));
        assert!(src.contains("uint8_t two_map[]"));
        assert!(src.contains("const lv_img_dsc_t two = {"));
    }
}
