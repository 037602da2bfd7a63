//! Listings written by `source` parse back into decodable byte runs.

use lvpack::source::{DEFAULT_GUARD, Icon, IconListing, Variant, WriteOptions, parse};
use lvpack::{
    BitDepth, ColorDepth, ColorFormatTag, EncodeOptions, ImageDescriptor, PixelBuffer, PixelFormat,
    SourceVersion, decode, encode,
};
use rgb::Rgba;

const RED: Rgba<u8> = Rgba { r: 255, g: 0, b: 0, a: 255 };
const BLUE: Rgba<u8> = Rgba { r: 0, g: 0, b: 255, a: 255 };
const BLACK: Rgba<u8> = Rgba { r: 0, g: 0, b: 0, a: 255 };
const CLEAR: Rgba<u8> = Rgba { r: 0, g: 0, b: 0, a: 0 };

/// Colors every layout stores exactly.
fn sample() -> PixelBuffer {
    PixelBuffer::new(2, 2, vec![RED, CLEAR, BLUE, BLACK]).unwrap()
}

#[test]
fn standard_listing_has_one_run_per_format() {
    let text = IconListing::standard("icon_sample", &sample(), &EncodeOptions::default())
        .unwrap()
        .to_source(&WriteOptions::default());
    let images = parse(&text).unwrap();
    assert_eq!(images.len(), 1);
    let parsed = &images[0];
    assert_eq!(parsed.cf, Some(ColorFormatTag::TrueColorAlpha));
    assert_eq!((parsed.width, parsed.height), (Some(2), Some(2)));
    assert_eq!(parsed.buffers.len(), 5);

    for format in [
        PixelFormat::A8R3G3B2,
        PixelFormat::Rgb565A8,
        PixelFormat::Rgb565A8Swapped,
        PixelFormat::Rgb888,
        PixelFormat::Argb8888,
    ] {
        let key = format.guard().unwrap().key();
        let run = parsed.buffer(&key).unwrap_or_else(|| panic!("no run under `{key}`"));
        let out = decode(&run.packed(format, None), &ImageDescriptor::new(format, 2, 2)).unwrap();
        assert!(out.is_complete(), "{format:?}");
        assert_eq!(out.image.width(), 2);
        assert_eq!(out.image.height(), 2);
    }
}

#[test]
fn every_build_configuration_decodes_its_own_run() {
    let img = sample();
    let text = IconListing::standard("icon_sample", &img, &EncodeOptions::default())
        .unwrap()
        .to_source(&WriteOptions::default());
    let parsed = parse(&text).unwrap().remove(0);

    for (depth, swap16) in [
        (ColorDepth::One, false),
        (ColorDepth::Eight, false),
        (ColorDepth::Sixteen, false),
        (ColorDepth::Sixteen, true),
        (ColorDepth::ThirtyTwo, false),
    ] {
        let out = parsed.decode(depth, swap16, SourceVersion::V8).unwrap();
        assert!(out.warnings.is_empty(), "{depth:?}");
        assert_eq!(out.image, img, "{depth:?} swap16={swap16}");
    }

    // RGB888 has nowhere to keep alpha.
    let out = parsed.decode(ColorDepth::TwentyFour, false, SourceVersion::V8).unwrap();
    assert_eq!(out.image.pixels(), &[RED, BLACK, BLUE, BLACK]);
}

#[test]
fn two_guarded_blocks_decode_independently() {
    let text = "
/* exported by hand */
const uint8_t arrow_map[] = {
#if LV_COLOR_16_SWAP == 0
  0x00, 0xf8, 0xff, 0x1f, 0x00, 0xff,
#else
  0xf8, 0x00, 0xff, 0x00, 0x1f, 0xff,
#endif
};

const lv_img_dsc_t arrow = {
  .header.cf = LV_IMG_CF_TRUE_COLOR_ALPHA,
  .header.w = 2,
  .header.h = 1,
  .data_size = 6,
  .data = arrow_map,
};
";
    let parsed = parse(text).unwrap().remove(0);
    assert_eq!(parsed.buffers.len(), 2);

    let plain = parsed.buffer("LV_COLOR_16_SWAP == 0").unwrap();
    let swapped = parsed.buffer("!(LV_COLOR_16_SWAP == 0)").unwrap();
    for (run, format) in [(plain, PixelFormat::Rgb565A8), (swapped, PixelFormat::Rgb565A8Swapped)] {
        let out = decode(&run.packed(format, None), &ImageDescriptor::new(format, 2, 1)).unwrap();
        assert_eq!(out.image.pixels(), &[RED, BLUE]);
    }

    for swap16 in [false, true] {
        let out = parsed.decode(ColorDepth::Sixteen, swap16, SourceVersion::V8).unwrap();
        assert_eq!(out.image.pixels(), &[RED, BLUE]);
    }
}

#[test]
fn indexed_icon_with_palette_comments() {
    let img = PixelBuffer::new(3, 1, vec![RED, BLUE, BLUE]).unwrap();
    let opts = EncodeOptions::default().with_color_depth(ColorDepth::ThirtyTwo);
    let packed = encode(&img, PixelFormat::Indexed(BitDepth::One), &opts).unwrap();
    let icon = Icon::new("dots", ColorFormatTag::Indexed(BitDepth::One), 3, 1)
        .with_variant(Variant::new(packed).with_color_depth(ColorDepth::ThirtyTwo));
    let text = IconListing::new().with_icon(icon).to_source(&WriteOptions::default());
    assert!(text.contains("/*Color of index 1*/"));

    let parsed = parse(&text).unwrap().remove(0);
    assert_eq!(parsed.buffers.len(), 1);
    assert_eq!(parsed.buffers[0].condition, DEFAULT_GUARD);
    let out = parsed.decode(ColorDepth::ThirtyTwo, false, SourceVersion::V8).unwrap();
    assert!(out.warnings.is_empty());
    assert_eq!(out.image, img);
}

#[test]
fn v7_listing_needs_v7_to_read_back() {
    let img = PixelBuffer::new(1, 1, vec![Rgba::new(10, 20, 30, 40)]).unwrap();
    let opts = EncodeOptions::default().with_source_version(SourceVersion::V7);
    let text = IconListing::standard("old", &img, &opts)
        .unwrap()
        .to_source(&WriteOptions::default());
    let parsed = parse(&text).unwrap().remove(0);

    let v7 = parsed.decode(ColorDepth::ThirtyTwo, false, SourceVersion::V7).unwrap();
    assert_eq!(v7.image, img);
    let v8 = parsed.decode(ColorDepth::ThirtyTwo, false, SourceVersion::V8).unwrap();
    assert_eq!(v8.image.pixels(), &[Rgba::new(30, 20, 10, 40)]);
}

#[test]
fn several_icons_in_one_file() {
    let listing = IconListing::standard("first", &sample(), &EncodeOptions::default())
        .unwrap()
        .with_icon(
            Icon::standard("second", &PixelBuffer::filled(1, 3, BLUE), &EncodeOptions::default())
                .unwrap(),
        );
    let images = parse(&listing.to_string()).unwrap();
    let names: Vec<&str> = images.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, ["first", "second"]);
    assert_eq!((images[1].width, images[1].height), (Some(1), Some(3)));
    let out = images[1].decode(ColorDepth::Sixteen, false, SourceVersion::V8).unwrap();
    assert_eq!(out.image.pixels(), &[BLUE; 3]);
}
