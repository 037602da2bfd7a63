//! Validates the code examples from README.md compile and behave correctly.

#[test]
fn readme_encode_decode() {
    use lvpack::{EncodeOptions, ImageDescriptor, PixelBuffer, PixelFormat, decode, encode};
    use rgb::Rgba;

    let img = PixelBuffer::new(
        2,
        2,
        vec![
            Rgba::new(255, 0, 0, 255),
            Rgba::new(0, 255, 0, 255),
            Rgba::new(0, 0, 255, 255),
            Rgba::new(0, 0, 0, 0),
        ],
    )
    .unwrap();

    let packed = encode(&img, PixelFormat::Rgb565A8, &EncodeOptions::default()).unwrap();
    assert_eq!(
        packed.bytes,
        [0x00, 0xf8, 0xff, 0xe0, 0x07, 0xff, 0x1f, 0x00, 0xff, 0x00, 0x00, 0x00]
    );

    let back = decode(&packed, &ImageDescriptor::new(PixelFormat::Rgb565A8, 2, 2)).unwrap();
    assert_eq!(back.image.get(1, 0), Some(Rgba::new(0, 252, 0, 255)));
}

#[test]
fn readme_descriptor_from_tag() {
    use lvpack::{ColorDepth, ColorFormatTag, ImageDescriptor, PixelFormat};

    let desc =
        ImageDescriptor::from_tag(ColorFormatTag::TrueColorAlpha, 76, 76, ColorDepth::Sixteen, true)
            .unwrap();
    assert_eq!(desc.format, PixelFormat::Rgb565A8Swapped);
}

#[test]
fn readme_c_sources() {
    use lvpack::source::{IconListing, WriteOptions, parse};
    use lvpack::{ColorDepth, EncodeOptions, PixelBuffer, SourceVersion};
    use rgb::Rgba;

    let img = PixelBuffer::filled(4, 4, Rgba::new(255, 0, 0, 255));
    let text = IconListing::standard("icon_stop", &img, &EncodeOptions::default())
        .unwrap()
        .to_source(&WriteOptions::default());

    let parsed = parse(&text).unwrap().remove(0);
    assert_eq!(parsed.name, "icon_stop");
    for depth in [ColorDepth::Eight, ColorDepth::Sixteen, ColorDepth::ThirtyTwo] {
        let out = parsed.decode(depth, false, SourceVersion::V8).unwrap();
        assert!(out.is_complete());
    }
}

#[test]
fn readme_symbols() {
    use lvpack::{ColorDepth, Symbols};

    let symbols = Symbols::lvgl(ColorDepth::Sixteen, false).with("MY_FLAG", 1);
    assert_eq!(symbols.test("MY_FLAG && LV_COLOR_DEPTH == 16"), Ok(true));
}

#[test]
fn readme_damaged_data() {
    use lvpack::{
        EncodeOptions, ImageDescriptor, PixelBuffer, PixelFormat, Warning, compare, decode, encode,
    };
    use rgb::Rgba;

    let img = PixelBuffer::filled(3, 3, Rgba::new(9, 9, 9, 255));
    let mut packed = encode(&img, PixelFormat::Rgb888, &EncodeOptions::default()).unwrap();
    packed.bytes.truncate(20);

    let out = decode(&packed, &ImageDescriptor::new(PixelFormat::Rgb888, 3, 3)).unwrap();
    assert_eq!(out.warnings[0], Warning::TruncatedData { complete_rows: 2, height: 3 });

    let tried = compare(&packed.bytes, &ImageDescriptor::new(PixelFormat::Rgb888, 3, 3));
    assert!(tried.iter().any(|c| c.is_plausible()));
}

#[cfg(feature = "imgref")]
#[test]
fn readme_imgref() {
    use ::imgref::ImgVec;
    use lvpack::{PixelBuffer, imgref};
    use rgb::Rgba;

    let img = ImgVec::new(vec![Rgba::new(255u8, 0, 128, 200); 4], 2, 2);
    let buf: PixelBuffer = imgref::from_imgref(img.as_ref()).unwrap();
    let back: ImgVec<Rgba<u8>> = buf.into();
    assert_eq!(back.buf()[3], Rgba::new(255, 0, 128, 200));
}
