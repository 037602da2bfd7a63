use criterion::{BenchmarkGroup, Criterion, Throughput, measurement::WallTime};
use lvpack::source::{IconListing, WriteOptions, parse};
use lvpack::{
    BitDepth, ColorDepth, EncodeOptions, ImageDescriptor, PixelBuffer, PixelFormat, decode, encode,
};
use rgb::Rgba;

// === Inputs ===

/// A typical small panel.
const W: u32 = 480;
const H: u32 = 272;

fn test_image(w: u32, h: u32) -> PixelBuffer {
    let pixels = (0..w * h).map(|i| {
        let v = (i % 251) as u8;
        Rgba::new(v, v.wrapping_mul(3), v.wrapping_mul(7), if i % 5 == 0 { 0 } else { 255 })
    });
    PixelBuffer::from_padded(w, h, pixels)
}

fn options() -> EncodeOptions {
    EncodeOptions::default().with_color_depth(ColorDepth::ThirtyTwo)
}

const FORMATS: [(&str, PixelFormat); 8] = [
    ("a8r3g3b2", PixelFormat::A8R3G3B2),
    ("rgb565_a8", PixelFormat::Rgb565A8),
    ("rgb565_a8_swapped", PixelFormat::Rgb565A8Swapped),
    ("rgb888", PixelFormat::Rgb888),
    ("argb8888", PixelFormat::Argb8888),
    ("alpha_4bit", PixelFormat::Alpha(BitDepth::Four)),
    ("indexed_2bit", PixelFormat::Indexed(BitDepth::Two)),
    ("indexed_8bit", PixelFormat::Indexed(BitDepth::Eight)),
];

// === Naive baseline ===

/// RGB565 + alpha without the format registry, for scale.
fn naive_rgb565_a8(src: &[u8], dst: &mut [u8]) {
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(3)) {
        let word = ((s[0] as u16 >> 3) << 11) | ((s[1] as u16 >> 2) << 5) | (s[2] as u16 >> 3);
        let [lo, hi] = word.to_le_bytes();
        d[0] = lo;
        d[1] = hi;
        d[2] = s[3];
    }
}

// === Benchmark helpers ===

fn bench_format(
    group: &mut BenchmarkGroup<WallTime>,
    name: &str,
    format: PixelFormat,
    img: &PixelBuffer,
) {
    let opts = options();
    group.bench_function(format!("encode/{name}"), |b| {
        b.iter(|| encode(img, format, &opts).unwrap());
    });

    let packed = encode(img, format, &opts).unwrap();
    let desc = ImageDescriptor::new(packed.format, img.width(), img.height())
        .with_color_depth(ColorDepth::ThirtyTwo);
    group.bench_function(format!("decode/{name}"), |b| {
        b.iter(|| decode(&packed, &desc).unwrap());
    });
}

// === Benchmark groups ===

fn bench_formats(c: &mut Criterion) {
    let mut group = c.benchmark_group("formats");
    group.throughput(Throughput::Elements(W as u64 * H as u64));
    let img = test_image(W, H);
    for (name, format) in FORMATS {
        bench_format(&mut group, name, format, &img);
    }
    group.bench_function("encode/rgb565_a8_naive", |b| {
        let mut dst = vec![0u8; W as usize * H as usize * 3];
        b.iter(|| naive_rgb565_a8(img.as_bytes(), &mut dst));
    });
    group.finish();
}

fn bench_source(c: &mut Criterion) {
    let mut group = c.benchmark_group("source");
    let img = test_image(76, 76);
    let listing = IconListing::standard("icon", &img, &EncodeOptions::default()).unwrap();
    let text = listing.to_source(&WriteOptions::default());
    group.throughput(Throughput::Bytes(text.len() as u64));

    group.bench_function("write", |b| {
        b.iter(|| listing.to_source(&WriteOptions::default()));
    });
    group.bench_function("parse", |b| {
        b.iter(|| parse(&text).unwrap());
    });
    group.finish();
}

fn main() {
    let mut criterion = Criterion::default().configure_from_args();
    bench_formats(&mut criterion);
    bench_source(&mut criterion);
    criterion.final_summary();
}
