use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use img_shrink::processing::{
    apply_partial_grayscale, encode_image, prepare_image, CompressionSettings, ImageCodec,
};
use img_shrink::quantize::quantize_to_palette;
use img_shrink::search::{search_quality_with, SearchOptions};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    }))
}

fn create_test_image(width: u32, height: u32) -> (PathBuf, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let test_file = temp_dir.path().join("bench.jpg");
    gradient(width, height)
        .save_with_format(&test_file, ImageFormat::Jpeg)
        .unwrap();
    (test_file, temp_dir)
}

fn bench_prepare_and_encode(c: &mut Criterion) {
    let img = gradient(800, 600);
    let mut group = c.benchmark_group("prepare_and_encode");

    for scale in [100u8, 50, 25] {
        let settings = CompressionSettings::new(Some(75), Some(scale), false, false, false).unwrap();
        group.bench_with_input(BenchmarkId::new("jpeg_scale", scale), &settings, |b, settings| {
            b.iter(|| {
                let (prepared, options) =
                    prepare_image(img.clone(), Path::new("bench.jpg"), black_box(settings)).unwrap();
                encode_image(&prepared, &options).unwrap()
            })
        });
    }
    group.finish();
}

fn bench_partial_grayscale(c: &mut Criterion) {
    let img = gradient(1024, 768);
    c.bench_function("partial_grayscale_1024x768", |b| {
        b.iter(|| apply_partial_grayscale(black_box(&img)))
    });
}

fn bench_quantize(c: &mut Criterion) {
    let img = gradient(256, 256);
    let mut group = c.benchmark_group("quantize");
    for colors in [64u32, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(colors), &colors, |b, &colors| {
            b.iter(|| quantize_to_palette(black_box(&img), colors).unwrap())
        });
    }
    group.finish();
}

fn bench_target_search(c: &mut Criterion) {
    let (input, temp_dir) = create_test_image(512, 512);
    let output = temp_dir.path().join("out.jpg");
    let target = std::fs::metadata(&input).unwrap().len() / 3;

    let mut group = c.benchmark_group("target_search");
    group.sample_size(10);
    group.bench_function("jpeg_512_to_third", |b| {
        b.iter(|| {
            search_quality_with(
                &ImageCodec,
                &input,
                &output,
                black_box(target),
                &SearchOptions::default(),
                &CompressionSettings::default(),
            )
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_prepare_and_encode,
    bench_partial_grayscale,
    bench_quantize,
    bench_target_search
);
criterion_main!(benches);
