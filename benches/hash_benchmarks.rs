use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, RgbImage};
use imgsieve::duplicates::{group_by_distance, group_by_hash, Sieve, SieveConfig};
use imgsieve::hashing::{hash, Fingerprinter, HashAlgorithm, HashValue};
use imgsieve::scanner::{Walker, WalkerConfig};
use std::path::PathBuf;
use tempfile::TempDir;

fn gradient(width: u32, height: u32) -> DynamicImage {
    let mut img = RgbImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        *pixel = image::Rgb([x as u8, y as u8, ((x + y) / 2) as u8]);
    }
    DynamicImage::ImageRgb8(img)
}

// Writes `count` images, every third one a copy of its predecessor
fn setup_image_dir(count: u32) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let mut previous = None;
    for i in 0..count {
        let path = temp_dir.path().join(format!("img_{i:03}.png"));
        match (&previous, i % 3) {
            (Some(prev), 2) => {
                std::fs::copy(prev, &path).expect("Failed to copy duplicate");
            }
            _ => {
                let mut img = RgbImage::new(128, 96);
                for (x, y, pixel) in img.enumerate_pixels_mut() {
                    *pixel = image::Rgb([(x * (i + 1)) as u8, (y * 3 + i) as u8, 128u8]);
                }
                img.save(&path).expect("Failed to save bench image");
            }
        }
        previous = Some(path);
    }
    temp_dir
}

// 1. Fingerprint computation per algorithm, on an in-memory image
fn bench_algorithms(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_algorithm");
    let img = gradient(512, 384);

    for algorithm in HashAlgorithm::ALL {
        group.bench_with_input(algorithm.name(), &img, |b, img| {
            b.iter(|| black_box(hash(img, algorithm, 8)));
        });
    }
    group.finish();
}

// 2. Hash size scaling
fn bench_hash_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("perceptual_size");
    let img = gradient(512, 384);

    for size in [8u32, 16, 32] {
        group.bench_with_input(format!("size_{size}"), &img, |b, img| {
            b.iter(|| black_box(hash(img, HashAlgorithm::Perceptual, size)));
        });
    }
    group.finish();
}

// 3. Grouping
fn bench_grouping(c: &mut Criterion) {
    let items: Vec<(PathBuf, HashValue)> = (0..2000u32)
        .map(|i| {
            let seed = (i % 700).wrapping_mul(2_654_435_761);
            let bits = (0..64).map(move |b| (seed.rotate_left(b) ^ (b * 31)) & 1 == 1);
            (PathBuf::from(format!("/bench/{i}.png")), HashValue::from_bits(bits))
        })
        .collect();

    c.bench_function("group_by_hash_2000", |b| {
        b.iter(|| black_box(group_by_hash(items.clone())));
    });
    c.bench_function("group_by_distance_2000_d4", |b| {
        b.iter(|| black_box(group_by_distance(items.clone(), 4)));
    });
}

// 4. Walk, decode, hash, group and resolve
fn bench_pipeline(c: &mut Criterion) {
    let temp_dir = setup_image_dir(30);
    let fingerprinter = Fingerprinter::new(HashAlgorithm::Perceptual, 8).unwrap();
    let sieve = Sieve::new(fingerprinter, SieveConfig::default());

    c.bench_function("walker_30_images", |b| {
        b.iter(|| {
            let walker = Walker::new(temp_dir.path(), WalkerConfig::default());
            black_box(walker.collect().unwrap());
        })
    });

    c.bench_function("pipeline_30_images", |b| {
        b.iter(|| black_box(sieve.run_dir(temp_dir.path(), false).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_algorithms,
    bench_hash_sizes,
    bench_grouping,
    bench_pipeline
);
criterion_main!(benches);
