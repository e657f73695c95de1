//! Benchmarks for segmentation and fingerprinting

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;
use threadsmith::{Fingerprint, TweetSegmenter};

fn article(words: usize) -> String {
    let vocabulary = ["ownership", "borrow", "lifetime", "trait", "async", "future", "pin", "drop"];
    (0..words)
        .map(|i| vocabulary[i % vocabulary.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

fn bench_split(c: &mut Criterion) {
    let segmenter = TweetSegmenter::default();
    let mut group = c.benchmark_group("split");

    for words in [100, 1_000, 8_000] {
        let text = article(words);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_function(format!("{words}_words"), |b| {
            b.iter(|| segmenter.split(black_box(&text), true));
        });
    }

    group.finish();
}

fn bench_fingerprint(c: &mut Criterion) {
    let text = article(8_000);
    c.bench_function("fingerprint_text", |b| {
        b.iter(|| Fingerprint::for_text(black_box(&text)));
    });
}

criterion_group!(benches, bench_split, bench_fingerprint);
criterion_main!(benches);
