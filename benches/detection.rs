//! Benchmarks for domain detection and the full optimization pipeline.
//!
//! Benchmark targets:
//! - Detection over the built-in patterns: <50µs
//! - Full optimization (detect + enhance + post-process): <200µs

// Criterion macros generate items without docs - this is expected for benchmarks
// Benchmarks use expect/unwrap for simplicity - panics are acceptable in benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use promptforge::models::OptimizeRequest;
use promptforge::services::{DomainDetector, PromptOptimizer, default_patterns};

const PROMPTS: &[(&str, &str)] = &[
    ("marketing", "Write marketing copy for a new SaaS product"),
    ("data", "Analyze our quarterly sales data and report the key metrics"),
    ("tax", "What IRS deduction applies to home office expenses?"),
    ("code", "Fix this function so the algorithm handles empty input"),
    ("general", "Tell me about Roman history"),
];

fn bench_detect(c: &mut Criterion) {
    let detector = DomainDetector::default();
    let patterns = default_patterns();
    let mut group = c.benchmark_group("detect");

    for (label, prompt) in PROMPTS {
        group.bench_with_input(BenchmarkId::from_parameter(label), prompt, |b, prompt| {
            b.iter(|| detector.detect(black_box(prompt), &patterns));
        });
    }

    group.finish();
}

fn bench_optimize(c: &mut Criterion) {
    let optimizer = PromptOptimizer::in_memory();
    let mut group = c.benchmark_group("optimize");

    for (label, prompt) in PROMPTS {
        let request = OptimizeRequest::new(*prompt)
            .with_format("markdown")
            .without_analytics();
        group.bench_with_input(BenchmarkId::from_parameter(label), &request, |b, request| {
            b.iter(|| optimizer.optimize(black_box(request)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_detect, bench_optimize);
criterion_main!(benches);
