//! 工具函数性能基准测试

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use linkgate::utils::{CodeGenerator, validate_url};

// ============== 短码生成 ==============

fn bench_code_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("utils/code_gen");

    for length in [6, 7, 10] {
        let generator = CodeGenerator::new(length);
        group.bench_with_input(BenchmarkId::new("generate", length), &generator, |b, g| {
            b.iter(|| g.generate());
        });
    }

    let generator = CodeGenerator::default();
    group.bench_function("derive_from_content", |b| {
        b.iter(|| generator.derive_from_content("https://example.com/some/long/path1700000000"));
    });

    group.bench_function("validate", |b| {
        b.iter(|| generator.validate("Ab3dE9z"));
    });

    group.finish();
}

// ============== URL 校验 ==============

fn bench_validate_url(c: &mut Criterion) {
    let mut group = c.benchmark_group("utils/validate_url");

    group.bench_function("valid_simple", |b| {
        b.iter(|| validate_url("https://example.com").is_ok());
    });

    let long_query = format!("https://example.com/search?q={}", "x".repeat(2_000));
    group.bench_function("valid_long_query", |b| {
        b.iter(|| validate_url(&long_query).is_ok());
    });

    group.bench_function("invalid_scheme", |b| {
        b.iter(|| validate_url("javascript:alert(1)").is_err());
    });

    group.bench_function("invalid_empty", |b| {
        b.iter(|| validate_url("   ").is_err());
    });

    group.finish();
}

criterion_group!(benches, bench_code_generation, bench_validate_url);
criterion_main!(benches);
