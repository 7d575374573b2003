use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use review_lint_engine::annotate::synthesize;
use review_lint_engine::diff::{match_any, parse_multi_file_diff};
use review_lint_engine::report::truncate_summary;

fn synthetic_diff(files: usize, lines_per_hunk: usize) -> String {
    let mut out = String::new();
    for f in 0..files {
        out.push_str(&format!(
            "diff --git a/src/mod{f}.rs b/src/mod{f}.rs\nindex 1111111..2222222 100644\n--- a/src/mod{f}.rs\n+++ b/src/mod{f}.rs\n"
        ));
        out.push_str(&format!("@@ -1,{lines_per_hunk} +1,{lines_per_hunk} @@\n"));
        for i in 0..lines_per_hunk {
            if i % 3 == 0 {
                out.push_str(&format!("-old line {i}\n+new line {i}\n"));
            } else {
                out.push_str(&format!(" same line {i}\n"));
            }
        }
    }
    out
}

fn benchmark_parse_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_multi_file_diff");
    for (files, lines) in [(1, 20), (50, 40), (500, 10)] {
        let text = synthetic_diff(files, lines);
        group.bench_with_input(BenchmarkId::new("files", files), &text, |b, t| {
            b.iter(|| parse_multi_file_diff(black_box(t)))
        });
    }
    group.finish();
}

fn benchmark_synthesize(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesize");
    for size in [100usize, 2_000, 20_000] {
        let original: String = (0..size).map(|i| format!("fn f{i}(){{}}\n")).collect();
        let formatted: String = (0..size)
            .map(|i| if i % 10 == 0 { format!("fn f{i}() {{}}\n") } else { format!("fn f{i}(){{}}\n") })
            .collect();
        group.bench_with_input(BenchmarkId::new("lines", size), &(original, formatted), |b, (o, n)| {
            b.iter(|| synthesize(black_box(o), black_box(n), "rustfmt"))
        });
    }
    group.finish();
}

fn benchmark_match_any(c: &mut Criterion) {
    let patterns = ["vendor/**", "testdata/**", "**/*.pb.go", "sdk/*", "docs/**/*.md"];
    c.bench_function("match_any", |b| {
        b.iter(|| match_any(black_box(&patterns), black_box("pkg/api/v1/service.pb.go")))
    });
}

fn benchmark_truncate_summary(c: &mut Criterion) {
    let long = "- src/a.rs:10 [error] rule: message that repeats\n".repeat(5_000);
    c.bench_function("truncate_summary", |b| b.iter(|| truncate_summary(black_box(&long))));
}

criterion_group!(
    benches,
    benchmark_parse_diff,
    benchmark_synthesize,
    benchmark_match_any,
    benchmark_truncate_summary
);
criterion_main!(benches);
