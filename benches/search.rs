//! Performance benchmarks for the output search
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lieutenant::search::SearchIndex;

/// Something shaped like a large `terraform plan`
fn plan_output(resources: usize) -> String {
    let mut buffer = String::new();
    for i in 0..resources {
        buffer.push_str(&format!(
            r#"  # aws_instance.web[{i}] will be created
  + resource "aws_instance" "web" {{
      + ami                          = "ami-0c55b159cbfafe1f0"
      + arn                          = (known after apply)
      + instance_type                = "t3.micro"
      + tags                         = {{
          + "Name" = "web-{i}"
        }}
    }}

"#,
            i = i
        ));
    }
    buffer.push_str(&format!("Plan: {} to add, 0 to change, 0 to destroy.\n", resources));
    buffer
}

fn bench_search(c: &mut Criterion) {
    let patterns = vec![
        "will be created",
        "known after apply",
        r"web\[\d+\]",
        "^Plan:",
        "no such text",
    ];

    let mut group = c.benchmark_group("search");
    for size in [100, 10_000] {
        let buffer = plan_output(size);
        for pattern in &patterns {
            group.bench_with_input(
                BenchmarkId::new(*pattern, size),
                &buffer,
                |b, buffer| {
                    let mut index = SearchIndex::new();
                    b.iter(|| index.search(black_box(buffer), black_box(pattern)).map(|m| m.len()))
                },
            );
        }
    }
    group.finish();
}

fn bench_navigation(c: &mut Criterion) {
    let buffer = plan_output(10_000);
    let mut index = SearchIndex::new();
    index.search(&buffer, "aws_instance").expect("valid pattern");

    c.bench_function("next_wraparound", |b| {
        b.iter(|| black_box(index.next()))
    });
}

criterion_group!(benches, bench_search, bench_navigation);
criterion_main!(benches);
