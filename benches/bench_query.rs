use criterion::{criterion_group, criterion_main, Criterion};
use retrace::{Bias, Consumer};

// A synthetic map shaped like minified output: one source, `lines` generated
// lines, each mapped to the next original line.
fn build_map(lines: u32) -> Vec<u8> {
    let mut mappings = String::from("AAAA");
    for _ in 1..lines {
        mappings.push_str(";AACA");
    }
    format!(r#"{{"version": 3, "sources": ["a.js"], "mappings": "{mappings}"}}"#).into_bytes()
}

fn benchmark_query(c: &mut Criterion) {
    const LINES: u32 = 10_000;
    let buf = build_map(LINES);

    c.bench_function("decode_mappings", |b| {
        b.iter(|| {
            let consumer = Consumer::from(buf.clone()).unwrap();
            assert_eq!(consumer.generated_mappings().unwrap().len(), LINES as usize);
        })
    });

    c.bench_function("original_position_for", |b| {
        let consumer = Consumer::from(buf.clone()).unwrap();
        // decode outside the measurement
        consumer.generated_mappings().unwrap();
        b.iter(|| {
            for line in [1, LINES / 2, LINES] {
                let found = consumer
                    .original_position_for(line, 0, Bias::default())
                    .unwrap()
                    .unwrap();
                assert_eq!(found.line, line);
            }
        })
    });

    c.bench_function("generated_position_for", |b| {
        let consumer = Consumer::from(buf.clone()).unwrap();
        consumer.generated_mappings().unwrap();
        b.iter(|| {
            for line in [1, LINES / 2, LINES] {
                let span = consumer
                    .generated_position_for("a.js", line, 0, Bias::default())
                    .unwrap()
                    .unwrap();
                assert_eq!(span.line, line);
            }
        })
    });
}

criterion_group!(query, benchmark_query);
criterion_main!(query);
