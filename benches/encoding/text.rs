// Benchmark inspired by https://github.com/tikv/rust-prometheus/blob/ab1ca7285d3463504381a5025ae1951e020d6796/benches/text_encoder.rs

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sumo_bridge::encoding::text::{encode_families, TextEncoder};
use sumo_bridge::gather::Gatherer;
use sumo_bridge::metrics::counter::Counter;
use sumo_bridge::metrics::family::Family;
use sumo_bridge::metrics::MetricType;
use sumo_bridge::model::{HistogramValue, Metric, MetricFamily, Value};
use sumo_bridge::registry::Registry;

fn histograms() -> Vec<MetricFamily> {
    (0..100)
        .map(|i| {
            let mut family =
                MetricFamily::new(format!("my_histogram_{i}"), "My histogram", MetricType::Histogram);
            for j in 0u64..100 {
                let buckets = (0..10).map(|b| (2f64.powi(b), j.min(b as u64))).collect();
                family.push(
                    Metric::new(Value::Histogram(HistogramValue {
                        sample_count: j,
                        sample_sum: j as f64 * 1.5,
                        buckets,
                    }))
                    .with_label("method", "GET")
                    .with_label("status", "200")
                    .with_label("some_number", j.to_string()),
                );
            }
            family
        })
        .collect()
}

pub fn text(c: &mut Criterion) {
    c.bench_function("encode counters", |b| {
        let mut registry = Registry::default();

        for i in 0..100 {
            let counter_family = Family::<Vec<(String, String)>, Counter>::default();
            registry.register(format!("my_counter_{i}"), "My counter", counter_family.clone());

            for j in 0u32..100 {
                counter_family
                    .get_or_create(&vec![
                        ("method".to_owned(), "GET".to_owned()),
                        ("status".to_owned(), "200".to_owned()),
                        ("some_number".to_owned(), j.to_string()),
                    ])
                    .inc();
            }
        }

        let families = registry.gather().unwrap();

        b.iter(|| {
            let buffer = encode_families(&families, |_, _| {});
            black_box(buffer);
        })
    });

    c.bench_function("encode histograms", |b| {
        let families = histograms();

        b.iter(|| {
            let mut encoder = TextEncoder::new();
            for family in families.iter() {
                encoder.encode(family).unwrap();
            }
            black_box(encoder.finish());
        })
    });
}

criterion_group!(benches, text);
criterion_main!(benches);
