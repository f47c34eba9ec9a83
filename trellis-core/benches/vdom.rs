use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use trellis_core::config::RuntimeConfig;
use trellis_core::vdom::{validate_vdom_json, Attributes, VdomArg, VdomChild, VdomConstructor, VdomNode};

fn list(rows: usize, config: &RuntimeConfig) -> VdomNode {
    let li = VdomConstructor::new("li");
    let items = (0..rows)
        .map(|n| {
            let item = li
                .call_with(
                    config,
                    vec![
                        Attributes::new().key(n).set("class", "row").into(),
                        format!("row {n}").into(),
                    ],
                )
                .expect("row builds");
            VdomChild::from(item)
        })
        .collect::<Vec<_>>();

    VdomConstructor::new("ul")
        .call_with(
            config,
            vec![
                Attributes::new().set("style", json!({"margin": 0})).into(),
                VdomArg::Child(VdomChild::List(items)),
            ],
        )
        .expect("list builds")
}

fn bench_construct(c: &mut Criterion) {
    let release = RuntimeConfig::default();
    let debug = RuntimeConfig {
        debug: true,
        ..RuntimeConfig::default()
    };

    c.bench_function("construct 1000 keyed rows", |b| {
        b.iter(|| list(black_box(1000), &release))
    });
    c.bench_function("construct 1000 keyed rows (debug)", |b| {
        b.iter(|| list(black_box(1000), &debug))
    });
}

fn bench_validate(c: &mut Criterion) {
    let json = list(1000, &RuntimeConfig::default())
        .to_json()
        .expect("list serializes");

    c.bench_function("validate 1000 rows", |b| {
        b.iter(|| validate_vdom_json(black_box(&json)))
    });
}

criterion_group!(benches, bench_construct, bench_validate);
criterion_main!(benches);
