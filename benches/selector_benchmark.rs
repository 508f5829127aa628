use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ui_probe::harness::{Scenario, Selector};

const SELECTORS: &[&str] = &[
    "text=Headers (0)",
    "placeholder=Key >> nth=0",
    "role=button[name=\"Send\"]",
    "input[placeholder='Enter request URL']",
    "title=New Environment",
];

fn benchmark_selector_parse(c: &mut Criterion) {
    c.bench_function("selector_parse", |b| {
        b.iter(|| {
            for input in SELECTORS {
                let selector = Selector::parse(black_box(input));
                assert!(selector.is_ok());
            }
        })
    });
}

fn benchmark_selector_script(c: &mut Criterion) {
    let selectors: Vec<Selector> = SELECTORS.iter().filter_map(|s| Selector::parse(s).ok()).collect();

    c.bench_function("selector_to_js", |b| {
        b.iter(|| {
            for selector in &selectors {
                black_box(selector.to_js_collection());
            }
        })
    });
}

fn benchmark_scenario_load(c: &mut Criterion) {
    let json = include_str!("../scenarios/app.json");

    c.bench_function("scenario_from_json", |b| {
        b.iter(|| {
            let scenario = Scenario::from_json(black_box(json));
            assert!(scenario.is_ok());
        })
    });
}

criterion_group!(benches, benchmark_selector_parse, benchmark_selector_script, benchmark_scenario_load);
criterion_main!(benches);
