use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};
use std::hint::black_box;
use testrun_automation::core::endurance::rollup;
use testrun_automation::core::harness::{HarnessReport, TestRecord};
use testrun_automation::reporting::junit;

fn sample_report(tests: usize) -> HarnessReport {
    let results = (0..tests)
        .map(|i| TestRecord {
            filename: format!("/work/tests-repository/tests/functional/testSuite{}/test{}.js", i / 10, i),
            name: format!("testSuite::testCase{}", i),
            failed: i % 7 == 0,
            fails: vec![json!({"exception": {"message": "Timeout <exceeded>", "stack": "at line 42"}})],
            time_start: Some(1_000),
            time_end: Some(4_000),
            ..TestRecord::default()
        })
        .collect();
    HarnessReport {
        results,
        ..HarnessReport::default()
    }
}

fn endurance_results(tests: usize, iterations: usize) -> Vec<Value> {
    (0..tests)
        .map(|t| {
            let iterations: Vec<Value> = (0..iterations)
                .map(|i| {
                    json!({"checkpoints": [
                        {"label": "start", "timestamp": i, "allocated": 100 + t + i, "mapped": [1, 2, 3]},
                        {"label": "end", "timestamp": i + 1, "allocated": 200 + t + i, "mapped": 4}
                    ]})
                })
                .collect();
            json!({"testMethod": format!("test{}", t), "iterations": iterations})
        })
        .collect()
}

fn bench_junit_render(c: &mut Criterion) {
    let report = sample_report(500);
    c.bench_function("junit_render_500", |b| {
        b.iter(|| junit::render(black_box(&report), "firefox-functional", "tests/functional"));
    });
}

fn bench_endurance_rollup(c: &mut Criterion) {
    let results = endurance_results(20, 50);
    c.bench_function("endurance_rollup_20x50", |b| {
        b.iter(|| {
            let mut results = results.clone();
            rollup(black_box(&mut results))
        });
    });
}

criterion_group!(benches, bench_junit_render, bench_endurance_rollup);
criterion_main!(benches);
