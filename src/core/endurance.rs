//! # Endurance Statistics Module / 耐久性统计模块
//!
//! Rolls up the raw checkpoint samples of an endurance run into minimum,
//! maximum and average values per iteration, per test and for the whole run.
//!
//! The set of tracked metrics is fixed by the first checkpoint seen
//! (`timestamp` and `label` excluded). Later checkpoints contribute only to
//! those metrics; extra keys are ignored and missing keys are skipped.
//!
//! 将耐久性运行的原始检查点样本汇总为每次迭代、每个测试以及整个运行的
//! 最小值、最大值和平均值。
//!
//! 跟踪的指标集合由第一个检查点确定（排除 `timestamp` 和 `label`）。
//! 之后的检查点只为这些指标提供数据；多出的键被忽略，缺失的键被跳过。

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Checkpoint keys that never count as metrics.
/// 从不作为指标的检查点键。
pub const BLACKLIST: [&str; 2] = ["timestamp", "label"];

type Samples = BTreeMap<String, Vec<f64>>;

/// Adds `stats` to every iteration and test in `results` and returns the
/// overall statistics. Running it twice on the same data gives the same output.
///
/// 为 `results` 中的每次迭代和每个测试添加 `stats`，并返回整体统计。
/// 对相同数据运行两次会得到相同的输出。
pub fn rollup(results: &mut [Value]) -> Value {
    let mut metrics: Option<Vec<String>> = None;
    let mut all = Samples::new();

    for test in results.iter_mut() {
        let mut test_samples = Samples::new();

        let iterations = test
            .get_mut("iterations")
            .and_then(Value::as_array_mut)
            .map(|items| items.as_mut_slice())
            .unwrap_or_default();
        for iteration in iterations {
            let mut iteration_samples = Samples::new();

            if let Some(checkpoints) = iteration.get("checkpoints").and_then(Value::as_array) {
                for checkpoint in checkpoints {
                    let Some(checkpoint) = checkpoint.as_object() else {
                        continue;
                    };
                    let keys = metrics.get_or_insert_with(|| metric_keys(checkpoint));
                    collect(&mut iteration_samples, keys, checkpoint);
                }
            }

            let keys = metrics.as_deref().unwrap_or_default();
            if let Some(iteration) = iteration.as_object_mut() {
                iteration.insert("stats".into(), stats(&iteration_samples, keys));
            }
            merge(&mut test_samples, iteration_samples);
        }

        let keys = metrics.as_deref().unwrap_or_default();
        if let Some(test) = test.as_object_mut() {
            test.insert("stats".into(), stats(&test_samples, keys));
        }
        merge(&mut all, test_samples);
    }

    stats(&all, metrics.as_deref().unwrap_or_default())
}

fn metric_keys(checkpoint: &Map<String, Value>) -> Vec<String> {
    checkpoint
        .keys()
        .filter(|key| !BLACKLIST.contains(&key.as_str()))
        .cloned()
        .collect()
}

fn collect(samples: &mut Samples, keys: &[String], checkpoint: &Map<String, Value>) {
    for key in keys {
        let values: Vec<f64> = match checkpoint.get(key) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_f64).collect(),
            Some(value) => value.as_f64().into_iter().collect(),
            None => continue,
        };
        samples.entry(key.clone()).or_default().extend(values);
    }
}

fn merge(into: &mut Samples, from: Samples) {
    for (key, values) in from {
        into.entry(key).or_default().extend(values);
    }
}

fn stats(samples: &Samples, keys: &[String]) -> Value {
    let mut out = Map::new();
    for key in keys {
        let Some(values) = samples.get(key).filter(|v| !v.is_empty()) else {
            continue;
        };
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let average = values.iter().sum::<f64>() / values.len() as f64;
        out.insert(
            key.clone(),
            json!({
                "average": number(average),
                "min": number(min),
                "max": number(max),
            }),
        );
    }
    Value::Object(out)
}

/// Whole numbers are reported as integers, like the samples usually are.
/// 整数值以整数形式报告，与样本通常的形式一致。
fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        json!(value as i64)
    } else {
        json!(value)
    }
}
