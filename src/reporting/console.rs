//! # Console Reporting Module / 控制台报告模块
//!
//! Run narration that is not tied to a single step: the platform banner, the
//! per-invocation summary table, the update result lines and the final
//! status.
//!
//! 不属于单个步骤的运行叙述：平台横幅、每次调用的摘要表、更新结果行以及最终状态。

use chrono::Local;
use colored::*;
use serde_json::Value;

use crate::core::models::{RunStatus, RunSummary, UpdatePhase};
use crate::infra::t;

/// Prints the operating system and architecture the run executes on.
/// 打印运行所在的操作系统和架构。
pub fn print_platform_banner() {
    println!(
        "{}",
        t!(
            "console.platform",
            os = std::env::consts::OS,
            arch = std::env::consts::ARCH
        )
    );
}

/// Prints a formatted summary of every invocation of the run.
/// 打印运行中每次调用的格式化摘要。
///
/// # Output Format / 输出格式
/// ```text
/// --- Test-run Summary ---
///   - Passed   | functional                     | 120 passed,   0 failed,   3 skipped |    95s
///   - Failed   | functional/restartTests        |  10 passed,   1 failed,   0 skipped |    31s
/// ```
pub fn print_summary(summary: &RunSummary) {
    if summary.invocations.is_empty() {
        return;
    }
    println!("\n{}", t!("console.summary_banner").bold());

    for record in &summary.invocations {
        let status = if record.has_failures() {
            t!("console.status_failed").red()
        } else {
            t!("console.status_passed").green()
        };
        println!(
            "  - {:<8} | {:<40} | {:>4} {}, {:>3} {}, {:>3} {} | {:>5}s",
            status,
            record.label,
            record.report.passed,
            t!("console.passed"),
            record.report.failed,
            t!("console.failed"),
            record.report.skipped,
            t!("console.skipped"),
            record.report.elapsed_secs()
        );
    }
}

fn text<'a>(value: &'a Value, path: &[&str]) -> &'a str {
    path.iter()
        .try_fold(value, |node, key| node.get(*key))
        .and_then(Value::as_str)
        .unwrap_or("n/a")
}

/// One result line for an update phase, built from its first and last
/// update attempt. `None` when the phase recorded no update at all.
///
/// 更新阶段的一条结果行，由其第一次和最后一次更新尝试构建。
/// 当阶段根本没有记录更新时为 `None`。
pub fn update_entry(phase: &UpdatePhase) -> Option<String> {
    let updates = phase.updates();
    let (first, last) = (updates.first()?, updates.last()?);

    let is_complete = last
        .pointer("/patch/is_complete")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let fallback = last
        .get("fallback")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let success = last.get("success").and_then(Value::as_bool).unwrap_or(false) && phase.fails == 0;

    Some(format!(
        "* {} => {}, {}, {}, {}{}, {}, {}, '''{}'''\n** {} ID:{}\n** {} ID:{}\n** Passed {} :: Failed {} :: Skipped {}",
        text(first, &["build_pre", "version"]),
        text(last, &["build_post", "version"]),
        text(last, &["patch", "type"]),
        text(first, &["build_pre", "locale"]),
        if is_complete { "complete" } else { "partial" },
        if fallback { "+fallback" } else { "" },
        text(last, &["patch", "channel"]),
        Local::now().date_naive(),
        if success { "PASS" } else { "FAIL" },
        text(first, &["build_pre", "user_agent"]),
        text(first, &["build_pre", "buildid"]),
        text(last, &["build_post", "user_agent"]),
        text(last, &["build_post", "buildid"]),
        phase.passes,
        phase.fails,
        phase.skipped,
    ))
}

/// Phases worth printing: the direct phase alone when every phase succeeded,
/// otherwise all of them.
///
/// 值得打印的阶段：所有阶段都成功时只打印直接更新阶段，否则打印全部阶段。
pub fn reported_update_phases(phases: &[UpdatePhase]) -> Vec<&UpdatePhase> {
    let all_passed = phases.iter().all(|p| p.success);
    if all_passed {
        phases.iter().filter(|p| !p.fallback).take(1).collect()
    } else {
        phases.iter().collect()
    }
}

pub fn print_update_results(phases: &[UpdatePhase]) {
    if phases.is_empty() {
        return;
    }
    println!("\n{}", t!("console.update_results").bold());
    println!("========");
    for phase in reported_update_phases(phases) {
        match update_entry(phase) {
            Some(entry) => println!("{}", entry),
            None => println!("{}", t!("console.no_updates", fallback = phase.fallback).yellow()),
        }
    }
}

/// Prints the final classification of the run.
/// 打印运行的最终分类。
pub fn print_status(status: RunStatus) {
    let line = t!("console.final_status", status = status, code = status.exit_code());
    match status {
        RunStatus::Success => println!("\n{}", line.green().bold()),
        RunStatus::TestsFailed => println!("\n{}", line.red().bold()),
        RunStatus::Aborted => eprintln!("\n{}", line.red().bold()),
        RunStatus::Unsupported => println!("\n{}", line.yellow().bold()),
    }
}
