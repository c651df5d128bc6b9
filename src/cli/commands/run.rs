//! # Run Command Module / 运行命令模块
//!
//! Executes one test-run of any type and reports its terminal status.
//!
//! 执行任意类型的一次测试运行并报告其最终状态。

use anyhow::Result;
use colored::*;

use crate::core::{
    config::{HarnessConfig, RunOptions},
    driver::{Collaborators, RunDriver},
    models::{RunError, RunStatus},
};
use crate::reporting::console::print_status;

/// Runs the test-run described by `options`.
///
/// Usage errors are returned as `Err` so the caller can exit with the usage
/// code; every other outcome is classified into a [`RunStatus`].
///
/// 运行 `options` 描述的测试运行。
/// 用法错误以 `Err` 返回，以便调用方使用用法退出码退出；其他所有结果都会被分类为 [`RunStatus`]。
pub async fn execute(config: HarnessConfig, options: RunOptions) -> Result<RunStatus> {
    let collaborators = match Collaborators::from_config(&config) {
        Ok(collaborators) => collaborators,
        Err(e) => {
            eprintln!("{}", format!("{:#}", e).red());
            print_status(RunStatus::Aborted);
            return Ok(RunStatus::Aborted);
        }
    };
    let mut driver = RunDriver::new(config, options, collaborators);
    let outcome = driver.run().await;

    let status = RunStatus::classify(&outcome);
    if let Err(e) = outcome {
        if matches!(RunError::find(&e), Some(RunError::Usage(_))) {
            return Err(e);
        }
        eprintln!("{}", format!("{:#}", e).red());
    }
    print_status(status);
    Ok(status)
}
