//! # Compat Command Module / 兼容性命令模块
//!
//! Runs the compatible-by-default matrix described by a JSON file.
//! 运行由 JSON 文件描述的默认兼容矩阵。

use anyhow::Result;
use colored::*;
use std::path::Path;

use crate::cli::parse_run_options;
use crate::core::{
    compat::{CompatConfig, CompatRun},
    config::HarnessConfig,
    driver::Collaborators,
    models::RunStatus,
};
use crate::reporting::console::print_status;

pub async fn execute(
    config: HarnessConfig,
    file: &Path,
    repository: Option<String>,
) -> Result<RunStatus> {
    let compat = CompatConfig::load(file)?;
    let collaborators = Collaborators::from_config(&config)?;
    let mut run = CompatRun::new(compat, config, collaborators, repository);

    let outcome = run.run(&parse_run_options).await;
    let status = match &outcome {
        Ok(()) => RunStatus::Success,
        Err(e) => {
            eprintln!("{}", format!("{:#}", e).red());
            RunStatus::from_error(e)
        }
    };
    print_status(status);
    Ok(status)
}
