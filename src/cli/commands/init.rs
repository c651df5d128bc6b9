//! # Init Command Module / 初始化命令模块
//!
//! Writes a `Testrun.toml` holding the built-in defaults, ready to be edited.
//!
//! 写入一个包含内置默认值、可直接编辑的 `Testrun.toml`。

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::{fs, path::Path, path::PathBuf};

use crate::core::config::HarnessConfig;
use crate::infra::t;

const HEADER: &str = "# Test-run harness configuration / 测试运行工具配置\n\
# language = \"en\"\n\
# workspace = \"~/testrun\"\n\n";

/// Default configuration rendered as TOML.
/// 以 TOML 形式呈现的默认配置。
pub fn default_config_text() -> Result<String> {
    let body = toml::to_string_pretty(&HarnessConfig::default())
        .context("Failed to render the default configuration")?;
    Ok(format!("{}{}", HEADER, body))
}

fn confirm_overwrite(output: &Path) -> Result<bool> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("init.overwrite_prompt", path = output.display()).to_string())
        .default(false)
        .interact()
        .context(t!("init.confirmation_failed").to_string())
}

pub fn execute(output: PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force && !confirm_overwrite(&output)? {
        println!("{}", t!("init.cancelled").yellow());
        return Ok(());
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| {
            t!("init.create_parent_dir_failed", path = parent.display()).to_string()
        })?;
    }

    fs::write(&output, default_config_text()?)
        .with_context(|| t!("init.write_failed", path = output.display()).to_string())?;

    println!("{}", t!("init.success", path = output.display()).green());
    Ok(())
}
