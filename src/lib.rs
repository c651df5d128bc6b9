//! # Test-Run Automation Library / 测试运行自动化库
//!
//! Orchestrates automated browser test-runs: acquires a build, prepares the
//! test-suite checkout and a clean profile, drives an external test runner
//! through the phases of a run type and publishes JUnit and dashboard reports.
//!
//! 编排自动化浏览器测试运行：获取构建、准备测试套件检出和干净的配置文件，
//! 驱动外部测试运行器完成运行类型的各个阶段，并发布 JUnit 和仪表板报告。
//!
//! ## Modules / 模块
//!
//! - `core` - Run lifecycle, run types and data models
//! - `infra` - Processes, file system, downloads, Mercurial and installers
//! - `reporting` - Console, JUnit and dashboard output
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 运行生命周期、运行类型和数据模型
//! - `infra` - 进程、文件系统、下载、Mercurial 和安装程序
//! - `reporting` - 控制台、JUnit 和仪表板输出
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use core::config;
pub use core::models;

/// Selects the interface language. Tries the full locale (e.g. "zh-CN"),
/// then the language part (e.g. "en" from "en-US"), finally "en".
///
/// 选择界面语言。先尝试完整区域设置（例如 "zh-CN"），
/// 再尝试语言部分（例如 "en-US" 中的 "en"），最后回退到 "en"。
pub fn set_language(requested: &str) {
    let available_locales = rust_i18n::available_locales!();
    let lang = if available_locales.contains(&requested) {
        requested
    } else {
        requested
            .split(['-', '_'])
            .next()
            .filter(|lang_code| available_locales.contains(lang_code))
            .unwrap_or("en")
    };
    rust_i18n::set_locale(lang);
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
