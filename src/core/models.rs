//! # Data Models Module / 数据模型模块
//!
//! This module defines the data structures shared by the run driver and the
//! reporters: the error taxonomy behind the process exit code, the terminal
//! run status, and the per-invocation and per-update-phase records.
//!
//! 此模块定义运行驱动器与报告器共享的数据结构：
//! 决定进程退出码的错误分类、最终运行状态，以及每次调用和每个更新阶段的记录。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

use crate::core::harness::HarnessReport;

/// Key/value state exchanged with the external runner.
/// 与外部运行器交换的键值状态。
pub type PersistedBag = Map<String, Value>;

/// Classified failures that the exit-code contract depends on.
/// Everything not listed here ends a run as `Aborted`.
///
/// 退出码约定所依赖的已分类失败。
/// 未在此列出的任何错误都会使运行以 `Aborted` 结束。
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Wrong invocation of the tool itself (e.g. no binary given).
    /// 工具本身调用方式错误（例如未指定二进制文件）。
    #[error("{0}")]
    Usage(String),
    /// A required resource does not exist.
    /// 所需资源不存在。
    #[error("{message}: {location}")]
    NotFound { message: String, location: String },
    /// The given path is neither an installer nor an application build.
    /// 给定路径既不是安装包也不是应用程序构建。
    #[error("Invalid binary specified: {0}")]
    InvalidBinary(String),
    /// Preparing the repository, binary or environment failed.
    /// 准备仓库、二进制文件或环境失败。
    #[error("{0}")]
    Setup(String),
    /// The checked out branch has no tests for the requested run type.
    /// 检出的分支中没有所请求运行类型的测试。
    #[error("Test-run type '{variant}' is not supported by branch '{branch}' of the test repository")]
    Unsupported { variant: String, branch: String },
    /// At least one invocation reported failing tests.
    /// 至少一次调用报告了失败的测试。
    #[error("Some tests have failed.")]
    TestsFailed,
    /// An update channel outside the known list was requested.
    /// 请求了不在已知列表中的更新通道。
    #[error("'{0}' is not a valid update channel")]
    InvalidChannel(String),
}

impl RunError {
    pub fn not_found(message: impl Into<String>, location: impl fmt::Display) -> Self {
        RunError::NotFound {
            message: message.into(),
            location: location.to_string(),
        }
    }

    /// Finds the classified error inside an `anyhow` chain, looking at
    /// context layers first and the underlying causes afterwards.
    ///
    /// 在 `anyhow` 错误链中查找已分类的错误，先检查 context 层，再检查底层原因。
    pub fn find(err: &anyhow::Error) -> Option<&RunError> {
        err.downcast_ref::<RunError>()
            .or_else(|| err.chain().find_map(|cause| cause.downcast_ref::<RunError>()))
    }
}

/// Terminal classification of one top-level invocation of the tool.
/// 工具一次顶层调用的最终分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Success,
    TestsFailed,
    Aborted,
    Unsupported,
}

impl RunStatus {
    /// Process exit code expected by the CI system.
    /// CI 系统所期望的进程退出码。
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Success => 0,
            RunStatus::TestsFailed => 2,
            RunStatus::Aborted => 3,
            RunStatus::Unsupported => 4,
        }
    }

    /// Maps an error that escaped a run onto its terminal status.
    /// 将逃逸出运行的错误映射到其最终状态。
    pub fn from_error(err: &anyhow::Error) -> Self {
        match RunError::find(err) {
            Some(RunError::Unsupported { .. }) => RunStatus::Unsupported,
            Some(RunError::TestsFailed) => RunStatus::TestsFailed,
            _ => RunStatus::Aborted,
        }
    }

    /// Classifies the outcome of a whole run. An error always wins over
    /// failing tests, failing tests win over success.
    ///
    /// 对整个运行的结果进行分类。错误总是优先于测试失败，测试失败优先于成功。
    pub fn classify(outcome: &anyhow::Result<RunSummary>) -> Self {
        match outcome {
            Ok(summary) => summary.status(),
            Err(err) => RunStatus::from_error(err),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStatus::Success => "success",
            RunStatus::TestsFailed => "tests failed",
            RunStatus::Aborted => "aborted",
            RunStatus::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// One completed call into the external runner.
/// 对外部运行器的一次已完成调用。
#[derive(Debug, Clone)]
pub struct InvocationRecord {
    /// Human readable label, e.g. `functional` or `addons/ide@seleniumhq.org/restart`.
    /// 可读标签，例如 `functional` 或 `addons/ide@seleniumhq.org/restart`。
    pub label: String,
    /// Manifest entries handed to the runner / 交给运行器的清单条目
    pub tests: Vec<PathBuf>,
    /// Whether the application was restarted between tests / 测试之间是否重启应用
    pub restart: bool,
    /// The raw report returned by the runner / 运行器返回的原始报告
    pub report: HarnessReport,
    /// JUnit file written for this invocation, if any / 为此调用写入的 JUnit 文件
    pub junit: Option<PathBuf>,
}

impl InvocationRecord {
    pub fn has_failures(&self) -> bool {
        self.report.failed > 0
    }
}

/// Result of one software-update phase (direct or fallback).
/// 一个软件更新阶段（直接或回退）的结果。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePhase {
    pub fallback: bool,
    pub success: bool,
    pub passes: u32,
    pub fails: u32,
    pub skipped: u32,
    /// The persisted bag as read back after the phase.
    /// 阶段结束后读回的持久化状态。
    pub data: PersistedBag,
}

impl UpdatePhase {
    /// The update attempts recorded by the runner during this phase.
    /// 运行器在此阶段记录的更新尝试。
    pub fn updates(&self) -> &[Value] {
        self.data
            .get("updates")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether the last recorded update attempt reported success.
    /// 最后一次记录的更新尝试是否报告成功。
    pub fn last_update_succeeded(&self) -> bool {
        self.updates()
            .last()
            .and_then(|update| update.get("success"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Everything a finished run hands to the console reporter.
/// 完成的运行交给控制台报告器的所有内容。
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub invocations: Vec<InvocationRecord>,
    pub update_phases: Vec<UpdatePhase>,
    /// Sticky flag: set once any invocation reported failures.
    /// 粘性标志：任何调用报告失败后即被设置。
    pub tests_failed: bool,
}

impl RunSummary {
    pub fn status(&self) -> RunStatus {
        if self.tests_failed {
            RunStatus::TestsFailed
        } else {
            RunStatus::Success
        }
    }
}
