//! # Core Module / 核心模块
//!
//! The test-run lifecycle: resolving the build, preparing the test-suite
//! checkout and the execution environment, driving the external runner
//! through the phases of a run type, and classifying the outcome.
//!
//! 测试运行生命周期：解析构建、准备测试套件检出和执行环境、
//! 驱动外部运行器完成运行类型的各个阶段，并对结果进行分类。

pub mod acquirer;
pub mod application;
pub mod compat;
pub mod config;
pub mod driver;
pub mod endurance;
pub mod environment;
pub mod harness;
pub mod manifest;
pub mod models;
pub mod repository;
pub mod variant;

// Re-exports
pub use config::{HarnessConfig, RunOptions, RunVariant};
pub use driver::{Collaborators, RunDriver};
pub use models::{RunError, RunStatus, RunSummary};
