//! # Reporting Module / 报告模块
//!
//! Turns the results of a run into its artifacts: JUnit XML files, dashboard
//! documents delivered through a [`dashboard::ReportSink`], and the console
//! summary.
//!
//! 将运行结果转换为其产物：JUnit XML 文件、通过 [`dashboard::ReportSink`]
//! 投递的仪表板文档，以及控制台摘要。

pub mod console;
pub mod dashboard;
pub mod junit;

pub use console::{print_status, print_summary, print_update_results};
pub use dashboard::{build_payload, ReportExtras, ReportMeta, ReportSink};
