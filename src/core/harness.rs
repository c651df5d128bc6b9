//! # Runner Interface Module / 运行器接口模块
//!
//! The narrow contract between the run driver and the external test runner.
//! The driver builds an [`Invocation`], hands it to a [`Harness`] together with
//! an [`EventSink`], and reads back a [`HarnessReport`]. It never interprets
//! test-level pass/fail logic itself.
//!
//! 运行驱动器与外部测试运行器之间的窄接口。
//! 驱动器构建 [`Invocation`]，将其与 [`EventSink`] 一起交给 [`Harness`]，
//! 然后读回 [`HarnessReport`]。驱动器本身从不解释测试级别的通过/失败逻辑。

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;

use crate::core::application::Application;
use crate::core::models::PersistedBag;

/// Out-of-band event classes the runner may emit while it is running.
/// 运行器在运行期间可能发出的带外事件类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Graphics,
    InstalledAddons,
    EnduranceResults,
}

impl EventKind {
    /// Wire name of the event / 事件的传输名称
    pub fn name(self) -> &'static str {
        match self {
            EventKind::Graphics => "mozmill.graphics",
            EventKind::InstalledAddons => "mozmill.installedAddons",
            EventKind::EnduranceResults => "mozmill.enduranceResults",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            EventKind::Graphics,
            EventKind::InstalledAddons,
            EventKind::EnduranceResults,
        ]
        .into_iter()
        .find(|kind| kind.name() == name)
    }
}

/// Receives events synchronously from inside a running invocation.
/// 在运行中的调用内部同步接收事件。
pub trait EventSink: Send {
    fn on_event(&mut self, kind: EventKind, data: Value);
}

/// Arguments used to construct the profile the runner starts with.
/// 用于构建运行器启动所用配置文件的参数。
#[derive(Debug, Clone, Default)]
pub struct ProfileArgs {
    pub path: PathBuf,
    pub addons: Vec<PathBuf>,
}

/// Arguments used to launch the application under test.
/// 用于启动被测应用程序的参数。
#[derive(Debug, Clone, Default)]
pub struct RunnerArgs {
    pub binary: PathBuf,
    pub logfile: Option<PathBuf>,
    pub port: Option<u16>,
}

/// One blocking call into the external runner.
/// 对外部运行器的一次阻塞调用。
#[derive(Debug, Clone)]
pub struct Invocation {
    pub application: Application,
    pub listeners: Vec<EventKind>,
    pub profile: ProfileArgs,
    pub runner: RunnerArgs,
    pub bridge_timeout: Option<Duration>,
    /// Ordered manifest entries / 有序的清单条目
    pub tests: Vec<PathBuf>,
    /// Restart the application between tests / 在测试之间重启应用程序
    pub restart: bool,
    pub persisted: PersistedBag,
}

/// The external test runner.
/// 外部测试运行器。
pub trait Harness: Send + Sync {
    /// Runs the invocation to completion. Events the invocation listens for
    /// are delivered to `events` in the order the runner emits them.
    ///
    /// 运行调用直至完成。调用所监听的事件会按运行器发出的顺序传递给 `events`。
    fn invoke<'a>(
        &'a self,
        invocation: &'a Invocation,
        events: &'a mut dyn EventSink,
    ) -> BoxFuture<'a, Result<HarnessReport>>;
}

/// Aggregate result of one invocation as reported by the runner.
/// 运行器报告的一次调用的汇总结果。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessReport {
    #[serde(default)]
    pub passed: u32,
    #[serde(default)]
    pub failed: u32,
    #[serde(default)]
    pub skipped: u32,
    #[serde(default)]
    pub results: Vec<TestRecord>,
    /// The persisted bag as the runner left it / 运行器留下的持久化状态
    #[serde(default)]
    pub persisted: PersistedBag,
    #[serde(default)]
    pub time_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub system_info: Map<String, Value>,
    /// Anything else the runner reported, kept for the dashboard.
    /// 运行器报告的其他内容，保留给仪表板。
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HarnessReport {
    /// Wall-clock duration of the invocation in whole seconds.
    /// 调用的挂钟时长（整秒）。
    pub fn elapsed_secs(&self) -> i64 {
        match (self.time_start, self.time_end) {
            (Some(start), Some(end)) => (end - start).num_seconds().max(0),
            _ => 0,
        }
    }
}

/// Outcome of a single test as reported by the runner.
/// 运行器报告的单个测试结果。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestRecord {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub failed: bool,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default)]
    pub skipped_reason: Option<String>,
    /// Either a single failure object or a list of them.
    /// 单个失败对象或失败对象列表。
    #[serde(default, deserialize_with = "one_or_many")]
    pub fails: Vec<Value>,
    /// Milliseconds since the epoch / 自纪元以来的毫秒数
    #[serde(default)]
    pub time_start: Option<u64>,
    #[serde(default)]
    pub time_end: Option<u64>,
}

impl TestRecord {
    /// Message and stack of every failure attached to this test.
    /// 此测试附带的每个失败的消息和堆栈。
    pub fn failure_details(&self) -> Vec<FailureDetail> {
        self.fails.iter().map(FailureDetail::from_value).collect()
    }

    /// Elapsed seconds, zero if the runner did not time the test.
    /// 经过的秒数，如果运行器未计时则为零。
    pub fn elapsed_secs(&self) -> u64 {
        match (self.time_start, self.time_end) {
            (Some(start), Some(end)) => end.saturating_sub(start) / 1000,
            _ => 0,
        }
    }
}

/// A failure record extracted from the runner's loosely typed failure object.
/// 从运行器松散类型的失败对象中提取的失败记录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureDetail {
    pub message: String,
    pub stack: String,
}

impl FailureDetail {
    pub fn from_value(value: &Value) -> Self {
        let data = value
            .get("exception")
            .filter(|v| !v.is_null())
            .or_else(|| value.get("fail").filter(|v| !v.is_null()));
        let field = |key: &str, fallback: &str| {
            data.and_then(|d| d.get(key))
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_else(|| fallback.to_string())
        };
        FailureDetail {
            message: field("message", "Unknown failure."),
            stack: field("stack", "Stack unavailable."),
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        single => vec![single],
    })
}
