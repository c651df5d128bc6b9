//! # Process Runner Module / 进程运行器模块
//!
//! [`Harness`] implementation that launches the external test runner as a
//! child process. The persisted bag goes in as a JSON file, events come back
//! as `EVENT <name> <json>` lines on stdout, and the final report is read from
//! the JSON file the runner writes before it exits.
//!
//! 以子进程方式启动外部测试运行器的 [`Harness`] 实现。
//! 持久化状态以 JSON 文件传入，事件以 stdout 上的 `EVENT <name> <json>` 行返回，
//! 最终报告从运行器退出前写入的 JSON 文件中读取。

use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::core::harness::{EventKind, EventSink, Harness, HarnessReport, Invocation};
use crate::infra::command::describe;

const EVENT_PREFIX: &str = "EVENT ";

#[derive(Debug, Clone)]
pub struct ProcessHarness {
    program: String,
    base_args: Vec<String>,
}

impl ProcessHarness {
    /// `command` is the runner's command line already split into words.
    /// `command` 是已经拆分为单词的运行器命令行。
    pub fn new(command: Vec<String>) -> Result<Self> {
        let mut parts = command.into_iter();
        let program = parts.next().context("The runner command must not be empty")?;
        Ok(Self {
            program,
            base_args: parts.collect(),
        })
    }

    fn command(&self, invocation: &Invocation, persisted: &Path, report: &Path) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.base_args)
            .arg("--app")
            .arg(invocation.application.name())
            .arg("--binary")
            .arg(&invocation.runner.binary)
            .arg("--profile")
            .arg(&invocation.profile.path);
        for addon in &invocation.profile.addons {
            cmd.arg("--addon").arg(addon);
        }
        for test in &invocation.tests {
            cmd.arg("--test").arg(test);
        }
        if invocation.restart {
            cmd.arg("--restart");
        }
        if let Some(logfile) = &invocation.runner.logfile {
            cmd.arg("--logfile").arg(logfile);
        }
        if let Some(port) = invocation.runner.port {
            cmd.arg("--port").arg(port.to_string());
        }
        if let Some(timeout) = invocation.bridge_timeout {
            cmd.arg("--timeout").arg(timeout.as_secs().to_string());
        }
        cmd.arg("--persisted")
            .arg(persisted)
            .arg("--report")
            .arg(report)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, invocation: &Invocation, events: &mut dyn EventSink) -> Result<HarnessReport> {
        let exchange = tempfile::Builder::new()
            .prefix("testrun_exchange_")
            .tempdir()
            .context("Failed to create the runner exchange folder")?;
        let persisted_path = exchange.path().join("persisted.json");
        let report_path = exchange.path().join("report.json");
        fs::write(
            &persisted_path,
            serde_json::to_vec_pretty(&invocation.persisted)?,
        )
        .context("Failed to write the persisted state for the runner")?;

        let mut cmd = self.command(invocation, &persisted_path, &report_path);
        let description = describe(&cmd);
        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to launch the test runner '{}'", description))?;

        let stdout = child
            .stdout
            .take()
            .context("Failed to capture the runner output")?;
        pump_output(BufReader::new(stdout), &invocation.listeners, events)
            .await
            .context("Failed to read the runner output")?;

        // The runner exits non-zero when tests fail; only a missing report is fatal.
        let status = child.wait().await?;
        if !report_path.is_file() {
            anyhow::bail!(
                "The test runner '{}' exited with {} without writing a report",
                description,
                status
            );
        }
        let content = fs::read_to_string(&report_path)
            .with_context(|| format!("Failed to read {}", report_path.display()))?;
        serde_json::from_str(&content).context("The test runner wrote an invalid report")
    }
}

/// Reads runner output until EOF. Event lines the invocation listens for go
/// to `events`; everything else is echoed. Bytes that are not UTF-8 are
/// replaced rather than ending the stream.
///
/// 读取运行器输出直到结束。调用所监听的事件行交给 `events`，其余内容原样回显。
/// 非 UTF-8 字节会被替换，而不会中断输出流。
pub async fn pump_output<R>(
    mut reader: R,
    listeners: &[EventKind],
    events: &mut dyn EventSink,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        match parse_event(line) {
            Some((kind, data)) if listeners.contains(&kind) => events.on_event(kind, data),
            Some(_) => {}
            None => println!("{}", line),
        }
    }
}

impl Harness for ProcessHarness {
    fn invoke<'a>(
        &'a self,
        invocation: &'a Invocation,
        events: &'a mut dyn EventSink,
    ) -> BoxFuture<'a, Result<HarnessReport>> {
        self.run(invocation, events).boxed()
    }
}

/// Parses an `EVENT <name> <json>` line. Unknown event names and payloads
/// that are not JSON are treated as ordinary output.
///
/// 解析 `EVENT <name> <json>` 行。未知事件名称和非 JSON 负载视为普通输出。
pub fn parse_event(line: &str) -> Option<(EventKind, Value)> {
    let rest = line.strip_prefix(EVENT_PREFIX)?;
    let (name, payload) = rest.split_once(' ').unwrap_or((rest, "null"));
    let kind = EventKind::from_name(name.trim())?;
    let data = serde_json::from_str(payload.trim()).ok()?;
    Some((kind, data))
}
