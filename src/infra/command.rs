//! # Command Execution Module / 命令执行模块
//!
//! Helpers for running the external tools the automation depends on
//! (version control, installers) and capturing what they print.
//!
//! 用于运行自动化所依赖的外部工具（版本控制、安装程序）并捕获其输出的辅助函数。

use anyhow::{Context, Result};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Spawns a command and captures its stdout and stderr.
/// The output streams are read concurrently and combined into a single string.
///
/// 派生一个命令，捕获其 stdout 和 stderr。
/// 输出流被并发读取并合并到一个字符串中。
///
/// # Returns
/// A tuple containing:
/// - The `ExitStatus` of the process wrapped in an `io::Result`.
/// - The combined stdout and stderr as a `String`.
pub async fn spawn_and_capture(
    mut cmd: tokio::process::Command,
) -> (std::io::Result<ExitStatus>, String) {
    let mut child = match cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return (Err(e), String::new()),
    };

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return (
            Err(std::io::Error::other("Failed to capture process output")),
            String::new(),
        );
    };

    // Both readers append to the same buffer so the interleaving stays roughly chronological.
    // 两个读取器追加到同一个缓冲区，以使交错顺序大致保持时间顺序。
    let output = Arc::new(tokio::sync::Mutex::new(String::new()));
    let stdout_handle = tokio::spawn(collect_lines(stdout, Arc::clone(&output)));
    let stderr_handle = tokio::spawn(collect_lines(stderr, Arc::clone(&output)));

    let status = child.wait().await;

    if let Err(e) = stdout_handle.await {
        eprintln!("Failed to join stdout task: {}", e);
    }
    if let Err(e) = stderr_handle.await {
        eprintln!("Failed to join stderr task: {}", e);
    }

    let captured = output.lock().await.clone();
    (status, captured)
}

async fn collect_lines<R>(stream: R, output: Arc<tokio::sync::Mutex<String>>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut output = output.lock().await;
        output.push_str(&line);
        output.push('\n');
    }
}

/// Runs a command to completion and returns its trimmed output.
/// A non-zero exit status is an error that carries the command line and
/// everything the command printed.
///
/// 运行命令直至完成并返回去除首尾空白的输出。
/// 非零退出状态会被视为错误，错误中包含命令行及命令打印的全部内容。
pub async fn check_output(cmd: tokio::process::Command) -> Result<String> {
    let description = describe(&cmd);
    let (status, output) = spawn_and_capture(cmd).await;
    let status = status.with_context(|| format!("Failed to execute '{}'", description))?;
    if !status.success() {
        anyhow::bail!(
            "Command '{}' failed with {}:\n{}",
            description,
            status,
            output.trim()
        );
    }
    Ok(output.trim().to_string())
}

/// Runs a command to completion and returns its trimmed stdout alone, so
/// warnings on stderr never leak into the value. On failure the error
/// carries both streams.
///
/// 运行命令直至完成，仅返回去除首尾空白的 stdout，使 stderr 上的警告不会混入结果。
/// 失败时错误中包含两个输出流的内容。
pub async fn stdout_of(mut cmd: tokio::process::Command) -> Result<String> {
    let description = describe(&cmd);
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("Failed to execute '{}'", description))?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !output.status.success() {
        anyhow::bail!(
            "Command '{}' failed with {}:\n{}\n{}",
            description,
            output.status,
            stdout.trim(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(stdout.trim().to_string())
}

/// Renders a command line for log and error messages.
/// 为日志和错误消息渲染命令行。
pub fn describe(cmd: &tokio::process::Command) -> String {
    let std_cmd = cmd.as_std();
    std::iter::once(std_cmd.get_program())
        .chain(std_cmd.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
