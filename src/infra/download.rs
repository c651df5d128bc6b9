//! # Transfer Module / 传输模块
//!
//! HTTP transfers through `reqwest`: downloading add-ons and builds
//! ([`HttpFetcher`]) and delivering dashboard reports ([`HttpReportSink`]).
//! `file://` URLs and plain paths are served from the local file system.
//!
//! 通过 `reqwest` 进行 HTTP 传输：下载附加组件和构建（[`HttpFetcher`]），
//! 以及投递仪表板报告（[`HttpReportSink`]）。
//! `file://` URL 和普通路径由本地文件系统提供。

use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::environment::{download_file_name, Fetcher};
use crate::infra::fs::unique_filename;
use crate::reporting::dashboard::ReportSink;

/// Local path for a `file://` URL.
/// `file://` URL 对应的本地路径。
pub fn file_url_path(url: &str) -> Option<PathBuf> {
    url.strip_prefix("file://").map(PathBuf::from)
}

fn is_http(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch(&self, url: &str, target: &Path) -> Result<()> {
        if let Some(source) = file_url_path(url) {
            fs::copy(&source, target).with_context(|| {
                format!("Failed to copy '{}' to '{}'", source.display(), target.display())
            })?;
            return Ok(());
        }
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to '{}' failed", url))?
            .error_for_status()
            .with_context(|| format!("Server refused '{}'", url))?;
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read the body of '{}'", url))?;
        fs::write(target, &bytes)
            .with_context(|| format!("Failed to write '{}'", target.display()))
    }
}

impl Fetcher for HttpFetcher {
    fn download<'a>(&'a self, url: &'a str, target_dir: &'a Path) -> BoxFuture<'a, Result<PathBuf>> {
        async move {
            fs::create_dir_all(target_dir)
                .with_context(|| format!("Failed to create {}", target_dir.display()))?;
            let target = target_dir.join(download_file_name(url));
            self.fetch(url, &target).await?;
            Ok(target)
        }
        .boxed()
    }
}

/// Delivers dashboard reports: `http(s)://` destinations receive a JSON
/// POST, anything else is written as a JSON file.
///
/// 投递仪表板报告：`http(s)://` 目标接收 JSON POST 请求，其他目标写入 JSON 文件。
#[derive(Debug, Clone, Default)]
pub struct HttpReportSink {
    client: reqwest::Client,
}

impl HttpReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    async fn post(&self, url: &str, report: &Value) -> Result<String> {
        let response = self
            .client
            .post(url)
            .json(report)
            .send()
            .await
            .with_context(|| format!("Failed to send the report to '{}'", url))?
            .error_for_status()
            .with_context(|| format!("Report server '{}' rejected the report", url))?;
        let body: Value = response.json().await.unwrap_or(Value::Null);
        Ok(body
            .get("id")
            .and_then(Value::as_str)
            .map(|id| format!("{}/{}", url.trim_end_matches('/'), id))
            .unwrap_or_else(|| url.to_string()))
    }

    fn write(&self, destination: &str, index: usize, report: &Value) -> Result<String> {
        let base = file_url_path(destination).unwrap_or_else(|| PathBuf::from(destination));
        let path = unique_filename(&base, index);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(report)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write the report to '{}'", path.display()))?;
        Ok(path.display().to_string())
    }
}

impl ReportSink for HttpReportSink {
    fn deliver<'a>(
        &'a self,
        destination: &'a str,
        index: usize,
        report: &'a Value,
    ) -> BoxFuture<'a, Result<String>> {
        async move {
            if is_http(destination) {
                self.post(destination, report).await
            } else {
                self.write(destination, index, report)
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_urls_are_copied() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.xpi");
        fs::write(&source, b"addon").unwrap();
        let url = format!("file://{}", source.display());

        let target_dir = dir.path().join("addons");
        let fetched = HttpFetcher::new()
            .download(&url, &target_dir)
            .await
            .unwrap();

        assert_eq!(fetched, target_dir.join("source.xpi"));
        assert_eq!(fs::read(fetched).unwrap(), b"addon");
    }

    #[tokio::test]
    async fn reports_without_scheme_are_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("report.json");
        let sink = HttpReportSink::new();
        let report = serde_json::json!({"report_type": "firefox-functional"});

        let first = sink
            .deliver(destination.to_str().unwrap(), 0, &report)
            .await
            .unwrap();
        let second = sink
            .deliver(destination.to_str().unwrap(), 1, &report)
            .await
            .unwrap();

        assert_eq!(PathBuf::from(first), dir.path().join("report_0.json"));
        assert_eq!(PathBuf::from(second), dir.path().join("report_1.json"));
    }
}
