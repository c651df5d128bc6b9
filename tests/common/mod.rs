// Shared test helpers for integration tests
#![allow(dead_code)]

use anyhow::Result;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use testrun_automation::core::acquirer::Installer;
use testrun_automation::core::config::{HarnessConfig, RunOptions};
use testrun_automation::core::driver::Collaborators;
use testrun_automation::core::environment::Fetcher;
use testrun_automation::core::harness::{EventSink, Harness, HarnessReport, Invocation};
use testrun_automation::core::repository::VersionControl;
use testrun_automation::reporting::dashboard::ReportSink;

/// Version control double: "cloning" copies a prepared fixture tree.
/// 版本控制替身："克隆"即复制预先准备好的夹具目录树。
pub struct FakeVcs {
    pub fixture: PathBuf,
    pub updates: Mutex<Vec<String>>,
}

impl FakeVcs {
    pub fn new(fixture: impl Into<PathBuf>) -> Self {
        Self {
            fixture: fixture.into(),
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn updated_branches(&self) -> Vec<String> {
        self.updates.lock().unwrap().clone()
    }
}

fn copy_tree(from: &Path, to: &Path) -> std::io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}

impl VersionControl for FakeVcs {
    fn metadata_dir(&self) -> &'static str {
        ".hg"
    }

    fn clone_repo<'a>(&'a self, _url: &'a str, dest: &'a Path) -> BoxFuture<'a, Result<()>> {
        async move {
            copy_tree(&self.fixture, dest)?;
            fs::create_dir_all(dest.join(".hg"))?;
            Ok(())
        }
        .boxed()
    }

    fn pull<'a>(&'a self, _path: &'a Path) -> BoxFuture<'a, Result<()>> {
        async { Ok(()) }.boxed()
    }

    fn update<'a>(&'a self, _path: &'a Path, branch: &'a str) -> BoxFuture<'a, Result<()>> {
        self.updates.lock().unwrap().push(branch.to_string());
        async { Ok(()) }.boxed()
    }

    fn branch<'a>(&'a self, _path: &'a Path) -> BoxFuture<'a, Result<String>> {
        let branch = self
            .updates
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_else(|| "default".to_string());
        async move { Ok(branch) }.boxed()
    }

    fn changeset<'a>(&'a self, _path: &'a Path) -> BoxFuture<'a, Result<String>> {
        async { Ok("0123456789ab".to_string()) }.boxed()
    }
}

/// Installer double that refuses to install; tests pass unpacked folders.
/// 拒绝安装的安装程序替身；测试传入的是已解包的目录。
pub struct FakeInstaller;

impl Installer for FakeInstaller {
    fn install<'a>(&'a self, installer: &'a Path, _dest: &'a Path) -> BoxFuture<'a, Result<PathBuf>> {
        async move { anyhow::bail!("unexpected install of {}", installer.display()) }.boxed()
    }

    fn uninstall<'a>(&'a self, _folder: &'a Path) -> BoxFuture<'a, Result<()>> {
        async { Ok(()) }.boxed()
    }
}

/// Installer double that unpacks a fake build and records what it touched.
/// 解包伪构建并记录其操作的安装程序替身。
#[derive(Default)]
pub struct RecordingInstaller {
    pub installed: Mutex<Vec<PathBuf>>,
    pub uninstalled: Mutex<Vec<PathBuf>>,
}

impl RecordingInstaller {
    pub fn installed(&self) -> Vec<PathBuf> {
        self.installed.lock().unwrap().clone()
    }

    pub fn uninstalled(&self) -> Vec<PathBuf> {
        self.uninstalled.lock().unwrap().clone()
    }
}

impl Installer for RecordingInstaller {
    fn install<'a>(&'a self, _installer: &'a Path, dest: &'a Path) -> BoxFuture<'a, Result<PathBuf>> {
        async move {
            anyhow::ensure!(!dest.exists(), "install folder {} is not fresh", dest.display());
            let folder = dest.join("firefox");
            write_app_folder(&folder, None);
            self.installed.lock().unwrap().push(folder.clone());
            Ok(folder)
        }
        .boxed()
    }

    fn uninstall<'a>(&'a self, folder: &'a Path) -> BoxFuture<'a, Result<()>> {
        async move {
            fs::remove_dir_all(folder)?;
            self.uninstalled.lock().unwrap().push(folder.to_path_buf());
            Ok(())
        }
        .boxed()
    }
}

/// Fetcher double that writes a small file and records every URL.
/// 写入小文件并记录每个 URL 的下载器替身。
#[derive(Default)]
pub struct FakeFetcher {
    pub urls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn requested(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl Fetcher for FakeFetcher {
    fn download<'a>(&'a self, url: &'a str, target_dir: &'a Path) -> BoxFuture<'a, Result<PathBuf>> {
        self.urls.lock().unwrap().push(url.to_string());
        async move {
            fs::create_dir_all(target_dir)?;
            let name = url.rsplit('/').next().unwrap_or("download");
            let path = target_dir.join(name);
            fs::write(&path, b"fake")?;
            Ok(path)
        }
        .boxed()
    }
}

type Script = dyn Fn(usize, &Invocation) -> Result<HarnessReport> + Send + Sync;

/// Runner double answering each invocation from a script.
/// 根据脚本响应每次调用的运行器替身。
pub struct FakeHarness {
    script: Box<Script>,
    pub invocations: Mutex<Vec<Invocation>>,
}

impl FakeHarness {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(usize, &Invocation) -> Result<HarnessReport> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Every invocation passes with `passed` tests.
    pub fn passing(passed: u32) -> Self {
        Self::new(move |_, invocation| Ok(report(passed, 0, invocation)))
    }

    pub fn recorded(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }
}

impl Harness for FakeHarness {
    fn invoke<'a>(
        &'a self,
        invocation: &'a Invocation,
        _events: &'a mut dyn EventSink,
    ) -> BoxFuture<'a, Result<HarnessReport>> {
        let index = {
            let mut invocations = self.invocations.lock().unwrap();
            invocations.push(invocation.clone());
            invocations.len() - 1
        };
        let outcome = (self.script)(index, invocation);
        async move { outcome }.boxed()
    }
}

/// A report that hands the persisted bag back unchanged.
/// 原样交回持久化状态的报告。
pub fn report(passed: u32, failed: u32, invocation: &Invocation) -> HarnessReport {
    HarnessReport {
        passed,
        failed,
        persisted: invocation.persisted.clone(),
        ..HarnessReport::default()
    }
}

/// Report sink double that keeps every delivered payload.
/// 保留每个投递负载的报告接收器替身。
#[derive(Default)]
pub struct RecordingSink {
    pub delivered: Mutex<Vec<(String, usize, Value)>>,
}

impl RecordingSink {
    pub fn payloads(&self) -> Vec<Value> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, payload)| payload.clone())
            .collect()
    }
}

impl ReportSink for RecordingSink {
    fn deliver<'a>(
        &'a self,
        destination: &'a str,
        index: usize,
        report: &'a Value,
    ) -> BoxFuture<'a, Result<String>> {
        self.delivered
            .lock()
            .unwrap()
            .push((destination.to_string(), index, report.clone()));
        async move { Ok(format!("{}#{}", destination, index)) }.boxed()
    }
}

/// Test doubles bundled with the collaborators handed to the driver.
/// 测试替身及交给驱动器的协作者集合。
pub struct Fixture {
    pub root: TempDir,
    pub vcs: Arc<FakeVcs>,
    pub fetcher: Arc<FakeFetcher>,
    pub harness: Arc<FakeHarness>,
    pub reports: Arc<RecordingSink>,
}

impl Fixture {
    /// Creates a test-suite tree containing `folders` (relative paths), each
    /// with a single test file.
    ///
    /// 创建包含 `folders`（相对路径）的测试套件目录树，每个目录中有一个测试文件。
    pub fn new(folders: &[&str], harness: FakeHarness) -> Self {
        let root = tempfile::tempdir().unwrap();
        let suite = root.path().join("suite");
        for folder in folders {
            let dir = suite.join(folder);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("test1.js"), "// test").unwrap();
        }
        fs::create_dir_all(&suite).unwrap();
        Self {
            vcs: Arc::new(FakeVcs::new(suite)),
            fetcher: Arc::new(FakeFetcher::default()),
            harness: Arc::new(harness),
            reports: Arc::new(RecordingSink::default()),
            root,
        }
    }

    pub fn suite(&self) -> PathBuf {
        self.root.path().join("suite")
    }

    pub fn collaborators(&self) -> Collaborators {
        self.collaborators_with(Arc::new(FakeInstaller))
    }

    pub fn collaborators_with(&self, installer: Arc<dyn Installer>) -> Collaborators {
        Collaborators {
            vcs: self.vcs.clone(),
            installer,
            fetcher: self.fetcher.clone(),
            harness: self.harness.clone(),
            reports: self.reports.clone(),
        }
    }

    /// Creates an unpacked Linux build with the given `SourceRepository`.
    /// 创建带有给定 `SourceRepository` 的已解包 Linux 构建。
    pub fn build(&self, source_repository: Option<&str>) -> PathBuf {
        let folder = self.root.path().join("firefox");
        write_app_folder(&folder, source_repository);
        folder
    }

    pub fn workspace(&self) -> PathBuf {
        let workspace = self.root.path().join("workspace");
        fs::create_dir_all(&workspace).unwrap();
        workspace
    }

    pub fn options(&self, binary: PathBuf) -> RunOptions {
        RunOptions {
            binaries: vec![binary],
            workspace: Some(self.workspace()),
            ..RunOptions::default()
        }
    }
}

pub fn write_app_folder(folder: &Path, source_repository: Option<&str>) {
    fs::create_dir_all(folder.join("defaults").join("pref")).unwrap();
    let mut ini = String::from("[App]\nName=Firefox\nVersion=10.0\nBuildID=20120101000000\n");
    if let Some(source) = source_repository {
        ini.push_str(&format!("SourceRepository={}\n", source));
    }
    fs::write(folder.join("application.ini"), ini).unwrap();
    fs::write(
        folder.join("defaults").join("pref").join("channel-prefs.js"),
        "pref(\"app.update.channel\", \"beta\");\n",
    )
    .unwrap();
    fs::write(folder.join("firefox"), "#!/bin/sh\n").unwrap();
}

pub fn config() -> HarnessConfig {
    HarnessConfig::default()
}
