//! # Repository Manager Module / 仓库管理模块
//!
//! Owns the single checkout of the test-suite repository a run works with:
//! clone into a scratch path, switch to the branch matching the build under
//! test, and remove it again on teardown.
//!
//! 管理一次运行所使用的测试套件仓库的唯一检出：
//! 克隆到临时路径、切换到与被测构建匹配的分支，并在清理时将其删除。

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::models::RunError;
use crate::infra::fs::remove_dir_if_exists;
use crate::infra::t;

/// Path segment that marks a release repository in `SourceRepository`.
/// `SourceRepository` 中标识发布仓库的路径段。
const RELEASES_MARKER: &str = "releases";

/// Branch used for builds coming from the main development repository.
/// 来自主开发仓库的构建所使用的分支。
pub const DEFAULT_BRANCH: &str = "default";

/// Version control operations the repository manager relies on.
/// 仓库管理器依赖的版本控制操作。
pub trait VersionControl: Send + Sync {
    /// Name of the metadata folder inside a working copy, e.g. `.hg`.
    /// 工作副本中元数据目录的名称，例如 `.hg`。
    fn metadata_dir(&self) -> &'static str;

    fn clone_repo<'a>(&'a self, url: &'a str, dest: &'a Path) -> BoxFuture<'a, Result<()>>;

    fn pull<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<()>>;

    /// Forces a clean update to `branch`, discarding local modifications.
    /// 强制干净地更新到 `branch`，丢弃本地修改。
    fn update<'a>(&'a self, path: &'a Path, branch: &'a str) -> BoxFuture<'a, Result<()>>;

    fn branch<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<String>>;

    fn changeset<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<String>>;
}

/// Infers the test-suite branch from a build's `SourceRepository` value.
///
/// - A repository below a `releases` segment maps to its trailing segment,
///   e.g. `http://hg.mozilla.org/releases/mozilla-beta` → `mozilla-beta`.
/// - Any other repository maps to `default`.
/// - Builds without the metadata are release builds and map to `release_branch`.
///
/// 根据构建的 `SourceRepository` 值推断测试套件分支：
/// 位于 `releases` 路径段下的仓库映射到其末尾路径段；
/// 其他仓库映射到 `default`；没有该元数据的构建是正式发布版，映射到 `release_branch`。
pub fn infer_branch(source_repository: Option<&str>, release_branch: &str) -> String {
    let source = match source_repository.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return release_branch.to_string(),
    };

    let segments: Vec<&str> = source
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    let is_release = segments
        .iter()
        .any(|segment| *segment == RELEASES_MARKER);

    match segments.last() {
        Some(candidate) if is_release => candidate.to_string(),
        _ => DEFAULT_BRANCH.to_string(),
    }
}

/// A local working copy of the test-suite repository.
/// 测试套件仓库的本地工作副本。
pub struct Repository {
    url: String,
    path: PathBuf,
    vcs: Arc<dyn VersionControl>,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("url", &self.url)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Repository {
    pub fn new(url: impl Into<String>, path: impl Into<PathBuf>, vcs: Arc<dyn VersionControl>) -> Self {
        Self {
            url: url.into(),
            path: path.into(),
            vcs,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a working copy is present at the local path.
    /// 本地路径上是否存在工作副本。
    pub fn exists(&self) -> bool {
        self.path.join(self.vcs.metadata_dir()).is_dir()
    }

    /// Clones the remote repository. The destination must not exist yet.
    /// 克隆远程仓库。目标路径必须尚不存在。
    pub async fn clone_repo(&self) -> Result<()> {
        if self.path.exists() {
            return Err(RunError::Setup(format!(
                "Clone destination already exists: {}",
                self.path.display()
            ))
            .into());
        }
        println!(
            "{}",
            t!("repository.cloning", url = &self.url, path = self.path.display())
        );
        self.vcs
            .clone_repo(&self.url, &self.path)
            .await
            .map_err(|e| setup_failure(&e))
    }

    /// Pulls new changes and forces a clean update to `branch`, or re-applies
    /// the currently selected branch when none is given.
    ///
    /// 拉取新变更并强制干净地更新到 `branch`；未指定分支时重新应用当前分支。
    pub async fn update(&self, branch: Option<&str>) -> Result<()> {
        self.vcs
            .pull(&self.path)
            .await
            .map_err(|e| setup_failure(&e))?;
        let branch = match branch {
            Some(name) => name.to_string(),
            None => self.branch().await?,
        };
        println!("{}", t!("repository.updating", branch = &branch));
        self.vcs
            .update(&self.path, &branch)
            .await
            .map_err(|e| setup_failure(&e))
    }

    pub async fn branch(&self) -> Result<String> {
        self.vcs
            .branch(&self.path)
            .await
            .context("Failed to read the current branch of the test repository")
    }

    pub async fn changeset(&self) -> Result<String> {
        self.vcs
            .changeset(&self.path)
            .await
            .context("Failed to read the current changeset of the test repository")
    }

    /// Deletes the working copy; a missing path is not an error.
    /// 删除工作副本；路径不存在不视为错误。
    pub fn remove(&self) -> Result<()> {
        println!("{}", t!("repository.removing", path = self.path.display()));
        remove_dir_if_exists(&self.path)
            .with_context(|| format!("Failed to remove repository at {}", self.path.display()))
    }
}

fn setup_failure(err: &anyhow::Error) -> anyhow::Error {
    RunError::Setup(format!(
        "Failure in setting up the test repository: {:#}",
        err
    ))
    .into()
}
