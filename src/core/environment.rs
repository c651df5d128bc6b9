//! # Environment Builder Module / 环境构建模块
//!
//! Assembles what the external runner needs for an invocation: the resolved
//! add-on set, a fresh profile directory, and the persisted key/value bag that
//! carries variant parameters into the runner. Tracks everything it created
//! so teardown can remove it again.
//!
//! 组装外部运行器一次调用所需的内容：解析后的附加组件集合、新的配置文件目录，
//! 以及将变体参数传入运行器的持久化键值状态。它会记录自己创建的所有内容，
//! 以便清理时再次删除。

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use crate::core::models::PersistedBag;
use crate::infra::fs::{remove_file_if_exists, scratch_dir};
use crate::infra::t;

/// Downloads remote resources into the workspace.
/// 将远程资源下载到工作区。
pub trait Fetcher: Send + Sync {
    /// Downloads `url` into `target_dir` and returns the local file path.
    /// 将 `url` 下载到 `target_dir` 并返回本地文件路径。
    fn download<'a>(&'a self, url: &'a str, target_dir: &'a Path) -> BoxFuture<'a, Result<PathBuf>>;
}

/// Whether an add-on reference has to be downloaded first.
/// 附加组件引用是否需要先下载。
pub fn is_remote(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("ftp://")
}

/// File name a downloaded URL is stored under: the last path segment with
/// any query string removed.
///
/// 下载的 URL 所保存的文件名：去掉查询字符串后的最后一个路径段。
pub fn download_file_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("download")
        .to_string()
}

pub struct Environment {
    workspace: PathBuf,
    addons_dir: PathBuf,
    fetcher: Arc<dyn Fetcher>,
    addon_list: Vec<PathBuf>,
    downloaded: Vec<PathBuf>,
    persisted: PersistedBag,
}

impl Environment {
    pub fn new(workspace: impl Into<PathBuf>, fetcher: Arc<dyn Fetcher>) -> Self {
        let workspace = workspace.into();
        let addons_dir = workspace.join("addons");
        Self {
            workspace,
            addons_dir,
            fetcher,
            addon_list: Vec::new(),
            downloaded: Vec::new(),
            persisted: PersistedBag::new(),
        }
    }

    pub fn addons(&self) -> &[PathBuf] {
        &self.addon_list
    }

    /// Downloads `url` into the add-ons folder and records it for removal.
    /// 将 `url` 下载到附加组件目录并记录以便之后删除。
    pub async fn download(&mut self, url: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.addons_dir).with_context(|| {
            format!("Failed to create add-ons folder {}", self.addons_dir.display())
        })?;
        println!(
            "{}",
            t!("environment.downloading", url = url, path = self.addons_dir.display())
        );
        let path = self
            .fetcher
            .download(url, &self.addons_dir)
            .await
            .with_context(|| format!("Failed to download '{}'", url))?;
        self.downloaded.push(path.clone());
        Ok(path)
    }

    /// Resolves every configured add-on reference: URLs are downloaded, local
    /// paths are used unmodified.
    ///
    /// 解析每个配置的附加组件引用：URL 会被下载，本地路径原样使用。
    pub async fn prepare_addons(&mut self, references: &[String]) -> Result<()> {
        for reference in references {
            let path = if is_remote(reference) {
                self.download(reference).await?
            } else {
                PathBuf::from(reference)
            };
            self.addon_list.push(path);
        }
        Ok(())
    }

    pub fn push_addon(&mut self, path: PathBuf) {
        self.addon_list.push(path);
    }

    /// Removes the most recent entry equal to `path` from the add-on list.
    /// 从附加组件列表中删除与 `path` 相等的最近一个条目。
    pub fn remove_addon(&mut self, path: &Path) {
        if let Some(pos) = self.addon_list.iter().rposition(|p| p == path) {
            self.addon_list.remove(pos);
        }
    }

    /// Allocates a fresh, empty profile directory below the workspace.
    /// 在工作区下分配一个新的空配置文件目录。
    pub fn create_profile(&self) -> Result<TempDir> {
        scratch_dir(&self.workspace, "profile_")
    }

    /// Removes a profile directory, logging instead of failing.
    /// 删除配置文件目录，失败时仅记录日志而不报错。
    pub fn remove_profile(&self, profile: TempDir) {
        let path = profile.path().to_path_buf();
        if let Err(e) = profile.close() {
            eprintln!(
                "{}",
                t!("environment.profile_remove_failed", path = path.display(), error = e)
            );
        }
    }

    pub fn persisted(&self) -> &PersistedBag {
        &self.persisted
    }

    pub fn set_persisted(&mut self, key: impl Into<String>, value: Value) {
        self.persisted.insert(key.into(), value);
    }

    pub fn remove_persisted(&mut self, key: &str) -> Option<Value> {
        self.persisted.remove(key)
    }

    /// Deletes one downloaded file and forgets about it.
    /// 删除一个已下载的文件并不再跟踪它。
    pub fn remove_download(&mut self, path: &Path) {
        println!("{}", t!("environment.removing_addon", path = path.display()));
        if let Err(e) = remove_file_if_exists(path) {
            eprintln!(
                "{}",
                t!("environment.addon_remove_failed", path = path.display(), error = e)
            );
        }
        self.downloaded.retain(|p| p != path);
    }

    /// Deletes every downloaded file. Individual failures are logged only.
    /// 删除所有已下载的文件。单个失败仅记录日志。
    pub fn remove_downloaded_addons(&mut self) {
        for path in std::mem::take(&mut self.downloaded) {
            println!("{}", t!("environment.removing_addon", path = path.display()));
            if let Err(e) = remove_file_if_exists(&path) {
                eprintln!(
                    "{}",
                    t!("environment.addon_remove_failed", path = path.display(), error = e)
                );
            }
        }
    }
}
