//! # File System Operations Module / 文件系统操作模块
//!
//! Scratch directories, recursive copies and the deadline-bounded removal
//! used when a freshly terminated application may still hold file locks.
//!
//! 临时目录、递归复制，以及在刚终止的应用程序可能仍持有文件锁时使用的
//! 带截止时间的删除操作。

use anyhow::{Context, Result};
use fs_extra::dir::{copy, move_dir, CopyOptions};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

use crate::infra::t;

/// Creates a uniquely named scratch directory below `root`.
/// The directory is deleted when the returned guard is dropped or closed.
///
/// 在 `root` 下创建一个唯一命名的临时目录。
/// 当返回的 guard 被丢弃或关闭时，该目录将被删除。
pub fn scratch_dir(root: &Path, prefix: &str) -> Result<TempDir> {
    fs::create_dir_all(root)
        .with_context(|| format!("Failed to create workspace root: {}", root.display()))?;
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir_in(root)
        .with_context(|| format!("Failed to create scratch directory in {}", root.display()))
}

/// Copies the entire content of `from` into a new directory `to`.
/// 将 `from` 的全部内容复制到新目录 `to` 中。
pub fn copy_dir_all(from: &Path, to: &Path) -> Result<()> {
    fs::create_dir_all(to)
        .with_context(|| format!("Failed to create directory: {}", to.display()))?;
    let mut options = CopyOptions::new();
    options.overwrite = true;
    options.content_only = true;
    copy(from, to, &options).with_context(|| {
        format!("Failed to copy '{}' to '{}'", from.display(), to.display())
    })?;
    Ok(())
}

/// Moves `from` to `to`, falling back to copy-and-delete across devices.
/// 将 `from` 移动到 `to`，跨设备时回退为复制后删除。
pub fn move_dir_all(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::create_dir_all(to)
        .with_context(|| format!("Failed to create directory: {}", to.display()))?;
    let mut options = CopyOptions::new();
    options.overwrite = true;
    options.content_only = true;
    move_dir(from, to, &options).with_context(|| {
        format!("Failed to move '{}' to '{}'", from.display(), to.display())
    })?;
    remove_dir_if_exists(from)
        .with_context(|| format!("Failed to remove '{}' after moving it", from.display()))
}

/// Removes a directory tree, treating an already missing path as success.
/// 删除目录树，路径已不存在时视为成功。
pub fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Removes a file, treating an already missing path as success.
/// 删除文件，路径已不存在时视为成功。
pub fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Retries removing `path` every `interval` until it succeeds or `deadline`
/// has elapsed; past the deadline the last removal error is returned.
///
/// 每隔 `interval` 重试删除 `path`，直到成功或超过 `deadline`；
/// 超过截止时间后返回最后一次删除错误。
pub async fn remove_dir_with_deadline(
    path: &Path,
    deadline: Duration,
    interval: Duration,
) -> Result<()> {
    let give_up_at = Instant::now() + deadline;
    loop {
        match remove_dir_if_exists(path) {
            Ok(()) => return Ok(()),
            Err(e) => {
                println!("{}", e);
                if Instant::now() >= give_up_at {
                    println!("{}", t!("fs.cannot_remove_folder", path = path.display()));
                    return Err(e)
                        .with_context(|| format!("Cannot remove folder '{}'", path.display()));
                }
                tokio::time::sleep(interval).await;
            }
        }
    }
}

/// File name for the `index`-th report when one run produces several,
/// e.g. `report.xml` becomes `report_1.xml`.
///
/// 当一次运行产生多个报告时第 `index` 个报告的文件名，
/// 例如 `report.xml` 变为 `report_1.xml`。
pub fn unique_filename(path: &Path, index: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, index, ext.to_string_lossy()),
        None => format!("{}_{}", stem, index),
    };
    path.with_file_name(name)
}

/// Expands `~` and environment variables in a user supplied path.
/// 展开用户提供路径中的 `~` 和环境变量。
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}

/// Gets the absolute path for a potentially relative path without requiring
/// it to exist.
///
/// 获取可能为相对路径的绝对路径，不要求该路径存在。
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path)
        .with_context(|| format!("Failed to resolve path: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deadline_removal_deletes_folder() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("firefox");
        fs::create_dir_all(folder.join("defaults")).unwrap();

        remove_dir_with_deadline(&folder, Duration::from_millis(100), Duration::from_millis(10))
            .await
            .unwrap();
        assert!(!folder.exists());
    }

    #[tokio::test]
    async fn deadline_removal_gives_up_with_last_error() {
        let dir = tempfile::tempdir().unwrap();
        // A plain file can never be removed as a folder.
        let blocked = dir.path().join("firefox");
        fs::write(&blocked, "locked").unwrap();

        let started = Instant::now();
        let err = remove_dir_with_deadline(&blocked, Duration::from_millis(50), Duration::from_millis(10))
            .await
            .unwrap_err();

        assert!(started.elapsed() >= Duration::from_millis(50));
        assert!(format!("{:#}", err).contains("Cannot remove folder"));
        assert!(blocked.is_file());
    }

    #[test]
    fn indexed_report_names() {
        assert_eq!(
            unique_filename(Path::new("out/report.xml"), 1),
            PathBuf::from("out/report_1.xml")
        );
        assert_eq!(unique_filename(Path::new("report"), 2), PathBuf::from("report_2"));
    }
}
