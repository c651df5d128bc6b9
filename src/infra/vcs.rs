//! # Mercurial Client Module / Mercurial 客户端模块
//!
//! [`VersionControl`] implementation that shells out to the `hg` command.
//!
//! 通过调用 `hg` 命令实现 [`VersionControl`]。

use anyhow::Result;
use futures::future::{BoxFuture, FutureExt};
use std::path::{Path, PathBuf};

use crate::core::repository::VersionControl;
use crate::infra::command::{check_output, stdout_of};

#[derive(Debug, Clone)]
pub struct Mercurial {
    command: String,
}

impl Default for Mercurial {
    fn default() -> Self {
        Self::new(default_command())
    }
}

/// `hg` ships as a batch file on Windows.
/// 在 Windows 上 `hg` 以批处理文件形式提供。
pub fn default_command() -> &'static str {
    if cfg!(windows) { "hg.bat" } else { "hg" }
}

impl Mercurial {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn command(&self, arguments: &[&str], cwd: &Path) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.command);
        cmd.args(arguments)
            .arg("--cwd")
            .arg(cwd)
            .kill_on_drop(true);
        cmd
    }

    /// Runs `hg` with `arguments` inside `cwd` and returns the trimmed output.
    /// 在 `cwd` 中使用 `arguments` 运行 `hg` 并返回去除空白的输出。
    async fn exec(&self, arguments: &[&str], cwd: &Path) -> Result<String> {
        check_output(self.command(arguments, cwd)).await
    }

    /// Like [`Self::exec`], but the value comes from stdout only.
    /// 与 [`Self::exec`] 相同，但结果仅取自 stdout。
    async fn query(&self, arguments: &[&str], cwd: &Path) -> Result<String> {
        stdout_of(self.command(arguments, cwd)).await
    }
}

impl VersionControl for Mercurial {
    fn metadata_dir(&self) -> &'static str {
        ".hg"
    }

    fn clone_repo<'a>(&'a self, url: &'a str, dest: &'a Path) -> BoxFuture<'a, Result<()>> {
        async move {
            let cwd: PathBuf = std::env::current_dir()?;
            let dest = dest.to_string_lossy();
            self.exec(&["clone", url, dest.as_ref()], &cwd).await?;
            Ok(())
        }
        .boxed()
    }

    fn pull<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<()>> {
        async move {
            self.exec(&["pull"], path).await?;
            Ok(())
        }
        .boxed()
    }

    fn update<'a>(&'a self, path: &'a Path, branch: &'a str) -> BoxFuture<'a, Result<()>> {
        async move {
            self.exec(&["update", "-C", branch], path).await?;
            Ok(())
        }
        .boxed()
    }

    fn branch<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<String>> {
        self.query(&["branch"], path).boxed()
    }

    fn changeset<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<String>> {
        self.query(&["parent", "--template", "{node}"], path).boxed()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[tokio::test]
    async fn changeset_ignores_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("hg");
        std::fs::write(
            &script,
            "#!/bin/sh\necho '*** failed to import extension foo' >&2\nprintf 0123456789abcdef\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let hg = Mercurial::new(script.to_string_lossy());
        let changeset = hg.changeset(dir.path()).await.unwrap();
        assert_eq!(changeset, "0123456789abcdef");
    }
}
