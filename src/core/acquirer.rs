//! # Resource Acquirer Module / 资源获取模块
//!
//! Turns the path given on the command line into a runnable build. Installers
//! are installed into a fresh folder of the run's workspace and owned by the
//! run; pre-extracted builds are used in place and never touched on teardown.
//!
//! 将命令行给出的路径转换为可运行的构建。安装包会被安装到运行工作区中的
//! 新目录并归该次运行所有；预先解压的构建则原地使用，清理时不会被改动。

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::application::{Application, ApplicationDetails, InstallerDetection, Platform};
use crate::core::models::RunError;
use crate::infra::fs::{absolute_path, copy_dir_all, remove_dir_if_exists};
use crate::infra::t;

/// Installs and uninstalls packaged builds.
/// 安装和卸载打包的构建。
pub trait Installer: Send + Sync {
    /// Installs `installer` below `dest` and returns the install folder.
    /// 将 `installer` 安装到 `dest` 下并返回安装目录。
    fn install<'a>(&'a self, installer: &'a Path, dest: &'a Path) -> BoxFuture<'a, Result<PathBuf>>;

    fn uninstall<'a>(&'a self, folder: &'a Path) -> BoxFuture<'a, Result<()>>;
}

/// A resolved build ready to be launched.
/// 已解析、可启动的构建。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryRef {
    /// The path as given by the caller / 调用者给出的路径
    pub raw: PathBuf,
    /// Executable handed to the runner / 交给运行器的可执行文件
    pub application: PathBuf,
    /// Install folder of the build / 构建的安装目录
    pub folder: PathBuf,
    /// `true` when this run installed the build and therefore must uninstall it.
    /// 当此次运行安装了该构建、因此必须卸载它时为 `true`。
    pub installed: bool,
}

pub struct Acquirer {
    application: Application,
    platform: Platform,
    detection: InstallerDetection,
    installer: Arc<dyn Installer>,
}

impl Acquirer {
    pub fn new(
        application: Application,
        platform: Platform,
        detection: InstallerDetection,
        installer: Arc<dyn Installer>,
    ) -> Self {
        Self {
            application,
            platform,
            detection,
            installer,
        }
    }

    pub fn is_installer(&self, path: &Path) -> bool {
        self.detection.is_installer(self.application, path)
    }

    /// Resolves `path` into an install folder and executable, installing it
    /// into `install_root` first when it is an installer.
    ///
    /// 将 `path` 解析为安装目录和可执行文件；如果它是安装包，则先安装到 `install_root`。
    pub async fn acquire(&self, path: &Path, install_root: &Path) -> Result<BinaryRef> {
        if !path.exists() {
            return Err(RunError::not_found("Path cannot be found", path.display()).into());
        }
        let raw = absolute_path(path)?;

        if self.is_installer(&raw) {
            println!(
                "{}",
                t!("acquire.installing", binary = raw.display(), path = install_root.display())
            );
            let folder = self
                .installer
                .install(&raw, install_root)
                .await
                .with_context(|| format!("Failed to install '{}'", raw.display()))?;
            let application = self.platform.binary_path(self.application, &folder);
            return Ok(BinaryRef {
                raw,
                application,
                folder,
                installed: true,
            });
        }

        let folder = self.platform.install_folder_of(&raw);
        if !self.platform.bin_folder(&folder).join("application.ini").is_file() {
            return Err(RunError::InvalidBinary(raw.display().to_string()).into());
        }
        let application = if raw.is_dir() {
            self.platform.binary_path(self.application, &folder)
        } else {
            raw.clone()
        };
        Ok(BinaryRef {
            raw,
            application,
            folder,
            installed: false,
        })
    }

    pub fn details(&self, binary: &BinaryRef) -> Result<ApplicationDetails> {
        ApplicationDetails::read(self.platform, &binary.folder)
    }

    /// Uninstalls the build if, and only if, this run installed it.
    /// 仅当此次运行安装了该构建时才卸载它。
    pub async fn release(&self, binary: &BinaryRef) -> Result<()> {
        if !binary.installed {
            return Ok(());
        }
        println!(
            "{}",
            t!("acquire.uninstalling", path = binary.folder.display())
        );
        self.installer.uninstall(&binary.folder).await
    }

    /// Makes a pristine copy of the install folder at `backup`.
    /// 在 `backup` 处创建安装目录的原始副本。
    pub fn backup(&self, binary: &BinaryRef, backup: &Path) -> Result<()> {
        println!(
            "{}",
            t!("acquire.backup", from = binary.folder.display(), to = backup.display())
        );
        remove_dir_if_exists(backup)
            .with_context(|| format!("Failed to clear backup location {}", backup.display()))?;
        copy_dir_all(&binary.folder, backup)
    }
}
