//! # Package Installer Module / 安装包安装模块
//!
//! [`Installer`] implementation for the package formats builds are shipped
//! in: tarballs on Linux, disk images on macOS, and installer executables on
//! Windows.
//!
//! 针对构建发布格式的 [`Installer`] 实现：Linux 上的 tar 包、
//! macOS 上的磁盘映像以及 Windows 上的安装程序。

use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::acquirer::Installer;
use crate::infra::command::check_output;
use crate::infra::fs::{copy_dir_all, remove_dir_if_exists};

#[derive(Debug, Clone, Default)]
pub struct PackageInstaller;

impl PackageInstaller {
    async fn install_tarball(&self, installer: &Path, dest: &Path) -> Result<PathBuf> {
        let mut cmd = tokio::process::Command::new("tar");
        cmd.arg("-xjf").arg(installer).arg("-C").arg(dest);
        check_output(cmd).await?;
        single_child_dir(dest)
    }

    async fn install_dmg(&self, installer: &Path, dest: &Path) -> Result<PathBuf> {
        let mount_point = dest.join("mount");
        fs::create_dir_all(&mount_point)?;

        let mut attach = tokio::process::Command::new("hdiutil");
        attach
            .args(["attach", "-nobrowse", "-noautoopen", "-mountpoint"])
            .arg(&mount_point)
            .arg(installer);
        check_output(attach).await?;

        let copied = self.copy_bundle(&mount_point, dest);

        let mut detach = tokio::process::Command::new("hdiutil");
        detach.arg("detach").arg(&mount_point);
        let detached = check_output(detach).await;

        let bundle = copied?;
        detached?;
        remove_dir_if_exists(&mount_point)?;
        Ok(bundle)
    }

    fn copy_bundle(&self, mount_point: &Path, dest: &Path) -> Result<PathBuf> {
        let bundle = fs::read_dir(mount_point)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .find(|path| path.extension().is_some_and(|ext| ext == "app"))
            .with_context(|| format!("No application bundle found in {}", mount_point.display()))?;
        let name = bundle
            .file_name()
            .context("Application bundle without a name")?;
        let target = dest.join(name);
        copy_dir_all(&bundle, &target)?;
        Ok(target)
    }

    async fn install_exe(&self, installer: &Path, dest: &Path) -> Result<PathBuf> {
        let mut cmd = tokio::process::Command::new(installer);
        cmd.arg("/S").arg(format!("/D={}", dest.display()));
        check_output(cmd).await?;
        Ok(dest.to_path_buf())
    }
}

impl Installer for PackageInstaller {
    fn install<'a>(&'a self, installer: &'a Path, dest: &'a Path) -> BoxFuture<'a, Result<PathBuf>> {
        async move {
            fs::create_dir_all(dest)
                .with_context(|| format!("Failed to create {}", dest.display()))?;
            let name = installer
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if name.ends_with(".dmg") {
                self.install_dmg(installer, dest).await
            } else if name.ends_with(".exe") {
                self.install_exe(installer, dest).await
            } else {
                self.install_tarball(installer, dest).await
            }
        }
        .boxed()
    }

    fn uninstall<'a>(&'a self, folder: &'a Path) -> BoxFuture<'a, Result<()>> {
        async move {
            let helper = folder.join("uninstall").join("helper.exe");
            if helper.is_file() {
                let mut cmd = tokio::process::Command::new(&helper);
                cmd.arg("/S");
                if let Err(e) = check_output(cmd).await {
                    eprintln!("{:#}", e);
                }
            }
            remove_dir_if_exists(folder)
                .with_context(|| format!("Failed to remove {}", folder.display()))
        }
        .boxed()
    }
}

/// Tarballs unpack into one top-level folder which becomes the install folder.
/// tar 包解压为一个顶层目录，该目录即为安装目录。
fn single_child_dir(dest: &Path) -> Result<PathBuf> {
    let dirs: Vec<PathBuf> = fs::read_dir(dest)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    match dirs.as_slice() {
        [only] => Ok(only.clone()),
        _ => Ok(dest.to_path_buf()),
    }
}
