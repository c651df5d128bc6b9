//! # Application Module / 应用程序模块
//!
//! Knowledge about the application under test: which products exist, how a
//! build is laid out on each platform, how to tell an installer from an
//! already installed build, and how to read or change the build's metadata
//! (`application.ini`, update channel, accepted MAR channels).
//!
//! 关于被测应用程序的知识：存在哪些产品、各平台上构建的目录布局、
//! 如何区分安装包与已安装的构建，以及如何读取或修改构建的元数据
//! （`application.ini`、更新通道、接受的 MAR 通道）。

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::models::RunError;
use crate::infra::ini::IniFile;
use crate::infra::t;

/// Update channels a build may be switched to.
/// 构建可以切换到的更新通道。
pub const UPDATE_CHANNELS: [&str; 9] = [
    "nightly",
    "aurora",
    "auroratest",
    "beta",
    "betatest",
    "release",
    "releasetest",
    "esr",
    "esrtest",
];

static CHANNEL_PREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"pref\("app\.update\.channel",\s*"([^"]*)"\)"#).expect("valid channel regex")
});

/// The products the automation knows how to test.
/// 自动化工具能够测试的产品。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Application {
    #[default]
    Firefox,
    Thunderbird,
    MetroFirefox,
}

impl Application {
    pub const ALL: [Application; 3] = [
        Application::Firefox,
        Application::Thunderbird,
        Application::MetroFirefox,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Application::Firefox => "firefox",
            Application::Thunderbird => "thunderbird",
            Application::MetroFirefox => "metrofirefox",
        }
    }

    /// Base name of the executable inside an install folder.
    /// 安装目录中可执行文件的基本名称。
    pub fn binary_name(self) -> &'static str {
        match self {
            Application::Firefox | Application::MetroFirefox => "firefox",
            Application::Thunderbird => "thunderbird",
        }
    }
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Application {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Application::ALL
            .into_iter()
            .find(|app| app.name() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown application '{}'", s))
    }
}

/// Platform families that differ in build layout.
/// 构建布局不同的平台系列。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    Mac,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "macos" => Platform::Mac,
            "windows" => Platform::Windows,
            _ => Platform::Linux,
        }
    }

    /// Key used by add-on manifests and configuration tables.
    /// 附加组件清单和配置表中使用的键。
    pub fn key(self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Mac => "mac",
            Platform::Windows => "win",
        }
    }

    /// Folder that holds the executables and `application.ini`.
    /// 存放可执行文件和 `application.ini` 的目录。
    pub fn bin_folder(self, app_folder: &Path) -> PathBuf {
        match self {
            Platform::Mac => app_folder.join("Contents").join("MacOS"),
            _ => app_folder.to_path_buf(),
        }
    }

    /// Path of the application executable for an install folder. On macOS the
    /// bundle itself is launched.
    ///
    /// 安装目录对应的应用程序可执行文件路径。在 macOS 上直接启动应用包本身。
    pub fn binary_path(self, application: Application, app_folder: &Path) -> PathBuf {
        match self {
            Platform::Windows => app_folder.join(format!("{}.exe", application.binary_name())),
            Platform::Mac => app_folder.to_path_buf(),
            Platform::Linux => app_folder.join(application.binary_name()),
        }
    }

    /// Derives the install folder from a path that points into an install.
    /// Directories are taken as they are, macOS paths ascend to the bundle
    /// root, anything else resolves to its containing directory.
    ///
    /// 从指向安装内部的路径推导安装目录。目录保持原样，
    /// macOS 路径上溯到应用包根目录，其他路径解析为其所在目录。
    pub fn install_folder_of(self, path: &Path) -> PathBuf {
        if self == Platform::Mac {
            if let Some(bundle) = path
                .ancestors()
                .find(|p| p.extension().is_some_and(|ext| ext == "app"))
            {
                return bundle.to_path_buf();
            }
        }
        if path.is_dir() {
            return path.to_path_buf();
        }
        path.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| path.to_path_buf())
    }
}

/// Decides whether a path is a packaged installer, based on a per-platform
/// list of file extensions.
///
/// 根据每个平台的文件扩展名列表判断路径是否为打包的安装程序。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerDetection {
    extensions: Vec<String>,
}

impl InstallerDetection {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.into().to_lowercase())
                .collect(),
        }
    }

    pub fn is_installer(&self, application: Application, path: &Path) -> bool {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let file_name = file_name.to_lowercase();
        // The application's own executable shares the installer extension on Windows.
        if file_name == format!("{}.exe", application.binary_name()) {
            return false;
        }
        self.extensions.iter().any(|ext| file_name.ends_with(ext.as_str()))
    }
}

/// Entries of `application.ini` the automation cares about.
/// 自动化工具关心的 `application.ini` 条目。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationDetails {
    pub name: String,
    pub version: String,
    pub build_id: String,
    /// Repository the build was produced from, absent on release builds.
    /// 构建所来自的仓库，正式发布版构建中不存在。
    pub source_repository: Option<String>,
}

impl ApplicationDetails {
    pub fn read(platform: Platform, app_folder: &Path) -> Result<Self> {
        let ini_path = platform.bin_folder(app_folder).join("application.ini");
        if !ini_path.is_file() {
            return Err(RunError::not_found("application.ini not found", ini_path.display()).into());
        }
        let ini = IniFile::read(&ini_path)?;
        let value = |key: &str| ini.get("App", key).unwrap_or_default().to_string();
        Ok(Self {
            name: value("Name"),
            version: value("Version"),
            build_id: value("BuildID"),
            source_repository: ini
                .get("App", "SourceRepository")
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        })
    }
}

/// Accessor for the `app.update.channel` default preference of a build.
/// 构建的 `app.update.channel` 默认首选项访问器。
#[derive(Debug, Clone)]
pub struct UpdateChannel {
    prefs_path: PathBuf,
}

impl UpdateChannel {
    /// Locates `channel-prefs.js` below `defaults/preferences` or `defaults/pref`.
    /// 在 `defaults/preferences` 或 `defaults/pref` 下定位 `channel-prefs.js`。
    pub fn locate(platform: Platform, app_folder: &Path) -> Result<Self> {
        let defaults = platform.bin_folder(app_folder).join("defaults");
        ["preferences", "pref"]
            .iter()
            .map(|folder| defaults.join(folder).join("channel-prefs.js"))
            .find(|path| path.is_file())
            .map(|prefs_path| Self { prefs_path })
            .ok_or_else(|| {
                RunError::not_found("Channel prefs not found", defaults.display()).into()
            })
    }

    pub fn is_valid_channel(channel: &str) -> bool {
        UPDATE_CHANNELS.contains(&channel)
    }

    pub fn path(&self) -> &Path {
        &self.prefs_path
    }

    pub fn read(&self) -> Result<String> {
        let content = fs::read_to_string(&self.prefs_path)
            .with_context(|| format!("Failed to read {}", self.prefs_path.display()))?;
        CHANNEL_PREF
            .captures(&content)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                RunError::not_found("Update channel preference not found", self.prefs_path.display())
                    .into()
            })
    }

    /// Rewrites the channel preference and verifies that it took effect.
    /// 重写通道首选项并验证其已生效。
    pub fn write(&self, channel: &str) -> Result<()> {
        println!("{}", t!("update.setting_channel", channel = channel));
        if !Self::is_valid_channel(channel) {
            return Err(RunError::InvalidChannel(channel.to_string()).into());
        }
        let content = fs::read_to_string(&self.prefs_path)
            .with_context(|| format!("Failed to read {}", self.prefs_path.display()))?;
        let replacement = format!(r#"pref("app.update.channel", "{}")"#, channel);
        let updated = CHANNEL_PREF.replace_all(&content, regex::NoExpand(&replacement));
        fs::write(&self.prefs_path, updated.as_bytes())
            .with_context(|| format!("Failed to write {}", self.prefs_path.display()))?;

        if self.read()? != channel {
            anyhow::bail!("Update channel wasn't set correctly.");
        }
        Ok(())
    }
}

/// Appends channel ids to `ACCEPTED_MAR_CHANNEL_IDS` in `update-settings.ini`.
/// 将通道 ID 追加到 `update-settings.ini` 的 `ACCEPTED_MAR_CHANNEL_IDS` 中。
pub fn allow_mar_channels(platform: Platform, app_folder: &Path, channels: &[String]) -> Result<()> {
    if channels.is_empty() {
        return Ok(());
    }
    let path = platform.bin_folder(app_folder).join("update-settings.ini");
    if !path.is_file() {
        return Err(RunError::not_found("update-settings.ini not found", path.display()).into());
    }
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    const KEY: &str = "ACCEPTED_MAR_CHANNEL_IDS=";
    let mut found = false;
    let mut lines: Vec<String> = content
        .lines()
        .map(|line| match line.trim().strip_prefix(KEY) {
            Some(existing) => {
                found = true;
                let mut ids: Vec<String> = existing
                    .split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect();
                for channel in channels {
                    if !ids.contains(channel) {
                        ids.push(channel.clone());
                    }
                }
                format!("{}{}", KEY, ids.join(","))
            }
            None => line.to_string(),
        })
        .collect();
    if !found {
        if !lines.iter().any(|l| l.trim() == "[Settings]") {
            lines.push("[Settings]".to_string());
        }
        lines.push(format!("{}{}", KEY, channels.join(",")));
    }

    println!(
        "{}",
        t!("update.allowing_mar_channels", channels = channels.join(", "))
    );
    fs::write(&path, lines.join("\n") + "\n")
        .with_context(|| format!("Failed to write {}", path.display()))
}
