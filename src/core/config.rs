//! # Configuration Module / 配置模块
//!
//! Two layers of configuration feed a run:
//! - [`HarnessConfig`]: tool-wide settings loaded from an optional TOML file
//!   (`Testrun.toml`). Every field has a default, so a missing file is the
//!   same as the built-in defaults.
//! - [`RunOptions`]: the immutable options of one run, built from the command
//!   line, with the variant-specific knobs carried in [`RunVariant`].
//!
//! 运行由两层配置驱动：
//! - [`HarnessConfig`]：从可选的 TOML 文件（`Testrun.toml`）加载的全局设置。
//!   每个字段都有默认值，因此文件缺失等同于内置默认值。
//! - [`RunOptions`]：由命令行构建的单次运行的不可变选项，
//!   变体特有的参数保存在 [`RunVariant`] 中。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::application::{Application, Platform};
use crate::infra::fs::expand_path;
use crate::infra::t;

pub const DEFAULT_CONFIG_FILE: &str = "Testrun.toml";

/// Test-suite repository used for Firefox builds.
/// Firefox 构建使用的测试套件仓库。
pub const FIREFOX_REPOSITORY: &str = "http://hg.mozilla.org/qa/mozmill-tests";
/// Test-suite repository used for Thunderbird builds.
/// Thunderbird 构建使用的测试套件仓库。
pub const THUNDERBIRD_REPOSITORY: &str =
    "http://hg.mozilla.org/users/bugzilla_standard8.plus.com/qa-tests/";

/// Tool-wide settings.
/// 工具级全局设置。
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// The language for console messages (e.g., "en", "zh-CN").
    /// When absent the system locale decides.
    ///
    /// 控制台消息的语言（例如 "en", "zh-CN"）。缺省时由系统区域设置决定。
    pub language: Option<String>,
    pub runner: RunnerConfig,
    pub vcs: VcsConfig,
    /// Test-suite repository per application name.
    /// 每个应用程序名称对应的测试套件仓库。
    pub repositories: BTreeMap<String, String>,
    /// Branch used for builds that carry no source repository metadata.
    /// 用于不带源仓库元数据的构建的分支。
    pub release_branch: String,
    /// Host add-ons have to be downloaded from unless untrusted add-ons are allowed.
    /// 除非允许不受信任的附加组件，否则附加组件必须从此主机下载。
    pub trusted_addon_host: String,
    /// Installer file extensions per platform key (`linux`, `mac`, `win`).
    /// 每个平台键（`linux`、`mac`、`win`）对应的安装包文件扩展名。
    pub installers: BTreeMap<String, Vec<String>>,
    /// Default workspace root; a temporary folder is used when unset.
    /// 默认工作区根目录；未设置时使用临时目录。
    pub workspace: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Command line of the external test runner, split like a shell would.
    /// 外部测试运行器的命令行，按 shell 规则拆分。
    pub command: String,
    /// Bridge timeout for invocations whose run type does not pick one.
    /// 用于运行类型未指定桥接超时的调用。
    pub bridge_timeout_secs: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            command: "mozmill".to_string(),
            bridge_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VcsConfig {
    pub command: String,
}

impl Default for VcsConfig {
    fn default() -> Self {
        Self {
            command: crate::infra::vcs::default_command().to_string(),
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let repositories = [
            (Application::Firefox, FIREFOX_REPOSITORY),
            (Application::MetroFirefox, FIREFOX_REPOSITORY),
            (Application::Thunderbird, THUNDERBIRD_REPOSITORY),
        ]
        .into_iter()
        .map(|(app, url)| (app.name().to_string(), url.to_string()))
        .collect();

        let installers = [
            (Platform::Linux, vec![".tar.bz2", ".bz2"]),
            (Platform::Mac, vec![".dmg"]),
            (Platform::Windows, vec![".exe"]),
        ]
        .into_iter()
        .map(|(platform, exts)| {
            (
                platform.key().to_string(),
                exts.into_iter().map(str::to_string).collect(),
            )
        })
        .collect();

        Self {
            language: None,
            runner: RunnerConfig::default(),
            vcs: VcsConfig::default(),
            repositories,
            release_branch: "mozilla-release".to_string(),
            trusted_addon_host: "addons.mozilla.org".to_string(),
            installers,
            workspace: None,
        }
    }
}

impl HarnessConfig {
    /// Parses a configuration from TOML text.
    /// 从 TOML 文本解析配置。
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse the harness configuration")
    }

    /// Loads `path` if given, otherwise `Testrun.toml` from the working
    /// directory when it exists, otherwise the defaults. An explicitly given
    /// path that does not exist is an error.
    ///
    /// 如果给定了 `path` 则加载它；否则若工作目录中存在 `Testrun.toml` 则加载之；
    /// 否则使用默认值。显式给定但不存在的路径视为错误。
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    /// Test-suite repository for `application`.
    /// `application` 对应的测试套件仓库。
    pub fn repository_for(&self, application: Application) -> Option<&str> {
        self.repositories.get(application.name()).map(String::as_str)
    }

    /// Installer extensions configured for `platform`.
    /// 为 `platform` 配置的安装包扩展名。
    pub fn installer_extensions(&self, platform: Platform) -> Vec<String> {
        self.installers
            .get(platform.key())
            .cloned()
            .unwrap_or_default()
    }

    /// Runner command line split into program and arguments.
    /// 拆分为程序和参数的运行器命令行。
    pub fn runner_command(&self) -> Result<Vec<String>> {
        let parts = shlex::split(&self.runner.command).with_context(|| {
            format!("Invalid runner command line: {}", self.runner.command)
        })?;
        if parts.is_empty() {
            anyhow::bail!("The runner command must not be empty");
        }
        Ok(parts)
    }

    pub fn workspace_root(&self) -> Option<PathBuf> {
        self.workspace.as_deref().map(expand_path)
    }
}

/// Options shared by every run variant.
/// 所有运行变体共享的选项。
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Positional arguments; exactly one binary is accepted.
    /// 位置参数；只接受一个二进制文件。
    pub binaries: Vec<PathBuf>,
    pub application: Application,
    /// Add-on references: local paths or URLs / 附加组件引用：本地路径或 URL
    pub addons: Vec<String>,
    pub junit: Option<PathBuf>,
    /// Dashboard destination: http(s) URL, `file://` URL or plain path.
    /// 仪表板目标：http(s) URL、`file://` URL 或普通路径。
    pub report: Option<String>,
    /// Overrides the configured test-suite repository.
    /// 覆盖配置的测试套件仓库。
    pub repository: Option<String>,
    /// Restart the application between every test.
    /// 在每个测试之间重启应用程序。
    pub restart: bool,
    pub tags: Vec<String>,
    pub workspace: Option<PathBuf>,
    pub logfile: Option<PathBuf>,
    pub screenshot_path: Option<PathBuf>,
    pub port: Option<u16>,
    pub variant: RunVariant,
}

/// The test-run variants and their specific knobs.
/// 测试运行变体及其特有参数。
#[derive(Debug, Clone, Default)]
pub enum RunVariant {
    #[default]
    Functional,
    Addons(AddonsOptions),
    Endurance(EnduranceOptions),
    L10n,
    Remote,
    Update(UpdateOptions),
}

#[derive(Debug, Clone, Default)]
pub struct AddonsOptions {
    /// Add-on test folders to run; all of them when empty.
    /// 要运行的附加组件测试目录；为空时运行全部。
    pub target_addons: Vec<String>,
    pub with_untrusted: bool,
}

#[derive(Debug, Clone)]
pub struct EnduranceOptions {
    /// Seconds between iterations / 迭代之间的秒数
    pub delay: f64,
    pub entities: u32,
    pub iterations: u32,
    /// Restart the application between tests / 在测试之间重启应用程序
    pub restart: bool,
    /// Named sub-suite below `tests/endurance/reserved`.
    /// `tests/endurance/reserved` 下的命名子套件。
    pub reserved: Option<String>,
}

/// Longest accepted delay between endurance iterations, in seconds.
/// 耐久性迭代之间允许的最长延迟（秒）。
pub const MAX_ENDURANCE_DELAY_SECS: f64 = 86_400.0;

impl EnduranceOptions {
    /// Accepts a finite delay between 0 and [`MAX_ENDURANCE_DELAY_SECS`].
    /// 接受 0 到 [`MAX_ENDURANCE_DELAY_SECS`] 之间的有限延迟。
    pub fn check_delay(delay: f64) -> std::result::Result<f64, String> {
        if delay.is_finite() && (0.0..=MAX_ENDURANCE_DELAY_SECS).contains(&delay) {
            Ok(delay)
        } else {
            Err(t!(
                "run.invalid_delay",
                delay = delay,
                max = MAX_ENDURANCE_DELAY_SECS
            )
            .to_string())
        }
    }
}

impl Default for EnduranceOptions {
    fn default() -> Self {
        Self {
            delay: 5.0,
            entities: 1,
            iterations: 1,
            restart: true,
            reserved: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub channel: Option<String>,
    pub fallback: bool,
    pub target_build_id: Option<String>,
    pub allow_mar_channels: Vec<String>,
    pub override_update_url: Option<String>,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            channel: None,
            fallback: true,
            target_build_id: None,
            allow_mar_channels: Vec::new(),
            override_update_url: None,
        }
    }
}
