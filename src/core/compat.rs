//! # Compatible-by-Default Module / 默认兼容模块
//!
//! Tests a list of builds against chunks of add-ons described in a JSON
//! configuration. Add-ons and builds are staged once, every build is
//! installed once per chunk, and each chunk goes through an endurance run, an
//! update run without fallback, and a second endurance run.
//!
//! 根据 JSON 配置中描述的附加组件分组测试一系列构建。附加组件和构建只暂存一次，
//! 每个构建在每个分组中只安装一次，每个分组依次经历一次耐久性运行、
//! 一次不带回退的更新运行和第二次耐久性运行。

use anyhow::{Context, Result};
use colored::*;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::acquirer::Acquirer;
use crate::core::application::{Application, InstallerDetection, Platform};
use crate::core::config::{HarnessConfig, RunOptions};
use crate::core::driver::{Collaborators, RunDriver};
use crate::core::environment::{download_file_name, is_remote};
use crate::core::models::RunError;
use crate::infra::fs::{expand_path, remove_dir_if_exists, scratch_dir};
use crate::infra::t;

#[derive(Debug, Clone, Deserialize)]
pub struct CompatConfig {
    pub settings: CompatSettings,
    pub addons: CompatAddons,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompatSettings {
    pub staging_path: PathBuf,
    #[serde(default = "default_addons_per_run")]
    pub addons_per_run: usize,
    /// Build URLs or local installer paths / 构建 URL 或本地安装包路径
    #[serde(default)]
    pub builds: Vec<String>,
    /// Options passed to every test-run, e.g. `--report=URL`.
    /// 传递给每次测试运行的选项，例如 `--report=URL`。
    #[serde(default)]
    pub testrun_options: Vec<String>,
}

fn default_addons_per_run() -> usize {
    1
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompatAddons {
    #[serde(default)]
    pub default: Vec<CompatAddon>,
    #[serde(default)]
    pub extended: Vec<CompatAddon>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompatAddon {
    pub name: String,
    pub url: String,
    /// Platform keys the add-on is available on; all when empty.
    /// 附加组件可用的平台键；为空时表示全部平台。
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(skip)]
    pub local_path: Option<PathBuf>,
}

impl CompatAddon {
    pub fn available_on(&self, platform: Platform) -> bool {
        self.platforms.is_empty() || self.platforms.iter().any(|p| p == platform.key())
    }
}

impl CompatConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }
}

/// Add-on sets tested one after another: the defaults alone first, then the
/// defaults together with the next `per_run` extended add-ons.
///
/// 依次测试的附加组件集合：首先只有默认附加组件，
/// 然后是默认附加组件加上接下来的 `per_run` 个扩展附加组件。
pub fn chunks<T: Clone>(defaults: &[T], extended: &[T], per_run: usize) -> Vec<Vec<T>> {
    let mut sets = vec![defaults.to_vec()];
    for slice in extended.chunks(per_run.max(1)) {
        let mut set = defaults.to_vec();
        set.extend_from_slice(slice);
        sets.push(set);
    }
    sets
}

/// Builds the options of one test-run from a run type and its arguments.
/// 根据运行类型及其参数构建一次测试运行的选项。
pub type OptionsParser<'a> = dyn Fn(&str, Vec<String>) -> Result<RunOptions> + 'a;

pub struct CompatRun {
    config: CompatConfig,
    harness_config: HarnessConfig,
    collaborators: Collaborators,
    platform: Platform,
    repository: Option<String>,
}

impl CompatRun {
    pub fn new(
        config: CompatConfig,
        harness_config: HarnessConfig,
        collaborators: Collaborators,
        repository: Option<String>,
    ) -> Self {
        Self {
            config,
            harness_config,
            collaborators,
            platform: Platform::current(),
            repository,
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    fn staging_path(&self) -> PathBuf {
        expand_path(&self.config.settings.staging_path)
    }

    async fn stage(&self, reference: &str, staging: &Path) -> Result<PathBuf> {
        if !is_remote(reference) {
            return Ok(PathBuf::from(reference));
        }
        let target = staging.join(download_file_name(reference));
        if target.exists() {
            return Ok(target);
        }
        println!("{}", t!("compat.staging", url = reference));
        self.collaborators
            .fetcher
            .download(reference, staging)
            .await
            .map_err(|e| RunError::not_found(format!("Cannot be downloaded: {:#}", e), reference).into())
    }

    async fn stage_addons(&mut self, staging: &Path) -> Result<()> {
        let platform = self.platform;
        for list in [&mut self.config.addons.default, &mut self.config.addons.extended] {
            list.retain(|addon| {
                let available = addon.available_on(platform);
                if !available {
                    println!(
                        "{}",
                        t!("compat.addon_unavailable", name = &addon.name, platform = platform.key())
                            .yellow()
                    );
                }
                available
            });
        }

        let mut staged = self.config.addons.clone();
        for addon in staged.default.iter_mut().chain(staged.extended.iter_mut()) {
            println!("{}", t!("compat.staging_addon", name = &addon.name, url = &addon.url));
            addon.local_path = Some(self.stage(&addon.url, staging).await?);
        }
        self.config.addons = staged;
        Ok(())
    }

    /// Runs the whole matrix. The staging folder is always removed; the last
    /// failure of any test-run decides the result.
    ///
    /// 运行整个矩阵。暂存目录总会被删除；任何测试运行的最后一个失败决定结果。
    pub async fn run(&mut self, parse: &OptionsParser<'_>) -> Result<()> {
        let staging = self.staging_path();
        fs::create_dir_all(&staging)
            .with_context(|| format!("Failed to create staging folder {}", staging.display()))?;

        let outcome = self.run_staged(&staging, parse).await;

        println!("{}", t!("compat.cleanup", path = staging.display()));
        if let Err(e) = remove_dir_if_exists(&staging) {
            eprintln!("{}", format!("{}", e).red());
        }

        let failures = outcome?;
        match failures.into_iter().last() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn run_staged(&mut self, staging: &Path, parse: &OptionsParser<'_>) -> Result<Vec<anyhow::Error>> {
        self.stage_addons(staging).await?;
        let mut builds = Vec::new();
        for build in self.config.settings.builds.clone() {
            builds.push(self.stage(&build, staging).await?);
        }

        let sets = chunks(
            &self.config.addons.default,
            &self.config.addons.extended,
            self.config.settings.addons_per_run,
        );
        let mut failures = Vec::new();
        for build in &builds {
            for set in &sets {
                if let Err(e) = self.run_chunk(build, set, staging, parse, &mut failures).await {
                    eprintln!("{}", format!("{:#}", e).red());
                    failures.push(e);
                }
            }
        }
        Ok(failures)
    }

    async fn run_chunk(
        &self,
        build: &Path,
        addons: &[CompatAddon],
        staging: &Path,
        parse: &OptionsParser<'_>,
        failures: &mut Vec<anyhow::Error>,
    ) -> Result<()> {
        let acquirer = Acquirer::new(
            Application::Firefox,
            self.platform,
            InstallerDetection::new(self.harness_config.installer_extensions(self.platform)),
            self.collaborators.installer.clone(),
        );
        let install_root = scratch_dir(staging, "binary_")?;
        let binary = acquirer.acquire(build, install_root.path()).await?;

        let mut args = self.config.settings.testrun_options.clone();
        if let Some(repository) = &self.repository {
            args.push(format!("--repository={}", repository));
        }
        args.push(binary.application.display().to_string());
        for addon in addons {
            if let Some(path) = &addon.local_path {
                args.push(format!("--addons={}", path.display()));
            }
            args.push(format!("--tag={}", addon.name));
        }

        for (variant, extra) in [
            ("endurance", None),
            ("update", Some("--no-fallback")),
            ("endurance", None),
        ] {
            let mut run_args = args.clone();
            run_args.extend(extra.map(str::to_string));
            if let Err(e) = self.execute_testrun(variant, run_args, parse).await {
                eprintln!("{}", format!("{:#}", e).red());
                failures.push(e);
            }
        }

        if let Err(e) = acquirer.release(&binary).await {
            eprintln!("{}", format!("{:#}", e).red());
        }
        if let Err(e) = install_root.close() {
            eprintln!("{}", format!("{}", e).red());
        }
        Ok(())
    }

    async fn execute_testrun(&self, variant: &str, args: Vec<String>, parse: &OptionsParser<'_>) -> Result<()> {
        println!("{}", t!("compat.testrun", variant = variant).cyan());
        let options = parse(variant, args)?;
        let mut driver = RunDriver::new(
            self.harness_config.clone(),
            options,
            self.collaborators.clone(),
        )
        .with_platform(self.platform);
        let summary = driver.run().await?;
        if summary.tests_failed {
            return Err(RunError::TestsFailed.into());
        }
        Ok(())
    }
}
