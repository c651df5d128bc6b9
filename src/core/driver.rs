//! # Run Driver Module / 运行驱动模块
//!
//! The test-run lifecycle state machine:
//!
//! ```text
//! Idle → Acquiring → RepositoryReady → EnvironmentReady → Invoking
//!      → Aggregating → CleaningUp → Terminal(Success|TestsFailed|Aborted|Unsupported)
//! ```
//!
//! A single [`RunDriver`] serves every run type. What differs between them
//! (test folders, phases, listeners, report identity) comes from
//! [`crate::core::variant`]. Cleanup always runs once acquisition started,
//! and an error raised before cleanup is still returned after it.
//!
//! 测试运行生命周期状态机。单个 [`RunDriver`] 服务于所有运行类型，
//! 它们之间的差异（测试目录、阶段、监听器、报告标识）来自 [`crate::core::variant`]。
//! 一旦开始获取构建，清理总会执行；清理前抛出的错误在清理后仍会返回。

use anyhow::{Context, Result};
use colored::*;
use once_cell::unsync::OnceCell;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::core::acquirer::{Acquirer, BinaryRef, Installer};
use crate::core::application::{
    allow_mar_channels, InstallerDetection, Platform, UpdateChannel,
};
use crate::core::config::{
    AddonsOptions, EnduranceOptions, HarnessConfig, RunOptions, RunVariant, UpdateOptions,
};
use crate::core::endurance;
use crate::core::environment::{Environment, Fetcher};
use crate::core::harness::{
    EventKind, EventSink, Harness, HarnessReport, Invocation, ProfileArgs, RunnerArgs,
};
use crate::core::manifest;
use crate::core::models::{InvocationRecord, RunError, RunStatus, RunSummary, UpdatePhase};
use crate::core::repository::{infer_branch, Repository, VersionControl};
use crate::core::variant::{self, Phase, VariantKind};
use crate::infra::download::{HttpFetcher, HttpReportSink};
use crate::infra::fs::{
    absolute_path, move_dir_all, remove_dir_if_exists, remove_dir_with_deadline, scratch_dir,
    unique_filename,
};
use crate::infra::ini::IniFile;
use crate::infra::installer::PackageInstaller;
use crate::infra::runner::ProcessHarness;
use crate::infra::t;
use crate::infra::vcs::Mercurial;
use crate::infra::xpi;
use crate::reporting::console::{print_platform_banner, print_summary, print_update_results};
use crate::reporting::dashboard::{build_payload, ReportExtras, ReportMeta, ReportSink};
use crate::reporting::junit;

/// How long a freshly terminated build may keep its folder locked.
/// 刚终止的构建可以锁定其目录的最长时间。
const RESTORE_DEADLINE: Duration = Duration::from_secs(15);
const RESTORE_INTERVAL: Duration = Duration::from_secs(1);

const REPOSITORY_FOLDER: &str = "tests-repository";

/// States of one run.
/// 单次运行的状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Acquiring,
    RepositoryReady,
    EnvironmentReady,
    Invoking,
    Aggregating,
    CleaningUp,
    Terminal(RunStatus),
}

/// The services a run talks to.
/// 运行所使用的服务。
#[derive(Clone)]
pub struct Collaborators {
    pub vcs: Arc<dyn VersionControl>,
    pub installer: Arc<dyn Installer>,
    pub fetcher: Arc<dyn Fetcher>,
    pub harness: Arc<dyn Harness>,
    pub reports: Arc<dyn ReportSink>,
}

impl Collaborators {
    /// The production collaborators: `hg`, package installers, `reqwest` and
    /// the runner process configured in `config`.
    ///
    /// 生产环境协作者：`hg`、安装包安装程序、`reqwest` 以及 `config` 中配置的运行器进程。
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        Ok(Self {
            vcs: Arc::new(Mercurial::new(config.vcs.command.clone())),
            installer: Arc::new(PackageInstaller),
            fetcher: Arc::new(HttpFetcher::new()),
            harness: Arc::new(ProcessHarness::new(config.runner_command()?)?),
            reports: Arc::new(HttpReportSink::new()),
        })
    }
}

/// Records the runner events of one invocation. Graphics and installed
/// add-ons keep their first occurrence; endurance results accumulate.
///
/// 记录一次调用的运行器事件。图形和已安装附加组件信息保留首次出现的值；
/// 耐久性结果会累积。
#[derive(Debug, Default)]
pub struct EventLog {
    graphics: OnceCell<Value>,
    installed_addons: OnceCell<Value>,
    endurance: Vec<Value>,
}

impl EventLog {
    pub fn graphics(&self) -> Option<&Value> {
        self.graphics.get()
    }

    pub fn installed_addons(&self) -> Option<&Value> {
        self.installed_addons.get()
    }

    pub fn endurance_results(&self) -> &[Value] {
        &self.endurance
    }
}

impl EventSink for EventLog {
    fn on_event(&mut self, kind: EventKind, data: Value) {
        match kind {
            // Later firings are ignored.
            EventKind::Graphics => {
                let _ = self.graphics.set(data);
            }
            EventKind::InstalledAddons => {
                let _ = self.installed_addons.set(data);
            }
            EventKind::EnduranceResults => self.endurance.push(data),
        }
    }
}

/// Everything a run owns between acquisition and cleanup.
/// 运行在获取与清理之间拥有的所有资源。
struct Session {
    workspace: PathBuf,
    binary: Option<BinaryRef>,
    backup: Option<PathBuf>,
    repository: Option<Repository>,
    changeset: String,
    environment: Environment,
    summary: RunSummary,
    reports_sent: usize,
    /// Last error of a phase that was caught to let the next phase run.
    /// 为了让下一阶段继续运行而被捕获的最后一个阶段错误。
    last_error: Option<anyhow::Error>,
    any_phase_succeeded: bool,
}

impl Session {
    fn binary(&self) -> Result<&BinaryRef> {
        self.binary
            .as_ref()
            .context("No build has been acquired for this run")
    }

    fn repository(&self) -> Result<&Repository> {
        self.repository
            .as_ref()
            .context("The test repository has not been prepared")
    }

    fn record_phase_error(&mut self, err: anyhow::Error) {
        eprintln!("{}", format!("{:#}", err).red());
        self.last_error = Some(err);
    }
}

/// Drives one test-run from acquisition to terminal status.
/// 驱动一次测试运行从获取构建到最终状态。
pub struct RunDriver {
    config: HarnessConfig,
    options: RunOptions,
    collaborators: Collaborators,
    platform: Platform,
    restore_deadline: Duration,
    transitions: Vec<RunState>,
}

impl RunDriver {
    pub fn new(config: HarnessConfig, options: RunOptions, collaborators: Collaborators) -> Self {
        Self {
            config,
            options,
            collaborators,
            platform: Platform::current(),
            restore_deadline: RESTORE_DEADLINE,
            transitions: vec![RunState::Idle],
        }
    }

    /// Overrides the platform layout assumed for builds.
    /// 覆盖构建所假定的平台布局。
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// How long removing the updated build may be retried before the
    /// fallback update gives up.
    ///
    /// 在回退更新放弃之前，删除已更新构建可重试的时长。
    pub fn with_restore_deadline(mut self, deadline: Duration) -> Self {
        self.restore_deadline = deadline;
        self
    }

    pub fn state(&self) -> RunState {
        self.transitions.last().copied().unwrap_or(RunState::Idle)
    }

    /// Every state the run went through, in order.
    /// 运行依次经历的所有状态。
    pub fn transitions(&self) -> &[RunState] {
        &self.transitions
    }

    fn enter(&mut self, state: RunState) {
        if self.state() != state {
            self.transitions.push(state);
        }
    }

    fn kind(&self) -> VariantKind {
        VariantKind::of(&self.options.variant)
    }

    fn acquirer(&self) -> Acquirer {
        Acquirer::new(
            self.options.application,
            self.platform,
            InstallerDetection::new(self.config.installer_extensions(self.platform)),
            Arc::clone(&self.collaborators.installer),
        )
    }

    /// Executes the run. `Ok` carries the summary of a run whose phases all
    /// completed (its status tells whether tests failed); `Err` carries the
    /// classified failure that ended it.
    ///
    /// 执行运行。`Ok` 携带所有阶段都已完成的运行摘要（其状态表明测试是否失败）；
    /// `Err` 携带导致运行结束的已分类失败。
    pub async fn run(&mut self) -> Result<RunSummary> {
        if self.options.binaries.len() != 1 {
            let err: anyhow::Error = RunError::Usage(
                t!("run.exactly_one_binary", count = self.options.binaries.len()).to_string(),
            )
            .into();
            self.enter(RunState::Terminal(RunStatus::from_error(&err)));
            return Err(err);
        }
        if let RunVariant::Endurance(options) = &self.options.variant {
            if let Err(message) = EnduranceOptions::check_delay(options.delay) {
                let err: anyhow::Error = RunError::Usage(message).into();
                self.enter(RunState::Terminal(RunStatus::from_error(&err)));
                return Err(err);
            }
        }
        print_platform_banner();

        let workspace = match self.allocate_workspace() {
            Ok(workspace) => workspace,
            Err(err) => {
                self.enter(RunState::Terminal(RunStatus::from_error(&err)));
                return Err(err);
            }
        };
        let mut session = Session {
            workspace: workspace.path().to_path_buf(),
            binary: None,
            backup: None,
            repository: None,
            changeset: String::new(),
            environment: Environment::new(
                workspace.path(),
                Arc::clone(&self.collaborators.fetcher),
            ),
            summary: RunSummary::default(),
            reports_sent: 0,
            last_error: None,
            any_phase_succeeded: false,
        };

        let outcome = self.execute(&mut session).await;

        self.enter(RunState::Aggregating);
        print_summary(&session.summary);
        print_update_results(&session.summary.update_phases);

        self.enter(RunState::CleaningUp);
        self.cleanup(&mut session).await;
        if let Err(e) = workspace.close() {
            eprintln!("{}", t!("run.workspace_remove_failed", error = e).red());
        }

        let result = match outcome {
            Err(err) => Err(err),
            Ok(()) => match session.last_error.take() {
                Some(err) if !session.any_phase_succeeded => Err(err),
                _ => Ok(session.summary),
            },
        };
        self.enter(RunState::Terminal(RunStatus::classify(&result)));
        result
    }

    fn allocate_workspace(&self) -> Result<TempDir> {
        let root = match self
            .options
            .workspace
            .clone()
            .or_else(|| self.config.workspace_root())
        {
            Some(root) => absolute_path(&crate::infra::fs::expand_path(&root))?,
            None => std::env::temp_dir(),
        };
        scratch_dir(&root, "testrun_")
    }

    async fn execute(&mut self, session: &mut Session) -> Result<()> {
        self.enter(RunState::Acquiring);
        let acquirer = self.acquirer();
        let binary = acquirer
            .acquire(&self.options.binaries[0], &session.workspace.join("binary"))
            .await?;
        session.binary = Some(binary.clone());

        let details = acquirer.details(&binary)?;
        println!(
            "{}",
            t!("run.application", name = &details.name, version = &details.version)
        );

        self.prepare_repository(session, details.source_repository.as_deref())
            .await?;
        self.enter(RunState::RepositoryReady);

        self.prepare_environment(session).await?;
        self.enter(RunState::EnvironmentReady);

        self.enter(RunState::Invoking);
        match self.options.variant.clone() {
            RunVariant::Functional | RunVariant::L10n | RunVariant::Remote => {
                self.run_static_phases(session).await;
            }
            RunVariant::Endurance(options) => self.run_endurance(session, &options).await,
            RunVariant::Addons(options) => self.run_addons(session, &options).await?,
            RunVariant::Update(options) => self.run_update(session, &options).await?,
        }
        Ok(())
    }

    async fn prepare_repository(&mut self, session: &mut Session, source: Option<&str>) -> Result<()> {
        let url = match &self.options.repository {
            Some(url) => url.clone(),
            None => self
                .config
                .repository_for(self.options.application)
                .map(str::to_string)
                .ok_or_else(|| {
                    RunError::Setup(format!(
                        "No test repository configured for {}",
                        self.options.application
                    ))
                })?,
        };
        let repository = Repository::new(
            url,
            session.workspace.join(REPOSITORY_FOLDER),
            Arc::clone(&self.collaborators.vcs),
        );
        repository.clone_repo().await?;
        // Stored right away so cleanup removes the clone even if the update fails.
        let repository = session.repository.insert(repository);

        let branch = infer_branch(source, &self.config.release_branch);
        repository.update(Some(&branch)).await?;
        let changeset = repository.changeset().await?;
        let supported = repository.path().join(self.kind().root()).is_dir();
        session.changeset = changeset;

        let kind = self.kind();
        if !supported {
            return Err(RunError::Unsupported {
                variant: kind.name().to_string(),
                branch,
            }
            .into());
        }
        Ok(())
    }

    async fn prepare_environment(&mut self, session: &mut Session) -> Result<()> {
        session
            .environment
            .prepare_addons(&self.options.addons)
            .await?;

        if let Some(path) = &self.options.screenshot_path {
            let path = absolute_path(path)?;
            fs::create_dir_all(&path).with_context(|| {
                format!("Failed to create the screenshot folder {}", path.display())
            })?;
            session
                .environment
                .set_persisted("screenshotPath", json!(path.display().to_string()));
        }
        Ok(())
    }

    /// Runs one phase in a fresh profile and aggregates its report.
    /// 在新的配置文件中运行一个阶段并汇总其报告。
    async fn invoke_phase(
        &mut self,
        session: &mut Session,
        phase: &Phase,
        target_addon: Option<&Path>,
    ) -> Result<InvocationRecord> {
        let repository_path = session.repository()?.path().to_path_buf();
        let folder = repository_path.join(&phase.path);
        if !folder.is_dir() {
            return Err(RunError::not_found("Test folder cannot be found", folder.display()).into());
        }
        let tests = manifest::resolve(&folder)?;
        let binary = session.binary()?.application.clone();

        println!("{}", t!("run.invoking", label = &phase.label).cyan());
        let profile = session.environment.create_profile()?;
        let kind = self.kind();
        let invocation = Invocation {
            application: self.options.application,
            listeners: kind.listeners(),
            profile: ProfileArgs {
                path: profile.path().to_path_buf(),
                addons: session.environment.addons().to_vec(),
            },
            runner: RunnerArgs {
                binary,
                logfile: self.options.logfile.clone(),
                port: self.options.port,
            },
            bridge_timeout: variant::bridge_timeout(&self.options.variant).or(self
                .config
                .runner
                .bridge_timeout_secs
                .map(Duration::from_secs)),
            tests: tests.clone(),
            restart: phase.restart || self.options.restart,
            persisted: session.environment.persisted().clone(),
        };

        let mut events = EventLog::default();
        let outcome = self
            .collaborators
            .harness
            .invoke(&invocation, &mut events)
            .await;
        session.environment.remove_profile(profile);
        let report = outcome.with_context(|| format!("Execution of '{}' aborted", phase.label))?;

        self.enter(RunState::Aggregating);
        if report.failed > 0 {
            session.summary.tests_failed = true;
        }
        let index = session.summary.invocations.len();
        let junit = self.write_junit(&report, index);
        self.send_report(session, &report, &events, target_addon)
            .await;

        let record = InvocationRecord {
            label: phase.label.clone(),
            tests,
            restart: invocation.restart,
            report,
            junit,
        };
        session.summary.invocations.push(record.clone());
        session.any_phase_succeeded = true;
        self.enter(RunState::Invoking);
        Ok(record)
    }

    fn write_junit(&self, report: &HarnessReport, index: usize) -> Option<PathBuf> {
        let base = self.options.junit.as_ref()?;
        let path = unique_filename(base, index);
        let kind = self.kind();
        let root = format!("tests/{}", kind.name());
        match junit::write(&path, report, &kind.report_type(self.options.application), &root) {
            Ok(()) => Some(path),
            Err(e) => {
                eprintln!("{}", format!("{:#}", e).red());
                None
            }
        }
    }

    fn report_extras(
        &self,
        report: &HarnessReport,
        events: &EventLog,
        target_addon: Option<&Path>,
    ) -> ReportExtras {
        let mut extras = ReportExtras {
            graphics: events.graphics().cloned(),
            installed_addons: events.installed_addons().cloned(),
            ..ReportExtras::default()
        };
        match &self.options.variant {
            RunVariant::Addons(_) => {
                extras.target_addon =
                    target_addon.map(|path| json!(xpi::addon_details(path)));
            }
            RunVariant::Endurance(_) => {
                let mut endurance = report
                    .persisted
                    .get("endurance")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                let mut results = events.endurance_results().to_vec();
                let stats = endurance::rollup(&mut results);
                endurance.insert("results".into(), Value::Array(results));
                endurance.insert("stats".into(), stats);
                extras.endurance = Some(Value::Object(endurance));
            }
            RunVariant::Update(_) => {
                extras.updates = Some(
                    report
                        .persisted
                        .get("updates")
                        .cloned()
                        .unwrap_or_else(|| json!([])),
                );
            }
            _ => {}
        }
        extras
    }

    async fn send_report(
        &self,
        session: &mut Session,
        report: &HarnessReport,
        events: &EventLog,
        target_addon: Option<&Path>,
    ) {
        let Some(destination) = self.options.report.as_deref() else {
            return;
        };
        let kind = self.kind();
        let meta = ReportMeta {
            report_type: kind.report_type(self.options.application),
            report_version: kind.report_version().to_string(),
            tests_repository: session
                .repository
                .as_ref()
                .map(|r| r.url().to_string())
                .unwrap_or_default(),
            tests_changeset: session.changeset.clone(),
            tags: self.options.tags.clone(),
        };
        let extras = self.report_extras(report, events, target_addon);
        let index = session.reports_sent;
        session.reports_sent += 1;

        let delivered = match build_payload(report, &meta, &extras) {
            Ok(payload) => {
                self.collaborators
                    .reports
                    .deliver(destination, index, &payload)
                    .await
            }
            Err(e) => Err(e),
        };
        match delivered {
            Ok(location) => println!("{}", t!("run.report_sent", location = location)),
            Err(e) => eprintln!(
                "{}",
                t!("run.report_failed", error = format!("{:#}", e)).red()
            ),
        }
    }

    /// Every phase is attempted even if an earlier one raised.
    /// 即使之前的阶段出错，每个阶段也都会被尝试。
    async fn run_static_phases(&mut self, session: &mut Session) {
        for phase in variant::static_phases(&self.options.variant) {
            if let Err(e) = self.invoke_phase(session, &phase, None).await {
                session.record_phase_error(e);
            }
        }
    }

    async fn run_endurance(&mut self, session: &mut Session, options: &EnduranceOptions) {
        session.environment.set_persisted(
            "endurance",
            json!({
                "delay": (options.delay * 1000.0).round() as u64,
                "iterations": options.iterations,
                "entities": options.entities,
                "restart": options.restart,
            }),
        );
        self.run_static_phases(session).await;
    }

    /// Add-on test folders of the checkout, sorted by name.
    /// 检出中的附加组件测试目录，按名称排序。
    fn all_addons(&self, repository: &Path) -> Result<Vec<String>> {
        let root = repository.join(VariantKind::Addons.root());
        let mut addons: Vec<String> = fs::read_dir(&root)
            .with_context(|| format!("Failed to list add-on tests in {}", root.display()))?
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        addons.sort();
        Ok(addons)
    }

    fn is_trusted(&self, url: &str) -> bool {
        let host = self.config.trusted_addon_host.to_ascii_lowercase();
        reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
            .is_some_and(|h| h == host || h.ends_with(&format!(".{}", host)))
    }

    async fn run_addons(&mut self, session: &mut Session, options: &AddonsOptions) -> Result<()> {
        let repository_path = session.repository()?.path().to_path_buf();
        let targets = if options.target_addons.is_empty() {
            self.all_addons(&repository_path)?
        } else {
            options.target_addons.clone()
        };

        for addon in targets {
            let settings = repository_path.join(variant::addon_root(&addon)).join("addon.ini");
            let url = IniFile::read(&settings)
                .ok()
                .and_then(|ini| ini.get("download", self.platform.key()).map(str::to_string));
            let Some(url) = url else {
                println!(
                    "{}",
                    t!("addons.no_settings", path = settings.display()).yellow()
                );
                continue;
            };

            if !options.with_untrusted && !self.is_trusted(&url) {
                println!("{}", t!("addons.untrusted", addon = &addon, url = &url).yellow());
                println!("{}", t!("addons.use_with_untrusted").yellow());
                continue;
            }

            let downloaded = match session.environment.download(&url).await {
                Ok(path) => path,
                Err(e) => {
                    session.record_phase_error(e);
                    continue;
                }
            };

            for phase in variant::addon_phases(&addon) {
                if phase.optional && !repository_path.join(&phase.path).is_dir() {
                    continue;
                }
                session.environment.push_addon(downloaded.clone());
                let outcome = self.invoke_phase(session, &phase, Some(&downloaded)).await;
                session.environment.remove_addon(&downloaded);
                if let Err(e) = outcome {
                    session.record_phase_error(e);
                }
            }

            session.environment.remove_download(&downloaded);
        }
        Ok(())
    }

    /// Switches the build to the requested update channel and allows the
    /// extra MAR channels. Runs before every phase since a restored backup
    /// starts out pristine.
    ///
    /// 将构建切换到请求的更新通道并允许额外的 MAR 通道。
    /// 由于恢复的备份是原始状态，因此在每个阶段之前都会运行。
    fn prepare_update(&self, session: &mut Session, options: &UpdateOptions, fallback: bool) -> Result<()> {
        let folder = session.binary()?.folder.clone();
        let prefs = UpdateChannel::locate(self.platform, &folder)?;
        let channel = match &options.channel {
            Some(channel) => {
                prefs.write(channel)?;
                channel.clone()
            }
            None => prefs.read()?,
        };
        allow_mar_channels(self.platform, &folder, &options.allow_mar_channels)?;

        let environment = &mut session.environment;
        environment.set_persisted("channel", json!(channel));
        match &options.target_build_id {
            Some(id) => environment.set_persisted("targetBuildID", json!(id)),
            None => {
                environment.remove_persisted("targetBuildID");
            }
        }
        let mut update = json!({ "fallback": fallback });
        if let Some(url) = &options.override_update_url {
            update["override_url"] = json!(url);
        }
        environment.set_persisted("update", update);
        Ok(())
    }

    async fn run_update_phase(
        &mut self,
        session: &mut Session,
        options: &UpdateOptions,
        fallback: bool,
    ) -> UpdatePhase {
        let phase = variant::update_phase(fallback);
        let outcome = match self.prepare_update(session, options, fallback) {
            Ok(()) => self.invoke_phase(session, &phase, None).await,
            Err(e) => Err(e),
        };

        let (data, passes, fails, skipped) = match outcome {
            Ok(record) => (
                record.report.persisted.clone(),
                record.report.passed,
                record.report.failed,
                record.report.skipped,
            ),
            Err(e) => {
                eprintln!("{}", t!("update.phase_aborted", error = format!("{:#}", e)).red());
                session.last_error = Some(e);
                (session.environment.persisted().clone(), 0, 0, 0)
            }
        };

        if let Some(staging) = data.get("updateStagingPath").and_then(Value::as_str) {
            let staging = Path::new(staging);
            if staging.exists() {
                println!("{}", t!("update.removing_staging", path = staging.display()));
                if let Err(e) = remove_dir_if_exists(staging) {
                    eprintln!(
                        "{}",
                        t!("update.staging_remove_failed", error = e).red()
                    );
                }
            }
        }

        let mut result = UpdatePhase {
            fallback,
            success: false,
            passes,
            fails,
            skipped,
            data,
        };
        result.success = fails == 0 && result.last_update_succeeded();
        result
    }

    /// Replaces the tested build with the pristine backup. Deletion is retried
    /// until the deadline; past it the error ends the run.
    ///
    /// 用原始备份替换已测试的构建。删除会重试直到截止时间；超过后错误将终止运行。
    async fn restore_binary(&self, session: &mut Session) -> Result<()> {
        let folder = session.binary()?.folder.clone();
        let backup = session
            .backup
            .take()
            .context("No backup of the build is available")?;

        println!("{}", t!("update.removing_binary", path = folder.display()));
        let interval = RESTORE_INTERVAL.min(self.restore_deadline);
        remove_dir_with_deadline(&folder, self.restore_deadline, interval).await?;
        println!("{}", t!("update.restoring_backup", path = backup.display()));
        move_dir_all(&backup, &folder)
    }

    async fn run_update(&mut self, session: &mut Session, options: &UpdateOptions) -> Result<()> {
        if options.fallback {
            let backup = session.workspace.join("binary_backup");
            let binary = session.binary()?.clone();
            self.acquirer()
                .backup(&binary, &backup)
                .map_err(|e| RunError::Setup(format!("Failure while creating the backup of the build: {:#}", e)))?;
            session.backup = Some(backup);
        }

        let direct = self.run_update_phase(session, options, false).await;
        session.summary.update_phases.push(direct);

        if options.fallback {
            self.restore_binary(session).await?;
            let fallback = self.run_update_phase(session, options, true).await;
            session.summary.update_phases.push(fallback);
        }
        Ok(())
    }

    /// Releases everything the run acquired; failures are only logged.
    /// 释放运行获取的所有资源；失败仅记录日志。
    async fn cleanup(&mut self, session: &mut Session) {
        if let Some(binary) = &session.binary {
            if let Err(e) = self.acquirer().release(binary).await {
                eprintln!("{}", t!("run.cleanup_failed", error = format!("{:#}", e)).red());
            }
        }
        session.environment.remove_downloaded_addons();
        if let Some(repository) = &session.repository {
            if let Err(e) = repository.remove() {
                eprintln!("{}", t!("run.cleanup_failed", error = format!("{:#}", e)).red());
            }
        }
    }
}
