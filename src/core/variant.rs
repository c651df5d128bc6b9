//! # Run Variant Module / 运行变体模块
//!
//! Describes what distinguishes the test-run types from each other: where
//! their tests live in the test suite, the report identity they carry, which
//! runner events they listen for, and the ordered phases a run goes through.
//! The run driver is a single state machine parameterized by these
//! descriptors.
//!
//! 描述各测试运行类型之间的区别：其测试在测试套件中的位置、报告标识、
//! 所监听的运行器事件，以及运行依次经历的阶段。
//! 运行驱动器是由这些描述参数化的单一状态机。

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::application::Application;
use crate::core::config::{EnduranceOptions, RunVariant};
use crate::core::harness::EventKind;

/// Extra seconds on top of the endurance delay before the bridge gives up.
/// 在耐久性延迟之上桥接放弃前的额外秒数。
const ENDURANCE_TIMEOUT_MARGIN_SECS: f64 = 60.0;

/// Update downloads take long; the runner's soft timeout is 360 seconds.
/// 更新下载耗时较长；运行器的软超时为 360 秒。
const UPDATE_BRIDGE_TIMEOUT_SECS: u64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    Functional,
    Addons,
    Endurance,
    L10n,
    Remote,
    Update,
}

impl VariantKind {
    pub fn of(variant: &RunVariant) -> Self {
        match variant {
            RunVariant::Functional => VariantKind::Functional,
            RunVariant::Addons(_) => VariantKind::Addons,
            RunVariant::Endurance(_) => VariantKind::Endurance,
            RunVariant::L10n => VariantKind::L10n,
            RunVariant::Remote => VariantKind::Remote,
            RunVariant::Update(_) => VariantKind::Update,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VariantKind::Functional => "functional",
            VariantKind::Addons => "addons",
            VariantKind::Endurance => "endurance",
            VariantKind::L10n => "l10n",
            VariantKind::Remote => "remote",
            VariantKind::Update => "update",
        }
    }

    /// Report type sent to the dashboard, e.g. `firefox-functional`.
    /// 发送到仪表板的报告类型，例如 `firefox-functional`。
    pub fn report_type(self, application: Application) -> String {
        format!("{}-{}", application.name(), self.name())
    }

    pub fn report_version(self) -> &'static str {
        match self {
            VariantKind::Endurance => "1.2",
            _ => "1.0",
        }
    }

    /// Folder of this run type relative to the repository root.
    /// 此运行类型相对于仓库根目录的目录。
    pub fn root(self) -> PathBuf {
        Path::new("tests").join(self.name())
    }

    pub fn listeners(self) -> Vec<EventKind> {
        let mut listeners = vec![EventKind::Graphics, EventKind::InstalledAddons];
        if self == VariantKind::Endurance {
            listeners.push(EventKind::EnduranceResults);
        }
        listeners
    }
}

/// One runner invocation of a run.
/// 运行中的一次运行器调用。
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    pub label: String,
    /// Test folder relative to the repository root / 相对于仓库根目录的测试目录
    pub path: PathBuf,
    pub restart: bool,
    /// Skipped silently when the folder does not exist.
    /// 目录不存在时静默跳过。
    pub optional: bool,
}

impl Phase {
    fn required(label: impl Into<String>, path: PathBuf, restart: bool) -> Self {
        Self {
            label: label.into(),
            path,
            restart,
            optional: false,
        }
    }
}

/// Phases of the run types that do not iterate over add-ons or update paths.
/// Add-on runs build theirs per add-on with [`addon_phases`]; update runs
/// use [`update_phase`].
///
/// 不遍历附加组件或更新路径的运行类型的阶段。
/// 附加组件运行通过 [`addon_phases`] 为每个附加组件构建阶段；更新运行使用 [`update_phase`]。
pub fn static_phases(variant: &RunVariant) -> Vec<Phase> {
    let kind = VariantKind::of(variant);
    let root = kind.root();
    match variant {
        RunVariant::Functional | RunVariant::Remote => vec![
            Phase::required(kind.name(), root.clone(), false),
            Phase::required(
                format!("{}/restartTests", kind.name()),
                root.join("restartTests"),
                true,
            ),
        ],
        RunVariant::L10n => vec![Phase::required(kind.name(), root, true)],
        RunVariant::Endurance(options) => vec![endurance_phase(options)],
        RunVariant::Addons(_) | RunVariant::Update(_) => Vec::new(),
    }
}

fn endurance_phase(options: &EnduranceOptions) -> Phase {
    let root = VariantKind::Endurance.root();
    match &options.reserved {
        Some(name) => Phase::required(
            format!("endurance/reserved/{}", name),
            root.join("reserved").join(name),
            options.restart,
        ),
        None => Phase::required("endurance", root, options.restart),
    }
}

/// The normal and restart phase of one add-on's tests; either may be absent.
/// 单个附加组件测试的普通阶段和重启阶段；两者都可能不存在。
pub fn addon_phases(addon: &str) -> Vec<Phase> {
    let base = addon_root(addon);
    vec![
        Phase {
            label: format!("addons/{}", addon),
            path: base.join("tests"),
            restart: false,
            optional: true,
        },
        Phase {
            label: format!("addons/{}/restartTests", addon),
            path: base.join("restartTests"),
            restart: true,
            optional: true,
        },
    ]
}

/// Folder of one add-on below `tests/addons`.
/// `tests/addons` 下单个附加组件的目录。
pub fn addon_root(addon: &str) -> PathBuf {
    VariantKind::Addons.root().join(addon)
}

/// The direct or fallback update phase.
/// 直接更新阶段或回退更新阶段。
pub fn update_phase(fallback: bool) -> Phase {
    let folder = if fallback {
        "testFallbackUpdate"
    } else {
        "testDirectUpdate"
    };
    Phase::required(
        format!("update/{}", folder),
        VariantKind::Update.root().join(folder),
        true,
    )
}

/// Bridge timeout a run type needs; `None` leaves the runner's default.
/// 运行类型所需的桥接超时；`None` 表示使用运行器的默认值。
pub fn bridge_timeout(variant: &RunVariant) -> Option<Duration> {
    match variant {
        RunVariant::Endurance(options) => {
            Duration::try_from_secs_f64(options.delay.max(0.0) + ENDURANCE_TIMEOUT_MARGIN_SECS).ok()
        }
        RunVariant::Update(_) => Some(Duration::from_secs(UPDATE_BRIDGE_TIMEOUT_SECS)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::UpdateOptions;

    #[test]
    fn functional_runs_normal_then_restart() {
        let phases = static_phases(&RunVariant::Functional);
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[0].path, Path::new("tests/functional"));
        assert!(!phases[0].restart);
        assert_eq!(phases[1].path, Path::new("tests/functional/restartTests"));
        assert!(phases[1].restart);
    }

    #[test]
    fn reserved_endurance_suite() {
        let options = EnduranceOptions {
            reserved: Some("memory".into()),
            restart: false,
            ..EnduranceOptions::default()
        };
        let phases = static_phases(&RunVariant::Endurance(options));
        assert_eq!(phases[0].path, Path::new("tests/endurance/reserved/memory"));
        assert!(!phases[0].restart);
    }

    #[test]
    fn report_identity() {
        assert_eq!(
            VariantKind::Endurance.report_type(Application::Firefox),
            "firefox-endurance"
        );
        assert_eq!(VariantKind::Endurance.report_version(), "1.2");
        assert_eq!(VariantKind::Update.report_version(), "1.0");
    }

    #[test]
    fn bridge_timeouts() {
        let endurance = RunVariant::Endurance(EnduranceOptions {
            delay: 10.0,
            ..EnduranceOptions::default()
        });
        assert_eq!(bridge_timeout(&endurance), Some(Duration::from_secs(70)));
        assert_eq!(
            bridge_timeout(&RunVariant::Update(UpdateOptions::default())),
            Some(Duration::from_secs(365))
        );
        assert_eq!(bridge_timeout(&RunVariant::L10n), None);
    }

    #[test]
    fn unrepresentable_delay_has_no_bridge_timeout() {
        for delay in [1e20, f64::INFINITY, f64::NAN] {
            let endurance = RunVariant::Endurance(EnduranceOptions {
                delay,
                ..EnduranceOptions::default()
            });
            assert_eq!(bridge_timeout(&endurance), None);
        }
    }
}
