//! # Run Driver Integration Tests / 运行驱动集成测试
//!
//! Drives complete test-runs against fake collaborators: a fixture test-suite
//! instead of Mercurial, an unpacked build folder instead of an installer and
//! a scripted runner instead of the real one.
//!
//! 使用伪协作者驱动完整的测试运行：用夹具测试套件代替 Mercurial，
//! 用已解包的构建目录代替安装包，用脚本化运行器代替真实运行器。

mod common;

use common::{config, report, FakeHarness, FakeVcs, Fixture, RecordingInstaller};
use serde_json::json;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use testrun_automation::core::application::Platform;
use testrun_automation::core::config::{AddonsOptions, EnduranceOptions, RunVariant, UpdateOptions};
use testrun_automation::core::driver::{RunDriver, RunState};
use testrun_automation::core::models::{RunError, RunStatus};
use testrun_automation::core::repository::Repository;

#[tokio::test]
async fn functional_run_passes_with_both_phases() {
    let fixture = Fixture::new(
        &["tests/functional/testA", "tests/functional/restartTests/testB"],
        FakeHarness::passing(4),
    );
    let binary = fixture.build(None);
    let mut options = fixture.options(binary);
    options.report = Some("http://dashboard.example.org/db".into());
    options.tags = vec!["nightly".into()];

    let mut driver =
        RunDriver::new(config(), options, fixture.collaborators()).with_platform(Platform::Linux);
    let outcome = driver.run().await;

    assert_eq!(RunStatus::classify(&outcome), RunStatus::Success);
    let summary = outcome.unwrap();
    let labels: Vec<_> = summary.invocations.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(labels, ["functional", "functional/restartTests"]);

    let invocations = fixture.harness.recorded();
    assert!(!invocations[0].restart);
    assert!(invocations[1].restart);
    assert_ne!(invocations[0].profile.path, invocations[1].profile.path);

    // Release builds check out the configured release branch.
    assert_eq!(fixture.vcs.updated_branches(), ["mozilla-release"]);

    let payloads = fixture.reports.payloads();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0]["report_type"], "firefox-functional");
    assert_eq!(payloads[0]["tests_changeset"], "0123456789ab");
    assert_eq!(payloads[0]["tags"], json!(["nightly"]));
    assert!(payloads[0].get("persisted").is_none());

    assert_eq!(
        driver.state(),
        RunState::Terminal(RunStatus::Success)
    );
    // The workspace folder is gone after cleanup.
    assert_eq!(fs::read_dir(fixture.workspace()).unwrap().count(), 0);
    // A pre-extracted build is used in place and left alone.
    assert!(fixture.root.path().join("firefox/application.ini").is_file());
    assert!(fixture.root.path().join("firefox/firefox").is_file());
}

#[tokio::test]
async fn installer_is_installed_fresh_and_removed_after_the_run() {
    let fixture = Fixture::new(
        &["tests/functional", "tests/functional/restartTests"],
        FakeHarness::passing(1),
    );
    let package = fixture.root.path().join("firefox-10.0.tar.bz2");
    fs::write(&package, "packed").unwrap();
    let installer = Arc::new(RecordingInstaller::default());

    let mut driver = RunDriver::new(
        config(),
        fixture.options(package.clone()),
        fixture.collaborators_with(installer.clone()),
    )
    .with_platform(Platform::Linux);
    let outcome = driver.run().await;

    assert_eq!(RunStatus::classify(&outcome), RunStatus::Success);
    let installed = installer.installed();
    assert_eq!(installed.len(), 1);
    assert!(installed[0].starts_with(fixture.workspace()));
    assert_eq!(installer.uninstalled(), installed);
    assert!(!installed[0].exists());
    // The runner was pointed at the installed copy, not the package.
    assert!(fixture.harness.recorded()[0].runner.binary.starts_with(&installed[0]));
    assert!(package.is_file());
}

#[tokio::test]
async fn repository_exists_between_clone_and_remove() {
    let fixture = Fixture::new(&["tests/functional"], FakeHarness::passing(1));
    let target = fixture.root.path().join("checkout");
    let repository = Repository::new(
        "http://hg.example.org/tests",
        &target,
        Arc::new(FakeVcs::new(fixture.suite())),
    );

    assert!(!repository.exists());
    repository.clone_repo().await.unwrap();
    assert!(repository.exists());
    assert!(target.join("tests/functional/test1.js").is_file());

    repository.remove().unwrap();
    assert!(!repository.exists());
    assert!(!target.exists());
}

#[tokio::test]
async fn failing_tests_mark_the_run_without_aborting_it() {
    let harness = FakeHarness::new(|index, invocation| {
        Ok(report(3, if index == 0 { 1 } else { 0 }, invocation))
    });
    let fixture = Fixture::new(
        &["tests/functional", "tests/functional/restartTests"],
        harness,
    );
    let binary = fixture.build(Some("http://hg.mozilla.org/releases/mozilla-beta"));
    let mut driver = RunDriver::new(config(), fixture.options(binary), fixture.collaborators())
        .with_platform(Platform::Linux);

    let outcome = driver.run().await;

    assert_eq!(RunStatus::classify(&outcome), RunStatus::TestsFailed);
    assert_eq!(outcome.unwrap().invocations.len(), 2);
    assert_eq!(fixture.vcs.updated_branches(), ["mozilla-beta"]);
}

#[tokio::test]
async fn untrusted_addon_is_skipped_without_download() {
    let fixture = Fixture::new(&["tests/addons/evil/tests"], FakeHarness::passing(1));
    fs::write(
        fixture.suite().join("tests/addons/evil/addon.ini"),
        "[download]\nlinux = http://evil.example.com/evil.xpi\n",
    )
    .unwrap();
    let binary = fixture.build(None);
    let mut options = fixture.options(binary);
    options.variant = RunVariant::Addons(AddonsOptions::default());

    let mut driver = RunDriver::new(config(), options, fixture.collaborators())
        .with_platform(Platform::Linux);
    let outcome = driver.run().await;

    assert_eq!(RunStatus::classify(&outcome), RunStatus::Success);
    assert!(fixture.fetcher.requested().is_empty());
    assert!(fixture.harness.recorded().is_empty());
}

#[tokio::test]
async fn trusted_addon_is_installed_for_its_phases() {
    let fixture = Fixture::new(&["tests/addons/good/tests"], FakeHarness::passing(2));
    fs::write(
        fixture.suite().join("tests/addons/good/addon.ini"),
        "[download]\nlinux = https://addons.mozilla.org/firefox/downloads/good.xpi\n",
    )
    .unwrap();
    let binary = fixture.build(None);
    let mut options = fixture.options(binary);
    options.variant = RunVariant::Addons(AddonsOptions::default());
    options.report = Some("http://dashboard.example.org/db".into());

    let mut driver = RunDriver::new(config(), options, fixture.collaborators())
        .with_platform(Platform::Linux);
    let summary = driver.run().await.unwrap();

    assert_eq!(
        fixture.fetcher.requested(),
        ["https://addons.mozilla.org/firefox/downloads/good.xpi"]
    );
    // The optional restart folder does not exist, so one phase only.
    assert_eq!(summary.invocations.len(), 1);
    assert_eq!(summary.invocations[0].label, "addons/good");
    let invocation = &fixture.harness.recorded()[0];
    assert!(invocation.profile.addons.iter().any(|a| a.ends_with("good.xpi")));

    // The downloaded stand-in is no package, so its identity stays unknown.
    let payloads = fixture.reports.payloads();
    assert_eq!(
        payloads[0]["target_addon"],
        json!({"id": null, "name": null, "version": null})
    );
}

#[tokio::test]
async fn fallback_update_runs_after_failed_direct_update() {
    let harness = FakeHarness::new(|index, invocation| {
        let mut result = report(5, if index == 0 { 1 } else { 0 }, invocation);
        result.persisted.insert(
            "updates".into(),
            json!([{
                "build_pre": {"version": "9.0", "buildid": "1"},
                "build_post": {"version": "10.0", "buildid": "2"},
                "success": index != 0,
            }]),
        );
        Ok(result)
    });
    let fixture = Fixture::new(
        &["tests/update/testDirectUpdate", "tests/update/testFallbackUpdate"],
        harness,
    );
    let binary = fixture.build(None);
    let mut options = fixture.options(binary);
    options.variant = RunVariant::Update(UpdateOptions {
        channel: Some("nightly".into()),
        fallback: true,
        ..UpdateOptions::default()
    });

    let mut driver = RunDriver::new(config(), options, fixture.collaborators())
        .with_platform(Platform::Linux);
    let outcome = driver.run().await;

    assert_eq!(RunStatus::classify(&outcome), RunStatus::TestsFailed);
    let summary = outcome.unwrap();
    assert_eq!(summary.update_phases.len(), 2);
    assert!(!summary.update_phases[0].fallback);
    assert!(!summary.update_phases[0].success);
    assert!(summary.update_phases[1].fallback);
    assert!(summary.update_phases[1].success);

    let invocations = fixture.harness.recorded();
    assert_eq!(invocations[0].persisted["update"]["fallback"], json!(false));
    assert_eq!(invocations[1].persisted["update"]["fallback"], json!(true));
    assert_eq!(invocations[1].persisted["channel"], json!("nightly"));
    assert_eq!(invocations[0].bridge_timeout.map(|d| d.as_secs()), Some(365));

    // The build folder was restored from the backup in between.
    assert!(fixture.root.path().join("firefox/application.ini").is_file());
}

#[tokio::test]
async fn endurance_settings_are_persisted_in_milliseconds() {
    let fixture = Fixture::new(&["tests/endurance/testMemory"], FakeHarness::passing(1));
    let binary = fixture.build(None);
    let mut options = fixture.options(binary);
    options.variant = RunVariant::Endurance(EnduranceOptions {
        delay: 0.5,
        iterations: 3,
        ..EnduranceOptions::default()
    });

    let mut driver = RunDriver::new(config(), options, fixture.collaborators())
        .with_platform(Platform::Linux);
    driver.run().await.unwrap();

    let invocation = &fixture.harness.recorded()[0];
    assert_eq!(invocation.persisted["endurance"]["delay"], json!(500));
    assert_eq!(invocation.persisted["endurance"]["iterations"], json!(3));
    assert!(invocation.restart);
}

#[tokio::test]
async fn branch_without_tests_is_unsupported() {
    let fixture = Fixture::new(&["tests/functional"], FakeHarness::passing(1));
    let binary = fixture.build(None);
    let mut options = fixture.options(binary);
    options.variant = RunVariant::L10n;

    let mut driver = RunDriver::new(config(), options, fixture.collaborators())
        .with_platform(Platform::Linux);
    let outcome = driver.run().await;

    assert_eq!(RunStatus::classify(&outcome), RunStatus::Unsupported);
    assert_eq!(RunStatus::classify(&outcome).exit_code(), 4);
    assert!(fixture.harness.recorded().is_empty());
    assert!(driver.transitions().contains(&RunState::CleaningUp));
}

#[tokio::test]
async fn missing_binary_is_a_usage_error() {
    let fixture = Fixture::new(&["tests/functional"], FakeHarness::passing(1));
    let mut options = fixture.options(fixture.build(None));
    options.binaries.clear();

    let mut driver = RunDriver::new(config(), options, fixture.collaborators());
    let err = driver.run().await.unwrap_err();

    assert!(matches!(RunError::find(&err), Some(RunError::Usage(_))));
    assert!(fixture.harness.recorded().is_empty());
}

#[tokio::test]
async fn runner_crash_in_every_phase_aborts() {
    let harness = FakeHarness::new(|_, _| anyhow::bail!("runner crashed"));
    let fixture = Fixture::new(
        &["tests/functional", "tests/functional/restartTests"],
        harness,
    );
    let binary = fixture.build(None);
    let mut driver = RunDriver::new(config(), fixture.options(binary), fixture.collaborators())
        .with_platform(Platform::Linux);

    let outcome = driver.run().await;

    assert_eq!(RunStatus::classify(&outcome), RunStatus::Aborted);
    // The second phase is still attempted.
    assert_eq!(fixture.harness.recorded().len(), 2);
}

#[tokio::test]
async fn locked_build_after_direct_update_aborts_the_run() {
    // The direct update leaves something behind that cannot be removed as a
    // folder, so restoring the backup never gets past the deadline.
    let harness = FakeHarness::new(|_, invocation| {
        let folder = invocation.runner.binary.parent().unwrap();
        fs::remove_dir_all(folder)?;
        fs::write(folder, "locked")?;
        Ok(report(1, 0, invocation))
    });
    let fixture = Fixture::new(&["tests/update/testDirectUpdate"], harness);
    let binary = fixture.build(None);
    let mut options = fixture.options(binary);
    options.variant = RunVariant::Update(UpdateOptions {
        fallback: true,
        ..UpdateOptions::default()
    });

    let mut driver = RunDriver::new(config(), options, fixture.collaborators())
        .with_platform(Platform::Linux)
        .with_restore_deadline(Duration::from_millis(50));
    let outcome = driver.run().await;

    assert_eq!(RunStatus::classify(&outcome), RunStatus::Aborted);
    assert!(format!("{:#}", outcome.unwrap_err()).contains("Cannot remove folder"));
    // The fallback phase never ran.
    assert_eq!(fixture.harness.recorded().len(), 1);
    assert_eq!(driver.state(), RunState::Terminal(RunStatus::Aborted));
}
