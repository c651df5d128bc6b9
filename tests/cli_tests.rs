use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;

fn testrun() -> Command {
    let mut cmd = Command::cargo_bin("testrun").unwrap();
    cmd.arg("--lang").arg("en");
    cmd
}

/// Without a subcommand the tool prints its usage and exits with code 1.
///
/// 没有子命令时，工具打印用法并以退出码 1 退出。
#[test]
fn test_missing_subcommand_is_a_usage_error() {
    testrun().assert().code(1);
}

#[test]
fn test_help_lists_run_types() {
    testrun()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("functional"))
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("compat-addons"));
}

/// A run type without a binary is a usage error, not an aborted run.
///
/// 没有指定二进制文件的运行类型属于用法错误，而不是中止的运行。
#[test]
fn test_run_without_binary_exits_with_usage_code() {
    testrun()
        .arg("functional")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Exactly one binary has to be specified"));
}

#[test]
fn test_unknown_option_exits_with_usage_code() {
    testrun()
        .args(["functional", "--no-such-option", "firefox"])
        .assert()
        .code(1);
}

/// A binary that does not exist aborts the run with code 3.
///
/// 不存在的二进制文件会使运行以退出码 3 中止。
#[test]
fn test_missing_binary_aborts() {
    let dir = tempfile::tempdir().unwrap();
    testrun()
        .arg("functional")
        .arg(dir.path().join("no-such-build"))
        .arg("--workspace")
        .arg(dir.path())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Path cannot be found"));
}

#[test]
fn test_init_writes_default_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("Testrun.toml");

    testrun()
        .arg("init")
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written"));

    let content = fs::read_to_string(&output).unwrap();
    assert!(content.contains("release_branch = \"mozilla-release\""));
    assert!(content.contains("trusted_addon_host"));
}

#[test]
fn test_init_force_overwrites_without_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("Testrun.toml");
    fs::write(&output, "stale").unwrap();

    testrun()
        .args(["init", "--force", "--output"])
        .arg(&output)
        .assert()
        .success();

    assert!(!fs::read_to_string(&output).unwrap().contains("stale"));
}

#[test]
fn test_compat_requires_a_configuration_file() {
    testrun().arg("compat-addons").assert().code(1);
}
