//! # Config Module Unit Tests / Config 模块单元测试
//!
//! Tests for loading the harness configuration and for turning command-line
//! arguments into run options.
//!
//! 测试工具配置的加载以及将命令行参数转换为运行选项。

use std::path::PathBuf;
use testrun_automation::cli::parse_run_options;
use testrun_automation::core::application::{Application, Platform};
use testrun_automation::core::config::{HarnessConfig, RunVariant, FIREFOX_REPOSITORY};
use testrun_automation::core::models::RunError;

#[cfg(test)]
mod harness_config_tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.release_branch, "mozilla-release");
        assert_eq!(config.trusted_addon_host, "addons.mozilla.org");
        assert_eq!(config.repository_for(Application::Firefox), Some(FIREFOX_REPOSITORY));
        assert_eq!(config.installer_extensions(Platform::Mac), vec![".dmg"]);
        assert_eq!(config.runner_command().unwrap(), vec!["mozmill"]);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = HarnessConfig::from_toml(
            r#"
language = "zh-CN"
release_branch = "mozilla-esr10"

[runner]
command = "python -m mozmill --verbose"
bridge_timeout_secs = 120
"#,
        )
        .unwrap();

        assert_eq!(config.language.as_deref(), Some("zh-CN"));
        assert_eq!(config.release_branch, "mozilla-esr10");
        assert_eq!(
            config.runner_command().unwrap(),
            vec!["python", "-m", "mozmill", "--verbose"]
        );
        assert_eq!(config.runner.bridge_timeout_secs, Some(120));
        assert_eq!(config.trusted_addon_host, "addons.mozilla.org");
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        assert!(HarnessConfig::from_toml("[runner\ncommand = 1").is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(HarnessConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_empty_runner_command_is_rejected() {
        let config = HarnessConfig::from_toml("[runner]\ncommand = \"\"").unwrap();
        assert!(config.runner_command().is_err());
    }
}

#[cfg(test)]
mod run_options_tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_common_options() {
        let options = parse_run_options(
            "functional",
            args(&[
                "/builds/firefox",
                "--addons=/tmp/a.xpi",
                "--addons",
                "http://example.org/b.xpi",
                "--junit",
                "out.xml",
                "--tag=nightly",
                "--restart",
                "--port",
                "24242",
            ]),
        )
        .unwrap();

        assert_eq!(options.binaries, vec![PathBuf::from("/builds/firefox")]);
        assert_eq!(options.addons.len(), 2);
        assert_eq!(options.junit, Some(PathBuf::from("out.xml")));
        assert_eq!(options.tags, vec!["nightly"]);
        assert!(options.restart);
        assert_eq!(options.port, Some(24242));
        assert_eq!(options.application, Application::Firefox);
        assert!(matches!(options.variant, RunVariant::Functional));
    }

    #[test]
    fn test_update_options() {
        let options = parse_run_options(
            "update",
            args(&[
                "firefox",
                "--no-fallback",
                "--channel=beta",
                "--allow-mar-channel",
                "firefox-mozilla-beta",
                "--target-buildid=20120101",
            ]),
        )
        .unwrap();

        let RunVariant::Update(update) = options.variant else {
            panic!("expected an update run");
        };
        assert!(!update.fallback);
        assert_eq!(update.channel.as_deref(), Some("beta"));
        assert_eq!(update.allow_mar_channels, vec!["firefox-mozilla-beta"]);
        assert_eq!(update.target_build_id.as_deref(), Some("20120101"));
    }

    #[test]
    fn test_endurance_defaults() {
        let options = parse_run_options("endurance", args(&["firefox"])).unwrap();
        let RunVariant::Endurance(endurance) = options.variant else {
            panic!("expected an endurance run");
        };
        assert_eq!(endurance.delay, 5.0);
        assert_eq!(endurance.iterations, 1);
        assert!(endurance.restart);
    }

    #[test]
    fn test_out_of_range_delay_is_a_usage_error() {
        for delay in ["inf", "NaN", "1e20", "-1"] {
            let flag = format!("--delay={}", delay);
            let err = parse_run_options("endurance", args(&["firefox", &flag])).unwrap_err();
            assert!(
                matches!(RunError::find(&err), Some(RunError::Usage(_))),
                "delay {} was accepted",
                delay
            );
        }

        let options = parse_run_options("endurance", args(&["firefox", "--delay=0.5"])).unwrap();
        let RunVariant::Endurance(endurance) = options.variant else {
            panic!("expected an endurance run");
        };
        assert_eq!(endurance.delay, 0.5);
    }

    #[test]
    fn test_unknown_option_is_a_usage_error() {
        let err = parse_run_options("functional", args(&["--bogus"])).unwrap_err();
        assert!(matches!(RunError::find(&err), Some(RunError::Usage(_))));
    }
}
