//! # Command Line Module / 命令行模块
//!
//! Builds the `testrun` command line and turns parsed arguments into
//! [`RunOptions`]. Every run type is a subcommand sharing the common options;
//! `compat-addons` and `init` sit next to them.
//!
//! 构建 `testrun` 命令行并将解析后的参数转换为 [`RunOptions`]。
//! 每种运行类型都是一个共享通用选项的子命令；`compat-addons` 和 `init` 与它们并列。

pub mod commands;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, path::PathBuf};

use crate::core::application::Application;
use crate::core::config::{
    AddonsOptions, EnduranceOptions, HarnessConfig, RunOptions, RunVariant, UpdateOptions,
};
use crate::core::models::{RunError, RunStatus};
use crate::infra::t;

fn parse_delay(value: &str) -> std::result::Result<f64, String> {
    let delay: f64 = value.trim().parse().map_err(|e| format!("{}", e))?;
    EnduranceOptions::check_delay(delay)
}

/// Subcommands that start a test-run.
/// 启动测试运行的子命令。
pub const RUN_COMMANDS: [&str; 6] = ["functional", "addons", "endurance", "l10n", "remote", "update"];

/// Value following `flag` on the raw command line, in `--flag value` or
/// `--flag=value` form.
///
/// 原始命令行中 `flag` 之后的值，形式为 `--flag value` 或 `--flag=value`。
fn pre_parse(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{}=", flag);
    args.iter().enumerate().find_map(|(pos, arg)| {
        if arg == flag {
            args.get(pos + 1).cloned()
        } else {
            arg.strip_prefix(&prefix).map(str::to_string)
        }
    })
}

/// Pre-parses the language so messages and help text are localized before
/// the full command line is built: `--lang`, then the configuration file's
/// `language`, then the system locale.
///
/// 预先解析语言，以便在构建完整命令行之前本地化消息和帮助文本：
/// 依次为 `--lang`、配置文件中的 `language`、系统区域设置。
fn pre_parse_language(args: &[String]) -> String {
    if let Some(lang) = pre_parse(args, "--lang") {
        return lang;
    }
    let config = pre_parse(args, "--config").map(PathBuf::from);
    if let Ok(HarnessConfig {
        language: Some(lang),
        ..
    }) = HarnessConfig::load(config.as_deref())
    {
        return lang;
    }
    sys_locale::get_locale().unwrap_or_else(|| "en".to_string())
}

fn common_args(cmd: Command, locale: &str) -> Command {
    cmd.arg(
        Arg::new("binary")
            .help(t!("cli.arg_binary", locale = locale).to_string())
            .value_name("BINARY")
            .value_parser(clap::value_parser!(PathBuf))
            .num_args(0..)
            .action(ArgAction::Append),
    )
    .arg(
        Arg::new("addons")
            .short('a')
            .long("addons")
            .help(t!("cli.arg_addons", locale = locale).to_string())
            .value_name("ADDONS")
            .action(ArgAction::Append),
    )
    .arg(
        Arg::new("application")
            .long("application")
            .help(t!("cli.arg_application", locale = locale).to_string())
            .value_name("APP")
            .value_parser(["firefox", "thunderbird", "metrofirefox"])
            .default_value("firefox")
            .action(ArgAction::Set),
    )
    .arg(
        Arg::new("junit")
            .long("junit")
            .help(t!("cli.arg_junit", locale = locale).to_string())
            .value_name("PATH")
            .value_parser(clap::value_parser!(PathBuf))
            .action(ArgAction::Set),
    )
    .arg(
        Arg::new("report")
            .short('r')
            .long("report")
            .help(t!("cli.arg_report", locale = locale).to_string())
            .value_name("URL")
            .action(ArgAction::Set),
    )
    .arg(
        Arg::new("repository")
            .long("repository")
            .help(t!("cli.arg_repository", locale = locale).to_string())
            .value_name("URL")
            .action(ArgAction::Set),
    )
    .arg(
        Arg::new("restart")
            .long("restart")
            .help(t!("cli.arg_restart", locale = locale).to_string())
            .action(ArgAction::SetTrue),
    )
    .arg(
        Arg::new("tag")
            .long("tag")
            .help(t!("cli.arg_tag", locale = locale).to_string())
            .value_name("TAG")
            .action(ArgAction::Append),
    )
    .arg(
        Arg::new("workspace")
            .long("workspace")
            .help(t!("cli.arg_workspace", locale = locale).to_string())
            .value_name("PATH")
            .value_parser(clap::value_parser!(PathBuf))
            .action(ArgAction::Set),
    )
    .arg(
        Arg::new("logfile")
            .short('l')
            .long("logfile")
            .help(t!("cli.arg_logfile", locale = locale).to_string())
            .value_name("PATH")
            .value_parser(clap::value_parser!(PathBuf))
            .action(ArgAction::Set),
    )
    .arg(
        Arg::new("port")
            .short('P')
            .long("port")
            .help(t!("cli.arg_port", locale = locale).to_string())
            .value_name("PORT")
            .value_parser(clap::value_parser!(u16))
            .action(ArgAction::Set),
    )
    .arg(
        Arg::new("screenshot-path")
            .long("screenshot-path")
            .help(t!("cli.arg_screenshot_path", locale = locale).to_string())
            .value_name("PATH")
            .value_parser(clap::value_parser!(PathBuf))
            .action(ArgAction::Set),
    )
}

fn run_command(name: &'static str, locale: &str) -> Command {
    let about = match name {
        "functional" => t!("cli.cmd_functional_about", locale = locale),
        "addons" => t!("cli.cmd_addons_about", locale = locale),
        "endurance" => t!("cli.cmd_endurance_about", locale = locale),
        "l10n" => t!("cli.cmd_l10n_about", locale = locale),
        "remote" => t!("cli.cmd_remote_about", locale = locale),
        _ => t!("cli.cmd_update_about", locale = locale),
    }
    .to_string();
    common_args(Command::new(name).about(about), locale)
}

pub fn build_cli(locale: &str) -> Command {
    Command::new("testrun")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli.about", locale = locale).to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli.arg_lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help(t!("cli.arg_config", locale = locale).to_string())
                .value_name("CONFIG")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true)
                .action(ArgAction::Set),
        )
        .subcommand(run_command("functional", locale))
        .subcommand(
            run_command("addons", locale)
                .arg(
                    Arg::new("target-addons")
                        .long("target-addons")
                        .help(t!("cli.arg_target_addons", locale = locale).to_string())
                        .value_name("ID")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("with-untrusted")
                        .long("with-untrusted")
                        .help(t!("cli.arg_with_untrusted", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            run_command("endurance", locale)
                .arg(
                    Arg::new("delay")
                        .long("delay")
                        .help(t!("cli.arg_delay", locale = locale).to_string())
                        .value_name("DELAY")
                        .value_parser(parse_delay)
                        .default_value("5")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("entities")
                        .long("entities")
                        .help(t!("cli.arg_entities", locale = locale).to_string())
                        .value_name("ENTITIES")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("1")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("iterations")
                        .long("iterations")
                        .help(t!("cli.arg_iterations", locale = locale).to_string())
                        .value_name("ITERATIONS")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("1")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("no-restart")
                        .long("no-restart")
                        .help(t!("cli.arg_no_restart", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("reserved")
                        .long("reserved")
                        .help(t!("cli.arg_reserved", locale = locale).to_string())
                        .value_name("RESERVED")
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(run_command("l10n", locale))
        .subcommand(run_command("remote", locale))
        .subcommand(
            run_command("update", locale)
                .arg(
                    Arg::new("channel")
                        .long("channel")
                        .help(t!("cli.arg_channel", locale = locale).to_string())
                        .value_name("CHANNEL")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("no-fallback")
                        .long("no-fallback")
                        .help(t!("cli.arg_no_fallback", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("target-buildid")
                        .long("target-buildid")
                        .help(t!("cli.arg_target_buildid", locale = locale).to_string())
                        .value_name("TARGET_ID")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("allow-mar-channel")
                        .long("allow-mar-channel")
                        .help(t!("cli.arg_allow_mar_channel", locale = locale).to_string())
                        .value_name("CHANNEL")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("override-update-url")
                        .long("override-update-url")
                        .help(t!("cli.arg_override_update_url", locale = locale).to_string())
                        .value_name("URL")
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("compat-addons")
                .about(t!("cli.cmd_compat_about", locale = locale).to_string())
                .arg(
                    Arg::new("config-file")
                        .help(t!("cli.arg_compat_config", locale = locale).to_string())
                        .value_name("CONFIG_FILE")
                        .value_parser(clap::value_parser!(PathBuf))
                        .num_args(0..)
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("repository")
                        .long("repository")
                        .help(t!("cli.arg_repository", locale = locale).to_string())
                        .value_name("URL")
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cli.cmd_init_about", locale = locale).to_string())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help(t!("cli.arg_output", locale = locale).to_string())
                        .value_name("PATH")
                        .value_parser(clap::value_parser!(PathBuf))
                        .default_value(crate::core::config::DEFAULT_CONFIG_FILE)
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("force")
                        .long("force")
                        .help(t!("cli.arg_force", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

/// Converts the matches of a run subcommand into [`RunOptions`].
/// 将运行子命令的匹配结果转换为 [`RunOptions`]。
pub fn options_from_matches(name: &str, matches: &ArgMatches) -> Result<RunOptions> {
    let variant = match name {
        "functional" => RunVariant::Functional,
        "l10n" => RunVariant::L10n,
        "remote" => RunVariant::Remote,
        "addons" => RunVariant::Addons(AddonsOptions {
            target_addons: strings(matches, "target-addons"),
            with_untrusted: matches.get_flag("with-untrusted"),
        }),
        "endurance" => RunVariant::Endurance(EnduranceOptions {
            delay: matches.get_one::<f64>("delay").copied().unwrap_or(5.0),
            entities: matches.get_one::<u32>("entities").copied().unwrap_or(1),
            iterations: matches.get_one::<u32>("iterations").copied().unwrap_or(1),
            restart: !matches.get_flag("no-restart"),
            reserved: matches.get_one::<String>("reserved").cloned(),
        }),
        "update" => RunVariant::Update(UpdateOptions {
            channel: matches.get_one::<String>("channel").cloned(),
            fallback: !matches.get_flag("no-fallback"),
            target_build_id: matches.get_one::<String>("target-buildid").cloned(),
            allow_mar_channels: strings(matches, "allow-mar-channel"),
            override_update_url: matches.get_one::<String>("override-update-url").cloned(),
        }),
        other => return Err(RunError::Usage(format!("Unknown test-run type '{}'", other)).into()),
    };

    let application = matches
        .get_one::<String>("application")
        .map(|name| name.parse::<Application>())
        .transpose()?
        .unwrap_or_default();

    Ok(RunOptions {
        binaries: matches
            .get_many::<PathBuf>("binary")
            .map(|values| values.cloned().collect())
            .unwrap_or_default(),
        application,
        addons: strings(matches, "addons"),
        junit: matches.get_one::<PathBuf>("junit").cloned(),
        report: matches.get_one::<String>("report").cloned(),
        repository: matches.get_one::<String>("repository").cloned(),
        restart: matches.get_flag("restart"),
        tags: strings(matches, "tag"),
        workspace: matches.get_one::<PathBuf>("workspace").cloned(),
        logfile: matches.get_one::<PathBuf>("logfile").cloned(),
        screenshot_path: matches.get_one::<PathBuf>("screenshot-path").cloned(),
        port: matches.get_one::<u16>("port").copied(),
        variant,
    })
}

/// Parses the arguments of one run subcommand, as if given on the command line.
/// 解析一个运行子命令的参数，如同它们是在命令行上给出的一样。
pub fn parse_run_options(name: &str, args: Vec<String>) -> Result<RunOptions> {
    let locale = rust_i18n::locale().to_string();
    let argv = ["testrun".to_string(), name.to_string()]
        .into_iter()
        .chain(args);
    let matches = build_cli(&locale)
        .try_get_matches_from(argv)
        .map_err(|e| RunError::Usage(e.to_string()))?;
    match matches.subcommand() {
        Some((sub, sub_matches)) => options_from_matches(sub, sub_matches),
        None => Err(RunError::Usage(format!("Unknown test-run type '{}'", name)).into()),
    }
}

/// Parses the process arguments and executes the selected command.
/// 解析进程参数并执行所选命令。
pub async fn run() -> Result<RunStatus> {
    let args: Vec<String> = env::args().collect();
    let language = pre_parse_language(&args);
    crate::set_language(&language);
    let locale = rust_i18n::locale().to_string();

    let matches = match build_cli(&locale).try_get_matches_from(&args) {
        Ok(matches) => matches,
        Err(e) => {
            use clap::error::ErrorKind;
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Ok(RunStatus::Success),
                _ => Err(RunError::Usage(t!("cli.invalid_arguments").to_string()).into()),
            };
        }
    };
    let config_path = matches.get_one::<PathBuf>("config").cloned();

    match matches.subcommand() {
        Some(("init", init_matches)) => {
            let output = init_matches
                .get_one::<PathBuf>("output")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(crate::core::config::DEFAULT_CONFIG_FILE));
            commands::init::execute(output, init_matches.get_flag("force"))?;
            Ok(RunStatus::Success)
        }
        Some(("compat-addons", compat_matches)) => {
            let files: Vec<PathBuf> = compat_matches
                .get_many::<PathBuf>("config-file")
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
            let [file] = files.as_slice() else {
                return Err(RunError::Usage(t!("compat.config_required").to_string()).into());
            };
            let config = HarnessConfig::load(config_path.as_deref())?;
            let repository = compat_matches.get_one::<String>("repository").cloned();
            commands::compat::execute(config, file, repository).await
        }
        Some((name, run_matches)) if RUN_COMMANDS.contains(&name) => {
            let config = HarnessConfig::load(config_path.as_deref())?;
            let options = options_from_matches(name, run_matches)?;
            commands::run::execute(config, options).await
        }
        _ => Err(RunError::Usage(t!("cli.invalid_arguments").to_string()).into()),
    }
}
