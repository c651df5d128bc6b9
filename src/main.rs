use colored::*;
use std::process::ExitCode;
use testrun_automation::{cli, models::RunError, models::RunStatus};

/// Exit code for a wrong invocation of the tool.
const USAGE_EXIT_CODE: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    match cli::run().await {
        Ok(status) => ExitCode::from(status.exit_code()),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            match RunError::find(&e) {
                Some(RunError::Usage(_)) => ExitCode::from(USAGE_EXIT_CODE),
                _ => ExitCode::from(RunStatus::from_error(&e).exit_code()),
            }
        }
    }
}
