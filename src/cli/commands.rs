//! # Commands Module / 命令模块
//!
//! One module per subcommand family.
//! 每个子命令族对应一个模块。

pub mod compat;
pub mod init;
pub mod run;
