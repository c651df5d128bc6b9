//! # Infrastructure Module / 基础设施模块
//!
//! Concrete implementations of the collaborators the run driver talks to
//! (version control, installers, transfers, the external runner) plus the
//! command, file system and INI helpers they share.
//!
//! 运行驱动器所使用的协作者的具体实现（版本控制、安装程序、传输、外部运行器），
//! 以及它们共享的命令、文件系统和 INI 辅助工具。

pub mod command;
pub mod download;
pub mod fs;
pub mod ini;
pub mod installer;
pub mod runner;
pub mod vcs;
pub mod xpi;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
