//! # Manifest Resolution Module / 清单解析模块
//!
//! Turns a test folder of the checked out test suite into the ordered list of
//! entries handed to the runner. A folder with a `manifest.ini` lists its
//! tests as sections in file order; a section carrying a `disabled` key is
//! left out. A folder without a manifest is handed over as a single entry and
//! the runner discovers the tests itself.
//!
//! 将检出的测试套件中的测试目录转换为交给运行器的有序条目列表。
//! 带有 `manifest.ini` 的目录以节的形式按文件顺序列出测试；
//! 带有 `disabled` 键的节会被排除。没有清单的目录作为单个条目交出，
//! 由运行器自行发现测试。

use anyhow::Result;
use colored::*;
use std::path::{Path, PathBuf};

use crate::infra::ini::IniFile;
use crate::infra::t;

pub const MANIFEST_FILE: &str = "manifest.ini";

/// Resolves `folder` into manifest entries.
/// 将 `folder` 解析为清单条目。
pub fn resolve(folder: &Path) -> Result<Vec<PathBuf>> {
    let manifest = folder.join(MANIFEST_FILE);
    if !manifest.is_file() {
        return Ok(vec![folder.to_path_buf()]);
    }

    let ini = IniFile::read(&manifest)?;
    let mut entries = Vec::with_capacity(ini.sections.len());
    for section in &ini.sections {
        if let Some(reason) = section.get("disabled") {
            println!(
                "{}",
                t!("manifest.disabled", test = &section.name, reason = reason).yellow()
            );
            continue;
        }
        entries.push(folder.join(&section.name));
    }
    Ok(entries)
}
