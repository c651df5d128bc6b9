//! # INI Reader Module / INI 读取模块
//!
//! Minimal reader for the INI dialect used by `application.ini`,
//! `addon.ini`, `manifest.ini` and `update-settings.ini`. Section order and
//! entry order are preserved; keys are case-sensitive.
//!
//! 用于 `application.ini`、`addon.ini`、`manifest.ini` 和 `update-settings.ini`
//! 的最小 INI 读取器。保留节顺序和条目顺序；键区分大小写。

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// One `[section]` with its entries in file order.
/// 一个 `[section]` 及其按文件顺序排列的条目。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniSection {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

impl IniSection {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniFile {
    pub sections: Vec<IniSection>,
}

impl IniFile {
    pub fn parse(content: &str) -> Self {
        let mut sections: Vec<IniSection> = Vec::new();
        for raw in content.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                sections.push(IniSection {
                    name: name.trim().to_string(),
                    entries: Vec::new(),
                });
                continue;
            }
            // Entries before the first section header are ignored.
            let Some(section) = sections.last_mut() else {
                continue;
            };
            let (key, value) = match line.find(['=', ':']) {
                Some(pos) => (line[..pos].trim(), line[pos + 1..].trim()),
                None => (line, ""),
            };
            section
                .entries
                .push((key.to_string(), value.to_string()));
        }
        IniFile { sections }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read INI file: {}", path.display()))?;
        Ok(Self::parse(&content))
    }

    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section).and_then(|s| s.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections_in_order() {
        let ini = IniFile::parse(
            "# comment\n[App]\nName=Firefox\nVersion = 10.0\n\n[Gecko]\nMaxVersion=10.*\n",
        );
        assert_eq!(ini.sections.len(), 2);
        assert_eq!(ini.get("App", "Name"), Some("Firefox"));
        assert_eq!(ini.get("App", "Version"), Some("10.0"));
        assert_eq!(ini.get("Gecko", "MaxVersion"), Some("10.*"));
        assert_eq!(ini.get("App", "Missing"), None);
    }

    #[test]
    fn keys_without_value_are_kept() {
        let ini = IniFile::parse("[test1.js]\n[test2.js]\ndisabled = bug 123\n");
        let second = ini.section("test2.js").unwrap();
        assert!(second.contains_key("disabled"));
        assert!(!ini.section("test1.js").unwrap().contains_key("disabled"));
    }
}
