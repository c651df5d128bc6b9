//! # Add-on Package Module / 附加组件包模块
//!
//! Reads the identity of an add-on from the `install.rdf` manifest packed
//! inside its XPI archive.
//!
//! 从 XPI 压缩包内的 `install.rdf` 清单中读取附加组件的标识信息。

use anyhow::{Context, Result};
use colored::*;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const MANIFEST: &str = "install.rdf";

// Blocks whose own `id`/`name`/`version` belong to something else.
static NESTED_BLOCKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)<([\w-]+:)?(targetApplication|requires|localized)\b.*?</([\w-]+:)?(targetApplication|requires|localized)\s*>",
    )
    .expect("nested block pattern is valid")
});

static PROLOG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<\?.*?\?>").expect("prolog pattern is valid"));

static ELEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<(?:[\w-]+:)?(id|name|version)\s*>\s*([^<]*?)\s*</(?:[\w-]+:)?(?:id|name|version)\s*>")
        .expect("element pattern is valid")
});

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b[\w-]+:(id|name|version)\s*=\s*"([^"]*)""#).expect("attribute pattern is valid")
});

/// Identity of an add-on as reported to the dashboard.
/// 上报给仪表板的附加组件标识。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddonDetails {
    pub id: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
}

impl AddonDetails {
    fn slot(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key {
            "id" => Some(&mut self.id),
            "name" => Some(&mut self.name),
            "version" => Some(&mut self.version),
            _ => None,
        }
    }

    fn fill(&mut self, key: &str, value: &str) {
        if let Some(slot) = self.slot(key) {
            if slot.is_none() {
                *slot = Some(unescape(value));
            }
        }
    }
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Extracts `id`, `name` and `version` of the install manifest itself.
/// Values of nested target applications, requirements and localizations
/// are ignored; both element and attribute notation are understood.
///
/// 提取安装清单自身的 `id`、`name` 和 `version`。
/// 嵌套的目标应用程序、依赖和本地化中的值会被忽略；元素和属性两种写法均可识别。
pub fn parse_install_rdf(rdf: &str) -> AddonDetails {
    let stripped = PROLOG.replace_all(rdf, "");
    let stripped = NESTED_BLOCKS.replace_all(&stripped, "");

    let mut details = AddonDetails::default();
    for caps in ELEMENT.captures_iter(&stripped) {
        details.fill(&caps[1], &caps[2]);
    }
    for caps in ATTRIBUTE.captures_iter(&stripped) {
        details.fill(&caps[1], &caps[2]);
    }
    details
}

/// Reads `install.rdf` from the XPI at `path`.
/// 从 `path` 处的 XPI 中读取 `install.rdf`。
pub fn read_install_rdf(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("{} is not an add-on package", path.display()))?;
    let mut entry = archive
        .by_name(MANIFEST)
        .with_context(|| format!("{} has no {}", path.display(), MANIFEST))?;
    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .with_context(|| format!("Failed to read {} from {}", MANIFEST, path.display()))?;
    Ok(content)
}

/// Details of the add-on at `path`. An unreadable package yields empty
/// details after a warning.
///
/// `path` 处附加组件的详细信息。无法读取的包会在警告后返回空信息。
pub fn addon_details(path: &Path) -> AddonDetails {
    match read_install_rdf(path) {
        Ok(rdf) => parse_install_rdf(&rdf),
        Err(e) => {
            eprintln!("{}", format!("{:#}", e).yellow());
            AddonDetails::default()
        }
    }
}
