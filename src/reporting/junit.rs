//! # JUnit Report Module / JUnit 报告模块
//!
//! Renders the report of one invocation as a JUnit XML `testsuite`. All text
//! is written as ASCII with character references so CI tools never trip over
//! the encoding of a failure message.
//!
//! 将一次调用的报告渲染为 JUnit XML `testsuite`。所有文本都以 ASCII 加字符引用的
//! 形式写出，使 CI 工具不会因失败消息的编码而出错。

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::core::harness::{HarnessReport, TestRecord};

const REPLACEMENT: &str = "&#65533;";

/// Escapes `text` for XML attribute and text content; every non-ASCII
/// character becomes a numeric character reference.
///
/// 为 XML 属性和文本内容转义 `text`；所有非 ASCII 字符都变为数字字符引用。
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\n' | '\r' | '\t' => out.push(c),
            // Not allowed in XML 1.0, not even as references.
            c if c.is_ascii_control() || c == '\u{FFFE}' || c == '\u{FFFF}' => {
                out.push_str(REPLACEMENT)
            }
            c if c.is_ascii() => out.push(c),
            c => {
                let _ = write!(out, "&#{};", c as u32);
            }
        }
    }
    out
}

/// Class name of a test: the file path below `root` with its extension
/// removed, literal dots turned into underscores and path separators into
/// dots. Paths outside `root` keep their full path.
///
/// 测试的类名：`root` 之下的文件路径，去掉扩展名，将字面点替换为下划线，
/// 再将路径分隔符替换为点。不在 `root` 下的路径保留完整路径。
pub fn class_name(filename: &str, root: &str) -> String {
    let filename = filename.replace('\\', "/");
    let relative = match filename.find(root) {
        Some(pos) => &filename[pos + root.len()..],
        None => filename.as_str(),
    };
    let relative = relative.trim_start_matches('/');

    let without_ext = match relative.rfind('.') {
        Some(dot) if dot > relative.rfind('/').map_or(0, |slash| slash + 1) => &relative[..dot],
        _ => relative,
    };
    without_ext.replace('.', "_").replace('/', ".")
}

/// Test name shown by JUnit: the part after the last `::`.
/// JUnit 显示的测试名称：最后一个 `::` 之后的部分。
pub fn test_name(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

fn failure_element(record: &TestRecord) -> String {
    let failures = record.failure_details();
    let (message, body) = match failures.as_slice() {
        [only] => (only.message.clone(), only.stack.clone()),
        [] => ("Unknown failure.".to_string(), "Stack unavailable.".to_string()),
        many => (
            format!("{} failures", many.len()),
            many.iter()
                .map(|f| format!("Message: {}\nStack: {}", f.message, f.stack))
                .collect::<Vec<_>>()
                .join("\n\n"),
        ),
    };
    format!(
        "<failure message=\"{}\">{}</failure>",
        escape(&message),
        escape(&body)
    )
}

/// Renders one invocation's report as a JUnit document.
/// 将一次调用的报告渲染为 JUnit 文档。
pub fn render(report: &HarnessReport, report_type: &str, root: &str) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>");
    let _ = write!(
        xml,
        "<testsuite errors=\"0\" failures=\"{}\" name=\"{}\" skips=\"{}\" tests=\"{}\" time=\"{}\">",
        report.failed,
        escape(report_type),
        report.skipped,
        report.results.len(),
        report.elapsed_secs()
    );

    for record in &report.results {
        let _ = write!(
            xml,
            "<testcase classname=\"{}\" name=\"{}\" time=\"{}\">",
            escape(&class_name(&record.filename, root)),
            escape(test_name(&record.name)),
            record.elapsed_secs()
        );
        if record.skipped {
            let reason = record.skipped_reason.as_deref().unwrap_or_default();
            let _ = write!(
                xml,
                "<skipped message=\"{}\">{}</skipped>",
                escape(reason),
                escape(reason)
            );
        } else if record.failed {
            xml.push_str(&failure_element(record));
        }
        xml.push_str("</testcase>");
    }

    xml.push_str("</testsuite>");
    xml
}

/// Writes the JUnit document for `report` to `path`.
/// 将 `report` 的 JUnit 文档写入 `path`。
pub fn write(path: &Path, report: &HarnessReport, report_type: &str, root: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, render(report, report_type, root))
        .with_context(|| format!("Failed to write the JUnit report to '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_to_ascii() {
        assert_eq!(escape("a<b & \"ü\""), "a&lt;b &amp; &quot;&#252;&quot;");
    }

    #[test]
    fn characters_illegal_in_xml_are_replaced() {
        assert_eq!(escape("a\u{1}b\u{1b}[0m\tc"), "a&#65533;b&#65533;[0m\tc");
        assert_eq!(escape("\u{FFFF}"), "&#65533;");
    }

    #[test]
    fn class_name_strips_root_and_extension() {
        assert_eq!(
            class_name(
                "/tmp/x.mozmill-tests/tests/functional/testAddons/test.Foo.js",
                "tests/functional"
            ),
            "testAddons.test_Foo"
        );
        assert_eq!(
            class_name(r"C:\tmp\tests\functional\a\b.js", "tests/functional"),
            "a.b"
        );
    }

    #[test]
    fn name_after_last_separator() {
        assert_eq!(test_name("testFoo.js::setupModule::testBar"), "testBar");
        assert_eq!(test_name("plain"), "plain");
    }
}
