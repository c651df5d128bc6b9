//! # Dashboard Report Module / 仪表板报告模块
//!
//! Builds the JSON document the results dashboard expects from the raw runner
//! report plus run metadata, and hands it to a [`ReportSink`].
//!
//! 根据原始运行器报告和运行元数据构建结果仪表板所期望的 JSON 文档，
//! 并将其交给 [`ReportSink`]。

use anyhow::Result;
use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::core::harness::HarnessReport;

/// Delivers a finished dashboard document.
/// 投递完成的仪表板文档。
pub trait ReportSink: Send + Sync {
    /// Sends `report` to `destination`; `index` counts the reports of this run
    /// and keeps file destinations apart. Returns where the report ended up.
    ///
    /// 将 `report` 发送到 `destination`；`index` 为本次运行的报告计数，
    /// 用于区分文件目标。返回报告最终所在的位置。
    fn deliver<'a>(
        &'a self,
        destination: &'a str,
        index: usize,
        report: &'a Value,
    ) -> BoxFuture<'a, Result<String>>;
}

/// Identity of the run a report belongs to.
/// 报告所属运行的标识。
#[derive(Debug, Clone, Default)]
pub struct ReportMeta {
    pub report_type: String,
    pub report_version: String,
    pub tests_repository: String,
    pub tests_changeset: String,
    pub tags: Vec<String>,
}

/// Data gathered outside the runner's report, mostly through events.
/// 在运行器报告之外收集的数据，主要通过事件获得。
#[derive(Debug, Clone, Default)]
pub struct ReportExtras {
    pub graphics: Option<Value>,
    pub installed_addons: Option<Value>,
    pub target_addon: Option<Value>,
    pub endurance: Option<Value>,
    pub updates: Option<Value>,
}

/// Builds the dashboard document for one invocation.
/// 为一次调用构建仪表板文档。
pub fn build_payload(report: &HarnessReport, meta: &ReportMeta, extras: &ReportExtras) -> Result<Value> {
    let mut doc = match serde_json::to_value(report)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    // The persisted bag is runner bookkeeping, not dashboard data.
    doc.remove("persisted");

    doc.insert("report_type".into(), Value::from(meta.report_type.clone()));
    doc.insert("report_version".into(), Value::from(meta.report_version.clone()));
    doc.insert("tests_repository".into(), Value::from(meta.tests_repository.clone()));
    doc.insert("tests_changeset".into(), Value::from(meta.tests_changeset.clone()));
    doc.insert("tags".into(), Value::from(meta.tags.clone()));

    if let Some(addons) = &extras.installed_addons {
        doc.insert("addons".into(), addons.clone());
    }
    if let Some(graphics) = &extras.graphics {
        let system_info = doc
            .entry("system_info")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(info) = system_info.as_object_mut() {
            info.insert("graphics".into(), graphics.clone());
        }
    }
    if let Some(target) = &extras.target_addon {
        doc.insert("target_addon".into(), target.clone());
    }
    if let Some(endurance) = &extras.endurance {
        doc.insert("endurance".into(), endurance.clone());
    }
    if let Some(updates) = &extras.updates {
        doc.insert("updates".into(), updates.clone());
    }
    Ok(Value::Object(doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_carries_metadata_and_events() {
        let report = HarnessReport {
            passed: 3,
            ..HarnessReport::default()
        };
        let meta = ReportMeta {
            report_type: "firefox-functional".into(),
            report_version: "1.0".into(),
            tests_repository: "http://hg.example.org/tests".into(),
            tests_changeset: "abc123".into(),
            tags: vec!["nightly".into()],
        };
        let extras = ReportExtras {
            graphics: Some(json!({"adapter": "Intel"})),
            ..ReportExtras::default()
        };

        let doc = build_payload(&report, &meta, &extras).unwrap();
        assert_eq!(doc["report_type"], "firefox-functional");
        assert_eq!(doc["tests_changeset"], "abc123");
        assert_eq!(doc["tags"], json!(["nightly"]));
        assert_eq!(doc["system_info"]["graphics"]["adapter"], "Intel");
        assert_eq!(doc["passed"], 3);
        assert!(doc.get("persisted").is_none());
        assert!(doc.get("addons").is_none());
    }
}
