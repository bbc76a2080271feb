use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ErrorKind;

/// 节点实时指标
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeMetrics {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    /// 字节
    pub memory_total: f64,
    pub disk_percent: f64,
    /// 字节
    pub disk_total: f64,
    pub uptime_seconds: f64,
}

impl NodeMetrics {
    /// 展开成注册表保存的指标表
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("cpu_percent".to_string(), self.cpu_percent),
            ("memory_percent".to_string(), self.memory_percent),
            ("memory_total".to_string(), self.memory_total),
            ("disk_percent".to_string(), self.disk_percent),
            ("disk_total".to_string(), self.disk_total),
            ("uptime_seconds".to_string(), self.uptime_seconds),
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformInfo {
    pub system: String,
    pub release: String,
    pub machine: String,
    pub hostname: String,
}

/// get-node-info 工具的响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub node_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub root_dir: String,
    #[serde(default)]
    pub allowed_commands: Vec<String>,
    /// 同步目标名 -> 节点上的绝对路径
    #[serde(default)]
    pub sync_targets: BTreeMap<String, String>,
    #[serde(default)]
    pub metrics: NodeMetrics,
    #[serde(default)]
    pub platform: PlatformInfo,
    pub timestamp: DateTime<Utc>,
}

/// 注册表为每个节点维护的健康快照
///
/// 只由注册表的状态刷新修改；对外总是交出克隆。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub node_id: String,
    pub display_name: String,
    pub tags: Vec<String>,
    /// 最近一次成功联系的时间
    pub last_seen: Option<DateTime<Utc>>,
    pub healthy: bool,
    pub metrics: BTreeMap<String, f64>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl NodeStatus {
    /// 新节点在第一次成功探测前视为不健康
    pub fn new(node_id: impl Into<String>, display_name: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            node_id: node_id.into(),
            display_name: display_name.into(),
            tags,
            last_seen: None,
            healthy: false,
            metrics: BTreeMap::new(),
            error: None,
            error_kind: None,
        }
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// 没有上报过CPU指标的节点按满载排序
    pub fn cpu_percent(&self) -> f64 {
        self.metric("cpu_percent").unwrap_or(100.0)
    }

    pub fn memory_percent(&self) -> f64 {
        self.metric("memory_percent").unwrap_or(100.0)
    }

    pub fn mark_healthy(&mut self, metrics: &NodeMetrics, seen_at: DateTime<Utc>) {
        self.healthy = true;
        self.metrics = metrics.to_map();
        self.last_seen = Some(seen_at);
        self.error = None;
        self.error_kind = None;
    }

    /// 探测失败：保留上一次的指标和联系时间
    pub fn mark_unhealthy(&mut self, error: impl Into<String>, kind: ErrorKind) {
        self.healthy = false;
        self.error = Some(error.into());
        self.error_kind = Some(kind);
    }

    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.iter().any(|tag| self.tags.contains(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(cpu: f64, mem: f64) -> NodeMetrics {
        NodeMetrics {
            cpu_percent: cpu,
            memory_percent: mem,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_status_is_unhealthy_and_fully_loaded() {
        let status = NodeStatus::new("n1", "n1", vec![]);
        assert!(!status.healthy);
        assert!(status.last_seen.is_none());
        assert_eq!(status.cpu_percent(), 100.0);
        assert_eq!(status.memory_percent(), 100.0);
    }

    #[test]
    fn test_unhealthy_keeps_previous_metrics() {
        let mut status = NodeStatus::new("n1", "n1", vec![]);
        let seen = Utc::now();
        status.mark_healthy(&metrics(12.5, 40.0), seen);
        assert!(status.healthy);
        assert_eq!(status.cpu_percent(), 12.5);

        status.mark_unhealthy("connection refused", ErrorKind::NodeUnreachable);
        assert!(!status.healthy);
        assert_eq!(status.cpu_percent(), 12.5);
        assert_eq!(status.last_seen, Some(seen));
        assert_eq!(status.error.as_deref(), Some("connection refused"));

        status.mark_healthy(&metrics(3.0, 10.0), Utc::now());
        assert!(status.error.is_none());
        assert!(status.error_kind.is_none());
    }

    #[test]
    fn test_has_any_tag() {
        let status = NodeStatus::new("n1", "n1", vec!["gpu".to_string(), "linux".to_string()]);
        assert!(status.has_any_tag(&["gpu".to_string()]));
        assert!(!status.has_any_tag(&["windows".to_string()]));
        assert!(!status.has_any_tag(&[]));
    }

    #[test]
    fn test_node_info_tolerates_missing_optional_fields() {
        let info: NodeInfo = serde_json::from_str(
            r#"{"node_id":"n1","root_dir":"/srv","timestamp":"2024-01-01T00:00:00Z","metrics":{"cpu_percent":5.0}}"#,
        )
        .unwrap();
        assert_eq!(info.metrics.cpu_percent, 5.0);
        assert_eq!(info.metrics.memory_percent, 0.0);
        assert!(info.sync_targets.is_empty());
    }
}
