//! 测试数据构建器

use std::collections::BTreeMap;

use chrono::Utc;
use fleet_core::{NodeInfo, NodeMetrics, PlatformInfo};

/// 构建测试用的 NodeInfo
pub struct NodeInfoBuilder {
    info: NodeInfo,
}

impl NodeInfoBuilder {
    pub fn new(node_id: &str) -> Self {
        Self {
            info: NodeInfo {
                node_id: node_id.to_string(),
                tags: vec![],
                description: None,
                root_dir: format!("/srv/{node_id}"),
                allowed_commands: vec![],
                sync_targets: BTreeMap::new(),
                metrics: NodeMetrics::default(),
                platform: PlatformInfo {
                    system: "Linux".to_string(),
                    release: "6.1".to_string(),
                    machine: "x86_64".to_string(),
                    hostname: node_id.to_string(),
                },
                timestamp: Utc::now(),
            },
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.info.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_load(mut self, cpu_percent: f64, memory_percent: f64) -> Self {
        self.info.metrics.cpu_percent = cpu_percent;
        self.info.metrics.memory_percent = memory_percent;
        self
    }

    pub fn with_allowed_commands(mut self, commands: &[&str]) -> Self {
        self.info.allowed_commands = commands.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn build(self) -> NodeInfo {
        self.info
    }
}
