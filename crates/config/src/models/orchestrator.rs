use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};
use crate::{ConfigError, ConfigResult};

/// 节点传输方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    #[serde(alias = "http")]
    Network,
    Local,
}

/// 静态节点定义，启动后不再变化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub node_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub transport: TransportKind,
    /// `network` 传输的节点服务器地址
    #[serde(default)]
    pub base_url: Option<String>,
    /// `local` 传输的根目录
    #[serde(default)]
    pub root_dir: Option<PathBuf>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// 越小越优先
    #[serde(default = "default_priority")]
    pub priority: i32,
    /// 保留字段，当前选择策略不使用
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub allowed_commands: Option<Vec<String>>,
    #[serde(default)]
    pub sync_targets: BTreeMap<String, PathBuf>,
    /// 仅 `local` 传输使用
    #[serde(default)]
    pub max_read_bytes: Option<u64>,
}

impl NodeDefinition {
    pub fn network(node_id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::bare(node_id.into(), TransportKind::Network)
        }
    }

    pub fn local(node_id: impl Into<String>, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: Some(root_dir.into()),
            ..Self::bare(node_id.into(), TransportKind::Local)
        }
    }

    fn bare(node_id: String, transport: TransportKind) -> Self {
        Self {
            node_id,
            display_name: None,
            transport,
            base_url: None,
            root_dir: None,
            tags: Vec::new(),
            description: None,
            priority: default_priority(),
            weight: default_weight(),
            auth_token: None,
            allowed_commands: None,
            sync_targets: BTreeMap::new(),
            max_read_bytes: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_allowed_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_commands = Some(commands.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_sync_target(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.sync_targets.insert(name.into(), path.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.node_id)
    }

    /// 空的或未配置的允许列表不做集中限制
    pub fn allows_command(&self, program: &str) -> bool {
        match &self.allowed_commands {
            Some(list) if !list.is_empty() => list.iter().any(|c| c == program),
            _ => true,
        }
    }

    pub fn has_restrictions(&self) -> bool {
        self.allowed_commands.as_ref().is_some_and(|list| !list.is_empty())
    }
}

impl ConfigValidator for NodeDefinition {
    fn validate(&self) -> ConfigResult<()> {
        ValidationUtils::validate_not_empty(&self.node_id, "node_id")?;
        match self.transport {
            TransportKind::Network => {
                let url = self.base_url.as_deref().ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "节点 {} 使用网络传输时必须配置 base_url",
                        self.node_id
                    ))
                })?;
                ValidationUtils::validate_url(url, "base_url")?;
            }
            TransportKind::Local => {
                let root = self.root_dir.as_ref().ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "节点 {} 使用本地传输时必须配置 root_dir",
                        self.node_id
                    ))
                })?;
                if root.as_os_str().is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "节点 {} 的 root_dir 不能为空",
                        self.node_id
                    )));
                }
            }
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(ConfigError::Validation(format!(
                "节点 {} 的 weight 必须是非负数",
                self.node_id
            )));
        }
        if let Some(commands) = &self.allowed_commands {
            for command in commands {
                ValidationUtils::validate_not_empty(command, "allowed_commands")?;
            }
        }
        if self.max_read_bytes == Some(0) {
            return Err(ConfigError::Validation("max_read_bytes 必须大于0".to_string()));
        }
        for name in self.sync_targets.keys() {
            ValidationUtils::validate_not_empty(name, "sync_targets")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_audit_path")]
    pub path: PathBuf,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: default_audit_path(),
            max_entries: default_max_entries(),
        }
    }
}

impl ConfigValidator for AuditConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation("audit.path 不能为空".to_string()));
        }
        ValidationUtils::validate_count(self.max_entries, 1_000, 10_000_000, "audit.max_entries")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarratorKind {
    /// 本地确定性文字
    #[default]
    Heuristic,
    /// 远端补全服务
    Http,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarratorConfig {
    #[serde(default)]
    pub kind: NarratorKind,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_narrator_timeout")]
    pub timeout_seconds: f64,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            kind: NarratorKind::default(),
            endpoint: None,
            model: None,
            timeout_seconds: default_narrator_timeout(),
        }
    }
}

impl ConfigValidator for NarratorConfig {
    fn validate(&self) -> ConfigResult<()> {
        ValidationUtils::validate_seconds(self.timeout_seconds, 600.0, "narrator.timeout_seconds")?;
        if self.kind == NarratorKind::Http {
            let endpoint = self.endpoint.as_deref().ok_or_else(|| {
                ConfigError::Validation("narrator.kind = http 时必须配置 endpoint".to_string())
            })?;
            ValidationUtils::validate_url(endpoint, "narrator.endpoint")?;
        }
        Ok(())
    }
}

/// 编排器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_orchestrator_id")]
    pub orchestrator_id: String,
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub narrator: NarratorConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    /// 后台健康刷新间隔
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: f64,
    /// 单次状态探测的超时
    #[serde(default = "default_status_timeout")]
    pub status_timeout_seconds: f64,
    /// 文件类工具调用的超时
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: f64,
    #[serde(default = "default_max_parallelism")]
    pub max_parallelism: usize,
}

impl OrchestratorConfig {
    /// 加载TOML配置文件，`FLEET__` 前缀的环境变量覆盖文件值
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::File(format!(
                "配置文件不存在: {}",
                path.display()
            )));
        }

        let config: OrchestratorConfig = ConfigBuilder::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Toml))
            .add_source(
                Environment::with_prefix("FLEET")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        tracing::debug!(
            "已加载编排器配置 {}，共 {} 个节点",
            config.orchestrator_id,
            config.nodes.len()
        );
        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> ConfigResult<Self> {
        let config: OrchestratorConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn new(nodes: Vec<NodeDefinition>) -> Self {
        Self {
            orchestrator_id: default_orchestrator_id(),
            nodes,
            narrator: NarratorConfig::default(),
            audit: AuditConfig::default(),
            refresh_interval_seconds: default_refresh_interval(),
            status_timeout_seconds: default_status_timeout(),
            request_timeout_seconds: default_request_timeout(),
            max_parallelism: default_max_parallelism(),
        }
    }

    pub fn node(&self, node_id: &str) -> Option<&NodeDefinition> {
        self.nodes.iter().find(|n| n.node_id == node_id)
    }
}

impl ConfigValidator for OrchestratorConfig {
    fn validate(&self) -> ConfigResult<()> {
        ValidationUtils::validate_not_empty(&self.orchestrator_id, "orchestrator_id")?;
        if self.nodes.is_empty() {
            return Err(ConfigError::Validation("至少需要配置一个节点".to_string()));
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            node.validate()?;
            if !seen.insert(node.node_id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "节点ID重复: {}",
                    node.node_id
                )));
            }
        }

        self.narrator.validate()?;
        self.audit.validate()?;
        if self.refresh_interval_seconds <= 1.0 {
            return Err(ConfigError::Validation(
                "refresh_interval_seconds 必须大于1秒".to_string(),
            ));
        }
        ValidationUtils::validate_seconds(self.refresh_interval_seconds, 3600.0, "refresh_interval_seconds")?;
        ValidationUtils::validate_seconds(self.status_timeout_seconds, 600.0, "status_timeout_seconds")?;
        ValidationUtils::validate_seconds(self.request_timeout_seconds, 600.0, "request_timeout_seconds")?;
        ValidationUtils::validate_count(self.max_parallelism, 1, 1024, "max_parallelism")?;
        Ok(())
    }
}

fn default_orchestrator_id() -> String {
    "fleet-orchestrator".to_string()
}

fn default_priority() -> i32 {
    100
}

fn default_weight() -> f64 {
    1.0
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("logs/audit.log")
}

fn default_max_entries() -> usize {
    50_000
}

fn default_narrator_timeout() -> f64 {
    90.0
}

fn default_refresh_interval() -> f64 {
    10.0
}

fn default_status_timeout() -> f64 {
    5.0
}

fn default_request_timeout() -> f64 {
    30.0
}

fn default_max_parallelism() -> usize {
    8
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
orchestrator_id = "lab"

[[nodes]]
node_id = "alpha"
transport = "http"
base_url = "http://10.0.0.2:8765"
tags = ["linux", "gpu"]
priority = 10

[[nodes]]
node_id = "beta"
transport = "local"
root_dir = "/srv/beta"
allowed_commands = ["ls", "echo"]

[nodes.sync_targets]
backup = "/srv/backup"
"#;

    #[test]
    fn test_from_toml() {
        let config = OrchestratorConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.orchestrator_id, "lab");
        assert_eq!(config.nodes.len(), 2);

        let alpha = config.node("alpha").unwrap();
        assert_eq!(alpha.transport, TransportKind::Network);
        assert_eq!(alpha.priority, 10);
        assert_eq!(alpha.weight, 1.0);
        assert!(alpha.allows_command("rm"));

        let beta = config.node("beta").unwrap();
        assert_eq!(beta.transport, TransportKind::Local);
        assert_eq!(beta.priority, 100);
        assert!(beta.allows_command("ls"));
        assert!(!beta.allows_command("rm"));
        assert_eq!(beta.sync_targets.get("backup"), Some(&PathBuf::from("/srv/backup")));

        assert_eq!(config.audit.max_entries, 50_000);
        assert_eq!(config.narrator.kind, NarratorKind::Heuristic);
    }

    #[test]
    fn test_duplicate_node_ids_rejected() {
        let config = OrchestratorConfig::new(vec![
            NodeDefinition::local("a", "/tmp/a"),
            NodeDefinition::local("a", "/tmp/b"),
        ]);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_empty_fleet_rejected() {
        let config = OrchestratorConfig::new(vec![]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_transport_requires_target() {
        let mut network = NodeDefinition::network("a", "http://localhost:8765");
        network.base_url = None;
        assert!(network.validate().is_err());

        let mut local = NodeDefinition::local("b", "/tmp/b");
        local.root_dir = None;
        assert!(local.validate().is_err());
    }

    #[test]
    fn test_http_narrator_requires_endpoint() {
        let narrator = NarratorConfig {
            kind: NarratorKind::Http,
            ..Default::default()
        };
        assert!(narrator.validate().is_err());
    }

    #[test]
    fn test_empty_allow_list_is_unrestricted() {
        let node = NodeDefinition::local("a", "/tmp/a").with_allowed_commands(Vec::<String>::new());
        assert!(!node.has_restrictions());
        assert!(node.allows_command("anything"));
    }
}
