use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use super::orchestrator::NodeDefinition;
use crate::validation::{ConfigValidator, ValidationUtils};
use crate::{ConfigError, ConfigResult};

pub const DEFAULT_ALLOWED_COMMANDS: [&str; 4] = ["python", "ls", "cat", "echo"];

/// 节点服务器和本地传输共用的节点配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub node_id: String,
    pub root_dir: PathBuf,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_allowed_commands")]
    pub allowed_commands: Vec<String>,
    /// 同步目标名 -> 目录
    #[serde(default)]
    pub sync_targets: BTreeMap<String, PathBuf>,
    /// read-file 的节点级字节上限
    #[serde(default)]
    pub max_read_bytes: Option<u64>,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl NodeConfig {
    pub fn new(node_id: impl Into<String>, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            node_id: node_id.into(),
            root_dir: root_dir.into(),
            tags: Vec::new(),
            description: None,
            allowed_commands: default_allowed_commands(),
            sync_targets: BTreeMap::new(),
            max_read_bytes: None,
            bind_address: default_bind_address(),
            auth_token: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }

    /// 加载TOML配置文件，`FLEET_NODE__` 前缀的环境变量覆盖文件值
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::File(format!(
                "节点配置文件不存在: {}",
                path.display()
            )));
        }

        let config: NodeConfig = ConfigBuilder::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Toml))
            .add_source(
                Environment::with_prefix("FLEET_NODE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> ConfigResult<Self> {
        let config: NodeConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// 由 `local` 传输的节点定义构造；未配置允许列表时使用默认列表
    pub fn from_definition(definition: &NodeDefinition) -> ConfigResult<Self> {
        let root_dir = definition.root_dir.clone().ok_or_else(|| {
            ConfigError::Validation(format!(
                "节点 {} 没有配置 root_dir",
                definition.node_id
            ))
        })?;

        let allowed_commands = match &definition.allowed_commands {
            Some(list) if !list.is_empty() => list.clone(),
            _ => default_allowed_commands(),
        };

        Ok(Self {
            tags: definition.tags.clone(),
            description: definition.description.clone(),
            allowed_commands,
            sync_targets: definition.sync_targets.clone(),
            max_read_bytes: definition.max_read_bytes,
            auth_token: definition.auth_token.clone(),
            ..Self::new(definition.node_id.clone(), root_dir)
        })
    }

    pub fn with_allowed_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_commands = commands.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sync_target(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.sync_targets.insert(name.into(), path.into());
        self
    }
}

impl ConfigValidator for NodeConfig {
    fn validate(&self) -> ConfigResult<()> {
        ValidationUtils::validate_not_empty(&self.node_id, "node_id")?;
        if self.root_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation("root_dir 不能为空".to_string()));
        }
        ValidationUtils::validate_socket_addr(&self.bind_address, "bind_address")?;
        for command in &self.allowed_commands {
            ValidationUtils::validate_not_empty(command, "allowed_commands")?;
        }
        for name in self.sync_targets.keys() {
            ValidationUtils::validate_not_empty(name, "sync_targets")?;
        }
        if self.max_read_bytes == Some(0) {
            return Err(ConfigError::Validation("max_read_bytes 必须大于0".to_string()));
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Validation("max_body_bytes 必须大于0".to_string()));
        }
        Ok(())
    }
}

fn default_allowed_commands() -> Vec<String> {
    DEFAULT_ALLOWED_COMMANDS.iter().map(|c| c.to_string()).collect()
}

fn default_bind_address() -> String {
    "0.0.0.0:8765".to_string()
}

fn default_max_body_bytes() -> usize {
    16 * 1024 * 1024
}
