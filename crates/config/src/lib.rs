//! 编排器与节点服务器的配置模型
//!
//! TOML文件通过 `config` crate 加载，`FLEET__` 前缀的环境变量可以覆盖文件中的值。
//! 所有模型在加载后立即校验，校验失败在启动时终止进程。

pub mod models;
pub mod validation;

pub use models::{
    AuditConfig, NarratorConfig, NarratorKind, NodeConfig, NodeDefinition, OrchestratorConfig,
    TransportKind,
};
pub use validation::{ConfigValidator, ValidationUtils};

use fleet_core::FleetError;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("配置校验失败: {0}")]
    Validation(String),

    #[error("配置文件错误: {0}")]
    File(String),

    #[error("配置解析错误: {0}")]
    Parse(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::File(err.to_string())
    }
}

impl From<ConfigError> for FleetError {
    fn from(err: ConfigError) -> Self {
        FleetError::ConfigInvalid(err.to_string())
    }
}
