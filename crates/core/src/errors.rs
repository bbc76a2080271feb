use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 错误类别
///
/// 跨越网络传输时保持可识别：节点服务器把它写进错误响应的 `kind` 字段，
/// 网络客户端再据此还原。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownNode,
    NodeUnreachable,
    NotFound,
    AlreadyExists,
    IsADirectory,
    TooLarge,
    PathEscapesRoot,
    PermissionDenied,
    CommandNotAllowed,
    UnknownSyncTarget,
    Timeout,
    ValidationFailed,
    ConfigInvalid,
    NarratorUnavailable,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownNode => "unknown_node",
            ErrorKind::NodeUnreachable => "node_unreachable",
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::IsADirectory => "is_a_directory",
            ErrorKind::TooLarge => "too_large",
            ErrorKind::PathEscapesRoot => "path_escapes_root",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::CommandNotAllowed => "command_not_allowed",
            ErrorKind::UnknownSyncTarget => "unknown_sync_target",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::ConfigInvalid => "config_invalid",
            ErrorKind::NarratorUnavailable => "narrator_unavailable",
            ErrorKind::Internal => "internal",
        }
    }

    /// 对应的HTTP状态码
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::ValidationFailed
            | ErrorKind::IsADirectory
            | ErrorKind::UnknownSyncTarget
            | ErrorKind::ConfigInvalid => 400,
            ErrorKind::PathEscapesRoot
            | ErrorKind::PermissionDenied
            | ErrorKind::CommandNotAllowed => 403,
            ErrorKind::UnknownNode | ErrorKind::NotFound => 404,
            ErrorKind::AlreadyExists => 409,
            ErrorKind::TooLarge => 413,
            ErrorKind::NodeUnreachable | ErrorKind::NarratorUnavailable => 503,
            ErrorKind::Timeout => 504,
            ErrorKind::Internal => 500,
        }
    }

    /// 响应体没有携带 `kind` 时，按状态码推断错误类别
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => ErrorKind::ValidationFailed,
            401 | 403 => ErrorKind::PermissionDenied,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::AlreadyExists,
            413 => ErrorKind::TooLarge,
            502 | 503 => ErrorKind::NodeUnreachable,
            504 => ErrorKind::Timeout,
            _ => ErrorKind::Internal,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 编排系统错误类型定义
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("未知节点: {node_id}")]
    UnknownNode { node_id: String },

    #[error("节点 {node_id} 不可达: {cause}")]
    NodeUnreachable { node_id: String, cause: String },

    #[error("节点 {node_id} 工具调用失败 [{kind}]: {message}")]
    ToolFailed {
        node_id: String,
        kind: ErrorKind,
        message: String,
    },

    #[error("路径不存在: {path}")]
    NotFound { path: String },

    #[error("目标已存在: {path}")]
    AlreadyExists { path: String },

    #[error("目标是目录: {path}")]
    IsADirectory { path: String },

    #[error("文件过大: {path} ({size} 字节，上限 {limit} 字节)")]
    TooLarge { path: String, size: u64, limit: u64 },

    #[error("路径越出节点根目录: {path}")]
    PathEscapesRoot { path: String },

    #[error("命令不在允许列表中: {command}")]
    PermissionDenied { command: String },

    #[error("节点 {node_id} 不允许执行命令: {command}")]
    CommandNotAllowed { node_id: String, command: String },

    #[error("未知的同步目标: {target}")]
    UnknownSyncTarget { target: String },

    #[error("执行超时 ({seconds:.1}秒)")]
    Timeout { seconds: f64 },

    #[error("请求参数无效: {0}")]
    ValidationFailed(String),

    #[error("配置无效: {0}")]
    ConfigInvalid(String),

    #[error("叙述服务不可用: {0}")]
    NarratorUnavailable(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl FleetError {
    pub fn unreachable(node_id: impl Into<String>, cause: impl fmt::Display) -> Self {
        FleetError::NodeUnreachable {
            node_id: node_id.into(),
            cause: cause.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        FleetError::ValidationFailed(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        FleetError::ConfigInvalid(message.into())
    }

    /// 错误类别，网络传输回来的错误保留远端的类别
    pub fn kind(&self) -> ErrorKind {
        match self {
            FleetError::UnknownNode { .. } => ErrorKind::UnknownNode,
            FleetError::NodeUnreachable { .. } => ErrorKind::NodeUnreachable,
            FleetError::ToolFailed { kind, .. } => *kind,
            FleetError::NotFound { .. } => ErrorKind::NotFound,
            FleetError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            FleetError::IsADirectory { .. } => ErrorKind::IsADirectory,
            FleetError::TooLarge { .. } => ErrorKind::TooLarge,
            FleetError::PathEscapesRoot { .. } => ErrorKind::PathEscapesRoot,
            FleetError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            FleetError::CommandNotAllowed { .. } => ErrorKind::CommandNotAllowed,
            FleetError::UnknownSyncTarget { .. } => ErrorKind::UnknownSyncTarget,
            FleetError::Timeout { .. } => ErrorKind::Timeout,
            FleetError::ValidationFailed(_) => ErrorKind::ValidationFailed,
            FleetError::ConfigInvalid(_) => ErrorKind::ConfigInvalid,
            FleetError::NarratorUnavailable(_) => ErrorKind::NarratorUnavailable,
            FleetError::Io(err) => match err.kind() {
                std::io::ErrorKind::NotFound => ErrorKind::NotFound,
                std::io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
                std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
                std::io::ErrorKind::TimedOut => ErrorKind::Timeout,
                _ => ErrorKind::Internal,
            },
            FleetError::Serialization(_) | FleetError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}
