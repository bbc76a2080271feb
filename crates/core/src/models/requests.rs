use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::command::CommandLine;
use super::sync::SyncStrategy;
use crate::{FleetError, FleetResult};

pub const MAX_LIST_LIMIT: usize = 20_000;
pub const MAX_READ_BYTES: u64 = 50_000_000;
pub const DEFAULT_COMMAND_TIMEOUT: f64 = 60.0;
pub const MAX_COMMAND_TIMEOUT: f64 = 600.0;

/// 请求在传输边界上的校验
pub trait Validate {
    fn validate(&self) -> FleetResult<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListFilesRequest {
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub include_hash: bool,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Default for ListFilesRequest {
    fn default() -> Self {
        Self {
            path: default_path(),
            recursive: false,
            pattern: None,
            include_hash: false,
            limit: None,
        }
    }
}

impl ListFilesRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_hash(mut self, include_hash: bool) -> Self {
        self.include_hash = include_hash;
        self
    }
}

impl Validate for ListFilesRequest {
    fn validate(&self) -> FleetResult<()> {
        validate_path(&self.path)?;
        if let Some(limit) = self.limit {
            if limit == 0 || limit > MAX_LIST_LIMIT {
                return Err(FleetError::validation(format!(
                    "limit 必须在 1 到 {MAX_LIST_LIMIT} 之间"
                )));
            }
        }
        if let Some(pattern) = &self.pattern {
            glob_syntax_check(pattern)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadFileRequest {
    pub path: String,
    #[serde(default)]
    pub max_bytes: Option<u64>,
}

impl ReadFileRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            max_bytes: None,
        }
    }
}

impl Validate for ReadFileRequest {
    fn validate(&self) -> FleetResult<()> {
        validate_path(&self.path)?;
        if let Some(max_bytes) = self.max_bytes {
            if max_bytes == 0 || max_bytes > MAX_READ_BYTES {
                return Err(FleetError::validation(format!(
                    "max_bytes 必须在 1 到 {MAX_READ_BYTES} 之间"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteFileRequest {
    pub path: String,
    pub content: String,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default = "default_true", alias = "create_dirs")]
    pub create_parent_dirs: bool,
    #[serde(default = "default_true")]
    pub backup: bool,
}

impl WriteFileRequest {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            overwrite: false,
            create_parent_dirs: true,
            backup: true,
        }
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }
}

impl Validate for WriteFileRequest {
    fn validate(&self) -> FleetResult<()> {
        validate_path(&self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteCommandRequest {
    pub command: CommandLine,
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl ExecuteCommandRequest {
    pub fn new(command: impl Into<CommandLine>) -> Self {
        Self {
            command: command.into(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

impl Validate for ExecuteCommandRequest {
    fn validate(&self) -> FleetResult<()> {
        self.command.argv()?;
        if !self.timeout.is_finite() || self.timeout <= 0.0 || self.timeout > MAX_COMMAND_TIMEOUT {
            return Err(FleetError::validation(format!(
                "timeout 必须大于0且不超过 {MAX_COMMAND_TIMEOUT} 秒"
            )));
        }
        if let Some(cwd) = &self.cwd {
            validate_path(cwd)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncFilesRequest {
    pub source_path: String,
    pub targets: Vec<String>,
    #[serde(default)]
    pub strategy: SyncStrategy,
}

impl SyncFilesRequest {
    pub fn new(source_path: impl Into<String>, targets: Vec<String>) -> Self {
        Self {
            source_path: source_path.into(),
            targets,
            strategy: SyncStrategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

impl Validate for SyncFilesRequest {
    fn validate(&self) -> FleetResult<()> {
        validate_path(&self.source_path)?;
        if self.targets.is_empty() {
            return Err(FleetError::validation("至少需要一个同步目标"));
        }
        if self.targets.iter().any(|t| t.trim().is_empty()) {
            return Err(FleetError::validation("同步目标名不能为空"));
        }
        Ok(())
    }
}

fn validate_path(path: &str) -> FleetResult<()> {
    if path.trim().is_empty() {
        return Err(FleetError::validation("路径不能为空"));
    }
    if path.contains('\0') {
        return Err(FleetError::validation("路径包含空字符"));
    }
    Ok(())
}

/// 只检查明显损坏的模式，具体匹配交给节点
fn glob_syntax_check(pattern: &str) -> FleetResult<()> {
    if pattern.is_empty() {
        return Err(FleetError::validation("pattern 不能为空字符串"));
    }
    let opened = pattern.matches('[').count();
    let closed = pattern.matches(']').count();
    if opened > closed {
        return Err(FleetError::validation(format!("pattern 方括号未闭合: {pattern}")));
    }
    Ok(())
}

fn default_path() -> String {
    ".".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> f64 {
    DEFAULT_COMMAND_TIMEOUT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_list_files_defaults() {
        let request: ListFilesRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.path, ".");
        assert!(!request.recursive);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_list_limit_bounds() {
        let mut request = ListFilesRequest::new(".");
        request.limit = Some(0);
        assert_eq!(request.validate().unwrap_err().kind(), ErrorKind::ValidationFailed);
        request.limit = Some(MAX_LIST_LIMIT + 1);
        assert!(request.validate().is_err());
        request.limit = Some(MAX_LIST_LIMIT);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_write_file_defaults_and_alias() {
        let request: WriteFileRequest =
            serde_json::from_str(r#"{"path":"a.txt","content":"x","create_dirs":false}"#).unwrap();
        assert!(!request.overwrite);
        assert!(!request.create_parent_dirs);
        assert!(request.backup);
    }

    #[test]
    fn test_execute_timeout_bounds() {
        let request: ExecuteCommandRequest = serde_json::from_str(r#"{"command":["ls"]}"#).unwrap();
        assert_eq!(request.timeout, DEFAULT_COMMAND_TIMEOUT);
        assert!(request.validate().is_ok());

        assert!(ExecuteCommandRequest::new(vec!["ls"]).with_timeout(0.0).validate().is_err());
        assert!(ExecuteCommandRequest::new(vec!["ls"]).with_timeout(601.0).validate().is_err());
        assert!(ExecuteCommandRequest::new(vec!["ls"]).with_timeout(600.0).validate().is_ok());
    }

    #[test]
    fn test_sync_requires_targets() {
        let request = SyncFilesRequest::new("data", vec![]);
        assert_eq!(request.validate().unwrap_err().kind(), ErrorKind::ValidationFailed);
    }

    #[test]
    fn test_empty_path_is_rejected() {
        assert!(ReadFileRequest::new("").validate().is_err());
        let mut request = ReadFileRequest::new("a.txt");
        request.max_bytes = Some(MAX_READ_BYTES + 1);
        assert!(request.validate().is_err());
    }
}
