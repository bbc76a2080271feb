use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::FleetError;

/// 同步策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStrategy {
    /// 先删除目标子树再复制
    #[default]
    Mirror,
    /// 在已有内容上覆盖复制，不删除多余文件
    Append,
}

impl FromStr for SyncStrategy {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mirror" => Ok(SyncStrategy::Mirror),
            "append" => Ok(SyncStrategy::Append),
            other => Err(FleetError::validation(format!("未知的同步策略: {other}"))),
        }
    }
}

impl fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStrategy::Mirror => f.write_str("mirror"),
            SyncStrategy::Append => f.write_str("append"),
        }
    }
}

/// 节点原生 sync-files 工具的逐目标结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncTargetReport {
    pub target: String,
    pub dest_path: String,
    pub files_synced: u64,
    pub bytes_copied: u64,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncFilesResponse {
    pub source: String,
    pub strategy: SyncStrategy,
    pub targets: Vec<SyncTargetReport>,
}

/// 跨节点同步计划
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPlan {
    pub source_node: String,
    pub source_path: String,
    pub target_nodes: Vec<String>,
    /// 请求的策略
    pub strategy: SyncStrategy,
    pub reason: String,
}

/// 同步时被跳过或失败的单个文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileIssue {
    pub path: String,
    pub reason: String,
}

/// 跨节点同步的逐目标报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub target_node: String,
    pub files_synced: u64,
    pub bytes_copied: u64,
    /// 源端无法读取或不是文本的文件
    pub skipped: Vec<FileIssue>,
    /// 写入目标失败的文件
    pub failed: Vec<FileIssue>,
    pub duration: f64,
    /// 实际生效的策略
    pub applied_strategy: SyncStrategy,
    /// 目标节点整体失败时的原因
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncReport {
    pub fn new(target_node: impl Into<String>, applied_strategy: SyncStrategy) -> Self {
        Self {
            target_node: target_node.into(),
            files_synced: 0,
            bytes_copied: 0,
            skipped: Vec::new(),
            failed: Vec::new(),
            duration: 0.0,
            applied_strategy,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPathResponse {
    pub plan: SyncPlan,
    pub reports: Vec<SyncReport>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("mirror".parse::<SyncStrategy>().unwrap(), SyncStrategy::Mirror);
        assert_eq!("APPEND".parse::<SyncStrategy>().unwrap(), SyncStrategy::Append);
        let err = "merge".parse::<SyncStrategy>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    }

    #[test]
    fn test_default_strategy_is_mirror() {
        assert_eq!(SyncStrategy::default(), SyncStrategy::Mirror);
    }
}
