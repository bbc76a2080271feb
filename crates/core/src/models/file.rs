use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 文件系统条目的元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// 节点上的绝对路径
    pub path: String,
    /// 相对于节点根目录的路径，使用 `/` 分隔，根目录本身为 `.`
    pub relative_path: String,
    pub is_dir: bool,
    /// 目录没有大小
    pub size: Option<u64>,
    pub modified: Option<DateTime<Utc>>,
    /// SHA-256 十六进制摘要，仅在请求时为普通文件计算
    #[serde(default)]
    pub hash: Option<String>,
}

/// list-files 工具的线上响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListFilesResponse {
    pub files: Vec<FileMetadata>,
    pub count: usize,
}

impl ListFilesResponse {
    pub fn new(files: Vec<FileMetadata>) -> Self {
        let count = files.len();
        Self { files, count }
    }
}

/// read-file 工具的响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadFileResponse {
    pub relative_path: String,
    pub size: u64,
    #[serde(alias = "hash")]
    pub content_hash: String,
    /// 内容不是合法UTF-8时为 `None`
    pub content: Option<String>,
}

/// write-file 工具的响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteFileResponse {
    pub success: bool,
    pub relative_path: String,
    pub bytes_written: u64,
    #[serde(alias = "hash")]
    pub content_hash: String,
    /// 备份文件相对于节点根目录的路径
    pub backup_path: Option<String>,
}
