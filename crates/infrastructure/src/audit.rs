use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fleet_config::AuditConfig;
use fleet_core::FleetResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// 审计条目，每行一个JSON对象
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub payload: Value,
}

/// 追加写入的审计日志
///
/// 写入和裁剪都在同一把锁内完成。锁保护的是当前行数，避免每次写入都重新读文件；
/// 超过上限时重写为最新的 `max_entries` 行。
pub struct AuditLog {
    path: PathBuf,
    max_entries: usize,
    line_count: Mutex<usize>,
}

impl AuditLog {
    pub async fn open(path: impl Into<PathBuf>, max_entries: usize) -> FleetResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let line_count = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents.lines().filter(|l| !l.trim().is_empty()).count(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        info!(
            "审计日志已打开: path={}, entries={}, max_entries={}",
            path.display(),
            line_count,
            max_entries
        );

        Ok(Self {
            path,
            max_entries: max_entries.max(1),
            line_count: Mutex::new(line_count),
        })
    }

    pub async fn from_config(config: &AuditConfig) -> FleetResult<Self> {
        Self::open(&config.path, config.max_entries).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// 追加一条记录
    pub async fn record(&self, action: &str, payload: Value) -> FleetResult<()> {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            action: action.to_string(),
            payload,
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut count = self.line_count.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        *count += 1;

        if *count > self.max_entries {
            *count = self.trim().await?;
        }
        debug!("审计记录: action={}", action);
        Ok(())
    }

    /// 读取全部条目，无法解析的行被跳过
    pub async fn entries(&self) -> FleetResult<Vec<AuditEntry>> {
        let _guard = self.line_count.lock().await;
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(contents
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }

    pub async fn len(&self) -> usize {
        *self.line_count.lock().await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// 保留最新的条目，写临时文件后替换
    async fn trim(&self) -> FleetResult<usize> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let lines: Vec<&str> = contents.lines().filter(|l| !l.trim().is_empty()).collect();
        let keep = &lines[lines.len().saturating_sub(self.max_entries)..];

        let mut trimmed = keep.join("\n");
        trimmed.push('\n');

        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        tokio::fs::write(&tmp_path, trimmed).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        debug!("审计日志已裁剪: 删除 {} 条", lines.len() - keep.len());
        Ok(keep.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_record_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::open(dir.path().join("logs/audit.log"), 100).await.unwrap();

        log.record("list_files", json!({"node_id": "n1"})).await.unwrap();
        log.record("execute_command", json!({"nodes": ["n1", "n2"]})).await.unwrap();

        let raw = tokio::fs::read_to_string(log.path()).await.unwrap();
        assert_eq!(raw.lines().count(), 2);
        let entries = log.entries().await.unwrap();
        assert_eq!(entries[0].action, "list_files");
        assert_eq!(entries[1].payload["nodes"][1], "n2");
    }

    #[tokio::test]
    async fn test_reopen_counts_existing_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        {
            let log = AuditLog::open(&path, 10).await.unwrap();
            for i in 0..3 {
                log.record("tick", json!({"i": i})).await.unwrap();
            }
        }
        let log = AuditLog::open(&path, 10).await.unwrap();
        assert_eq!(log.len().await, 3);
    }
}
