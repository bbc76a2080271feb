//! 节点客户端和叙述器的内存实现
//!
//! 不访问网络和文件系统，适合测试路由、安全检查、分发和同步逻辑。

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use fleet_core::{
    CommandOutput, ErrorKind, ExecuteCommandRequest, FileMetadata, FleetError, FleetResult,
    ListFilesRequest, ListFilesResponse, NarrationContext, Narrator, NodeClient, NodeInfo,
    ReadFileRequest, ReadFileResponse, SyncFilesRequest, SyncFilesResponse, SyncTargetReport,
    WriteFileRequest, WriteFileResponse,
};

use crate::builders::NodeInfoBuilder;

#[derive(Debug, Default)]
struct MockNodeState {
    info: Option<NodeInfo>,
    failure: Option<ErrorKind>,
    /// 路径 -> 内容，`None` 表示二进制文件
    files: BTreeMap<String, Option<String>>,
    written: BTreeMap<String, String>,
    executed: Vec<ExecuteCommandRequest>,
    info_calls: usize,
    read_calls: usize,
}

/// Mock节点客户端
///
/// 克隆共享同一份状态，测试可以在交给注册表之后继续观察调用情况。
#[derive(Debug, Clone)]
pub struct MockNodeClient {
    node_id: String,
    state: Arc<Mutex<MockNodeState>>,
}

impl MockNodeClient {
    pub fn new(node_id: &str) -> Self {
        let state = MockNodeState {
            info: Some(NodeInfoBuilder::new(node_id).build()),
            ..Default::default()
        };
        Self {
            node_id: node_id.to_string(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with_info(self, info: NodeInfo) -> Self {
        self.state.lock().unwrap().info = Some(info);
        self
    }

    pub fn with_load(self, cpu_percent: f64, memory_percent: f64) -> Self {
        let info = NodeInfoBuilder::new(&self.node_id)
            .with_load(cpu_percent, memory_percent)
            .build();
        self.with_info(info)
    }

    /// 之后的每次调用都以指定类别失败
    pub fn failing(self, kind: ErrorKind) -> Self {
        self.set_failure(Some(kind));
        self
    }

    pub fn set_failure(&self, kind: Option<ErrorKind>) {
        self.state.lock().unwrap().failure = kind;
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .files
            .insert(path.to_string(), Some(content.to_string()));
        self
    }

    pub fn with_binary_file(self, path: &str) -> Self {
        self.state.lock().unwrap().files.insert(path.to_string(), None);
        self
    }

    pub fn execute_calls(&self) -> usize {
        self.state.lock().unwrap().executed.len()
    }

    pub fn executed(&self) -> Vec<ExecuteCommandRequest> {
        self.state.lock().unwrap().executed.clone()
    }

    pub fn info_calls(&self) -> usize {
        self.state.lock().unwrap().info_calls
    }

    pub fn read_calls(&self) -> usize {
        self.state.lock().unwrap().read_calls
    }

    pub fn written_files(&self) -> BTreeMap<String, String> {
        self.state.lock().unwrap().written.clone()
    }

    fn check_failure(&self) -> FleetResult<()> {
        match self.state.lock().unwrap().failure {
            None => Ok(()),
            Some(ErrorKind::NodeUnreachable) => {
                Err(FleetError::unreachable(&self.node_id, "connection refused"))
            }
            Some(ErrorKind::Timeout) => Err(FleetError::Timeout { seconds: 1.0 }),
            Some(kind) => Err(FleetError::ToolFailed {
                node_id: self.node_id.clone(),
                kind,
                message: format!("mock failure: {kind}"),
            }),
        }
    }
}

#[async_trait]
impl NodeClient for MockNodeClient {
    fn node_id(&self) -> &str {
        &self.node_id
    }

    async fn list_files(&self, request: ListFilesRequest) -> FleetResult<ListFilesResponse> {
        self.check_failure()?;
        let state = self.state.lock().unwrap();
        let prefix = request.path.trim_end_matches('/');
        let files: Vec<FileMetadata> = state
            .files
            .iter()
            .filter(|(path, _)| {
                prefix == "." || path.as_str() == prefix || path.starts_with(&format!("{prefix}/"))
            })
            .map(|(path, content)| FileMetadata {
                path: format!("/mock/{}/{path}", self.node_id),
                relative_path: path.clone(),
                is_dir: false,
                size: Some(content.as_ref().map_or(4, |c| c.len() as u64)),
                modified: Some(Utc::now()),
                hash: None,
            })
            .collect();
        if files.is_empty() && prefix != "." {
            return Err(FleetError::NotFound { path: request.path });
        }
        Ok(ListFilesResponse::new(files))
    }

    async fn read_file(&self, request: ReadFileRequest) -> FleetResult<ReadFileResponse> {
        self.check_failure()?;
        let mut state = self.state.lock().unwrap();
        state.read_calls += 1;
        let content = state
            .files
            .get(&request.path)
            .ok_or_else(|| FleetError::NotFound {
                path: request.path.clone(),
            })?;
        Ok(ReadFileResponse {
            relative_path: request.path.clone(),
            size: content.as_ref().map_or(4, |c| c.len() as u64),
            content_hash: "0".repeat(64),
            content: content.clone(),
        })
    }

    async fn write_file(&self, request: WriteFileRequest) -> FleetResult<WriteFileResponse> {
        self.check_failure()?;
        let mut state = self.state.lock().unwrap();
        let exists = state.files.contains_key(&request.path) || state.written.contains_key(&request.path);
        if exists && !request.overwrite {
            return Err(FleetError::AlreadyExists { path: request.path });
        }
        let bytes_written = request.content.len() as u64;
        state.written.insert(request.path.clone(), request.content);
        Ok(WriteFileResponse {
            success: true,
            relative_path: request.path,
            bytes_written,
            content_hash: "0".repeat(64),
            backup_path: None,
        })
    }

    async fn execute_command(&self, request: ExecuteCommandRequest) -> FleetResult<CommandOutput> {
        self.state.lock().unwrap().executed.push(request.clone());
        self.check_failure()?;
        let command = request.command.argv()?;
        Ok(CommandOutput {
            stdout: format!("{}: {}\n", self.node_id, command.join(" ")),
            stderr: String::new(),
            exit_code: 0,
            duration: 0.01,
            cwd: request.cwd,
            command,
        })
    }

    async fn sync_files(&self, request: SyncFilesRequest) -> FleetResult<SyncFilesResponse> {
        self.check_failure()?;
        Ok(SyncFilesResponse {
            source: request.source_path.clone(),
            strategy: request.strategy,
            targets: request
                .targets
                .iter()
                .map(|target| SyncTargetReport {
                    target: target.clone(),
                    dest_path: format!("/mock/{target}/{}", request.source_path),
                    files_synced: 0,
                    bytes_copied: 0,
                    duration: 0.0,
                })
                .collect(),
        })
    }

    async fn get_node_info(&self) -> FleetResult<NodeInfo> {
        self.state.lock().unwrap().info_calls += 1;
        self.check_failure()?;
        let state = self.state.lock().unwrap();
        state
            .info
            .clone()
            .ok_or_else(|| FleetError::Internal("mock node has no info".to_string()))
    }
}

/// 记录上下文的Mock叙述器
#[derive(Debug, Clone)]
pub struct RecordingNarrator {
    reply: Option<String>,
    contexts: Arc<Mutex<Vec<NarrationContext>>>,
}

impl RecordingNarrator {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            contexts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 每次调用都返回 NarratorUnavailable
    pub fn failing() -> Self {
        Self {
            reply: None,
            contexts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn contexts(&self) -> Vec<NarrationContext> {
        self.contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Narrator for RecordingNarrator {
    fn name(&self) -> &str {
        "recording"
    }

    async fn narrate(&self, context: &NarrationContext) -> FleetResult<String> {
        self.contexts.lock().unwrap().push(context.clone());
        self.reply
            .clone()
            .ok_or_else(|| FleetError::NarratorUnavailable("recording narrator offline".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_load_sets_reported_metrics() {
        let mock = MockNodeClient::new("n1").with_load(12.5, 40.0);
        let state = mock.state.lock().unwrap();
        let info = state.info.as_ref().unwrap();
        assert_eq!(info.node_id, "n1");
        assert_eq!(info.metrics.cpu_percent, 12.5);
        assert_eq!(info.metrics.memory_percent, 40.0);
    }
}
