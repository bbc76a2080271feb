use std::time::Duration;

use async_trait::async_trait;
use fleet_config::NodeDefinition;
use fleet_core::{
    CommandOutput, ErrorKind, ExecuteCommandRequest, FleetError, FleetResult, ListFilesRequest,
    ListFilesResponse, NodeClient, NodeInfo, ReadFileRequest, ReadFileResponse, SyncFilesRequest,
    SyncFilesResponse, WriteFileRequest, WriteFileResponse,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// 命令超时之外给网络往返留出的余量
const EXECUTE_GRACE: Duration = Duration::from_secs(5);

/// 节点服务器返回的错误体
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    kind: Option<ErrorKind>,
    #[serde(default)]
    details: Option<Value>,
}

/// 网络传输的节点客户端
pub struct HttpNodeClient {
    node_id: String,
    base_url: String,
    auth_token: Option<String>,
    request_timeout: Duration,
    http_client: reqwest::Client,
}

impl HttpNodeClient {
    pub fn new(
        node_id: impl Into<String>,
        base_url: impl Into<String>,
        auth_token: Option<String>,
        request_timeout: Duration,
    ) -> FleetResult<Self> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| FleetError::Internal(format!("创建HTTP客户端失败: {e}")))?;
        Ok(Self {
            node_id: node_id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token,
            request_timeout,
            http_client,
        })
    }

    pub fn from_definition(definition: &NodeDefinition, request_timeout: Duration) -> FleetResult<Self> {
        let base_url = definition.base_url.clone().ok_or_else(|| {
            FleetError::config(format!("节点 {} 没有配置 base_url", definition.node_id))
        })?;
        Self::new(
            definition.node_id.clone(),
            base_url,
            definition.auth_token.clone(),
            request_timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 探测 `GET /healthz`
    pub async fn health_check(&self) -> FleetResult<bool> {
        let url = format!("{}/healthz", self.base_url);
        let response = self
            .authorized(self.http_client.get(&url))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e, self.request_timeout))?;
        Ok(response.status().is_success())
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn call_tool<Req, Resp>(&self, tool: &str, body: &Req, timeout: Duration) -> FleetResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/tools/{}", self.base_url, tool);
        debug!("调用节点工具: node_id={}, tool={}", self.node_id, tool);

        let response = self
            .authorized(self.http_client.post(&url))
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                metrics::counter!("fleet_node_rpc_failures_total", "tool" => tool.to_string())
                    .increment(1);
                self.transport_error(e, timeout)
            })?;

        let status = response.status();
        if status.is_success() {
            return response.json::<Resp>().await.map_err(|e| {
                FleetError::Internal(format!(
                    "节点 {} 的 {} 响应无法解析: {e}",
                    self.node_id, tool
                ))
            });
        }

        let text = response.text().await.unwrap_or_default();
        let (kind, message) = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => {
                let message = match body.details {
                    Some(details) if !details.is_null() => format!("{} ({details})", body.error),
                    _ => body.error,
                };
                (
                    body.kind.unwrap_or_else(|| ErrorKind::from_status(status.as_u16())),
                    message,
                )
            }
            Err(_) => (
                ErrorKind::from_status(status.as_u16()),
                format!("HTTP {status}: {text}"),
            ),
        };

        warn!(
            "节点工具调用失败: node_id={}, tool={}, status={}, kind={}",
            self.node_id, tool, status, kind
        );
        metrics::counter!("fleet_node_rpc_failures_total", "tool" => tool.to_string()).increment(1);
        Err(FleetError::ToolFailed {
            node_id: self.node_id.clone(),
            kind,
            message,
        })
    }

    fn transport_error(&self, err: reqwest::Error, timeout: Duration) -> FleetError {
        if err.is_timeout() {
            warn!("节点请求超时: node_id={}, timeout={:?}", self.node_id, timeout);
            FleetError::Timeout {
                seconds: timeout.as_secs_f64(),
            }
        } else {
            warn!("节点不可达: node_id={}, error={}", self.node_id, err);
            FleetError::unreachable(&self.node_id, err)
        }
    }
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    fn node_id(&self) -> &str {
        &self.node_id
    }

    async fn list_files(&self, request: ListFilesRequest) -> FleetResult<ListFilesResponse> {
        self.call_tool("list-files", &request, self.request_timeout).await
    }

    async fn read_file(&self, request: ReadFileRequest) -> FleetResult<ReadFileResponse> {
        self.call_tool("read-file", &request, self.request_timeout).await
    }

    async fn write_file(&self, request: WriteFileRequest) -> FleetResult<WriteFileResponse> {
        self.call_tool("write-file", &request, self.request_timeout).await
    }

    async fn execute_command(&self, request: ExecuteCommandRequest) -> FleetResult<CommandOutput> {
        let timeout = Duration::from_secs_f64(request.timeout.max(0.0)) + EXECUTE_GRACE;
        self.call_tool("execute-command", &request, timeout).await
    }

    async fn sync_files(&self, request: SyncFilesRequest) -> FleetResult<SyncFilesResponse> {
        self.call_tool("sync-files", &request, self.request_timeout).await
    }

    async fn get_node_info(&self) -> FleetResult<NodeInfo> {
        self.call_tool("get-node-info", &serde_json::json!({}), self.request_timeout)
            .await
    }
}
