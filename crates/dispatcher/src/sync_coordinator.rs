use std::sync::Arc;
use std::time::Instant;

use fleet_core::{
    ErrorKind, FileIssue, FleetError, FleetResult, ListFilesRequest, NarrationContext, Narrator,
    NodeClient, ReadFileRequest, SyncPlan, SyncReport, SyncStrategy, WriteFileRequest,
};
use futures::future::join_all;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::registry::NodeRegistry;

/// 从源节点读出的单个文件
enum SourceFile {
    Text { path: String, content: String },
    Skipped(FileIssue),
}

/// 跨节点同步
///
/// 通过编排器中转：逐个读取源节点的文件，再写到每个目标节点的相同相对路径。
/// 这条路径只做追加复制，不删除目标上的多余文件；
/// 报告里的 `applied_strategy` 总是 `append`。
pub struct SyncCoordinator {
    registry: Arc<NodeRegistry>,
    narrator: Option<Arc<dyn Narrator>>,
}

impl SyncCoordinator {
    pub fn new(registry: Arc<NodeRegistry>, narrator: Option<Arc<dyn Narrator>>) -> Self {
        Self { registry, narrator }
    }

    pub async fn plan_sync(
        &self,
        source_node: &str,
        source_path: &str,
        target_nodes: &[String],
        strategy: SyncStrategy,
    ) -> FleetResult<SyncPlan> {
        if source_path.trim().is_empty() {
            return Err(FleetError::validation("源路径不能为空"));
        }
        self.registry.get_definition(source_node)?;

        let mut targets: Vec<String> = Vec::with_capacity(target_nodes.len());
        for node_id in target_nodes {
            self.registry.get_definition(node_id)?;
            if node_id == source_node {
                warn!("同步目标包含源节点本身，已忽略: {}", node_id);
                continue;
            }
            if !targets.contains(node_id) {
                targets.push(node_id.clone());
            }
        }
        if targets.is_empty() {
            return Err(FleetError::validation("至少需要一个不同于源节点的目标节点"));
        }

        let fallback = format!(
            "Sync {} from {} to {} ({})",
            source_path,
            source_node,
            targets.join(", "),
            strategy
        );
        let reason = match &self.narrator {
            Some(narrator) => {
                let context = NarrationContext::new(
                    "sync",
                    fallback.clone(),
                    json!({
                        "source_node": source_node,
                        "source_path": source_path,
                        "targets": targets,
                        "strategy": strategy,
                    }),
                );
                match narrator.narrate(&context).await {
                    Ok(text) if !text.trim().is_empty() => text,
                    Ok(_) => fallback,
                    Err(e) => {
                        debug!("同步计划叙述失败，使用默认说明: {}", e);
                        fallback
                    }
                }
            }
            None => fallback,
        };

        Ok(SyncPlan {
            source_node: source_node.to_string(),
            source_path: source_path.to_string(),
            target_nodes: targets,
            strategy,
            reason,
        })
    }

    /// 执行同步计划
    ///
    /// 源节点列举失败时返回错误；单个文件的读写失败只记在报告里。
    /// 文件逐个读取并写往各目标，内存中只保留当前文件的内容。
    pub async fn sync_path(&self, plan: &SyncPlan) -> FleetResult<Vec<SyncReport>> {
        if plan.strategy == SyncStrategy::Mirror {
            warn!(
                "编排器中转同步不删除目标文件，按追加方式执行: source={}:{}",
                plan.source_node, plan.source_path
            );
        }

        let source = self.registry.get_client(&plan.source_node)?;
        let listing = source
            .list_files(ListFilesRequest::new(&plan.source_path).recursive(true))
            .await?;
        let paths: Vec<String> = listing
            .files
            .into_iter()
            .filter(|f| !f.is_dir)
            .map(|f| f.relative_path)
            .collect();
        info!(
            "开始同步: source={}:{}, files={}, targets={:?}",
            plan.source_node,
            plan.source_path,
            paths.len(),
            plan.target_nodes
        );

        let started = Instant::now();
        let mut targets: Vec<TargetState> = plan
            .target_nodes
            .iter()
            .map(|target| self.open_target(target))
            .collect();

        for path in paths {
            if targets.iter().all(|t| t.client.is_none()) {
                break;
            }
            match self.read_source(source.as_ref(), path).await {
                SourceFile::Text { path, content } => {
                    join_all(
                        targets
                            .iter_mut()
                            .filter(|t| t.client.is_some())
                            .map(|t| t.write(&path, &content)),
                    )
                    .await;
                }
                SourceFile::Skipped(issue) => {
                    for target in targets.iter_mut().filter(|t| t.client.is_some()) {
                        target.report.skipped.push(issue.clone());
                    }
                }
            }
        }

        let elapsed = started.elapsed().as_secs_f64();
        let reports: Vec<SyncReport> = targets
            .into_iter()
            .map(|mut target| {
                target.report.duration = elapsed;
                info!(
                    "目标同步完成: node_id={}, files={}, bytes={}, skipped={}, failed={}",
                    target.report.target_node,
                    target.report.files_synced,
                    target.report.bytes_copied,
                    target.report.skipped.len(),
                    target.report.failed.len()
                );
                target.report
            })
            .collect();

        let synced: u64 = reports.iter().map(|r| r.files_synced).sum();
        metrics::counter!("fleet_files_synced_total").increment(synced);
        Ok(reports)
    }

    fn open_target(&self, target: &str) -> TargetState {
        let mut report = SyncReport::new(target, SyncStrategy::Append);
        let client = match self.registry.get_client(target) {
            Ok(client) => Some(client),
            Err(e) => {
                report.error = Some(e.to_string());
                None
            }
        };
        TargetState { report, client }
    }

    async fn read_source(&self, source: &dyn NodeClient, path: String) -> SourceFile {
        match source.read_file(ReadFileRequest::new(&path)).await {
            Ok(response) => match response.content {
                Some(content) => SourceFile::Text { path, content },
                None => SourceFile::Skipped(FileIssue {
                    path,
                    reason: "not valid UTF-8 text".to_string(),
                }),
            },
            Err(e) => {
                debug!("源文件读取失败，跳过: path={}, error={}", path, e);
                SourceFile::Skipped(FileIssue {
                    path,
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// 单个目标节点的同步进度；节点不可用后 `client` 置空，不再写入
struct TargetState {
    report: SyncReport,
    client: Option<Arc<dyn NodeClient>>,
}

impl TargetState {
    async fn write(&mut self, path: &str, content: &str) {
        let Some(client) = self.client.clone() else {
            return;
        };
        let request = WriteFileRequest::new(path.to_string(), content.to_string())
            .overwrite(true)
            .backup(false);
        match client.write_file(request).await {
            Ok(written) => {
                self.report.files_synced += 1;
                self.report.bytes_copied += written.bytes_written;
            }
            Err(e) if matches!(e.kind(), ErrorKind::NodeUnreachable | ErrorKind::Timeout) => {
                warn!(
                    "目标节点不可用，停止向其同步: node_id={}, error={}",
                    self.report.target_node, e
                );
                self.report.failed.push(FileIssue {
                    path: path.to_string(),
                    reason: e.to_string(),
                });
                self.report.error = Some(e.to_string());
                self.client = None;
            }
            Err(e) => self.report.failed.push(FileIssue {
                path: path.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

