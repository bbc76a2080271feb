use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use fleet_config::NodeConfig;
use fleet_core::{
    CommandOutput, ExecuteCommandRequest, FleetError, FleetResult, ListFilesRequest,
    ListFilesResponse, NodeInfo, ReadFileRequest, ReadFileResponse, SyncFilesRequest,
    SyncFilesResponse, SyncTargetReport, Validate, WriteFileRequest, WriteFileResponse,
};
use tracing::{debug, info};

use crate::executor::CommandExecutor;
use crate::filesystem::{hash_bytes, list_entries, ListOptions};
use crate::metrics::{platform_info, MetricsCollector};
use crate::paths::NodeRoot;
use crate::sync::{copy_tree, paths_overlap};

/// 节点工具的进程内实现
///
/// 节点HTTP服务器和本地传输共用这一实现。请求在进入这里时先做校验。
#[derive(Clone)]
pub struct NodeTools {
    config: Arc<NodeConfig>,
    root: NodeRoot,
    executor: CommandExecutor,
    metrics: Arc<MetricsCollector>,
}

impl NodeTools {
    pub fn new(config: NodeConfig) -> FleetResult<Self> {
        let root = NodeRoot::new(&config.root_dir)?;
        let executor = CommandExecutor::new(root.clone(), config.allowed_commands.clone());
        let metrics = Arc::new(MetricsCollector::new(root.path()));
        info!(
            "节点工具已就绪: node_id={}, root={}",
            config.node_id,
            root.path().display()
        );
        Ok(Self {
            config: Arc::new(config),
            root,
            executor,
            metrics,
        })
    }

    pub fn node_id(&self) -> &str {
        &self.config.node_id
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn root(&self) -> &NodeRoot {
        &self.root
    }

    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    pub async fn list_files(&self, request: ListFilesRequest) -> FleetResult<ListFilesResponse> {
        request.validate()?;
        let target = self.root.resolve(&request.path)?;
        let root = self.root.clone();
        let options = ListOptions {
            recursive: request.recursive,
            pattern: request.pattern.clone(),
            include_hash: request.include_hash,
        };

        let mut files = blocking(move || list_entries(&root, &target, &options)).await?;
        if let Some(limit) = request.limit {
            files.truncate(limit);
        }
        debug!("列举文件: path={}, count={}", request.path, files.len());
        Ok(ListFilesResponse::new(files))
    }

    pub async fn read_file(&self, request: ReadFileRequest) -> FleetResult<ReadFileResponse> {
        request.validate()?;
        let target = self.existing_file(&request.path).await?;

        let size = tokio::fs::metadata(&target).await?.len();
        let limit = match (request.max_bytes, self.config.max_read_bytes) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        if let Some(limit) = limit {
            if size > limit {
                return Err(FleetError::TooLarge {
                    path: request.path,
                    size,
                    limit,
                });
            }
        }

        let data = tokio::fs::read(&target).await?;
        let content_hash = hash_bytes(&data);
        Ok(ReadFileResponse {
            relative_path: self.root.relative(&target),
            size: data.len() as u64,
            content_hash,
            content: String::from_utf8(data).ok(),
        })
    }

    pub async fn write_file(&self, request: WriteFileRequest) -> FleetResult<WriteFileResponse> {
        request.validate()?;
        let target = self.root.resolve(&request.path)?;
        if target.is_dir() {
            return Err(FleetError::IsADirectory { path: request.path });
        }

        if let Some(parent) = target.parent() {
            if !parent.exists() {
                if !request.create_parent_dirs {
                    return Err(FleetError::NotFound {
                        path: self.root.relative(parent),
                    });
                }
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut backup_path = None;
        if target.exists() {
            if !request.overwrite {
                return Err(FleetError::AlreadyExists { path: request.path });
            }
            if request.backup {
                let backup = backup_path_for(&target);
                tokio::fs::copy(&target, &backup).await?;
                info!("写入前已备份: {} -> {}", target.display(), backup.display());
                backup_path = Some(self.root.relative(&backup));
            }
        }

        let data = request.content.into_bytes();
        tokio::fs::write(&target, &data).await?;
        Ok(WriteFileResponse {
            success: true,
            relative_path: self.root.relative(&target),
            bytes_written: data.len() as u64,
            content_hash: hash_bytes(&data),
            backup_path,
        })
    }

    pub async fn execute_command(&self, request: ExecuteCommandRequest) -> FleetResult<CommandOutput> {
        request.validate()?;
        self.executor.execute(&request).await
    }

    /// 把根目录下的路径复制到一个或多个已命名的同步目标
    ///
    /// 目标名在复制开始前全部校验，未知目标不会留下部分结果。
    pub async fn sync_files(&self, request: SyncFilesRequest) -> FleetResult<SyncFilesResponse> {
        request.validate()?;
        let source = self.root.resolve(&request.source_path)?;
        if !source.exists() {
            return Err(FleetError::NotFound {
                path: request.source_path,
            });
        }

        let source_rel = self.root.relative(&source);
        let mut destinations = Vec::with_capacity(request.targets.len());
        for name in &request.targets {
            let dir = self
                .config
                .sync_targets
                .get(name)
                .ok_or_else(|| FleetError::UnknownSyncTarget {
                    target: name.clone(),
                })?;
            let dest = if source_rel == "." {
                dir.clone()
            } else {
                dir.join(&source_rel)
            };
            if paths_overlap(&source, &dest)? {
                return Err(FleetError::validation(format!(
                    "同步目标 {name} 与源路径重叠: {}",
                    dest.display()
                )));
            }
            destinations.push((name.clone(), dest));
        }

        let mut targets = Vec::with_capacity(destinations.len());
        for (name, dest) in destinations {
            let started = Instant::now();
            let (src, dst, strategy) = (source.clone(), dest.clone(), request.strategy);
            let stats = blocking(move || copy_tree(&src, &dst, strategy).map_err(FleetError::from)).await?;
            let duration = started.elapsed().as_secs_f64();

            info!(
                "同步完成: target={}, files={}, bytes={}, strategy={}",
                name, stats.files, stats.bytes, strategy
            );
            targets.push(SyncTargetReport {
                target: name,
                dest_path: dest.to_string_lossy().into_owned(),
                files_synced: stats.files,
                bytes_copied: stats.bytes,
                duration,
            });
        }

        Ok(SyncFilesResponse {
            source: source_rel,
            strategy: request.strategy,
            targets,
        })
    }

    pub async fn get_node_info(&self) -> FleetResult<NodeInfo> {
        let collector = self.metrics.clone();
        let metrics = blocking(move || Ok(collector.sample())).await?;

        Ok(NodeInfo {
            node_id: self.config.node_id.clone(),
            tags: self.config.tags.clone(),
            description: self.config.description.clone(),
            root_dir: self.root.path().to_string_lossy().into_owned(),
            allowed_commands: self.executor.allowed_commands().to_vec(),
            sync_targets: self
                .config
                .sync_targets
                .iter()
                .map(|(name, path)| (name.clone(), path.to_string_lossy().into_owned()))
                .collect(),
            metrics,
            platform: platform_info(),
            timestamp: Utc::now(),
        })
    }

    async fn existing_file(&self, requested: &str) -> FleetResult<PathBuf> {
        let target = self.root.resolve(requested)?;
        match tokio::fs::metadata(&target).await {
            Ok(meta) if meta.is_dir() => Err(FleetError::IsADirectory {
                path: requested.to_string(),
            }),
            Ok(_) => Ok(target),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FleetError::NotFound {
                path: requested.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// `<name>.bak.<unix秒>`，同一秒内重复备份时追加序号
fn backup_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let timestamp = Utc::now().timestamp();
    let mut candidate = target.with_file_name(format!("{name}.bak.{timestamp}"));
    let mut counter = 1;
    while candidate.exists() {
        candidate = target.with_file_name(format!("{name}.bak.{timestamp}.{counter}"));
        counter += 1;
    }
    candidate
}

async fn blocking<T, F>(f: F) -> FleetResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> FleetResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| FleetError::Internal(format!("后台任务失败: {e}")))?
}
