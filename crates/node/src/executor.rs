use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fleet_core::{CommandOutput, ExecuteCommandRequest, FleetError, FleetResult};
use tokio::process::Command;
use tracing::{info, warn};

use crate::paths::NodeRoot;

/// 受允许列表约束的命令执行器
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    root: NodeRoot,
    allowed_commands: Arc<Vec<String>>,
    spawned: Arc<AtomicU64>,
}

impl CommandExecutor {
    pub fn new(root: NodeRoot, allowed_commands: Vec<String>) -> Self {
        Self {
            root,
            allowed_commands: Arc::new(allowed_commands),
            spawned: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn allowed_commands(&self) -> &[String] {
        &self.allowed_commands
    }

    /// 已启动的进程数
    pub fn spawn_count(&self) -> u64 {
        self.spawned.load(Ordering::Relaxed)
    }

    /// 执行命令
    ///
    /// 可执行文件的基本名不在允许列表中时直接拒绝，不会启动进程。
    /// 超时后子进程随future一起被丢弃并终止。
    pub async fn execute(&self, request: &ExecuteCommandRequest) -> FleetResult<CommandOutput> {
        let argv = request.command.argv()?;
        let program = request.command.program_basename()?;
        if !self.allowed_commands.iter().any(|c| c == &program) {
            warn!("拒绝执行不在允许列表中的命令: {}", program);
            return Err(FleetError::PermissionDenied { command: program });
        }

        let cwd = self.working_dir(request.cwd.as_deref())?;

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..])
            .current_dir(&cwd)
            .envs(&request.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!(
            "执行命令: command={:?}, cwd={}, timeout={}s",
            argv,
            cwd.display(),
            request.timeout
        );

        let start_time = Instant::now();
        let child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FleetError::NotFound {
                path: argv[0].clone(),
            },
            _ => FleetError::Io(e),
        })?;
        self.spawned.fetch_add(1, Ordering::Relaxed);

        let output = match tokio::time::timeout(
            Duration::from_secs_f64(request.timeout),
            child.wait_with_output(),
        )
        .await
        {
            Ok(output) => output?,
            Err(_) => {
                warn!("命令执行超时: command={:?}, timeout={}s", argv, request.timeout);
                return Err(FleetError::Timeout {
                    seconds: request.timeout,
                });
            }
        };

        let duration = start_time.elapsed().as_secs_f64();
        // 被信号终止的进程没有退出码
        let exit_code = output.status.code().unwrap_or(-1);

        info!(
            "命令执行完成: command={:?}, exit_code={}, duration={:.3}s",
            argv, exit_code, duration
        );

        Ok(CommandOutput {
            command: argv,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code,
            duration,
            cwd: Some(self.root.relative(&cwd)),
        })
    }

    fn working_dir(&self, requested: Option<&str>) -> FleetResult<PathBuf> {
        let cwd = match requested {
            Some(path) => self.root.resolve(path)?,
            None => self.root.path().to_path_buf(),
        };
        if !cwd.is_dir() {
            return Err(FleetError::NotFound {
                path: self.root.relative(&cwd),
            });
        }
        Ok(cwd)
    }
}
