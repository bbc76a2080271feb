use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ErrorKind, FleetError, FleetResult};

/// 待执行的命令
///
/// 线上格式兼容两种写法：参数数组 `["ls", "-la"]` 或 shell 风格字符串 `"ls -la"`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
    Argv(Vec<String>),
    Shell(String),
}

impl CommandLine {
    /// 拆分为参数数组，空命令视为无效请求
    pub fn argv(&self) -> FleetResult<Vec<String>> {
        let argv = match self {
            CommandLine::Argv(args) => args.clone(),
            CommandLine::Shell(line) => shlex::split(line)
                .ok_or_else(|| FleetError::validation(format!("无法解析命令: {line}")))?,
        };

        match argv.first() {
            Some(program) if !program.trim().is_empty() => Ok(argv),
            _ => Err(FleetError::validation("命令不能为空")),
        }
    }

    /// 可执行文件的基本名，允许列表按它匹配
    pub fn program_basename(&self) -> FleetResult<String> {
        let argv = self.argv()?;
        let program = &argv[0];
        Ok(Path::new(program)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.clone()))
    }

    /// 命令的文本表示，超时估算按它的长度计算
    pub fn repr(&self) -> String {
        match self {
            CommandLine::Argv(args) => format!("{args:?}"),
            CommandLine::Shell(line) => line.clone(),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandLine::Argv(args) => {
                let joined = shlex::try_join(args.iter().map(String::as_str))
                    .unwrap_or_else(|_| args.join(" "));
                f.write_str(&joined)
            }
            CommandLine::Shell(line) => f.write_str(line),
        }
    }
}

impl From<&str> for CommandLine {
    fn from(line: &str) -> Self {
        CommandLine::Shell(line.to_string())
    }
}

impl From<String> for CommandLine {
    fn from(line: String) -> Self {
        CommandLine::Shell(line)
    }
}

impl From<Vec<String>> for CommandLine {
    fn from(args: Vec<String>) -> Self {
        CommandLine::Argv(args)
    }
}

impl From<Vec<&str>> for CommandLine {
    fn from(args: Vec<&str>) -> Self {
        CommandLine::Argv(args.into_iter().map(str::to_string).collect())
    }
}

/// 节点返回的命令执行结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutput {
    #[serde(default)]
    pub command: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// 秒
    pub duration: f64,
    /// 实际工作目录，相对于节点根目录
    #[serde(default)]
    pub cwd: Option<String>,
}

/// 单个节点调用失败的原因
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&FleetError> for CommandFailure {
    fn from(err: &FleetError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// 编排器聚合后的单节点执行结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub node_id: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<CommandFailure>,
}

impl CommandResult {
    pub fn from_output(node_id: impl Into<String>, output: CommandOutput) -> Self {
        Self {
            node_id: node_id.into(),
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
            duration: output.duration,
            failure: None,
        }
    }

    /// 节点调用本身失败（不可达、被拒绝、超时）时没有进程退出码，记为 -1
    pub fn from_error(node_id: impl Into<String>, err: &FleetError, duration: f64) -> Self {
        Self {
            node_id: node_id.into(),
            stdout: String::new(),
            stderr: err.to_string(),
            exit_code: -1,
            duration,
            failure: Some(CommandFailure::from(err)),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none() && self.exit_code == 0
    }
}
