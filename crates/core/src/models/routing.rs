use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::command::{CommandLine, CommandResult};

/// 扇出模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanOutMode {
    Single,
    Parallel,
}

impl fmt::Display for FanOutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FanOutMode::Single => f.write_str("single"),
            FanOutMode::Parallel => f.write_str("parallel"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterRequest {
    pub task: String,
    #[serde(default)]
    pub required_tags: Vec<String>,
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
}

impl RouterRequest {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            required_tags: Vec::new(),
            parallelism: 1,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.required_tags = tags;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterDecision {
    /// 按优先顺序排列
    pub nodes: Vec<String>,
    pub mode: FanOutMode,
    pub reason: String,
}

/// 编排器的命令执行请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub description: String,
    pub command: CommandLine,
    #[serde(default)]
    pub preferred_tags: Vec<String>,
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// 秒；为空时按命令长度估算
    #[serde(default)]
    pub timeout: Option<f64>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl CommandRequest {
    pub fn new(command: impl Into<CommandLine>) -> Self {
        Self {
            description: String::new(),
            command: command.into(),
            preferred_tags: Vec::new(),
            parallelism: 1,
            timeout: None,
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.preferred_tags = tags;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    /// 给路由器看的任务描述，没有描述时用命令本身
    pub fn task(&self) -> String {
        if self.description.trim().is_empty() {
            self.command.to_string()
        } else {
            self.description.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub nodes: Vec<String>,
    pub mode: FanOutMode,
    /// 秒
    pub timeout: f64,
    pub reason: String,
    pub router_reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub execution_id: Uuid,
    pub plan: ExecutionPlan,
    pub results: Vec<CommandResult>,
}

fn default_parallelism() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_request_defaults() {
        let request: CommandRequest = serde_json::from_str(r#"{"command":"ls -la"}"#).unwrap();
        assert_eq!(request.parallelism, 1);
        assert!(request.timeout.is_none());
        assert_eq!(request.task(), "ls -la");
    }

    #[test]
    fn test_description_is_preferred_as_task() {
        let request = CommandRequest::new(vec!["ls"]).with_description("list workspace");
        assert_eq!(request.task(), "list workspace");
    }

    #[test]
    fn test_fan_out_mode_wire_name() {
        assert_eq!(
            serde_json::to_string(&FanOutMode::Parallel).unwrap(),
            "\"parallel\""
        );
        assert_eq!(FanOutMode::Single.to_string(), "single");
    }
}
