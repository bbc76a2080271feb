use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::FleetResult;

/// 交给叙述器的上下文
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationContext {
    /// 调用场景，例如 `router`、`planner`、`sync`、`probe`
    pub topic: String,
    pub prompt: String,
    #[serde(default)]
    pub data: Value,
}

impl NarrationContext {
    pub fn new(topic: impl Into<String>, prompt: impl Into<String>, data: Value) -> Self {
        Self {
            topic: topic.into(),
            prompt: prompt.into(),
            data,
        }
    }
}

/// 为路由、计划和同步决策生成说明文字
///
/// 输出只是建议，不参与决策本身。
#[async_trait]
pub trait Narrator: Send + Sync {
    fn name(&self) -> &str;

    async fn narrate(&self, context: &NarrationContext) -> FleetResult<String>;
}
