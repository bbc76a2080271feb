use std::sync::Arc;

use async_trait::async_trait;
use fleet_config::{NarratorConfig, NarratorKind};
use fleet_core::{FleetError, FleetResult, NarrationContext, Narrator};
use fleet_infrastructure::HttpNarrator;
use serde_json::Value;

/// 不依赖外部服务的确定性叙述器
pub struct HeuristicNarrator;

impl HeuristicNarrator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HeuristicNarrator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Narrator for HeuristicNarrator {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn narrate(&self, context: &NarrationContext) -> FleetResult<String> {
        let text = match context.topic.as_str() {
            "router" => {
                let summary: Vec<String> = context
                    .data
                    .get("selected")
                    .and_then(Value::as_array)
                    .map(|nodes| {
                        nodes
                            .iter()
                            .filter_map(|node| {
                                let id = node.get("node_id")?.as_str()?;
                                let cpu = node.get("cpu_percent")?.as_f64()?;
                                Some(format!("{id} (cpu {cpu:.1}%)"))
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                if summary.is_empty() {
                    return Err(FleetError::NarratorUnavailable(
                        "没有可叙述的候选节点".to_string(),
                    ));
                }
                format!("Selected {} based on lowest CPU utilization", summary.join(", "))
            }
            "probe" => format!("heuristic narrator is available: {}", context.prompt),
            _ => context.prompt.clone(),
        };
        Ok(text)
    }
}

/// 总是不可用，调用方使用各自的回退文字
pub struct DisabledNarrator;

#[async_trait]
impl Narrator for DisabledNarrator {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn narrate(&self, _context: &NarrationContext) -> FleetResult<String> {
        Err(FleetError::NarratorUnavailable("叙述器已禁用".to_string()))
    }
}

pub fn build_narrator(config: &NarratorConfig) -> FleetResult<Arc<dyn Narrator>> {
    Ok(match config.kind {
        NarratorKind::Heuristic => Arc::new(HeuristicNarrator::new()),
        NarratorKind::Http => Arc::new(HttpNarrator::from_config(config)?),
        NarratorKind::Disabled => Arc::new(DisabledNarrator),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::ErrorKind;
    use serde_json::json;

    #[tokio::test]
    async fn test_heuristic_router_text() {
        let context = NarrationContext::new(
            "router",
            "pick nodes",
            json!({"selected": [{"node_id": "n1", "cpu_percent": 10.0}]}),
        );
        let text = HeuristicNarrator::new().narrate(&context).await.unwrap();
        assert_eq!(text, "Selected n1 (cpu 10.0%) based on lowest CPU utilization");
    }

    #[tokio::test]
    async fn test_disabled_narrator_is_unavailable() {
        let context = NarrationContext::new("probe", "ping", Value::Null);
        let err = DisabledNarrator.narrate(&context).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NarratorUnavailable);
    }

    #[test]
    fn test_build_from_config() {
        let narrator = build_narrator(&NarratorConfig::default()).unwrap();
        assert_eq!(narrator.name(), "heuristic");

        let config = NarratorConfig {
            kind: NarratorKind::Disabled,
            ..Default::default()
        };
        assert_eq!(build_narrator(&config).unwrap().name(), "disabled");

        let config = NarratorConfig {
            kind: NarratorKind::Http,
            ..Default::default()
        };
        assert!(build_narrator(&config).is_err());
    }
}
