use std::time::Duration;

use async_trait::async_trait;
use fleet_config::NarratorConfig;
use fleet_core::{FleetError, FleetResult, NarrationContext, Narrator};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    context: &'a NarrationContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

/// 远端补全服务
///
/// POST `{prompt, context, model?}`，响应中的 `text`、`response`、`content` 或
/// `output` 字段作为叙述文字。
pub struct HttpNarrator {
    endpoint: String,
    model: Option<String>,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl HttpNarrator {
    pub fn new(endpoint: impl Into<String>, model: Option<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            model,
            timeout,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &NarratorConfig) -> FleetResult<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| FleetError::config("HTTP叙述器缺少 endpoint"))?;
        Ok(Self::new(
            endpoint,
            config.model.clone(),
            Duration::from_secs_f64(config.timeout_seconds),
        ))
    }
}

#[async_trait]
impl Narrator for HttpNarrator {
    fn name(&self) -> &str {
        "http"
    }

    async fn narrate(&self, context: &NarrationContext) -> FleetResult<String> {
        let body = CompletionRequest {
            prompt: &context.prompt,
            context,
            model: self.model.as_deref(),
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FleetError::NarratorUnavailable(format!("请求失败: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FleetError::NarratorUnavailable(format!("HTTP {status}")));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| FleetError::NarratorUnavailable(format!("响应解析失败: {e}")))?;
        let text = extract_text(&value)
            .ok_or_else(|| FleetError::NarratorUnavailable("响应中没有文本".to_string()))?;
        debug!("叙述完成: topic={}, chars={}", context.topic, text.len());
        Ok(text)
    }
}

fn extract_text(value: &Value) -> Option<String> {
    if let Some(text) = value.as_str() {
        return non_empty(text);
    }
    ["text", "response", "content", "output"]
        .iter()
        .filter_map(|key| value.get(key).and_then(Value::as_str))
        .find_map(non_empty)
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_text() {
        assert_eq!(extract_text(&json!({"text": " chose n1 "})).as_deref(), Some("chose n1"));
        assert_eq!(extract_text(&json!({"response": "ok"})).as_deref(), Some("ok"));
        assert_eq!(extract_text(&json!("plain")).as_deref(), Some("plain"));
        assert!(extract_text(&json!({"text": "   "})).is_none());
        assert!(extract_text(&json!({"other": 1})).is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let narrator = HttpNarrator::new("http://127.0.0.1:1/complete", None, Duration::from_secs(2));
        let context = NarrationContext::new("router", "pick", json!({}));
        let err = narrator.narrate(&context).await.unwrap_err();
        assert_eq!(err.kind(), fleet_core::ErrorKind::NarratorUnavailable);
    }
}
