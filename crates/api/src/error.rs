use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fleet_core::{ErrorKind, FleetError};
use serde_json::json;

/// 节点服务器的错误响应
///
/// 响应体为 `{error, kind, details}`，`kind` 让网络客户端还原错误类别。
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Fleet(#[from] FleetError),

    #[error("请求体无效: {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("缺少或错误的访问令牌")]
    Unauthorized,

    #[error("工具不存在: {0}")]
    UnknownTool(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, ErrorKind) {
        match self {
            ApiError::Fleet(err) => {
                let kind = err.kind();
                let status = StatusCode::from_u16(kind.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, kind)
            }
            ApiError::Rejected { status, .. } => {
                let kind = if *status == StatusCode::PAYLOAD_TOO_LARGE {
                    ErrorKind::TooLarge
                } else {
                    ErrorKind::ValidationFailed
                };
                // 语法正确但字段不符的JSON统一按400返回
                (StatusCode::from_u16(kind.status_code()).unwrap_or(*status), kind)
            }
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, ErrorKind::PermissionDenied),
            ApiError::UnknownTool(_) => (StatusCode::NOT_FOUND, ErrorKind::NotFound),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let details = match &self {
            ApiError::Rejected { message, .. } => json!(message),
            _ => serde_json::Value::Null,
        };

        if status.is_server_error() {
            tracing::error!("请求处理失败: {}", self);
        } else {
            tracing::debug!("请求被拒绝: status={}, kind={}, error={}", status, kind, self);
        }

        let body = json!({
            "error": self.to_string(),
            "kind": kind,
            "details": details,
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fleet_error_status_mapping() {
        let cases = [
            (FleetError::NotFound { path: "a".into() }, StatusCode::NOT_FOUND),
            (FleetError::AlreadyExists { path: "a".into() }, StatusCode::CONFLICT),
            (FleetError::PathEscapesRoot { path: "..".into() }, StatusCode::FORBIDDEN),
            (FleetError::PermissionDenied { command: "rm".into() }, StatusCode::FORBIDDEN),
            (FleetError::Timeout { seconds: 1.0 }, StatusCode::GATEWAY_TIMEOUT),
            (FleetError::validation("bad"), StatusCode::BAD_REQUEST),
            (FleetError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }

    #[test]
    fn test_unauthorized_status() {
        assert_eq!(
            ApiError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
