use crate::{ConfigError, ConfigResult};

/// 配置校验接口
pub trait ConfigValidator {
    fn validate(&self) -> ConfigResult<()>;
}

/// 通用校验工具
pub struct ValidationUtils;

impl ValidationUtils {
    pub fn validate_not_empty(value: &str, field_name: &str) -> ConfigResult<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{field_name} 不能为空")));
        }
        Ok(())
    }

    /// 秒数必须为正且不超过上限
    pub fn validate_seconds(value: f64, max: f64, field_name: &str) -> ConfigResult<()> {
        if !value.is_finite() || value <= 0.0 {
            return Err(ConfigError::Validation(format!("{field_name} 必须大于0")));
        }
        if value > max {
            return Err(ConfigError::Validation(format!(
                "{field_name} 不能超过 {max} 秒"
            )));
        }
        Ok(())
    }

    pub fn validate_count(count: usize, min: usize, max: usize, field_name: &str) -> ConfigResult<()> {
        if count < min || count > max {
            return Err(ConfigError::Validation(format!(
                "{field_name} 必须在 {min} 到 {max} 之间"
            )));
        }
        Ok(())
    }

    pub fn validate_url(url: &str, field_name: &str) -> ConfigResult<()> {
        Self::validate_not_empty(url, field_name)?;
        let lower = url.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "{field_name} 必须是 http:// 或 https:// 开头的URL"
            )));
        }
        Ok(())
    }

    pub fn validate_socket_addr(addr: &str, field_name: &str) -> ConfigResult<()> {
        addr.parse::<std::net::SocketAddr>()
            .map(|_| ())
            .map_err(|e| ConfigError::Validation(format!("{field_name} 不是合法的地址 {addr}: {e}")))
    }
}
