use crate::config::ConfigError;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// 默认的请求方式集合，用于生成“不支持的请求方式”用例
pub const DEFAULT_METHODS: [&str; 5] = ["GET", "POST", "DELETE", "PUT", "TRACE"];

/// 完整的运行配置 (rucase.toml)
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// 接口环境地址
    pub api_envi: ApiEnvironment,

    /// 请求相关配置
    pub request: RequestSettings,

    /// 提取存储配置
    pub store: StoreSettings,

    /// 测试数据目录配置
    pub data: DataSettings,
}

/// `[api_envi]`：host 以及其他具名地址
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ApiEnvironment {
    #[serde(flatten)]
    pub hosts: HashMap<String, String>,
}

impl ApiEnvironment {
    /// 获取具名地址
    pub fn get(&self, name: &str) -> Result<&str, ConfigError> {
        self.hosts
            .get(name)
            .map(|s| s.as_str())
            .ok_or_else(|| ConfigError::MissingHost(name.to_string()))
    }

    /// 默认地址，未配置时为空字符串（用例 url 写完整地址）
    pub fn host(&self) -> &str {
        self.hosts.get("host").map(|s| s.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RequestSettings {
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,

    /// 失败重试次数（不含首次请求）
    pub retries: u32,

    /// 重试退避基数，第 n 次重试等待 backoff * 2^(n-1)
    #[serde(deserialize_with = "deserialize_duration")]
    pub backoff: Duration,

    /// 请求方式全集
    pub methods: Vec<String>,

    pub verify_tls: bool,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retries: 2,
            backoff: Duration::from_millis(300),
            methods: DEFAULT_METHODS.iter().map(|m| m.to_string()).collect(),
            verify_tls: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".rucase").join("extract.jsonl"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub dir: PathBuf,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw).map_err(serde::de::Error::custom)
}

/// 解析时间字符串（支持 "5s", "1000ms", "2m"）
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidDuration(s.to_string());

    if let Some(ms) = s.strip_suffix("ms") {
        let millis: u64 = ms.trim().parse().map_err(|_| invalid())?;
        Ok(Duration::from_millis(millis))
    } else if let Some(sec) = s.strip_suffix('s') {
        let secs: u64 = sec.trim().parse().map_err(|_| invalid())?;
        Ok(Duration::from_secs(secs))
    } else if let Some(min) = s.strip_suffix('m') {
        let mins: u64 = min.trim().parse().map_err(|_| invalid())?;
        Ok(Duration::from_secs(mins * 60))
    } else {
        Err(invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("xs").is_err());
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.request.timeout, Duration::from_secs(30));
        assert_eq!(settings.request.retries, 2);
        assert_eq!(
            settings.request.methods,
            vec!["GET", "POST", "DELETE", "PUT", "TRACE"]
        );
        assert_eq!(settings.api_envi.host(), "");
    }

    #[test]
    fn test_settings_parse() {
        let toml_str = r#"
[api_envi]
host = "http://localhost:8080"
admin = "http://localhost:9090"

[request]
timeout = "10s"
methods = ["GET", "POST"]

[store]
path = "tmp/extract.jsonl"
"#;

        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.api_envi.host(), "http://localhost:8080");
        assert_eq!(settings.api_envi.get("admin").unwrap(), "http://localhost:9090");
        assert!(settings.api_envi.get("missing").is_err());
        assert_eq!(settings.request.timeout, Duration::from_secs(10));
        // 未配置的字段使用默认值
        assert_eq!(settings.request.retries, 2);
        assert_eq!(settings.request.methods, vec!["GET", "POST"]);
        assert_eq!(settings.store.path, PathBuf::from("tmp/extract.jsonl"));
        assert_eq!(settings.data.dir, PathBuf::from("data"));
    }
}
