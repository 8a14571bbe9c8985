pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::{
    ApiEnvironment, DataSettings, RequestSettings, Settings, StoreSettings, parse_duration,
};

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Host '{0}' is not configured in [api_envi]")]
    MissingHost(String),
}
