use thiserror::Error;

#[derive(Error, Debug)]
pub enum RucaseError {
    #[error("配置错误: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("用例文件错误: {0}")]
    Case(#[from] crate::case::CaseError),

    #[error("提取存储错误: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("占位符解析错误: {0}")]
    Placeholder(#[from] crate::placeholder::PlaceholderError),

    #[error("断言错误: {0}")]
    Assert(#[from] crate::assertion::AssertError),

    #[error("请求失败: {0}")]
    Transport(#[from] crate::http::TransportError),

    #[error("用例执行失败: {0}")]
    Run(#[from] crate::runner::RunError),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON 解析错误: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for RucaseError {
    fn from(err: anyhow::Error) -> Self {
        RucaseError::Other(err.to_string())
    }
}

/// Result type for rucase crate
pub type Result<T> = std::result::Result<T, RucaseError>;
