pub mod expander;
pub mod loader;
pub mod model;

pub use expander::CaseExpander;
pub use loader::CaseLoader;
pub use model::{BaseInfo, CaseBlock, CaseVariant, keys};

/// 用例文件错误类型
#[derive(Debug, thiserror::Error)]
pub enum CaseError {
    #[error("Failed to read case file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid case file: {0}")]
    Format(String),

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}
