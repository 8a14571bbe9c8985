//! `${name(args)}` 占位符解析
//!
//! 用例中的 header、cookies、validation 以及请求参数都可以引用
//! 已注册的提取函数，例如 `${get_extract_data(token)}`、`${timestamp()}`。

mod builtins;
mod registry;
mod resolver;

pub use builtins::register_builtins;
pub use registry::{ExtractorFn, ExtractorRegistry};
pub use resolver::PlaceholderResolver;

use crate::config::ConfigError;
use crate::store::StoreError;

/// 提取函数执行失败
#[derive(Debug, thiserror::Error)]
pub enum ExtractorError {
    #[error("expected {expected} argument(s), got {actual}")]
    Arity { expected: String, actual: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// 占位符解析错误，均视为用例配置错误
#[derive(Debug, thiserror::Error)]
pub enum PlaceholderError {
    #[error("malformed reference '{reference}': {reason}")]
    Malformed { reference: String, reason: String },

    #[error("unregistered extractor '{0}'")]
    Unregistered(String),

    #[error("extractor '{name}' failed: {source}")]
    Extractor {
        name: String,
        #[source]
        source: ExtractorError,
    },

    #[error("failed to serialize value: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("resolved text is not valid JSON: {0}")]
    Reparse(#[source] serde_json::Error),
}
