//! 响应数据提取
//!
//! `extract` / `extract_list` 中的表达式按自身语法区分正则与 JSONPath，
//! 提取结果写入 [`ExtractStore`](crate::store::ExtractStore)。
//! 提取失败不会中断用例，而是写入 `NOT_FOUND: ...` 哨兵字符串。

pub mod classify;
pub mod extractor;

pub use classify::{ExpressionKind, classify};
pub use extractor::{ExtractDirective, ResponseExtractor};

/// 哨兵前缀，提取失败时写入存储的字符串以此开头
pub const SENTINEL_PREFIX: &str = "NOT_FOUND";

/// 可恢复的提取错误，最终都会转换为哨兵值
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("invalid regex: {0}")]
    Regex(#[from] regex::Error),

    #[error("regex has no capture group")]
    NoGroup,

    #[error("regex did not match")]
    NoMatch,

    #[error("response is not JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("invalid path query: {0}")]
    InvalidPath(String),

    #[error("path query yielded no result")]
    Empty,
}

impl ExtractError {
    /// 转换为写入存储的哨兵字符串，包含原始表达式
    pub fn sentinel(&self, expression: &str) -> String {
        match self {
            ExtractError::Empty => {
                format!("{}: path query yielded no result: {}", SENTINEL_PREFIX, expression)
            }
            _ => format!(
                "{}: response is not JSON or path query failed: {}",
                SENTINEL_PREFIX, expression
            ),
        }
    }
}
