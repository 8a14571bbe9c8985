//! 用例间共享的提取数据存储
//!
//! 存储是一个追加写入的 JSON Lines 文件：每次 `write` 追加一行键值映射，
//! 读取时完整加载文件并按行建立索引，同一个 key 以最后一次写入为准。
//! 用例按顺序串行执行，读写不会并发发生；每次操作都会用非阻塞文件锁
//! 检查这一前提，发现并发访问时返回 [`StoreError::Busy`]。

mod storage;

pub use storage::ExtractStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("key '{0}' not found in extract store")]
    NotFound(String),

    #[error("extract store {path} is being accessed concurrently")]
    Busy {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("extract store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("extract store serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
