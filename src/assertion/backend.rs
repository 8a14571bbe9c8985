use crate::assertion::AssertError;
use serde_json::Value;

/// `db` 断言使用的查询后端
///
/// 返回 `Some` 表示查询到了结果集，`None` 表示没有结果。
pub trait QueryBackend: Send + Sync {
    fn query(&self, sql: &str) -> Result<Option<Vec<Value>>, AssertError>;
}

impl<F> QueryBackend for F
where
    F: Fn(&str) -> Result<Option<Vec<Value>>, AssertError> + Send + Sync,
{
    fn query(&self, sql: &str) -> Result<Option<Vec<Value>>, AssertError> {
        self(sql)
    }
}
