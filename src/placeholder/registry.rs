use crate::placeholder::{ExtractorError, PlaceholderError};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// 提取函数：接收位置参数，返回结构化结果
pub type ExtractorFn = Box<dyn Fn(&[String]) -> Result<Value, ExtractorError> + Send + Sync>;

/// 提取函数注册表，名称 -> 函数
#[derive(Default)]
pub struct ExtractorRegistry {
    functions: HashMap<String, ExtractorFn>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册提取函数，同名覆盖
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[String]) -> Result<Value, ExtractorError> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Box::new(f));
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// 按名称调用
    pub fn call(&self, name: &str, args: &[String]) -> Result<Value, PlaceholderError> {
        let f = self
            .functions
            .get(name)
            .ok_or_else(|| PlaceholderError::Unregistered(name.to_string()))?;

        f(args).map_err(|source| PlaceholderError::Extractor {
            name: name.to_string(),
            source,
        })
    }
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_and_call() {
        let mut registry = ExtractorRegistry::new();
        registry.register("echo", |args: &[String]| Ok(json!(args.join("+"))));

        assert_eq!(registry.names(), vec!["echo"]);
        let value = registry
            .call("echo", &["a".to_string(), "b".to_string()])
            .unwrap();
        assert_eq!(value, json!("a+b"));
    }

    #[test]
    fn test_unregistered() {
        let registry = ExtractorRegistry::new();
        let result = registry.call("missing", &[]);
        assert!(matches!(result, Err(PlaceholderError::Unregistered(name)) if name == "missing"));
    }

    #[test]
    fn test_extractor_failure_is_wrapped() {
        let mut registry = ExtractorRegistry::new();
        registry.register("fail", |_: &[String]| {
            Err(ExtractorError::InvalidArgument("boom".to_string()))
        });

        let result = registry.call("fail", &[]);
        assert!(matches!(result, Err(PlaceholderError::Extractor { ref name, .. }) if name == "fail"));
    }
}
