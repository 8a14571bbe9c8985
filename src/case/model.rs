use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 用例中识别的字段名
pub mod keys {
    pub const CASE_NAME: &str = "case_name";
    pub const METHOD: &str = "method";
    pub const VALIDATION: &str = "validation";
    pub const EXTRACT: &str = "extract";
    pub const EXTRACT_LIST: &str = "extract_list";
    pub const FILES: &str = "files";
    pub const MISSING_FIELDS: &str = "missing_fields";
    pub const SUPPORT: &str = "support";

    pub const DATA: &str = "data";
    pub const JSON: &str = "json";
    pub const PARAMS: &str = "params";

    /// 请求参数容器，按此顺序查找
    pub const PAYLOAD_KEYS: [&str; 3] = [DATA, JSON, PARAMS];
}

/// 接口基本信息 (baseInfo)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseInfo {
    /// 接口名称
    pub api_name: String,

    /// 接口路径，拼接在 [api_envi] host 之后
    pub url: String,

    /// 默认请求方式，用例可单独覆盖
    #[serde(default)]
    pub method: Option<String>,

    /// 请求头，可包含占位符
    #[serde(default)]
    pub header: Value,

    /// Cookie，可包含占位符
    #[serde(default)]
    pub cookies: Option<Value>,
}

/// 用例文件中的一个接口块
#[derive(Debug, Clone, Deserialize)]
pub struct CaseBlock {
    #[serde(rename = "baseInfo")]
    pub base_info: BaseInfo,

    /// 原始用例声明，保持声明中的字段顺序
    #[serde(rename = "testCase", default)]
    pub test_case: Vec<Map<String, Value>>,
}

/// 展开后的独立用例：接口信息 + 用例声明的完整副本
#[derive(Debug, Clone, PartialEq)]
pub struct CaseVariant {
    pub base_info: BaseInfo,
    pub case: Map<String, Value>,
}

impl CaseVariant {
    pub fn new(base_info: BaseInfo, case: Map<String, Value>) -> Self {
        Self { base_info, case }
    }

    /// 用例名称
    pub fn name(&self) -> &str {
        self.case
            .get(keys::CASE_NAME)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// 请求方式，未指定时使用 baseInfo 中的默认方式
    pub fn method(&self) -> Option<&str> {
        self.case
            .get(keys::METHOD)
            .and_then(Value::as_str)
            .or(self.base_info.method.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_info() -> BaseInfo {
        BaseInfo {
            api_name: "login".to_string(),
            url: "/api/login".to_string(),
            method: Some("POST".to_string()),
            header: json!({"Content-Type": "application/json"}),
            cookies: None,
        }
    }

    #[test]
    fn test_variant_method_fallback() {
        let case = json!({"case_name": "ok"}).as_object().unwrap().clone();
        let variant = CaseVariant::new(base_info(), case);
        assert_eq!(variant.name(), "ok");
        assert_eq!(variant.method(), Some("POST"));

        let case = json!({"case_name": "get", "method": "GET"})
            .as_object()
            .unwrap()
            .clone();
        let variant = CaseVariant::new(base_info(), case);
        assert_eq!(variant.method(), Some("GET"));
    }

    #[test]
    fn test_variant_without_name() {
        let variant = CaseVariant::new(base_info(), Map::new());
        assert_eq!(variant.name(), "");
    }
}
