use crate::case::{CaseBlock, CaseError, CaseExpander, CaseVariant};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// YAML 用例文件加载器
pub struct CaseLoader;

impl CaseLoader {
    /// 读取并解析用例文件
    pub fn parse_file(path: &Path) -> Result<Vec<CaseBlock>, CaseError> {
        let content = std::fs::read_to_string(path).map_err(|source| CaseError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_content(&content)
    }

    /// 解析用例文本
    ///
    /// 根节点为列表时每项是一个接口块，为映射时整体作为一个接口块，空文件返回空列表。
    pub fn parse_content(content: &str) -> Result<Vec<CaseBlock>, CaseError> {
        if content.lines().all(|l| {
            let line = l.trim();
            line.is_empty() || line.starts_with('#') || line == "---"
        }) {
            return Ok(Vec::new());
        }

        let root: Value = serde_yaml::from_str(content)?;

        let items = match root {
            Value::Null => return Ok(Vec::new()),
            Value::Array(items) => items,
            Value::Object(_) => vec![root],
            other => {
                return Err(CaseError::Format(format!(
                    "expected a mapping or a list of mappings, got {}",
                    other
                )));
            }
        };

        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| Self::parse_block(index, item))
            .collect()
    }

    fn parse_block(index: usize, item: Value) -> Result<CaseBlock, CaseError> {
        let Value::Object(map) = &item else {
            return Err(CaseError::Format(format!(
                "entry {} is not a mapping",
                index
            )));
        };

        match map.get("baseInfo") {
            None | Some(Value::Null) => return Err(CaseError::MissingField("baseInfo")),
            Some(Value::Object(_)) => {}
            Some(_) => {
                return Err(CaseError::InvalidField {
                    field: "baseInfo".to_string(),
                    reason: "must be a mapping".to_string(),
                });
            }
        }

        serde_json::from_value(item).map_err(|e| CaseError::InvalidField {
            field: format!("entry {}", index),
            reason: e.to_string(),
        })
    }

    /// 加载文件并展开为独立用例，按声明顺序排列
    pub fn collect(path: &Path, expander: &CaseExpander) -> Result<Vec<CaseVariant>, CaseError> {
        let blocks = Self::parse_file(path)?;
        let variants = Self::expand_blocks(blocks, expander);
        debug!(
            "Loaded {} case(s) from {}",
            variants.len(),
            path.display()
        );
        Ok(variants)
    }

    /// 展开已解析的接口块
    pub fn expand_blocks(blocks: Vec<CaseBlock>, expander: &CaseExpander) -> Vec<CaseVariant> {
        blocks
            .into_iter()
            .flat_map(|block| {
                let base_info = block.base_info;
                block
                    .test_case
                    .iter()
                    .flat_map(|case| expander.expand(case))
                    .map(|case| CaseVariant::new(base_info.clone(), case))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const LOGIN_YAML: &str = r#"
- baseInfo:
    api_name: login
    url: /api/login
    method: POST
    header:
      Content-Type: application/json
  testCase:
    - case_name: login ok
      json:
        user: admin
        pwd: secret
      validation:
        - contains: {status_code: 200}
      extract:
        token: $.token
    - case_name: login missing
      json:
        user: admin
        pwd: secret
      missing_fields: [pwd]
"#;

    fn expander() -> CaseExpander {
        CaseExpander::new(["GET", "POST", "DELETE", "PUT", "TRACE"])
    }

    #[test]
    fn test_parse_list_root() {
        let blocks = CaseLoader::parse_content(LOGIN_YAML).unwrap();
        assert_eq!(blocks.len(), 1);

        let block = &blocks[0];
        assert_eq!(block.base_info.api_name, "login");
        assert_eq!(block.base_info.method.as_deref(), Some("POST"));
        assert_eq!(block.test_case.len(), 2);

        // 保持声明顺序
        let keys: Vec<&str> = block.test_case[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["case_name", "json", "validation", "extract"]);
    }

    #[test]
    fn test_parse_mapping_root() {
        let yaml = r#"
baseInfo:
  api_name: ping
  url: /ping
testCase:
  - case_name: ping
"#;
        let blocks = CaseLoader::parse_content(yaml).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].base_info.method, None);
        assert_eq!(blocks[0].base_info.header, Value::Null);
    }

    #[test]
    fn test_parse_empty_content() {
        assert!(CaseLoader::parse_content("").unwrap().is_empty());
        assert!(CaseLoader::parse_content("# only comment\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            CaseLoader::parse_content("42"),
            Err(CaseError::Format(_))
        ));
        assert!(matches!(
            CaseLoader::parse_content("- testCase: []"),
            Err(CaseError::MissingField("baseInfo"))
        ));
        assert!(matches!(
            CaseLoader::parse_content("- baseInfo: 1"),
            Err(CaseError::InvalidField { .. })
        ));
        assert!(matches!(
            CaseLoader::parse_content("- baseInfo: {url: /x}"),
            Err(CaseError::InvalidField { .. })
        ));
        assert!(matches!(
            CaseLoader::parse_content("key: [unclosed"),
            Err(CaseError::Yaml(_))
        ));
    }

    #[test]
    fn test_collect_expands_cases() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(LOGIN_YAML.as_bytes()).unwrap();

        let variants = CaseLoader::collect(file.path(), &expander()).unwrap();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].name(), "login ok");
        assert_eq!(variants[1].name(), "login missing[pwd]");
        assert_eq!(variants[1].case["json"], json!({"user": "admin"}));
        assert_eq!(variants[1].method(), Some("POST"));
    }

    #[test]
    fn test_collect_missing_file() {
        let result = CaseLoader::collect(Path::new("/nonexistent/cases.yaml"), &expander());
        assert!(matches!(result, Err(CaseError::Io { .. })));
    }
}
