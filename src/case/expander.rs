use crate::case::model::keys;
use crate::config::RequestSettings;
use crate::utils::value::to_text;
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use tracing::{error, warn};

type Case = Map<String, Value>;

/// 用例展开器
///
/// - `missing_fields`：每个字段生成一条缺失/置空/置 null 的用例
/// - `support`：为请求方式全集中不支持的每个方式生成一条期望 405 的用例
///
/// 两条规则互不叉乘，结果按 missing_fields、support 的顺序拼接。
#[derive(Debug, Clone)]
pub struct CaseExpander {
    methods: Vec<String>,
}

/// 缺失字段的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissingMode {
    Remove,
    Empty,
    Null,
}

#[derive(Debug, Clone)]
struct MissingField {
    field: String,
    mode: MissingMode,
    value: Option<Value>,
    container: Option<String>,
    label: Option<String>,
}

impl CaseExpander {
    pub fn new<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let methods = methods
            .into_iter()
            .map(|m| m.as_ref().trim().to_uppercase())
            .filter(|m| !m.is_empty())
            .collect();
        Self { methods }
    }

    pub fn from_settings(settings: &RequestSettings) -> Self {
        Self::new(&settings.methods)
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    /// 展开一条用例声明，原始声明不会被修改
    pub fn expand(&self, case: &Case) -> Vec<Case> {
        let has_missing = case.get(keys::MISSING_FIELDS).is_some_and(is_truthy);
        let has_support = case.get(keys::SUPPORT).is_some_and(|v| !v.is_null());

        let mut without_support = case.clone();
        without_support.shift_remove(keys::SUPPORT);
        let mut without_missing = case.clone();
        without_missing.shift_remove(keys::MISSING_FIELDS);

        match (has_missing, has_support) {
            (false, false) => {
                without_support.shift_remove(keys::MISSING_FIELDS);
                vec![without_support]
            }
            (true, false) => self.expand_missing_fields(&without_support),
            (false, true) => self.expand_methods(&without_missing),
            (true, true) => {
                // 原用例由 expand_methods 给出
                let mut cases = self.missing_field_variants(&without_support);
                cases.extend(self.expand_methods(&without_missing));
                cases
            }
        }
    }

    /// 按 missing_fields 生成缺失字段用例，没有有效条目时返回原用例
    pub fn expand_missing_fields(&self, case: &Case) -> Vec<Case> {
        let mut base = case.clone();
        base.shift_remove(keys::MISSING_FIELDS);

        let variants = self.missing_field_variants(case);
        if variants.is_empty() {
            vec![base]
        } else {
            variants
        }
    }

    /// 只返回缺失字段用例本身，不含原用例
    fn missing_field_variants(&self, case: &Case) -> Vec<Case> {
        let mut base = case.clone();
        let directive = base.shift_remove(keys::MISSING_FIELDS);

        let items = match directive {
            Some(Value::Array(items)) => items,
            Some(v) if is_truthy(&v) => vec![v],
            _ => return Vec::new(),
        };

        items
            .iter()
            .filter_map(|item| {
                let parsed = MissingField::parse(item);
                if parsed.is_none() {
                    error!("missing_fields entry has no field name: {}", item);
                }
                parsed
            })
            .map(|missing| missing.apply(&base))
            .collect()
    }

    /// 按 support 生成不支持请求方式的用例，结果第一条为原用例
    pub fn expand_methods(&self, case: &Case) -> Vec<Case> {
        let mut base = case.clone();
        let Some(support) = base.shift_remove(keys::SUPPORT).filter(|v| !v.is_null()) else {
            return vec![base];
        };

        let supported: HashSet<String> = match &support {
            Value::String(s) => normalize_methods(std::iter::once(s.as_str())),
            Value::Array(items) => {
                let texts: Vec<String> = items.iter().map(to_text).collect();
                normalize_methods(texts.iter().map(String::as_str))
            }
            other => {
                error!("support must be a method name or a list of names, got: {}", other);
                HashSet::new()
            }
        };

        let base_name = base
            .get(keys::CASE_NAME)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut cases = vec![base.clone()];
        for method in self.methods.iter().filter(|m| !supported.contains(*m)) {
            let mut variant = base.clone();
            variant.shift_remove(keys::EXTRACT);
            variant.shift_remove(keys::EXTRACT_LIST);
            variant.insert(keys::METHOD.to_string(), Value::String(method.clone()));

            if matches!(method.as_str(), "GET" | "DELETE") && !variant.contains_key(keys::PARAMS) {
                for payload_key in [keys::JSON, keys::DATA] {
                    if variant.get(payload_key).is_some_and(Value::is_object) {
                        if let Some(payload) = variant.shift_remove(payload_key) {
                            variant.insert(keys::PARAMS.to_string(), payload);
                        }
                        break;
                    }
                }
            }

            let name = if base_name.is_empty() {
                format!("unsupported[{}]", method)
            } else {
                format!("{}-unsupported[{}]", base_name, method)
            };
            variant.insert(keys::CASE_NAME.to_string(), Value::String(name));
            variant.insert(
                keys::VALIDATION.to_string(),
                json!([{"contains": {"status_code": 405}}]),
            );
            cases.push(variant);
        }

        cases
    }
}

impl MissingField {
    fn parse(item: &Value) -> Option<Self> {
        match item {
            Value::String(s) if !s.is_empty() => Some(Self::plain(s.clone())),
            Value::Number(n) => Some(Self::plain(n.to_string())),
            Value::Object(descriptor) => {
                let field = descriptor
                    .get("field")
                    .filter(|v| !v.is_null())
                    .map(to_text)
                    .filter(|f| !f.is_empty())?;

                let mode = match descriptor.get("mode").and_then(Value::as_str) {
                    None | Some("remove") => MissingMode::Remove,
                    Some("empty") => MissingMode::Empty,
                    Some("null") => MissingMode::Null,
                    Some(other) => {
                        warn!("Unknown missing_fields mode '{}', falling back to remove", other);
                        MissingMode::Remove
                    }
                };

                let container = descriptor
                    .get("container")
                    .or_else(|| descriptor.get("target"))
                    .and_then(Value::as_str)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string);

                Some(Self {
                    field,
                    mode,
                    value: descriptor.get("value").filter(|v| !v.is_null()).cloned(),
                    container,
                    label: descriptor.get("label").filter(|v| !v.is_null()).map(to_text),
                })
            }
            _ => None,
        }
    }

    fn plain(field: String) -> Self {
        Self {
            field,
            mode: MissingMode::Remove,
            value: None,
            container: None,
            label: None,
        }
    }

    fn apply(&self, base: &Case) -> Case {
        let mut variant = base.clone();

        let label = self.label.as_deref().unwrap_or(&self.field);
        let case_name = base
            .get(keys::CASE_NAME)
            .and_then(Value::as_str)
            .unwrap_or_default();
        let name = if case_name.contains("{field}") {
            case_name.replace("{field}", label)
        } else if case_name.is_empty() {
            label.to_string()
        } else {
            format!("{}[{}]", case_name, label)
        };
        variant.insert(keys::CASE_NAME.to_string(), Value::String(name));

        let payload_key = self
            .container
            .clone()
            .or_else(|| {
                keys::PAYLOAD_KEYS
                    .iter()
                    .find(|k| variant.contains_key(**k))
                    .map(|k| k.to_string())
            })
            .unwrap_or_else(|| keys::DATA.to_string());

        let mut payload = variant
            .get(&payload_key)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        match (self.mode, &self.value) {
            (MissingMode::Empty, value) => {
                let value = value.clone().unwrap_or_else(|| Value::String(String::new()));
                payload.insert(self.field.clone(), value);
            }
            (MissingMode::Null, _) => {
                payload.insert(self.field.clone(), Value::Null);
            }
            (MissingMode::Remove, Some(value)) => {
                payload.insert(self.field.clone(), value.clone());
            }
            (MissingMode::Remove, None) => {
                payload.shift_remove(&self.field);
            }
        }

        variant.insert(payload_key, Value::Object(payload));
        variant
    }
}

fn normalize_methods<'a>(methods: impl Iterator<Item = &'a str>) -> HashSet<String> {
    methods
        .map(|m| m.trim().to_uppercase())
        .filter(|m| !m.is_empty())
        .collect()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Number(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(value: Value) -> Case {
        value.as_object().unwrap().clone()
    }

    fn expander() -> CaseExpander {
        CaseExpander::new(["GET", "POST", "DELETE", "PUT", "TRACE"])
    }

    #[test]
    fn test_no_directive_yields_original() {
        let original = case(json!({"case_name": "ok", "data": {"a": 1}}));
        let cases = expander().expand(&original);
        assert_eq!(cases, vec![original]);
    }

    #[test]
    fn test_missing_field_remove() {
        let original = case(json!({
            "case_name": "login",
            "data": {"token": "abc", "id": 1},
            "missing_fields": ["token"]
        }));

        let cases = expander().expand(&original);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0]["case_name"], json!("login[token]"));
        assert_eq!(cases[0]["data"], json!({"id": 1}));
        assert!(!cases[0].contains_key("missing_fields"));

        // 原始声明不变
        assert!(original.contains_key("missing_fields"));
        assert_eq!(original["data"], json!({"token": "abc", "id": 1}));
    }

    #[test]
    fn test_missing_field_modes() {
        let original = case(json!({
            "case_name": "create {field}",
            "json": {"name": "x", "age": 3},
            "missing_fields": [
                {"field": "name", "mode": "empty"},
                {"field": "age", "mode": "null", "label": "age-null"},
                {"field": "name", "value": "override"},
                {"field": "extra", "mode": "empty", "value": 0}
            ]
        }));

        let cases = expander().expand(&original);
        assert_eq!(cases.len(), 4);

        assert_eq!(cases[0]["case_name"], json!("create name"));
        assert_eq!(cases[0]["json"], json!({"name": "", "age": 3}));

        assert_eq!(cases[1]["case_name"], json!("create age-null"));
        assert_eq!(cases[1]["json"], json!({"name": "x", "age": null}));

        assert_eq!(cases[2]["json"], json!({"name": "override", "age": 3}));
        assert_eq!(cases[3]["json"], json!({"name": "x", "age": 3, "extra": 0}));
    }

    #[test]
    fn test_missing_field_explicit_container() {
        let original = case(json!({
            "case_name": "query",
            "data": {"a": 1},
            "params": {"page": 1, "size": 10},
            "missing_fields": {"field": "page", "container": "params"}
        }));

        let cases = expander().expand(&original);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0]["params"], json!({"size": 10}));
        assert_eq!(cases[0]["data"], json!({"a": 1}));
    }

    #[test]
    fn test_missing_field_without_payload_defaults_to_data() {
        let original = case(json!({"case_name": "", "missing_fields": "token"}));

        let cases = expander().expand(&original);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0]["case_name"], json!("token"));
        assert_eq!(cases[0]["data"], json!({}));
    }

    #[test]
    fn test_missing_field_entries_without_field_are_skipped() {
        let original = case(json!({
            "case_name": "x",
            "data": {"a": 1},
            "missing_fields": [{"mode": "null"}]
        }));

        let cases = expander().expand(&original);
        assert_eq!(cases, vec![case(json!({"case_name": "x", "data": {"a": 1}}))]);
    }

    #[test]
    fn test_support_generates_unsupported_methods() {
        let original = case(json!({
            "case_name": "list",
            "method": "GET",
            "params": {"page": 1},
            "extract": {"id": "$.data[0].id"},
            "extract_list": {"ids": "$.data[*].id"},
            "support": ["get"]
        }));

        let cases = expander().expand(&original);
        assert_eq!(cases.len(), 5);
        assert!(!cases[0].contains_key("support"));
        assert!(cases[0].contains_key("extract"));

        let methods: Vec<&str> = cases[1..]
            .iter()
            .map(|c| c["method"].as_str().unwrap())
            .collect();
        assert_eq!(methods, vec!["POST", "DELETE", "PUT", "TRACE"]);

        for variant in &cases[1..] {
            assert!(!variant.contains_key("extract"));
            assert!(!variant.contains_key("extract_list"));
            assert_eq!(
                variant["validation"],
                json!([{"contains": {"status_code": 405}}])
            );
        }
        assert_eq!(cases[1]["case_name"], json!("list-unsupported[POST]"));
    }

    #[test]
    fn test_support_moves_body_to_params_for_get_and_delete() {
        let original = case(json!({
            "case_name": "create",
            "json": {"name": "x"},
            "support": "post"
        }));

        let cases = expander().expand(&original);
        let get = cases.iter().find(|c| c["method"] == json!("GET")).unwrap();
        assert_eq!(get["params"], json!({"name": "x"}));
        assert!(!get.contains_key("json"));

        let delete = cases.iter().find(|c| c["method"] == json!("DELETE")).unwrap();
        assert_eq!(delete["params"], json!({"name": "x"}));

        let put = cases.iter().find(|c| c["method"] == json!("PUT")).unwrap();
        assert_eq!(put["json"], json!({"name": "x"}));
        assert!(!put.contains_key("params"));
    }

    #[test]
    fn test_support_invalid_type_treats_all_as_unsupported() {
        let original = case(json!({"case_name": "x", "support": 12}));
        let cases = expander().expand(&original);
        assert_eq!(cases.len(), 6);
    }

    #[test]
    fn test_both_directives_are_concatenated() {
        let original = case(json!({
            "case_name": "login",
            "data": {"user": "u", "pwd": "p"},
            "missing_fields": ["user", "pwd"],
            "support": ["POST", "PUT", "DELETE", "TRACE"]
        }));

        let cases = expander().expand(&original);
        // 2 个缺失字段用例 + 原用例 + 1 个 GET 用例
        assert_eq!(cases.len(), 4);
        assert_eq!(cases[0]["case_name"], json!("login[user]"));
        assert_eq!(cases[1]["case_name"], json!("login[pwd]"));
        assert_eq!(cases[2]["case_name"], json!("login"));
        assert_eq!(cases[3]["method"], json!("GET"));

        for c in &cases {
            assert!(!c.contains_key("missing_fields"));
            assert!(!c.contains_key("support"));
        }
    }

    #[test]
    fn test_methods_are_normalized() {
        let expander = CaseExpander::new([" get", "post ", ""]);
        assert_eq!(expander.methods(), &["GET".to_string(), "POST".to_string()]);
    }

    #[test]
    fn test_invalid_missing_fields_with_support_keeps_single_original() {
        let original = case(json!({
            "case_name": "x",
            "missing_fields": [{"mode": "null"}],
            "support": ["GET", "POST"]
        }));

        let cases = CaseExpander::new(["GET", "POST"]).expand(&original);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0], case(json!({"case_name": "x"})));
    }
}
