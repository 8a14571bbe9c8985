use crate::extract::{ExpressionKind, ExtractError, classify};
use crate::store::ExtractStore;
use crate::utils::value::{coerce_digits, to_text};
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};
use serde_json_path::JsonPath;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 一条提取指令：存储 key + 提取表达式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractDirective {
    pub key: String,
    pub expression: String,
}

impl ExtractDirective {
    pub fn new(key: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            expression: expression.into(),
        }
    }

    /// 从用例中的 `extract` / `extract_list` 映射解析指令
    pub fn from_value(value: &Value) -> Vec<Self> {
        match value {
            Value::Object(map) => map
                .iter()
                .map(|(key, expr)| Self::new(key.clone(), to_text(expr)))
                .collect(),
            Value::Null => Vec::new(),
            other => {
                warn!("Extract directive must be a mapping, got: {}", other);
                Vec::new()
            }
        }
    }
}

/// 响应提取器
pub struct ResponseExtractor {
    store: Arc<ExtractStore>,
}

impl ResponseExtractor {
    pub fn new(store: Arc<ExtractStore>) -> Self {
        Self { store }
    }

    /// 单值提取，返回提取到的键值
    pub fn extract(&self, directives: &Value, body: &str) -> Map<String, Value> {
        self.run(directives, body, extract_single)
    }

    /// 多值提取，返回提取到的键值
    pub fn extract_list(&self, directives: &Value, body: &str) -> Map<String, Value> {
        self.run(directives, body, extract_many)
    }

    /// 存储写入失败只记录日志，继续处理后续指令
    fn run(
        &self,
        directives: &Value,
        body: &str,
        extract: fn(&str, &str) -> Result<Value, ExtractError>,
    ) -> Map<String, Value> {
        let mut extracted = Map::new();

        for directive in ExtractDirective::from_value(directives) {
            let value = extract(&directive.expression, body).unwrap_or_else(|e| {
                error!(
                    "Extraction of '{}' with '{}' failed: {}",
                    directive.key, directive.expression, e
                );
                Value::String(e.sentinel(&directive.expression))
            });

            info!("Extracted {} = {}", directive.key, value);
            if let Err(e) = self.store.write_entry(&directive.key, value.clone()) {
                error!("Failed to store extracted '{}': {}", directive.key, e);
            }
            extracted.insert(directive.key, value);
        }

        extracted
    }
}

fn compile(expression: &str) -> Result<Regex, ExtractError> {
    Ok(RegexBuilder::new(expression)
        .dot_matches_new_line(true)
        .build()?)
}

/// 单值提取：正则取第一个捕获组，否则按 JSONPath 取第一个结果
pub fn extract_single(expression: &str, body: &str) -> Result<Value, ExtractError> {
    if classify(expression) == ExpressionKind::Regex {
        match regex_first(expression, body) {
            Ok(value) => return Ok(value),
            Err(e) => warn!("Regex '{}' not resolved ({}), trying path query", expression, e),
        }
    }

    query(expression, body)?
        .into_iter()
        .next()
        .ok_or(ExtractError::Empty)
}

/// 多值提取：正则取全部匹配，否则按 JSONPath 取全部结果
pub fn extract_many(expression: &str, body: &str) -> Result<Value, ExtractError> {
    if classify(expression) == ExpressionKind::Regex {
        match regex_all(expression, body) {
            Ok(values) => return Ok(Value::Array(values)),
            Err(e) => warn!("Regex '{}' not resolved ({}), trying path query", expression, e),
        }
    }

    let values = query(expression, body)?;
    if values.is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(Value::Array(values))
}

fn regex_first(expression: &str, body: &str) -> Result<Value, ExtractError> {
    let re = compile(expression)?;
    if re.captures_len() < 2 {
        return Err(ExtractError::NoGroup);
    }

    let captures = re.captures(body).ok_or(ExtractError::NoMatch)?;
    let text = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
    Ok(coerce_digits(text))
}

/// 一个捕获组返回各组文本，没有捕获组返回整体匹配，多个捕获组返回每次匹配的组列表
fn regex_all(expression: &str, body: &str) -> Result<Vec<Value>, ExtractError> {
    let re = compile(expression)?;
    let groups = re.captures_len() - 1;

    let values: Vec<Value> = re
        .captures_iter(body)
        .map(|caps| {
            let group = |i: usize| coerce_digits(caps.get(i).map(|m| m.as_str()).unwrap_or_default());
            match groups {
                0 => group(0),
                1 => group(1),
                n => Value::Array((1..=n).map(group).collect()),
            }
        })
        .collect();

    if values.is_empty() {
        Err(ExtractError::NoMatch)
    } else {
        Ok(values)
    }
}

fn query(expression: &str, body: &str) -> Result<Vec<Value>, ExtractError> {
    let json: Value = serde_json::from_str(body)?;
    let path =
        JsonPath::parse(expression.trim()).map_err(|e| ExtractError::InvalidPath(e.to_string()))?;
    Ok(path.query(&json).all().into_iter().cloned().collect())
}
