use serde_json::{Map, Value};
use std::fmt;

/// 断言错误类型
///
/// 与提取错误不同，这里的错误都是致命的：用例声明有误或查询后端出错。
#[derive(Debug, thiserror::Error)]
pub enum AssertError {
    #[error("Type mismatch in '{clause}': expected {expected}, got {actual}")]
    TypeMismatch {
        clause: String,
        expected: String,
        actual: String,
    },

    #[error("No common key between expected {expected} and actual result")]
    NoCommonKey { expected: String },

    #[error("Invalid validation: {0}")]
    Malformed(String),

    #[error("Query backend failed: {0}")]
    Backend(String),
}

/// 断言子句
#[derive(Debug, Clone, PartialEq)]
pub enum AssertionClause {
    /// `contains`：字段名 -> 期望包含的值
    Contains(Map<String, Value>),
    /// `eq`
    Equal(Value),
    /// `ne`
    NotEqual(Value),
    /// `db`：查询语句
    External(String),
    /// 未知的断言标签，记录后忽略
    Unknown(String),
}

impl AssertionClause {
    pub fn tag(&self) -> &str {
        match self {
            AssertionClause::Contains(_) => "contains",
            AssertionClause::Equal(_) => "eq",
            AssertionClause::NotEqual(_) => "ne",
            AssertionClause::External(_) => "db",
            AssertionClause::Unknown(tag) => tag,
        }
    }

    /// 解析用例中的 `validation`
    ///
    /// 列表中每个映射可以带多个标签，按声明顺序展开；单个映射视为只有一项的列表。
    pub fn parse_list(validation: &Value) -> Result<Vec<Self>, AssertError> {
        let items = match validation {
            Value::Null => return Ok(Vec::new()),
            Value::Array(items) => items.as_slice(),
            Value::Object(_) => std::slice::from_ref(validation),
            other => {
                return Err(AssertError::Malformed(format!(
                    "expected a list of mappings, got {}",
                    type_name(other)
                )));
            }
        };

        let mut clauses = Vec::new();
        for item in items {
            let Value::Object(map) = item else {
                return Err(AssertError::Malformed(format!(
                    "validation entry must be a mapping, got {}",
                    item
                )));
            };
            for (tag, payload) in map {
                clauses.push(Self::parse(tag, payload)?);
            }
        }
        Ok(clauses)
    }

    pub fn parse(tag: &str, payload: &Value) -> Result<Self, AssertError> {
        match tag {
            "contains" => match payload {
                Value::Object(map) => Ok(AssertionClause::Contains(map.clone())),
                other => Err(AssertError::TypeMismatch {
                    clause: tag.to_string(),
                    expected: "mapping".to_string(),
                    actual: type_name(other).to_string(),
                }),
            },
            "eq" | "equal" => Ok(AssertionClause::Equal(payload.clone())),
            "ne" | "not_equal" => Ok(AssertionClause::NotEqual(payload.clone())),
            "db" | "external" => Ok(AssertionClause::External(
                crate::utils::value::to_text(payload),
            )),
            other => Ok(AssertionClause::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for AssertionClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssertionClause::Contains(map) => write!(f, "contains {}", Value::Object(map.clone())),
            AssertionClause::Equal(v) => write!(f, "eq {}", v),
            AssertionClause::NotEqual(v) => write!(f, "ne {}", v),
            AssertionClause::External(q) => write!(f, "db {}", q),
            AssertionClause::Unknown(tag) => write!(f, "{} (unsupported)", tag),
        }
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

/// 断言结果
#[derive(Debug, Clone)]
pub struct AssertionResult {
    /// 断言描述
    pub raw: String,

    /// 是否通过
    pub passed: bool,

    /// 实际值（字符串表示）
    pub actual: Option<String>,

    /// 期望描述
    pub expected: String,

    /// 失败消息
    pub message: Option<String>,
}

impl AssertionResult {
    pub fn success(raw: String, actual: String, expected: String) -> Self {
        Self {
            raw,
            passed: true,
            actual: Some(actual),
            expected,
            message: None,
        }
    }

    pub fn failure(raw: String, actual: Option<String>, expected: String, message: String) -> Self {
        Self {
            raw,
            passed: false,
            actual,
            expected,
            message: Some(message),
        }
    }
}

/// 一组断言的判定：失败计数为 0 才算通过
#[derive(Debug, Clone, Default)]
pub struct Verdict {
    pub failures: usize,
    pub results: Vec<AssertionResult>,
}

impl Verdict {
    pub fn record(&mut self, result: AssertionResult) {
        if !result.passed {
            self.failures += 1;
        }
        self.results.push(result);
    }

    pub fn passed(&self) -> bool {
        self.failures == 0
    }
}
