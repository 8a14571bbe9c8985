use crate::placeholder::{ExtractorRegistry, PlaceholderError};
use crate::utils::value::to_text;
use serde_json::Value;
use tracing::debug;

/// 占位符替换器
///
/// 替换次数在入口处按 `${` 出现次数计算一次，之后不再重新扫描：
/// 提取结果里如果又带出 `${...}`，超出次数的部分会原样保留。
#[derive(Debug)]
pub struct PlaceholderResolver {
    registry: ExtractorRegistry,
}

impl PlaceholderResolver {
    pub fn new(registry: ExtractorRegistry) -> Self {
        Self { registry }
    }

    /// 解析任意值中的占位符
    ///
    /// - 字符串：替换后返回字符串
    /// - 映射：序列化为 JSON 文本，替换后重新反序列化
    /// - 其他（列表、数字等）：序列化后替换，返回替换后的文本
    pub fn resolve(&self, data: &Value) -> Result<Value, PlaceholderError> {
        let text = match data {
            Value::String(s) => s.clone(),
            other => serde_json::to_string(other).map_err(PlaceholderError::Serialize)?,
        };

        let resolved = self.resolve_str(&text)?;

        if data.is_object() {
            serde_json::from_str(&resolved).map_err(PlaceholderError::Reparse)
        } else {
            Ok(Value::String(resolved))
        }
    }

    /// 替换文本中的 `${name(args)}` 引用
    pub fn resolve_str(&self, text: &str) -> Result<String, PlaceholderError> {
        let mut text = text.to_string();
        let occurrences = text.matches("${").count();

        for _ in 0..occurrences {
            let Some(start) = text.find("${") else {
                break;
            };
            let end = text[start..]
                .find('}')
                .map(|offset| start + offset)
                .ok_or_else(|| PlaceholderError::Malformed {
                    reference: text[start..].to_string(),
                    reason: "missing closing '}'".to_string(),
                })?;

            let reference = text[start..=end].to_string();
            let (name, args) = parse_reference(&reference)?;
            let value = self.registry.call(name, &args)?;
            let replacement = to_text(&value);

            debug!("Placeholder {} -> {}", reference, replacement);
            text = text.replacen(&reference, &replacement, 1);
        }

        Ok(text)
    }
}

/// 拆分 `${name(a,b)}` 为函数名和位置参数
fn parse_reference(reference: &str) -> Result<(&str, Vec<String>), PlaceholderError> {
    let malformed = |reason: &str| PlaceholderError::Malformed {
        reference: reference.to_string(),
        reason: reason.to_string(),
    };

    let open = reference.find('(').ok_or_else(|| malformed("missing '('"))?;
    let close = reference[open..]
        .find(')')
        .map(|offset| open + offset)
        .ok_or_else(|| malformed("missing ')'"))?;

    let name = reference[2..open].trim();
    if name.is_empty() {
        return Err(malformed("empty function name"));
    }

    let raw_args = &reference[open + 1..close];
    // 参数原样保留，不去除空白
    let args = if raw_args.is_empty() {
        Vec::new()
    } else {
        raw_args.split(',').map(str::to_string).collect()
    };

    Ok((name, args))
}
