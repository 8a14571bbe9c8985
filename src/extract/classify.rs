use regex::Regex;
use std::sync::OnceLock;

/// 常见捕获组写法
const GROUP_INDICATORS: [&str; 4] = [r"(\d+)", r"(\d*)", "(.*?)", "(.+?)"];

/// 提取表达式类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionKind {
    Regex,
    PathQuery,
}

/// 判断提取表达式是正则还是 JSONPath
///
/// 含捕获组且不以 `$` 开头的视为正则，其余一律按 JSONPath 处理。
pub fn classify(expression: &str) -> ExpressionKind {
    static GROUP_REGEX: OnceLock<Regex> = OnceLock::new();
    let group = GROUP_REGEX.get_or_init(|| Regex::new(r"\(.+?\)").unwrap());

    let has_group =
        GROUP_INDICATORS.iter().any(|p| expression.contains(p)) || group.is_match(expression);

    if has_group && !expression.trim().starts_with('$') {
        ExpressionKind::Regex
    } else {
        ExpressionKind::PathQuery
    }
}
