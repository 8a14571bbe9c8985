use crate::assertion::backend::QueryBackend;
use crate::assertion::types::{AssertError, AssertionClause, AssertionResult, Verdict, type_name};
use crate::report::{AttachmentKind, Reporter};
use crate::utils::value::{loose_eq, to_text};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info};

/// 断言求值器
pub struct AssertionEvaluator {
    reporter: Arc<dyn Reporter>,
    backend: Option<Arc<dyn QueryBackend>>,
}

impl AssertionEvaluator {
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self {
            reporter,
            backend: None,
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn QueryBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// 依次执行断言子句，累计失败次数
    ///
    /// `actual` 为响应 JSON（非 JSON 响应传入空映射），`headers` 为响应头，
    /// 其中包含 `status_code`。类型错误立即返回，不再执行后续子句。
    pub fn evaluate(
        &self,
        clauses: &[AssertionClause],
        actual: &Value,
        headers: &Map<String, Value>,
    ) -> Result<Verdict, AssertError> {
        let mut verdict = Verdict::default();

        for clause in clauses {
            match clause {
                AssertionClause::Contains(expected) => {
                    self.contains(expected, actual, headers, &mut verdict)
                }
                AssertionClause::Equal(expected) => {
                    self.compare(clause, expected, actual, false, &mut verdict)?
                }
                AssertionClause::NotEqual(expected) => {
                    self.compare(clause, expected, actual, true, &mut verdict)?
                }
                AssertionClause::External(query) => self.external(query, &mut verdict)?,
                AssertionClause::Unknown(tag) => {
                    error!("Unsupported assertion '{}', ignored", tag);
                }
            }
        }

        if verdict.passed() {
            info!("All {} assertion(s) passed", verdict.results.len());
        } else {
            error!("{} assertion(s) failed", verdict.failures);
        }
        Ok(verdict)
    }

    /// 包含断言
    ///
    /// 先在整个响应树中查找同名字段，找不到再按不区分大小写查响应头。
    /// 单个目标比较文本包含；多个目标组成列表按成员判断，全是字符串的列表先拼接成一个字符串。
    /// 期望值 `NONE`（不区分大小写）表示 null。
    fn contains(
        &self,
        expected: &Map<String, Value>,
        actual: &Value,
        headers: &Map<String, Value>,
        verdict: &mut Verdict,
    ) {
        for (key, expected_value) in expected {
            let raw = format!("contains {}: {}", key, expected_value);

            let mut found = Vec::new();
            collect_field(actual, key, &mut found);
            if found.is_empty()
                && let Some(value) = lookup_header(headers, key)
            {
                found.push(value.clone());
            }

            if found.is_empty() {
                let message = format!("未找到断言目标键：{}", key);
                error!("包含断言失败：{}", message);
                self.reporter
                    .attach("包含断言：失败", &message, AttachmentKind::Text);
                verdict.record(AssertionResult::failure(
                    raw,
                    None,
                    expected_value.to_string(),
                    message,
                ));
                continue;
            }

            let target = if found.len() == 1 {
                found.remove(0)
            } else {
                Value::Array(found)
            };
            let target = match target {
                Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_string) => {
                    Value::String(items.iter().map(to_text).collect())
                }
                other => other,
            };

            let expected_value = match expected_value {
                Value::String(s) if s.eq_ignore_ascii_case("none") => Value::Null,
                other => other.clone(),
            };

            let matched = match &target {
                Value::Array(items) => items.iter().any(|item| loose_eq(item, &expected_value)),
                other => to_text(other).contains(&to_text(&expected_value)),
            };

            if matched {
                verdict.record(AssertionResult::success(
                    raw,
                    to_text(&target),
                    to_text(&expected_value),
                ));
            } else {
                let message = format!("预期包含：{}\n实际：{}", expected_value, target);
                error!("包含断言失败：预期包含【{}】，实际【{}】", expected_value, target);
                self.reporter
                    .attach("包含断言：失败", &message, AttachmentKind::Text);
                verdict.record(AssertionResult::failure(
                    raw,
                    Some(to_text(&target)),
                    to_text(&expected_value),
                    message,
                ));
            }
        }
    }

    /// 相等 / 不相等断言
    ///
    /// 取期望映射中第一个在实际结果里也存在的 key，用实际结果中该 key 组成的
    /// 单键映射与完整的期望映射比较。
    fn compare(
        &self,
        clause: &AssertionClause,
        expected: &Value,
        actual: &Value,
        negate: bool,
        verdict: &mut Verdict,
    ) -> Result<(), AssertError> {
        let (Value::Object(expected_map), Value::Object(actual_map)) = (expected, actual) else {
            let offending = if expected.is_object() { actual } else { expected };
            return Err(AssertError::TypeMismatch {
                clause: clause.tag().to_string(),
                expected: "mapping".to_string(),
                actual: type_name(offending).to_string(),
            });
        };

        let (key, actual_value) = expected_map
            .keys()
            .find_map(|k| actual_map.get_key_value(k))
            .ok_or_else(|| AssertError::NoCommonKey {
                expected: expected.to_string(),
            })?;

        let mut picked = Map::new();
        picked.insert(key.clone(), actual_value.clone());
        let picked = Value::Object(picked);

        let equal = loose_eq(&picked, expected);
        let passed = equal != negate;
        let (label, relation) = if negate {
            ("不相等断言", if passed { "不等于" } else { "等于" })
        } else {
            ("相等断言", if passed { "等于" } else { "不等于" })
        };

        let content = format!("预期结果：{}\n实际结果：{}", expected, picked);
        let raw = clause.to_string();
        if passed {
            info!("{}成功：接口实际结果 {} {}预期结果 {}", label, picked, relation, expected);
            self.reporter
                .attach(&format!("{}结果：成功", label), &content, AttachmentKind::Text);
            verdict.record(AssertionResult::success(
                raw,
                picked.to_string(),
                expected.to_string(),
            ));
        } else {
            error!("{}失败：接口实际结果 {} {}预期结果 {}", label, picked, relation, expected);
            self.reporter
                .attach(&format!("{}结果：失败", label), &content, AttachmentKind::Text);
            verdict.record(AssertionResult::failure(
                raw,
                Some(picked.to_string()),
                expected.to_string(),
                format!("actual {} {} expected {}", picked, if negate { "==" } else { "!=" }, expected),
            ));
        }
        Ok(())
    }

    /// 外部查询断言：查询有结果即通过
    fn external(&self, query: &str, verdict: &mut Verdict) -> Result<(), AssertError> {
        let raw = format!("db {}", query);

        let Some(backend) = &self.backend else {
            let message = "no query backend configured".to_string();
            error!("数据库断言失败：{}", message);
            self.reporter
                .attach("数据库断言：失败", &message, AttachmentKind::Text);
            verdict.record(AssertionResult::failure(raw, None, "rows".to_string(), message));
            return Ok(());
        };

        match backend.query(query)? {
            Some(rows) => {
                info!("数据库断言成功：{} 行", rows.len());
                verdict.record(AssertionResult::success(
                    raw,
                    format!("{} row(s)", rows.len()),
                    "rows".to_string(),
                ));
            }
            None => {
                let message = "query returned no result".to_string();
                error!("数据库断言失败，请检查数据库是否存在该数据：{}", query);
                self.reporter
                    .attach("数据库断言：失败", query, AttachmentKind::Text);
                verdict.record(AssertionResult::failure(raw, None, "rows".to_string(), message));
            }
        }
        Ok(())
    }
}

/// 深度优先查找所有名为 `key` 的字段值
fn collect_field(value: &Value, key: &str, found: &mut Vec<Value>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                if k == key {
                    found.push(v.clone());
                }
                collect_field(v, key, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_field(item, key, found);
            }
        }
        _ => {}
    }
}

fn lookup_header<'a>(headers: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    headers.get(key).or_else(|| {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReporter;
    use serde_json::json;

    fn evaluator() -> (Arc<MemoryReporter>, AssertionEvaluator) {
        let reporter = Arc::new(MemoryReporter::new());
        let evaluator = AssertionEvaluator::new(reporter.clone());
        (reporter, evaluator)
    }

    fn clauses(validation: Value) -> Vec<AssertionClause> {
        AssertionClause::parse_list(&validation).unwrap()
    }

    fn headers(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_equal_passes_on_common_key() {
        let (_, evaluator) = evaluator();
        let verdict = evaluator
            .evaluate(
                &clauses(json!([{"eq": {"id": 5}}])),
                &json!({"id": 5, "name": "x"}),
                &Map::new(),
            )
            .unwrap();
        assert!(verdict.passed());
    }

    #[test]
    fn test_equal_fails_with_one_failure() {
        let (reporter, evaluator) = evaluator();
        let verdict = evaluator
            .evaluate(
                &clauses(json!([{"eq": {"id": 5}}])),
                &json!({"id": 6, "name": "x"}),
                &Map::new(),
            )
            .unwrap();
        assert_eq!(verdict.failures, 1);
        assert!(reporter.find("相等断言结果：失败").is_some());
    }

    #[test]
    fn test_equal_numbers_by_value() {
        let (_, evaluator) = evaluator();
        let verdict = evaluator
            .evaluate(&clauses(json!([{"eq": {"price": 5}}])), &json!({"price": 5.0}), &Map::new())
            .unwrap();
        assert!(verdict.passed());
    }

    #[test]
    fn test_not_equal() {
        let (_, evaluator) = evaluator();
        let actual = json!({"code": 0, "msg": "ok"});

        let verdict = evaluator
            .evaluate(&clauses(json!([{"ne": {"code": 1}}])), &actual, &Map::new())
            .unwrap();
        assert!(verdict.passed());

        let verdict = evaluator
            .evaluate(&clauses(json!([{"ne": {"code": 0}}])), &actual, &Map::new())
            .unwrap();
        assert_eq!(verdict.failures, 1);
    }

    #[test]
    fn test_equal_picks_first_declared_common_key() {
        let (_, evaluator) = evaluator();
        // 只比较 {"code": 0}，与完整期望 {"missing":.., "code": 0} 不相等
        let verdict = evaluator
            .evaluate(
                &clauses(json!([{"eq": {"code": 0}}, {"eq": {"missing": 1, "code": 0}}])),
                &json!({"code": 0}),
                &Map::new(),
            )
            .unwrap();
        assert_eq!(verdict.failures, 1);
        assert!(verdict.results[1].actual.as_deref() == Some(r#"{"code":0}"#));
    }

    #[test]
    fn test_equal_type_mismatch_is_fatal() {
        let (_, evaluator) = evaluator();
        let result = evaluator.evaluate(
            &clauses(json!([{"eq": {"id": 1}}, {"contains": {"id": 1}}])),
            &json!([1, 2]),
            &Map::new(),
        );
        assert!(matches!(result, Err(AssertError::TypeMismatch { .. })));

        let result = evaluator.evaluate(&clauses(json!([{"ne": "x"}])), &json!({}), &Map::new());
        assert!(matches!(result, Err(AssertError::TypeMismatch { .. })));
    }

    #[test]
    fn test_equal_without_common_key_is_fatal() {
        let (_, evaluator) = evaluator();
        let result = evaluator.evaluate(
            &clauses(json!([{"eq": {"id": 1}}])),
            &json!({"name": "x"}),
            &Map::new(),
        );
        assert!(matches!(result, Err(AssertError::NoCommonKey { .. })));
    }

    #[test]
    fn test_contains_none_matches_null() {
        let (_, evaluator) = evaluator();
        let verdict = evaluator
            .evaluate(
                &clauses(json!([{"contains": {"status": "NONE"}}])),
                &json!({"status": null}),
                &Map::new(),
            )
            .unwrap();
        assert!(verdict.passed());
    }

    #[test]
    fn test_contains_deep_search_and_substring() {
        let (_, evaluator) = evaluator();
        let actual = json!({"code": 0, "data": {"user": {"nickname": "alice-admin"}}});
        let verdict = evaluator
            .evaluate(
                &clauses(json!([{"contains": {"nickname": "alice", "code": 0}}])),
                &actual,
                &Map::new(),
            )
            .unwrap();
        assert!(verdict.passed());
    }

    #[test]
    fn test_contains_multiple_targets() {
        let (_, evaluator) = evaluator();
        let actual = json!({"items": [{"id": 1, "tag": "ab"}, {"id": 2, "tag": "cd"}]});

        // 数字列表按成员判断
        let verdict = evaluator
            .evaluate(&clauses(json!([{"contains": {"id": 2.0}}])), &actual, &Map::new())
            .unwrap();
        assert!(verdict.passed());

        // 字符串列表拼接后判断包含
        let verdict = evaluator
            .evaluate(&clauses(json!([{"contains": {"tag": "bc"}}])), &actual, &Map::new())
            .unwrap();
        assert!(verdict.passed());

        let verdict = evaluator
            .evaluate(&clauses(json!([{"contains": {"id": 3}}])), &actual, &Map::new())
            .unwrap();
        assert_eq!(verdict.failures, 1);
    }

    #[test]
    fn test_contains_falls_back_to_headers() {
        let (_, evaluator) = evaluator();
        let headers = headers(json!({"status_code": 405, "Content-Type": "application/json"}));
        let verdict = evaluator
            .evaluate(
                &clauses(json!([{"contains": {"status_code": 405, "content-type": "json"}}])),
                &json!({}),
                &headers,
            )
            .unwrap();
        assert!(verdict.passed());
    }

    #[test]
    fn test_contains_missing_key_counts_failure() {
        let (reporter, evaluator) = evaluator();
        let verdict = evaluator
            .evaluate(
                &clauses(json!([{"contains": {"token": "x", "code": 1}}])),
                &json!({"code": 0}),
                &Map::new(),
            )
            .unwrap();
        assert_eq!(verdict.failures, 2);
        assert_eq!(reporter.attachments().len(), 2);
    }

    #[test]
    fn test_external_without_backend_fails() {
        let (_, evaluator) = evaluator();
        let verdict = evaluator
            .evaluate(&clauses(json!([{"db": "select 1"}])), &json!({}), &Map::new())
            .unwrap();
        assert_eq!(verdict.failures, 1);
    }

    #[test]
    fn test_external_with_backend() {
        let (_, evaluator) = evaluator();
        let backend = |sql: &str| -> Result<Option<Vec<Value>>, AssertError> {
            if sql.contains("exists") {
                Ok(Some(vec![json!({"id": 1})]))
            } else if sql.contains("broken") {
                Err(AssertError::Backend("connection lost".to_string()))
            } else {
                Ok(None)
            }
        };
        let evaluator = evaluator.with_backend(Arc::new(backend));

        let verdict = evaluator
            .evaluate(
                &clauses(json!([{"db": "select exists"}, {"db": "select none"}])),
                &json!({}),
                &Map::new(),
            )
            .unwrap();
        assert_eq!(verdict.failures, 1);

        let result =
            evaluator.evaluate(&clauses(json!([{"db": "broken"}])), &json!({}), &Map::new());
        assert!(matches!(result, Err(AssertError::Backend(_))));
    }

    #[test]
    fn test_unknown_clause_is_ignored() {
        let (_, evaluator) = evaluator();
        let verdict = evaluator
            .evaluate(&clauses(json!([{"regex": "x"}])), &json!({}), &Map::new())
            .unwrap();
        assert!(verdict.passed());
        assert!(verdict.results.is_empty());
    }
}
