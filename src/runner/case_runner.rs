use crate::assertion::{AssertionClause, AssertionEvaluator, QueryBackend};
use crate::case::{CaseError, CaseVariant, keys};
use crate::config::Settings;
use crate::extract::ResponseExtractor;
use crate::http::{Method, OutgoingRequest, RequestBody, Transport};
use crate::placeholder::{ExtractorRegistry, PlaceholderResolver, register_builtins};
use crate::report::{AttachmentKind, Reporter};
use crate::runner::{CaseReport, RunError};
use crate::store::ExtractStore;
use crate::utils::pretty_json;
use crate::utils::value::to_text;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// 单条用例的执行器
///
/// 解析占位符，组装请求，发送后提取数据并执行断言。
pub struct CaseRunner<T: Transport> {
    settings: Arc<Settings>,
    transport: T,
    resolver: PlaceholderResolver,
    extractor: ResponseExtractor,
    evaluator: AssertionEvaluator,
    reporter: Arc<dyn Reporter>,
}

impl<T: Transport> CaseRunner<T> {
    /// 使用内置提取函数构建
    pub fn new(
        settings: Arc<Settings>,
        transport: T,
        store: Arc<ExtractStore>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        let mut registry = ExtractorRegistry::new();
        register_builtins(&mut registry, Arc::clone(&store), Arc::clone(&settings));
        Self::with_registry(settings, transport, store, reporter, registry)
    }

    /// 使用自定义的提取函数注册表构建
    pub fn with_registry(
        settings: Arc<Settings>,
        transport: T,
        store: Arc<ExtractStore>,
        reporter: Arc<dyn Reporter>,
        registry: ExtractorRegistry,
    ) -> Self {
        Self {
            settings,
            transport,
            resolver: PlaceholderResolver::new(registry),
            extractor: ResponseExtractor::new(store),
            evaluator: AssertionEvaluator::new(Arc::clone(&reporter)),
            reporter,
        }
    }

    /// `db` 断言的查询后端
    pub fn with_backend(mut self, backend: Arc<dyn QueryBackend>) -> Self {
        self.evaluator = self.evaluator.with_backend(backend);
        self
    }

    fn attach(&self, name: &str, content: &str) {
        self.reporter.attach(name, content, AttachmentKind::Text);
    }

    /// 执行一条展开后的用例
    ///
    /// 断言失败计数不为 0 时返回 [`RunError::AssertionsFailed`]，
    /// 配置、请求以及断言类型错误返回对应的 [`RunError`]。
    pub async fn run_case(&self, variant: &CaseVariant) -> Result<CaseReport, RunError> {
        let mut case = variant.case.clone();
        let base = &variant.base_info;

        self.attach("接口名称", &base.api_name);
        let url = format!("{}{}", self.settings.api_envi.host(), base.url);
        self.attach("接口地址", &url);

        let headers = self.resolve_mapping("header", &base.header)?;
        self.attach("请求头", &pretty_json(&Value::Object(headers.clone().unwrap_or_default())));

        let cookies = match &base.cookies {
            Some(raw) => self.resolve_mapping("cookies", raw)?,
            None => None,
        };
        if let Some(cookies) = &cookies {
            self.attach("Cookie", &pretty_json(&Value::Object(cookies.clone())));
        }

        let case_name = case
            .shift_remove(keys::CASE_NAME)
            .map(|v| to_text(&v))
            .ok_or(CaseError::MissingField(keys::CASE_NAME))?;
        self.attach("测试用例名称", &case_name);

        let method_text = case
            .shift_remove(keys::METHOD)
            .filter(|v| !v.is_null())
            .map(|v| to_text(&v))
            .or_else(|| base.method.clone())
            .ok_or(CaseError::MissingField(keys::METHOD))?;
        let method: Method = method_text.parse().map_err(|_| CaseError::InvalidField {
            field: keys::METHOD.to_string(),
            reason: format!("unsupported method '{}'", method_text),
        })?;
        self.attach("请求方法", method.as_str());

        let clauses = match case.shift_remove(keys::VALIDATION) {
            None | Some(Value::Null) => Vec::new(),
            Some(raw) => {
                let resolved = match self.resolver.resolve(&raw)? {
                    Value::String(text) => {
                        serde_json::from_str(&text).map_err(|e| CaseError::InvalidField {
                            field: keys::VALIDATION.to_string(),
                            reason: e.to_string(),
                        })?
                    }
                    other => other,
                };
                self.attach("预期结果", &pretty_json(&resolved));
                AssertionClause::parse_list(&resolved)?
            }
        };

        let extract = case.shift_remove(keys::EXTRACT);
        let extract_list = case.shift_remove(keys::EXTRACT_LIST);

        for key in keys::PAYLOAD_KEYS {
            if let Some(raw) = case.get(key).cloned() {
                let resolved = self.resolve_payload(&raw)?;
                case.insert(key.to_string(), resolved);
            }
        }

        let mut request = OutgoingRequest::new(method, url.clone()).with_body(request_body(
            case.shift_remove(keys::DATA),
            case.shift_remove(keys::JSON),
        ));
        for (key, value) in headers.iter().flatten() {
            request = request.with_header(key.clone(), to_text(value));
        }
        if let Some(cookies) = cookies {
            request = request.with_cookies(cookies);
        }
        for (key, value) in query_pairs(case.shift_remove(keys::PARAMS)) {
            request = request.with_query(key, value);
        }

        if let Some(files) = case.shift_remove(keys::FILES) {
            let Value::Object(files) = files else {
                return Err(CaseError::InvalidField {
                    field: keys::FILES.to_string(),
                    reason: "must be a mapping of field name to file path".to_string(),
                }
                .into());
            };
            self.attach("导入文件", &Value::Object(files.clone()).to_string());
            for (field, path) in &files {
                request = request.with_file(field.clone(), to_text(path));
            }
        }

        if let Some(timeout) = case.shift_remove("timeout").as_ref().and_then(Value::as_f64) {
            request.timeout = Some(Duration::from_secs_f64(timeout.max(0.0)));
        }
        for key in case.keys() {
            debug!("Case field '{}' is not used by the request", key);
        }

        info!("请求方式：{}", request.method);
        info!("请求地址：{}", request.url);
        let response = match self.transport.send(&request).await {
            Ok(response) => response,
            Err(e) => {
                error!("接口请求异常：{}", e);
                self.attach("接口请求异常", &e.to_string());
                return Err(RunError::Transport(e));
            }
        };
        info!("响应码：{}，耗时：{}ms", response.status, response.duration.as_millis());

        let mut response_headers = response.header_map();
        response_headers.insert(
            "status_code".to_string(),
            Value::String(response.status.code().to_string()),
        );
        self.attach("响应头", &pretty_json(&Value::Object(response_headers.clone())));

        let (actual, extracted) = match response.json() {
            Some(json) => {
                self.reporter
                    .attach("响应内容", &pretty_json(&json), AttachmentKind::Json);
                let mut extracted = Map::new();
                if let Some(directives) = &extract {
                    extracted.extend(self.extractor.extract(directives, response.text()));
                }
                if let Some(directives) = &extract_list {
                    extracted.extend(self.extractor.extract_list(directives, response.text()));
                }
                (json, extracted)
            }
            None => {
                self.attach("响应内容", response.text());
                (Value::Object(Map::new()), Map::new())
            }
        };

        let verdict = self
            .evaluator
            .evaluate(&clauses, &actual, &response_headers)
            .inspect_err(|e| {
                error!("断言异常：{}", e);
                self.attach("断言异常", &e.to_string());
            })?;

        CaseReport {
            case_name,
            api_name: base.api_name.clone(),
            method: method.to_string(),
            url,
            response,
            extracted,
            failures: verdict.failures,
            assertions: verdict.results,
        }
        .into_result()
    }

    /// 解析占位符后要求得到映射，null 表示未设置
    fn resolve_mapping(
        &self,
        field: &str,
        raw: &Value,
    ) -> Result<Option<Map<String, Value>>, RunError> {
        if raw.is_null() {
            return Ok(None);
        }

        let invalid = |reason: String| CaseError::InvalidField {
            field: field.to_string(),
            reason,
        };
        match self.resolver.resolve(raw)? {
            Value::Object(map) => Ok(Some(map)),
            Value::String(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => Ok(Some(map)),
                Ok(other) => Err(invalid(format!("expected a mapping, got {}", other)).into()),
                Err(e) => Err(invalid(e.to_string()).into()),
            },
            other => Err(invalid(format!("expected a mapping, got {}", other)).into()),
        }
    }

    /// 列表参数解析后是文本，这里还原为结构
    fn resolve_payload(&self, raw: &Value) -> Result<Value, RunError> {
        let resolved = self.resolver.resolve(raw)?;
        Ok(match (raw, resolved) {
            (Value::Array(_), Value::String(text)) => {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            }
            (_, resolved) => resolved,
        })
    }
}

fn query_pairs(params: Option<Value>) -> Vec<(String, String)> {
    match params {
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), to_text(v))).collect(),
        Some(Value::String(text)) => url::form_urlencoded::parse(text.trim_start_matches('?').as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        _ => Vec::new(),
    }
}

/// `data` 优先于 `json`：映射按表单编码，其他按原文发送
fn request_body(data: Option<Value>, json: Option<Value>) -> RequestBody {
    match (data, json) {
        (Some(Value::Object(map)), _) => {
            RequestBody::Form(map.iter().map(|(k, v)| (k.clone(), to_text(v))).collect())
        }
        (Some(Value::Null) | None, Some(Value::Null) | None) => RequestBody::None,
        (Some(Value::Null) | None, Some(json)) => RequestBody::Json(json),
        (Some(other), _) => RequestBody::Raw(to_text(&other)),
    }
}
