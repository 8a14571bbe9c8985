use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::RequestSettings;
use crate::http::request::{OutgoingRequest, RequestBody};
use crate::http::response::Response;
use crate::http::{Transport, TransportError};
use crate::store::ExtractStore;
use crate::utils::value::to_text;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

/// 基于 reqwest 的传输实现
///
/// 连接失败、超时以及 429/5xx 响应按指数退避重试，
/// 响应中的 Set-Cookie 写入提取存储的 `Cookie` 节点。
#[derive(Clone)]
pub struct Client {
    inner: reqwest::Client,
    timeout: Duration,
    retries: u32,
    backoff: Duration,
    store: Option<Arc<ExtractStore>>,
}

impl Client {
    pub fn new(settings: &RequestSettings) -> Result<Self, TransportError> {
        let inner = reqwest::Client::builder()
            .timeout(settings.timeout)
            .danger_accept_invalid_certs(!settings.verify_tls)
            .build()?;

        Ok(Self {
            inner,
            timeout: settings.timeout,
            retries: settings.retries,
            backoff: settings.backoff,
            store: None,
        })
    }

    /// 记录响应 Cookie 到提取存储
    pub fn with_store(mut self, store: Arc<ExtractStore>) -> Self {
        self.store = Some(store);
        self
    }

    async fn execute(&self, request: &OutgoingRequest) -> Result<Response, TransportError> {
        let url = reqwest::Url::parse_with_params(&request.url, &request.query)?;
        let mut req = self
            .inner
            .request(request.method.into(), url.clone())
            .timeout(request.timeout.unwrap_or(self.timeout));

        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }
        if let Some(cookie) = request.cookie_header() {
            req = req.header(COOKIE, cookie);
        }

        if request.files.is_empty() {
            req = match &request.body {
                RequestBody::None => req,
                RequestBody::Json(value) => req.json(value),
                RequestBody::Form(fields) => {
                    let encoded = url::form_urlencoded::Serializer::new(String::new())
                        .extend_pairs(fields)
                        .finish();
                    req.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                        .body(encoded)
                }
                RequestBody::Raw(text) => req.body(text.clone()),
            };
        } else {
            req = req.multipart(self.multipart(request).await?);
        }

        let start = Instant::now();
        let response = req
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url.as_str(), e))?;
        let duration = start.elapsed();

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Response::new(status, headers, body, duration)
    }

    /// 上传文件时表单字段作为文本段发送，文件内容在本次请求内读取
    async fn multipart(&self, request: &OutgoingRequest) -> Result<Form, TransportError> {
        let mut form = Form::new();

        let fields: Vec<(String, String)> = match &request.body {
            RequestBody::Form(fields) => fields.clone(),
            RequestBody::Json(Value::Object(map)) => {
                map.iter().map(|(k, v)| (k.clone(), to_text(v))).collect()
            }
            RequestBody::None => Vec::new(),
            RequestBody::Json(_) | RequestBody::Raw(_) => {
                warn!(
                    "{} {}: body cannot be sent as multipart fields alongside files, dropped",
                    request.method, request.url
                );
                Vec::new()
            }
        };
        for (key, value) in fields {
            form = form.text(key, value);
        }

        for file in &request.files {
            let bytes = tokio::fs::read(&file.path)
                .await
                .map_err(|source| TransportError::Upload {
                    path: file.path.display().to_string(),
                    source,
                })?;
            let file_name = file
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| file.field.clone());
            form = form.part(file.field.clone(), Part::bytes(bytes).file_name(file_name));
        }

        Ok(form)
    }

    fn record_cookies(&self, response: &Response) {
        let Some(store) = &self.store else {
            return;
        };
        let cookies = response.cookies();
        if cookies.is_empty() {
            return;
        }

        info!("Response Set-Cookie written to extract store: {:?}", cookies);
        if let Err(e) = store.write(&json!({ "Cookie": cookies })) {
            warn!("Failed to record response cookies: {}", e);
        }
    }
}

impl Transport for Client {
    async fn send(&self, request: &OutgoingRequest) -> Result<Response, TransportError> {
        let mut attempt = 0;

        loop {
            debug!("{} {} (attempt {})", request.method, request.url, attempt + 1);
            let outcome = self.execute(request).await;

            let retryable = match &outcome {
                Ok(response) => response.status.is_retryable(),
                Err(e) => e.is_retryable(),
            };
            if !retryable || attempt >= self.retries {
                let response = outcome?;
                self.record_cookies(&response);
                return Ok(response);
            }

            let delay = self.backoff * 2u32.saturating_pow(attempt);
            match &outcome {
                Ok(response) => warn!(
                    "{} {} returned {}, retrying in {:?}",
                    request.method, request.url, response.status, delay
                ),
                Err(e) => warn!(
                    "{} {} failed: {}, retrying in {:?}",
                    request.method, request.url, e, delay
                ),
            }

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
