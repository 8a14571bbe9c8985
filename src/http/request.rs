use std::path::PathBuf;
use std::time::Duration;

use crate::http::types::Method;
use serde_json::{Map, Value};

/// 请求体形态
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    None,
    /// `json`：序列化为 JSON
    Json(Value),
    /// `data` 为映射：表单编码
    Form(Vec<(String, String)>),
    /// `data` 为文本：原样发送
    Raw(String),
}

/// multipart 上传文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub field: String,
    pub path: PathBuf,
}

/// 发往传输层的请求描述
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub cookies: Option<Map<String, Value>>,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub files: Vec<UploadFile>,
    /// 单次请求超时，未设置时使用客户端默认值
    pub timeout: Option<Duration>,
}

impl OutgoingRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            cookies: None,
            query: Vec::new(),
            body: RequestBody::None,
            files: Vec::new(),
            timeout: None,
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_cookies(mut self, cookies: Map<String, Value>) -> Self {
        self.cookies = Some(cookies);
        self
    }

    pub fn with_file(mut self, field: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.files.push(UploadFile {
            field: field.into(),
            path: path.into(),
        });
        self
    }

    /// Cookie 请求头的值
    pub fn cookie_header(&self) -> Option<String> {
        let cookies = self.cookies.as_ref().filter(|c| !c.is_empty())?;
        Some(
            cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, crate::utils::value::to_text(v)))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let request = OutgoingRequest::new(Method::Post, "http://localhost/api")
            .with_header("Content-Type", "application/json")
            .with_query("page", "1")
            .with_body(RequestBody::Json(json!({"a": 1})))
            .with_file("file", "/tmp/a.txt");

        assert_eq!(
            request.headers,
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );
        assert_eq!(request.query, vec![("page".to_string(), "1".to_string())]);
        assert_eq!(request.files[0].field, "file");
    }

    #[test]
    fn test_cookie_header() {
        let request = OutgoingRequest::new(Method::Get, "http://localhost");
        assert_eq!(request.cookie_header(), None);

        let cookies = json!({"JSESSIONID": "abc", "uid": 7});
        let request = request.with_cookies(cookies.as_object().unwrap().clone());
        assert_eq!(
            request.cookie_header().as_deref(),
            Some("JSESSIONID=abc; uid=7")
        );
    }
}
