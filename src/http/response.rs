use crate::http::TransportError;
use crate::http::types::Status;
use reqwest::header::{HeaderMap as Headers, SET_COOKIE};
use serde_json::{Map, Value};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Response {
    pub status: Status,
    pub headers: Headers,
    pub body: String,
    pub duration: Duration,
}

impl Response {
    pub fn new(
        status: u16,
        headers: Headers,
        body: String,
        duration: Duration,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            status: Status::new(status)?,
            headers,
            body,
            duration,
        })
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    /// 按 JSON 解析响应体，非 JSON 返回 None
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// 响应头映射，同名多值以 `, ` 拼接
    pub fn header_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for (name, value) in &self.headers {
            let value = String::from_utf8_lossy(value.as_bytes()).to_string();
            match map.get_mut(name.as_str()) {
                Some(Value::String(existing)) => {
                    existing.push_str(", ");
                    existing.push_str(&value);
                }
                _ => {
                    map.insert(name.as_str().to_string(), Value::String(value));
                }
            }
        }
        map
    }

    /// 解析 Set-Cookie，返回 name -> value
    pub fn cookies(&self) -> Map<String, Value> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|raw| {
                let pair = raw.split(';').next()?.trim();
                let (name, value) = pair.split_once('=')?;
                let name = name.trim();
                (!name.is_empty())
                    .then(|| (name.to_string(), Value::String(value.trim().to_string())))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(headers: &[(&str, &str)], body: &str) -> Response {
        let mut map = Headers::new();
        for (k, v) in headers {
            map.append(
                reqwest::header::HeaderName::from_bytes(k.as_bytes()).unwrap(),
                v.parse().unwrap(),
            );
        }
        Response::new(200, map, body.to_string(), Duration::from_millis(5)).unwrap()
    }

    #[test]
    fn test_json_body() {
        assert_eq!(response(&[], r#"{"a":1}"#).json(), Some(json!({"a": 1})));
        assert_eq!(response(&[], "<html>").json(), None);
    }

    #[test]
    fn test_header_map() {
        let resp = response(
            &[("content-type", "application/json"), ("x-tag", "a"), ("x-tag", "b")],
            "",
        );
        let map = resp.header_map();
        assert_eq!(map["content-type"], json!("application/json"));
        assert_eq!(map["x-tag"], json!("a, b"));
    }

    #[test]
    fn test_cookies() {
        let resp = response(
            &[
                ("set-cookie", "JSESSIONID=abc123; Path=/; HttpOnly"),
                ("set-cookie", "lang=zh"),
                ("set-cookie", "broken"),
            ],
            "",
        );
        let cookies = resp.cookies();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies["JSESSIONID"], json!("abc123"));
        assert_eq!(cookies["lang"], json!("zh"));
    }
}
