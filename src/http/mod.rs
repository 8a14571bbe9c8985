pub mod client;
pub mod request;
pub mod response;
pub mod types;

use std::future::Future;

pub use client::Client;
pub use request::{OutgoingRequest, RequestBody, UploadFile};
pub use response::Response;
pub use types::{Method, Status};

/// 传输层错误
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {0} timed out")]
    Timeout(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Failed to read upload file {path}: {source}")]
    Upload {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid HTTP status code: {0}")]
    InvalidStatus(u16),
}

impl TransportError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(url.to_string())
        } else if err.is_connect() {
            TransportError::Connect {
                url: url.to_string(),
                source: err,
            }
        } else {
            TransportError::Http(err)
        }
    }

    /// 连接失败和超时可以重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Connect { .. } | TransportError::Timeout(_)
        )
    }
}

/// 发送请求的传输层
pub trait Transport {
    fn send(
        &self,
        request: &OutgoingRequest,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send;
}
