//! 用例附件输出
//!
//! 执行过程中的请求地址、请求头、预期结果、响应内容等以具名附件形式输出，
//! 附件输出失败不会影响用例结果。

use std::sync::Mutex;
use tracing::{debug, warn};

/// 附件内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Text,
    Json,
}

impl AttachmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentKind::Text => "text",
            AttachmentKind::Json => "json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub content: String,
    pub kind: AttachmentKind,
}

/// 附件接收方
pub trait Reporter: Send + Sync {
    fn attach(&self, name: &str, content: &str, kind: AttachmentKind);
}

/// 写入 tracing 日志（debug 级别，target 为 `rucase::attachment`）
#[derive(Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn attach(&self, name: &str, content: &str, kind: AttachmentKind) {
        debug!(target: "rucase::attachment", kind = kind.as_str(), "{}: {}", name, content);
    }
}

/// 收集到内存，供调用方在执行后检查
#[derive(Debug, Default)]
pub struct MemoryReporter {
    attachments: Mutex<Vec<Attachment>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attachments(&self) -> Vec<Attachment> {
        match self.attachments.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 取出已收集的附件并清空
    pub fn drain(&self) -> Vec<Attachment> {
        match self.attachments.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn find(&self, name: &str) -> Option<Attachment> {
        self.attachments().into_iter().find(|a| a.name == name)
    }
}

impl Reporter for MemoryReporter {
    fn attach(&self, name: &str, content: &str, kind: AttachmentKind) {
        match self.attachments.lock() {
            Ok(mut guard) => guard.push(Attachment {
                name: name.to_string(),
                content: content.to_string(),
                kind,
            }),
            Err(_) => warn!("Attachment '{}' dropped", name),
        }
    }
}
