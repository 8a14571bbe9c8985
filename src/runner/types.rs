use crate::assertion::AssertionResult;
use crate::http::Response;
use crate::runner::RunError;
use serde_json::{Map, Value};
use std::time::Duration;

/// 单条用例执行完成后的记录
#[derive(Debug, Clone)]
pub struct CaseReport {
    pub case_name: String,
    pub api_name: String,
    pub method: String,
    pub url: String,
    pub response: Response,
    /// 本条用例写入提取存储的数据
    pub extracted: Map<String, Value>,
    pub assertions: Vec<AssertionResult>,
    pub failures: usize,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        self.failures == 0
    }

    /// 断言有失败时转换为 [`RunError::AssertionsFailed`]，报告随错误返回
    pub fn into_result(self) -> Result<Self, RunError> {
        if self.passed() {
            Ok(self)
        } else {
            Err(RunError::AssertionsFailed(Box::new(self)))
        }
    }
}

/// 单条用例在控制台输出中的结果
#[derive(Debug, Clone)]
pub struct TestResult {
    /// 文件内序号（从 1 开始）
    pub index: usize,

    pub name: String,

    pub api_name: String,

    pub method: String,

    pub url: String,

    /// 响应状态码（请求成功时）
    pub status: Option<u16>,

    pub duration: Duration,

    /// 断言全部通过
    pub success: bool,

    /// 执行错误（请求失败、占位符错误、断言类型错误等）
    pub error: Option<String>,

    /// 完整的 HTTP 响应（用于详细输出）
    pub response: Option<Response>,

    pub assertions: Vec<AssertionResult>,
}

impl TestResult {
    pub fn from_report(index: usize, report: CaseReport) -> Self {
        let success = report.passed();
        Self {
            index,
            name: report.case_name,
            api_name: report.api_name,
            method: report.method,
            url: report.url,
            status: Some(report.response.status.code()),
            duration: report.response.duration,
            success,
            error: None,
            response: Some(report.response),
            assertions: report.assertions,
        }
    }

    pub fn error(
        index: usize,
        name: String,
        api_name: String,
        method: String,
        error: String,
        duration: Duration,
    ) -> Self {
        Self {
            index,
            name,
            api_name,
            method,
            url: String::new(),
            status: None,
            duration,
            success: false,
            error: Some(error),
            response: None,
            assertions: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// 测试摘要
#[derive(Debug, Clone, Default)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    /// 断言失败
    pub failed: usize,
    /// 执行出错
    pub errors: usize,
    pub total_duration: Duration,
    pub total_assertions: usize,
    pub passed_assertions: usize,
    pub failed_assertions: usize,
}

impl TestSummary {
    pub fn from_results(results: &[TestResult]) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        let errors = results.iter().filter(|r| r.is_error()).count();
        let total_duration = results.iter().map(|r| r.duration).sum();

        let total_assertions = results.iter().map(|r| r.assertions.len()).sum();
        let passed_assertions = results
            .iter()
            .flat_map(|r| &r.assertions)
            .filter(|a| a.passed)
            .count();

        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed - errors,
            errors,
            total_duration,
            total_assertions,
            passed_assertions,
            failed_assertions: total_assertions - passed_assertions,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }
}
