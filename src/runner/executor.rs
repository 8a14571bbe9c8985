use crate::case::{CaseExpander, CaseLoader, CaseVariant};
use crate::http::Transport;
use crate::runner::types::{TestResult, TestSummary};
use crate::runner::{CaseRunner, RunError, TestReporter};
use crate::store::ExtractStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

/// 测试会话：清空提取存储，先执行前置文件，再按顺序执行用例文件
pub struct CaseExecutor<T: Transport> {
    runner: CaseRunner<T>,
    expander: CaseExpander,
    store: Arc<ExtractStore>,
    reporter: TestReporter,
    run_id: Uuid,
}

impl<T: Transport> CaseExecutor<T> {
    pub fn new(
        runner: CaseRunner<T>,
        expander: CaseExpander,
        store: Arc<ExtractStore>,
        reporter: TestReporter,
    ) -> Self {
        Self {
            runner,
            expander,
            store,
            reporter,
            run_id: Uuid::new_v4(),
        }
    }

    /// 执行一次完整会话
    ///
    /// 前置文件（通常是登录）加载失败或任何一条用例失败都会中止会话；
    /// 其他用例文件加载失败时记为一条错误结果，继续执行后续文件。
    pub async fn run_session(
        &self,
        setup: Option<&Path>,
        files: &[PathBuf],
    ) -> Result<(Vec<TestResult>, TestSummary), RunError> {
        let start = Instant::now();
        info!("Session {} started", self.run_id);
        self.store.clear()?;

        let mut results = Vec::new();

        if let Some(setup) = setup {
            let setup_results = self
                .run_file(setup)
                .await
                .map_err(|e| RunError::SetupFailed {
                    path: setup.display().to_string(),
                    reason: e.to_string(),
                })?;
            if let Some(failed) = setup_results.iter().find(|r| !r.success) {
                let reason = failed
                    .error
                    .clone()
                    .unwrap_or_else(|| format!("case '{}' failed", failed.name));
                error!("Setup file {} failed, session aborted", setup.display());
                return Err(RunError::SetupFailed {
                    path: setup.display().to_string(),
                    reason,
                });
            }
            results.extend(setup_results);
        }

        for file in files {
            match self.run_file(file).await {
                Ok(file_results) => results.extend(file_results),
                Err(e) => {
                    error!("Case file {} skipped: {}", file.display(), e);
                    let result = TestResult::error(
                        1,
                        file.display().to_string(),
                        String::new(),
                        String::new(),
                        e.to_string(),
                        Duration::ZERO,
                    );
                    self.reporter.print_result(&result);
                    results.push(result);
                }
            }
        }

        let mut summary = TestSummary::from_results(&results);
        summary.total_duration = start.elapsed();
        self.reporter.print_summary(&summary);
        info!(
            "Session {} finished: {} passed, {} failed, {} errors",
            self.run_id, summary.passed, summary.failed, summary.errors
        );

        Ok((results, summary))
    }

    /// 加载、展开并依次执行一个用例文件
    pub async fn run_file(&self, path: &Path) -> Result<Vec<TestResult>, RunError> {
        let variants = CaseLoader::collect(path, &self.expander)?;
        self.reporter
            .print_header(&path.display().to_string(), variants.len());

        let mut results = Vec::with_capacity(variants.len());
        for (index, variant) in variants.iter().enumerate() {
            let result = self.run_variant(index + 1, variant).await;
            self.reporter.print_result(&result);
            results.push(result);
        }
        Ok(results)
    }

    async fn run_variant(&self, index: usize, variant: &CaseVariant) -> TestResult {
        let span = info_span!("case", run_id = %self.run_id, case = %variant.name());
        let start = Instant::now();

        match self.runner.run_case(variant).instrument(span).await {
            Ok(report) => TestResult::from_report(index, report),
            Err(RunError::AssertionsFailed(report)) => {
                error!("Case '{}' failed: {} assertion(s) failed", variant.name(), report.failures);
                TestResult::from_report(index, *report)
            }
            Err(e) => {
                error!("Case '{}' failed: {}", variant.name(), e);
                TestResult::error(
                    index,
                    variant.name().to_string(),
                    variant.base_info.api_name.clone(),
                    variant.method().unwrap_or_default().to_string(),
                    e.to_string(),
                    start.elapsed(),
                )
            }
        }
    }
}
