pub mod case_runner;
pub mod executor;
pub mod reporter;
pub mod types;

pub use case_runner::CaseRunner;
pub use executor::CaseExecutor;
pub use reporter::TestReporter;
pub use types::{CaseReport, TestResult, TestSummary};

use crate::assertion::AssertError;
use crate::case::CaseError;
use crate::config::ConfigError;
use crate::http::TransportError;
use crate::placeholder::PlaceholderError;
use crate::store::StoreError;

/// 用例执行错误
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Case(#[from] CaseError),

    #[error(transparent)]
    Placeholder(#[from] PlaceholderError),

    #[error(transparent)]
    Assert(#[from] AssertError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{} assertion(s) failed in case '{}'", .0.failures, .0.case_name)]
    AssertionsFailed(Box<CaseReport>),

    #[error("Setup file {path} failed: {reason}")]
    SetupFailed { path: String, reason: String },
}
