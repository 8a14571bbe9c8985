/// 断言模块：contains / eq / ne / db
mod backend;
mod evaluator;
mod types;

pub use backend::QueryBackend;
pub use evaluator::AssertionEvaluator;
pub use types::{AssertError, AssertionClause, AssertionResult, Verdict};
