pub mod formatter;
pub mod value;

pub use formatter::{ResponseFormat, ResponseFormatter, pretty_json};
