use crate::runner::types::{TestResult, TestSummary};
use crate::utils::{ResponseFormat, ResponseFormatter};
use colored::Colorize;

/// 控制台输出
pub struct TestReporter {
    verbose: bool,
    formatter: ResponseFormatter,
}

impl TestReporter {
    pub fn new(verbose: bool) -> Self {
        let format = if verbose {
            ResponseFormat::Verbose
        } else {
            ResponseFormat::Compact
        };

        Self {
            verbose,
            formatter: ResponseFormatter::new(format),
        }
    }

    /// 打印单条用例结果
    pub fn print_result(&self, result: &TestResult) {
        let symbol = if result.success {
            "✓".green()
        } else {
            "✗".red()
        };

        let status = result
            .status
            .map(|s| format!(" -> {}", s))
            .unwrap_or_default();

        println!(
            " {} [{}] {} - {} {} {}{} ({}ms)",
            symbol,
            result.index,
            result.name,
            result.api_name.dimmed(),
            result.method.cyan(),
            result.url,
            status,
            result.duration.as_millis()
        );

        // verbose 模式或失败时显示响应
        if (self.verbose || !result.success)
            && let Some(response) = &result.response
        {
            for line in self.formatter.format(response).lines() {
                println!("   {}", line);
            }
            println!();
        }

        if let Some(error) = &result.error {
            println!("   {}: {}", "Error".red().bold(), error);
            println!();
        }

        if !result.assertions.is_empty() && (self.verbose || !result.success) {
            println!("   Assertions:");
            for assertion in &result.assertions {
                if assertion.passed {
                    println!("     {} {}", "✓".green(), assertion.raw);
                } else {
                    println!("     {} {}", "✗".red(), assertion.raw);
                    if let Some(msg) = &assertion.message {
                        for line in msg.lines() {
                            println!("       {}", line.red());
                        }
                    }
                }
            }
            println!();
        }
    }

    pub fn print_header(&self, file_path: &str, total: usize) {
        println!("\nRunning {} cases from {}...\n", total, file_path.bold());
    }

    pub fn print_summary(&self, summary: &TestSummary) {
        println!("\n{}", "━".repeat(50));
        println!("{}", "Summary".bold());
        println!("{}", "━".repeat(50));

        if summary.all_passed() {
            println!(
                "  {}: {} passed, {} total",
                "Cases".bold(),
                summary.passed.to_string().green(),
                summary.total
            );
        } else {
            println!(
                "  {}: {} passed, {} failed, {} errors, {} total",
                "Cases".bold(),
                summary.passed.to_string().green(),
                summary.failed.to_string().red(),
                summary.errors.to_string().yellow(),
                summary.total
            );
        }

        if summary.total_assertions > 0 {
            if summary.failed_assertions == 0 {
                println!(
                    "  {}: {} passed, {} total",
                    "Assertions".bold(),
                    summary.passed_assertions.to_string().green(),
                    summary.total_assertions
                );
            } else {
                println!(
                    "  {}: {} passed, {} failed, {} total",
                    "Assertions".bold(),
                    summary.passed_assertions.to_string().green(),
                    summary.failed_assertions.to_string().red(),
                    summary.total_assertions
                );
            }
        }

        println!(
            "  {}: {:.3}s",
            "Duration".bold(),
            summary.total_duration.as_secs_f64()
        );
        println!();
    }
}

impl Default for TestReporter {
    fn default() -> Self {
        Self::new(false)
    }
}
