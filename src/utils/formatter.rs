use crate::http::Response;
use colored::*;
use serde_json::Value;

/// 缩进格式的 JSON 文本，用于附件和控制台输出
pub fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub enum ResponseFormat {
    Compact,
    Verbose,
}

pub struct ResponseFormatter {
    format: ResponseFormat,
    color: bool,
}

impl ResponseFormatter {
    pub fn new(format: ResponseFormat) -> Self {
        Self {
            format,
            color: true,
        }
    }

    pub fn without_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn format(&self, response: &Response) -> String {
        let mut output = vec![self.status_line(response, matches!(self.format, ResponseFormat::Verbose))];

        let timing = format!("Time: {}ms", response.duration.as_millis());
        output.push(if self.color {
            timing.cyan().to_string()
        } else {
            timing
        });

        match self.format {
            ResponseFormat::Compact => {
                let body = &response.body;
                if !body.is_empty() && body.len() < 200 {
                    output.push(format_body(body));
                } else if !body.is_empty() {
                    output.push(format!("Body: {} bytes", body.len()));
                }
            }
            ResponseFormat::Verbose => {
                output.push(String::new());
                output.push(self.title("Headers:"));
                for (key, value) in response.headers.iter() {
                    let line = format!(
                        "   {}: {}",
                        key,
                        value.to_str().unwrap_or("<invalid utf-8>")
                    );
                    output.push(if self.color {
                        line.blue().to_string()
                    } else {
                        line
                    });
                }

                if !response.body.is_empty() {
                    output.push(String::new());
                    output.push(self.title("Body:"));
                    output.push(format_body(&response.body));
                }
            }
        }

        output.join("\n")
    }

    fn status_line(&self, response: &Response, bold: bool) -> String {
        let line = format!("HTTP {}", response.status);
        if !self.color {
            return line;
        }

        let colored = if response.is_success() {
            line.green()
        } else if response.status.is_client_error() {
            line.yellow()
        } else {
            line.red()
        };
        if bold {
            colored.bold().to_string()
        } else {
            colored.to_string()
        }
    }

    fn title(&self, text: &str) -> String {
        if self.color {
            text.blue().bold().to_string()
        } else {
            text.to_string()
        }
    }
}

/// JSON 响应体格式化，非 JSON 原样返回
fn format_body(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .map(|v| pretty_json(&v))
        .unwrap_or_else(|_| body.to_string())
}
