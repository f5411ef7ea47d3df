//! Formatters - Different output formatters for command results

use crate::command_result::CommandResult;
use std::io::Write;

/// Formatter trait
pub trait Formatter {
    fn format(&self, result: &CommandResult) -> String;
    fn write_to(&self, result: &CommandResult, writer: &mut dyn Write) -> std::io::Result<()> {
        write!(writer, "{}", self.format(result))
    }
    /// Prompt shown before reading the next command
    fn prompt(&self) -> &'static str {
        ""
    }
}

/// Shell formatter - interactive presentation with prompts and colors
pub struct ShellFormatter;

impl Formatter for ShellFormatter {
    fn format(&self, result: &CommandResult) -> String {
        if result.is_query() && result.is_success() {
            return result.output.clone();
        }

        let prefix = if result.success {
            "\x1b[32m✓\x1b[0m"
        } else {
            "\x1b[31m✗\x1b[0m"
        };
        let message = result
            .message
            .as_deref()
            .unwrap_or(result.output.trim_end());
        format!(
            "{} {}: {}\n",
            prefix,
            result.operation.to_string().to_uppercase(),
            message
        )
    }

    fn prompt(&self) -> &'static str {
        "\x1b[36m> \x1b[0m"
    }
}

/// Text formatter - returns plain text output
pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format(&self, result: &CommandResult) -> String {
        let mut text = result.output.clone();
        if let Some(ref message) = result.message {
            text.push_str(message);
            text.push('\n');
        }
        text
    }
}

/// JSON formatter - returns JSON string of structured data
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, result: &CommandResult) -> String {
        let mut json = serde_json::to_string(result).unwrap_or_else(|_| "{}".to_string());
        json.push('\n');
        json
    }
}

/// Formatters module - factory for creating formatters
pub struct Formatters;

impl Formatters {
    pub fn by_name(name: &str) -> Box<dyn Formatter> {
        match name.to_lowercase().as_str() {
            "shell" => Box::new(ShellFormatter),
            "text" => Box::new(TextFormatter),
            "json" => Box::new(JsonFormatter),
            _ => Box::new(ShellFormatter),
        }
    }
}
