//! CommandResult - Outcome of one console command

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Console operation a result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Load,
    New,
    Get,
    Set,
    Area,
    Save,
    Delete,
    Backup,
    Restore,
    Recent,
    List,
    Quit,
    Error,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Load => "load",
            Operation::New => "new",
            Operation::Get => "get",
            Operation::Set => "set",
            Operation::Area => "area",
            Operation::Save => "save",
            Operation::Delete => "delete",
            Operation::Backup => "backup",
            Operation::Restore => "restore",
            Operation::Recent => "recent",
            Operation::List => "list",
            Operation::Quit => "quit",
            Operation::Error => "error",
        }
    }

    /// Check if the operation only reads profile state
    pub fn is_query(&self) -> bool {
        matches!(self, Operation::Get | Operation::List | Operation::Recent)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Outcome of a command, built up with the `with_*` methods
///
/// `output` is the text a query prints; `message` is a one-line status.
/// Details are extra fields flattened into the JSON form, kept sorted so
/// that output is stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub input: String,
    pub operation: Operation,
    pub success: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl CommandResult {
    /// A successful result with nothing to show yet
    pub fn success(input: impl Into<String>, operation: Operation) -> Self {
        Self {
            input: input.into(),
            operation,
            success: true,
            output: String::new(),
            message: None,
            details: BTreeMap::new(),
        }
    }

    /// A failed result carrying the reason
    pub fn failure(
        input: impl Into<String>,
        operation: Operation,
        message: impl Into<String>,
    ) -> Self {
        Self::success(input, operation)
            .with_success(false)
            .with_message(message)
    }

    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach a detail; values that can't be represented as JSON become null
    pub fn with_detail(mut self, key: &str, value: impl Serialize) -> Self {
        self.add_detail(key, value);
        self
    }

    pub fn add_detail(&mut self, key: &str, value: impl Serialize) {
        let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
        self.details.insert(key.to_string(), value);
    }

    pub fn get_detail(&self, key: &str) -> Option<&serde_json::Value> {
        self.details.get(key)
    }

    pub fn is_query(&self) -> bool {
        self.operation.is_query()
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn is_failure(&self) -> bool {
        !self.success
    }
}
