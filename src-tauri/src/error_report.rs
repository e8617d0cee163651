use std::{backtrace::Backtrace, error::Error, panic::PanicHookInfo};

use serde::{Deserialize, Serialize};
use serde_json::Value;

const MAX_TITLE_BYTES: usize = 256;
const MAX_MESSAGE_BYTES: usize = 4 * 1024;
const MAX_STACK_BYTES: usize = 32 * 1024;
const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum FaultKind {
    UncaughtError,
    UnhandledRejection,
    Manual,
}

impl FaultKind {
    pub(crate) fn default_title(self) -> &'static str {
        match self {
            FaultKind::UncaughtError => "Unhandled Error",
            FaultKind::UnhandledRejection => "Unhandled Promise Rejection",
            FaultKind::Manual => "Error",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ReportError {
    #[error("error report must be a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("error report does not match the report schema: {0}")]
    Schema(#[from] serde_json::Error),
}

/// Fault payload carried across the webview boundary. Every field is plain
/// text so the report is always serializable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorReport {
    pub(crate) kind: FaultKind,
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) message: String,
    #[serde(default)]
    pub(crate) stack: Option<String>,
}

fn truncate_at_char_boundary(mut text: String, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text;
    }
    let mut cut = max_bytes;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl ErrorReport {
    pub(crate) fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: None,
            message: message.into(),
            stack: None,
        }
        .normalized()
    }

    pub(crate) fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self.normalized()
    }

    /// Validates a payload received from the webview.
    pub(crate) fn from_payload(payload: Value) -> Result<Self, ReportError> {
        if !payload.is_object() {
            return Err(ReportError::NotAnObject(json_type_name(&payload)));
        }
        let report: ErrorReport = serde_json::from_value(payload)?;
        Ok(report.normalized())
    }

    /// Builds a report from a Rust error, rendering its source chain as the
    /// stack text.
    pub(crate) fn from_error(error: &(dyn Error + 'static), kind: FaultKind) -> Self {
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(format!("caused by: {cause}"));
            source = cause.source();
        }
        let report = Self::new(kind, error.to_string());
        if chain.is_empty() {
            report
        } else {
            report.with_stack(chain.join("\n"))
        }
    }

    pub(crate) fn from_panic(info: &PanicHookInfo<'_>) -> Self {
        let payload = info.payload();
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "panic with non-string payload".to_string()
        };
        let location = info
            .location()
            .map(|location| format!("panicked at {location}\n"))
            .unwrap_or_default();

        Self::new(FaultKind::UncaughtError, message).with_stack(format!(
            "{location}{}",
            Backtrace::force_capture()
        ))
    }

    fn normalized(mut self) -> Self {
        self.title = self
            .title
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .map(|title| truncate_at_char_boundary(title, MAX_TITLE_BYTES));

        let message = self.message.trim();
        self.message = if message.is_empty() {
            UNKNOWN_ERROR_MESSAGE.to_string()
        } else {
            truncate_at_char_boundary(message.to_string(), MAX_MESSAGE_BYTES)
        };

        self.stack = self
            .stack
            .filter(|stack| !stack.trim().is_empty())
            .map(|stack| truncate_at_char_boundary(stack, MAX_STACK_BYTES));
        self
    }
}
