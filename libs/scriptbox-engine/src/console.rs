//! Output capture for sandboxed code.
//!
//! The sandbox never writes to a real console. Each `console.*` call is
//! reported as a level plus a list of [`ConsoleValue`]s; the sandbox side only
//! decides *which* representation a value has (it is the only place the live
//! value exists), and everything about how that representation becomes text
//! lives here so that formatting is identical for every runtime.

use serde::{Deserialize, Serialize};

pub const WARNING_MARKER: &str = "⚠ ";
pub const ERRORS_HEADER: &str = "Errors:";

/// One console argument as reported by the sandbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ConsoleValue {
    Undefined,
    Null,
    /// A string argument, passed through unchanged
    Text(String),
    /// Structured serialization of an object or array
    Json(String),
    /// String coercion, used for primitives and unserializable objects
    Coerced(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Info,
    Debug,
    Warn,
    Error,
    Table,
}

/// A single console call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleRecord {
    pub level: ConsoleLevel,
    #[serde(default)]
    pub args: Vec<ConsoleValue>,
}

/// Render one value as text
pub fn format_value(value: &ConsoleValue) -> String {
    match value {
        ConsoleValue::Undefined => "undefined".to_string(),
        ConsoleValue::Null => "null".to_string(),
        ConsoleValue::Text(text) | ConsoleValue::Coerced(text) => text.clone(),
        ConsoleValue::Json(raw) => pretty_json(raw),
    }
}

/// Render a whole argument list, space separated
pub fn format_args(args: &[ConsoleValue]) -> String {
    args.iter().map(format_value).collect::<Vec<_>>().join(" ")
}

fn pretty_json(raw: &str) -> String {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| raw.to_string())
}

/// Buffers for one execution
#[derive(Debug, Default)]
pub struct OutputCapture {
    lines: Vec<String>,
    errors: Vec<String>,
}

impl OutputCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, args: &[ConsoleValue]) {
        self.push_line(&format_args(args));
    }

    pub fn info(&mut self, args: &[ConsoleValue]) {
        self.log(args);
    }

    pub fn debug(&mut self, args: &[ConsoleValue]) {
        self.log(args);
    }

    pub fn warn(&mut self, args: &[ConsoleValue]) {
        self.push_line(&format!("{}{}", WARNING_MARKER, format_args(args)));
    }

    /// Goes to the error buffer; this never marks the execution as failed
    pub fn error(&mut self, args: &[ConsoleValue]) {
        self.push_error_text(&format_args(args));
    }

    pub fn table(&mut self, args: &[ConsoleValue]) {
        let rendered = match args.first() {
            Some(ConsoleValue::Json(raw)) => pretty_json(raw),
            Some(other) => format_value(other),
            None => String::new(),
        };
        self.push_line(&rendered);
    }

    pub fn record(&mut self, record: &ConsoleRecord) {
        match record.level {
            ConsoleLevel::Log => self.log(&record.args),
            ConsoleLevel::Info => self.info(&record.args),
            ConsoleLevel::Debug => self.debug(&record.args),
            ConsoleLevel::Warn => self.warn(&record.args),
            ConsoleLevel::Error => self.error(&record.args),
            ConsoleLevel::Table => self.table(&record.args),
        }
    }

    /// Append already formatted text; multi-line text becomes several lines
    pub fn push_line(&mut self, text: &str) {
        self.lines.extend(text.split('\n').map(str::to_string));
    }

    pub fn push_error_text(&mut self, text: &str) {
        self.errors.extend(text.split('\n').map(str::to_string));
    }

    /// Append a stream of text (e.g. captured stdout), dropping the final
    /// newline so `print("a")` yields one line rather than two
    pub fn push_stream(&mut self, text: &str) {
        let text = text.strip_suffix('\n').unwrap_or(text);
        if !text.is_empty() {
            self.push_line(&text.replace("\r\n", "\n"));
        }
    }

    pub fn push_error_stream(&mut self, text: &str) {
        let text = text.trim_end();
        if !text.is_empty() {
            self.push_error_text(&text.replace("\r\n", "\n"));
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Output lines followed by the `Errors:` section when anything was
    /// written to the error buffer
    pub fn finish(self) -> Vec<String> {
        let mut lines = self.lines;
        if !self.errors.is_empty() {
            lines.push(ERRORS_HEADER.to_string());
            lines.extend(self.errors);
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> ConsoleValue {
        ConsoleValue::Text(s.to_string())
    }

    #[test]
    fn test_format_value_rules() {
        assert_eq!(format_value(&ConsoleValue::Undefined), "undefined");
        assert_eq!(format_value(&ConsoleValue::Null), "null");
        assert_eq!(format_value(&text("  keep  ")), "  keep  ");
        assert_eq!(format_value(&ConsoleValue::Coerced("42".into())), "42");
        assert_eq!(
            format_value(&ConsoleValue::Json(r#"{"a":1,"b":[true]}"#.into())),
            "{\n  \"a\": 1,\n  \"b\": [\n    true\n  ]\n}"
        );
    }

    #[test]
    fn test_json_keeps_key_order() {
        let rendered = format_value(&ConsoleValue::Json(r#"{"z":1,"a":2}"#.into()));
        assert!(rendered.find("\"z\"").unwrap() < rendered.find("\"a\"").unwrap());
    }

    #[test]
    fn test_invalid_json_falls_back_to_raw() {
        assert_eq!(format_value(&ConsoleValue::Json("{oops".into())), "{oops");
    }

    #[test]
    fn test_format_args_joins_with_space() {
        let args = vec![text("sum"), ConsoleValue::Coerced("3".into()), ConsoleValue::Null];
        assert_eq!(format_args(&args), "sum 3 null");
        assert_eq!(format_args(&[]), "");
    }

    #[test]
    fn test_warn_is_prefixed() {
        let mut capture = OutputCapture::new();
        capture.warn(&[text("careful")]);
        assert_eq!(capture.finish(), vec!["⚠ careful"]);
    }

    #[test]
    fn test_error_goes_to_separate_section() {
        let mut capture = OutputCapture::new();
        capture.log(&[text("first")]);
        capture.error(&[text("x")]);
        capture.info(&[text("second")]);
        assert!(capture.has_errors());
        assert_eq!(capture.finish(), vec!["first", "second", "Errors:", "x"]);
    }

    #[test]
    fn test_no_errors_section_when_clean() {
        let mut capture = OutputCapture::new();
        capture.log(&[text("only")]);
        assert_eq!(capture.finish(), vec!["only"]);
    }

    #[test]
    fn test_table_renders_structured() {
        let mut capture = OutputCapture::new();
        capture.table(&[ConsoleValue::Json(r#"[{"id":1}]"#.into())]);
        assert_eq!(capture.finish().join("\n"), "[\n  {\n    \"id\": 1\n  }\n]");
    }

    #[test]
    fn test_record_dispatch() {
        let record: ConsoleRecord = serde_json::from_str(
            r#"{"level":"warn","args":[{"kind":"text","value":"w"},{"kind":"undefined"}]}"#,
        )
        .unwrap();
        let mut capture = OutputCapture::new();
        capture.record(&record);
        assert_eq!(capture.finish(), vec!["⚠ w undefined"]);
    }

    #[test]
    fn test_push_stream_drops_trailing_newline() {
        let mut capture = OutputCapture::new();
        capture.push_stream("a\r\nb\n");
        capture.push_stream("");
        assert_eq!(capture.finish(), vec!["a", "b"]);
    }
}
