//! Line-by-line structural check of a feedback file.
//!
//! Unlike the store loader, which silently skips bad lines, the validator
//! reports every line so a reviewer can repair the file by hand.

use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    Valid,
    MissingFields(Vec<&'static str>),
    InvalidJson,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    /// 1-based line number.
    pub line: usize,
    pub status: EntryStatus,
}

impl fmt::Display for EntryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            EntryStatus::Valid => write!(f, "✅ Entry {} is valid.", self.line),
            EntryStatus::MissingFields(fields) => {
                let quoted: Vec<String> = fields.iter().map(|n| format!("'{n}'")).collect();
                write!(
                    f,
                    "❌ Entry {} is missing fields: [{}]",
                    self.line,
                    quoted.join(", ")
                )
            }
            EntryStatus::InvalidJson => write!(f, "❌ Entry {} is not valid JSON.", self.line),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationReport {
    FileNotFound(PathBuf),
    Entries(Vec<EntryReport>),
}

impl ValidationReport {
    /// True when the file exists and every line is valid.
    pub fn is_clean(&self) -> bool {
        match self {
            ValidationReport::FileNotFound(_) => false,
            ValidationReport::Entries(entries) => {
                entries.iter().all(|e| e.status == EntryStatus::Valid)
            }
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationReport::FileNotFound(path) => {
                writeln!(f, "File {} not found.", path.display())
            }
            ValidationReport::Entries(entries) => {
                for entry in entries {
                    writeln!(f, "{entry}")?;
                }
                Ok(())
            }
        }
    }
}

/// Check one line. A field counts as missing when absent, null, or empty.
pub fn check_entry(line: &str) -> EntryStatus {
    let Ok(entry) = serde_json::from_str::<Value>(line.trim()) else {
        return EntryStatus::InvalidJson;
    };

    let present = |value: Option<&Value>| match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Bool(b)) => *b,
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(Value::Number(_)) => true,
    };

    let log = entry.get("log");
    let mut missing = Vec::new();
    for field in ["task", "prompt", "response"] {
        if !present(log.and_then(|l| l.get(field))) {
            missing.push(field);
        }
    }
    if !present(entry.get("reason")) {
        missing.push("reason");
    }

    if missing.is_empty() {
        EntryStatus::Valid
    } else {
        EntryStatus::MissingFields(missing)
    }
}

/// Check every line of a feedback file.
pub fn validate_text(text: &str) -> Vec<EntryReport> {
    text.lines()
        .enumerate()
        .map(|(idx, line)| EntryReport {
            line: idx + 1,
            status: check_entry(line),
        })
        .collect()
}

/// Validate the file at `path`. A missing file is a report, not an error.
pub fn validate_feedback_file(path: &Path) -> std::io::Result<ValidationReport> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(ValidationReport::Entries(validate_text(
            &String::from_utf8_lossy(&bytes),
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Ok(ValidationReport::FileNotFound(path.to_path_buf()))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"{"log":{"task":"moderator","prompt":"p","response":"r"},"reason":"Other"}"#;

    #[test]
    fn reports_each_line_in_order() {
        let text = format!(
            "{GOOD}\n{{\"log\":{{\"task\":\"moderator\",\"prompt\":\"p\",\"response\":\"\"}}}}\nnope\n"
        );
        let lines: Vec<String> = validate_text(&text).iter().map(ToString::to_string).collect();
        assert_eq!(
            lines,
            vec![
                "✅ Entry 1 is valid.",
                "❌ Entry 2 is missing fields: ['response', 'reason']",
                "❌ Entry 3 is not valid JSON.",
            ]
        );
    }

    #[test]
    fn missing_log_reports_all_log_fields() {
        assert_eq!(
            check_entry(r#"{"reason":"Other"}"#),
            EntryStatus::MissingFields(vec!["task", "prompt", "response"])
        );
        assert_eq!(
            check_entry(r#"["not", "an", "object"]"#),
            EntryStatus::MissingFields(vec!["task", "prompt", "response", "reason"])
        );
    }

    #[test]
    fn blank_line_is_invalid_json() {
        assert_eq!(check_entry(""), EntryStatus::InvalidJson);
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback_queue.jsonl");
        let report = validate_feedback_file(&path).unwrap();
        assert!(!report.is_clean());
        assert_eq!(
            report.to_string(),
            format!("File {} not found.\n", path.display())
        );
    }

    #[test]
    fn clean_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback.jsonl");
        std::fs::write(&path, format!("{GOOD}\n{GOOD}\n")).unwrap();
        let report = validate_feedback_file(&path).unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn non_utf8_line_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback.jsonl");
        let mut bytes = format!("{GOOD}\n").into_bytes();
        bytes.extend_from_slice(b"\xff\xfe garbage\n");
        std::fs::write(&path, bytes).unwrap();

        let report = validate_feedback_file(&path).unwrap();
        assert!(!report.is_clean());
        assert!(report.to_string().contains("❌ Entry 2 is not valid JSON."));
    }
}
