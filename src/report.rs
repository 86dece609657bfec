//! Output formatting for analysis results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

use crate::protocol::{Measure, Message};

/// Result of analyzing one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub file: String,
    pub language: String,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measures: Vec<Measure>,
    /// Set when the analysis failed; `messages` then holds what arrived first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Top-level JSON report.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub path: String,
    pub files_analyzed: usize,
    pub issue_count: usize,
    pub error_count: usize,
    pub files: Vec<FileReport>,
}

impl JsonReport {
    pub fn new(path: &str, files: Vec<FileReport>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            path: path.to_string(),
            files_analyzed: files.len(),
            issue_count: issue_count(&files),
            error_count: files.iter().filter(|f| f.error.is_some()).count(),
            files,
        }
    }
}

/// Total number of issues across all files.
pub fn issue_count(files: &[FileReport]) -> usize {
    files.iter().map(|f| f.messages.len()).sum()
}

/// Write the JSON report to stdout.
pub fn write_json(path: &str, files: Vec<FileReport>) -> anyhow::Result<()> {
    let report = JsonReport::new(path, files);
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, &report)?;
    writeln!(handle)?;
    Ok(())
}

/// Write colored output to stdout.
pub fn write_pretty(path: &str, files: &[FileReport]) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let _ = render_pretty(&mut handle, path, files);
}

/// Render the pretty format into any writer.
pub fn render_pretty<W: Write>(out: &mut W, path: &str, files: &[FileReport]) -> io::Result<()> {
    writeln!(out, "{} {}", "cfbridge".bold(), path)?;
    writeln!(out)?;

    for file in files {
        if let Some(err) = &file.error {
            writeln!(out, "{} {}: {}", "error".red().bold(), file.file, err)?;
        }
        for message in &file.messages {
            writeln!(
                out,
                "{}:{}:{}: {} [{}]",
                message.filename,
                message.text_range.start_line,
                message.text_range.start_offset,
                message.message_text,
                message.rule_key.yellow()
            )?;
            for (i, flow) in message.flows.iter().enumerate() {
                for location in &flow.locations {
                    writeln!(
                        out,
                        "    {} {}:{}: {}",
                        format!("{}.", i + 1).dimmed(),
                        location.filename,
                        location.text_range.start_line,
                        location.message_text
                    )?;
                }
            }
        }
    }

    let issues = issue_count(files);
    let errors = files.iter().filter(|f| f.error.is_some()).count();
    writeln!(out)?;
    let summary = format!(
        "{} file(s) analyzed, {} issue(s), {} error(s)",
        files.len(),
        issues,
        errors
    );
    if issues == 0 && errors == 0 {
        writeln!(out, "{}", summary.green())
    } else {
        writeln!(out, "{}", summary.red())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Flow, Location, TextRange};

    fn report() -> FileReport {
        FileReport {
            file: "file.cpp".to_string(),
            language: "cpp".to_string(),
            messages: vec![Message {
                rule_key: "S5025".to_string(),
                filename: "file.cpp".to_string(),
                text_range: TextRange::new(10, 10, 4, 9),
                remediation_effort: 0,
                message_text: "Use a smart pointer".to_string(),
                part_of_effective_profile: true,
                flows: vec![Flow {
                    locations: vec![Location {
                        filename: "file.cpp".to_string(),
                        text_range: TextRange::new(12, 12, 1, 2),
                        message_text: "allocated here".to_string(),
                    }],
                }],
                data_flows: vec![],
                fixes: vec![],
            }],
            measures: vec![],
            error: None,
        }
    }

    #[test]
    fn test_pretty_lists_issue_and_flow() {
        colored::control::set_override(false);
        let mut out = Vec::new();
        render_pretty(&mut out, "src", &[report()]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("file.cpp:10:4: Use a smart pointer [S5025]"));
        assert!(text.contains("1. file.cpp:12: allocated here"));
        assert!(text.contains("1 file(s) analyzed, 1 issue(s), 0 error(s)"));
    }

    #[test]
    fn test_json_report_counts() {
        let mut failed = report();
        failed.messages.clear();
        failed.error = Some("Communication issue with the C/C++ analyzer".to_string());
        let report = JsonReport::new("src", vec![report(), failed]);
        assert_eq!(report.files_analyzed, 2);
        assert_eq!(report.issue_count, 1);
        assert_eq!(report.error_count, 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["files"][0]["messages"][0]["rule_key"], "S5025");
        assert!(json["files"][0].get("error").is_none());
    }
}
