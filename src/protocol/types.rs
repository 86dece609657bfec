//! Records decoded from the analyzer response.

use serde::{Deserialize, Serialize};

/// A span in a source file as reported by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextRange {
    pub start_line: i32,
    pub end_line: i32,
    pub start_offset: i32,
    pub end_offset: i32,
}

impl TextRange {
    pub fn new(start_line: i32, end_line: i32, start_offset: i32, end_offset: i32) -> Self {
        Self {
            start_line,
            end_line,
            start_offset,
            end_offset,
        }
    }
}

/// A single step within a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub filename: String,
    pub text_range: TextRange,
    pub message_text: String,
}

/// An ordered path explaining an issue. Step order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub locations: Vec<Location>,
}

/// A data-flow path attached to an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFlow {
    pub description: String,
    pub steps: Vec<Location>,
}

/// One text replacement inside a quick fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    pub text_range: TextRange,
    pub text: String,
}

/// A quick fix proposed by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fix {
    pub message: String,
    pub edits: Vec<Edit>,
}

/// An issue reported by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub rule_key: String,
    pub filename: String,
    pub text_range: TextRange,
    /// Extra header integer with no meaning to the bridge.
    pub remediation_effort: i32,
    pub message_text: String,
    pub part_of_effective_profile: bool,
    pub flows: Vec<Flow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_flows: Vec<DataFlow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixes: Vec<Fix>,
}

/// Per-file metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    pub filename: String,
    pub classes: i32,
    pub functions: i32,
    pub statements: i32,
    pub complexity: i32,
    pub cognitive_complexity: i32,
    /// Bitmap of executable lines, raw as received.
    pub executable_lines: Vec<u8>,
}

/// Symbol reference range. The decoder only preserves the six fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub line: i32,
    pub column: i32,
    pub end_line: i32,
    pub end_column: i32,
    pub reference_count: i32,
    pub kind: i32,
}
