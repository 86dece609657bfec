//! Analysis requests: one immutable description per analyzer invocation.

mod factory;

pub use factory::{CFamilyRequestFactory, RequestFactory, RequestFactoryRegistry};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variables forwarded to the analyzer, name to value.
pub type EnvironmentVariables = BTreeMap<String, String>;

/// Per-run options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Run the analyzer to capture a reproducer bundle instead of issues.
    #[serde(default)]
    pub create_reproducer: bool,
}

/// Languages the native analyzer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    Cpp,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "c" => Some(Language::C),
            "cpp" => Some(Language::Cpp),
            _ => None,
        }
    }

    /// Determine the language from a file extension (without dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "c" => Some(Language::C),
            "cpp" | "cc" | "cxx" | "c++" | "h" | "hh" | "hpp" | "hxx" => Some(Language::Cpp),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Effective rule configuration for one language.
///
/// Produced upstream (legacy keys already translated, project-level rules
/// already removed) and treated as read-only here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfiguration {
    pub language_key: String,
    #[serde(default)]
    pub active_rules: Vec<String>,
    #[serde(default)]
    pub rule_parameters: BTreeMap<String, BTreeMap<String, String>>,
}

/// Supplies the rule configuration for a language.
pub trait RulesConfigProvider: Send + Sync {
    fn rules_configuration(&self, language: Language) -> Option<Arc<RulesConfiguration>>;
}

/// One analyzer invocation. Immutable once built.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    file_path: PathBuf,
    language: Language,
    rules_configuration: Arc<RulesConfiguration>,
    environment_variables: Arc<EnvironmentVariables>,
    options: AnalysisOptions,
}

/// Serialized form of a request, written for reproducer captures.
#[derive(Serialize)]
struct RequestDescription<'a> {
    file: &'a Path,
    language: Language,
    options: &'a AnalysisOptions,
    arguments: Vec<String>,
    environment: &'a EnvironmentVariables,
    rules: &'a RulesConfiguration,
}

impl AnalysisRequest {
    pub fn new(
        file_path: impl Into<PathBuf>,
        language: Language,
        rules_configuration: Arc<RulesConfiguration>,
        environment_variables: Arc<EnvironmentVariables>,
        options: AnalysisOptions,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            language,
            rules_configuration,
            environment_variables,
            options,
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn rules_configuration(&self) -> &Arc<RulesConfiguration> {
        &self.rules_configuration
    }

    /// The exact environment instance the request was built with.
    pub fn environment_variables(&self) -> &Arc<EnvironmentVariables> {
        &self.environment_variables
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Arguments for the analyzer: the file path and nothing else.
    pub fn command_line_arguments(&self) -> Vec<OsString> {
        vec![self.file_path.clone().into_os_string()]
    }

    /// Write a JSON self-description of this request. Has no other effect.
    pub fn write_request_diagnostics<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let description = RequestDescription {
            file: &self.file_path,
            language: self.language,
            options: &self.options,
            arguments: self
                .command_line_arguments()
                .iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect(),
            environment: &self.environment_variables,
            rules: &self.rules_configuration,
        };
        serde_json::to_writer_pretty(&mut *writer, &description)?;
        writeln!(writer)
    }
}
