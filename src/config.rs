//! Bridge configuration file.
//!
//! ```yaml
//! analyzer: /opt/sonar-cfamily/subprocess
//! working_directory: /tmp/cfbridge
//! environment:
//!   CFAMILY_LOG_LEVEL: info
//! excluded_paths:
//!   - "**/third_party/**"
//! rules:
//!   cpp:
//!     active: [S100, S3776]
//!     parameters:
//!       S3776:
//!         threshold: "25"
//! ```

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::request::{EnvironmentVariables, Language, RulesConfigProvider, RulesConfiguration};

/// Default config file names to search for.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["cfbridge.yaml", ".cfbridge.yaml"];

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BridgeConfig {
    /// Path to the native analyzer executable.
    #[serde(default)]
    pub analyzer: PathBuf,
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
    /// Where reproducer captures go (default: platform cache dir).
    #[serde(default)]
    pub reproducer_directory: Option<PathBuf>,
    #[serde(default)]
    pub environment: EnvironmentVariables,
    /// Glob patterns for paths to skip when analyzing a directory.
    #[serde(default)]
    excluded_paths: Vec<String>,
    /// `excluded_paths` compiled once at load time.
    #[serde(skip)]
    excluded: GlobSet,
    /// Rule settings keyed by language ("c" or "cpp").
    #[serde(default)]
    pub rules: BTreeMap<String, LanguageRules>,
}

/// Rule settings for one language.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LanguageRules {
    #[serde(default)]
    pub active: Vec<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, BTreeMap<String, String>>,
}

impl BridgeConfig {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse_str(&content)
    }

    /// Parse a configuration, compiling its exclusion globs.
    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        let mut config: BridgeConfig = serde_yaml::from_str(content)?;
        config.excluded = build_glob_set(&config.excluded_paths)?;
        Ok(config)
    }

    pub fn excluded_paths(&self) -> &[String] {
        &self.excluded_paths
    }

    /// Replace the exclusion patterns. Fails if any pattern is not a valid glob.
    pub fn set_excluded_paths(&mut self, patterns: Vec<String>) -> anyhow::Result<()> {
        self.excluded = build_glob_set(&patterns)?;
        self.excluded_paths = patterns;
        Ok(())
    }

    /// Check if a path matches one of the exclusion patterns.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        self.excluded.is_match(path)
    }

    /// Freeze the rule sections into a provider the request factories can share.
    pub fn rules_provider(&self) -> ConfiguredRules {
        let by_language = self
            .rules
            .iter()
            .filter_map(|(key, rules)| {
                let language = Language::parse(key)?;
                let config = RulesConfiguration {
                    language_key: language.as_str().to_string(),
                    active_rules: rules.active.clone(),
                    rule_parameters: rules.parameters.clone(),
                };
                Some((language, Arc::new(config)))
            })
            .collect();
        ConfiguredRules { by_language }
    }
}

/// Rule configurations loaded from the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredRules {
    by_language: BTreeMap<Language, Arc<RulesConfiguration>>,
}

impl RulesConfigProvider for ConfiguredRules {
    fn rules_configuration(&self, language: Language) -> Option<Arc<RulesConfiguration>> {
        self.by_language.get(&language).cloned()
    }
}

fn build_glob_set(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Validate a configuration.
pub fn validate(config: &BridgeConfig) -> anyhow::Result<()> {
    if config.analyzer.as_os_str().is_empty() {
        anyhow::bail!("'analyzer' must point to the native analyzer executable");
    }

    for key in config.rules.keys() {
        if Language::parse(key).is_none() {
            anyhow::bail!("unknown rules language {:?}, must be 'c' or 'cpp'", key);
        }
    }

    Ok(())
}

/// Starter configuration written by `cfbridge init`.
pub const TEMPLATE: &str = r#"# cfbridge configuration
analyzer: /path/to/cfamily/subprocess
# working_directory: /tmp/cfbridge
# reproducer_directory: /tmp/cfbridge/reproducer
environment: {}
excluded_paths:
  - "**/build/**"
rules:
  c:
    active: []
  cpp:
    active: []
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
analyzer: /opt/cfamily/subprocess
environment:
  aaa: bbb
excluded_paths:
  - "**/third_party/**"
rules:
  cpp:
    active: [S100]
    parameters:
      S100:
        format: "^[a-z]+$"
"#;
        let config = BridgeConfig::parse_str(yaml).unwrap();
        assert_eq!(config.analyzer, PathBuf::from("/opt/cfamily/subprocess"));
        assert_eq!(config.environment["aaa"], "bbb");
        assert!(validate(&config).is_ok());

        let provider = config.rules_provider();
        let cpp = provider.rules_configuration(Language::Cpp).unwrap();
        assert_eq!(cpp.active_rules, vec!["S100"]);
        assert_eq!(cpp.rule_parameters["S100"]["format"], "^[a-z]+$");
        assert!(config.is_path_excluded(Path::new("/src/third_party/zlib/inflate.c")));
        assert!(provider.rules_configuration(Language::C).is_none());
    }

    #[test]
    fn test_validate_rejects_missing_analyzer() {
        let config = BridgeConfig::default();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_language() {
        let config = BridgeConfig {
            analyzer: PathBuf::from("analyzer"),
            rules: [("java".to_string(), LanguageRules::default())].into_iter().collect(),
            ..Default::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("java"));
    }

    #[test]
    fn test_bad_glob_rejected_at_load() {
        let yaml = "analyzer: analyzer\nexcluded_paths: [\"[\"]\n";
        let err = BridgeConfig::parse_str(yaml).unwrap_err();
        assert!(err.to_string().contains("excluded_paths"));

        let mut config = BridgeConfig::default();
        assert!(config.set_excluded_paths(vec!["[".to_string()]).is_err());
        assert!(config.excluded_paths().is_empty());
    }

    #[test]
    fn test_excluded_paths() {
        let mut config = BridgeConfig::default();
        config
            .set_excluded_paths(vec!["**/third_party/**".to_string(), "**/*.gen.c".to_string()])
            .unwrap();
        assert!(config.is_path_excluded(Path::new("/src/third_party/zlib/inflate.c")));
        assert!(config.is_path_excluded(Path::new("/src/parser.gen.c")));
        assert!(!config.is_path_excluded(Path::new("/src/main.c")));
    }

    #[test]
    fn test_no_exclusions_match_nothing() {
        let config = BridgeConfig::parse_str("analyzer: analyzer\n").unwrap();
        assert!(!config.is_path_excluded(Path::new("/src/main.c")));
    }

    #[test]
    fn test_template_is_valid_yaml() {
        let config = BridgeConfig::parse_str(TEMPLATE).unwrap();
        assert!(validate(&config).is_ok());
        assert_eq!(config.rules.len(), 2);
    }
}
