//! Request factories and the ordered registry that picks one per file.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::{AnalysisOptions, AnalysisRequest, EnvironmentVariables, Language, RulesConfigProvider};
use crate::error::BridgeError;

/// Builds a request for files it recognizes.
pub trait RequestFactory: Send + Sync {
    /// Return a request if this factory handles `path`, `None` otherwise.
    fn try_get(&self, path: &Path, options: &AnalysisOptions) -> Option<AnalysisRequest>;
}

/// Ordered list of factories. Registration order is priority order.
#[derive(Default)]
pub struct RequestFactoryRegistry {
    factories: Vec<Box<dyn RequestFactory>>,
}

impl RequestFactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a factory after all previously registered ones.
    pub fn register(&mut self, factory: Box<dyn RequestFactory>) {
        self.factories.push(factory);
    }

    pub fn with(mut self, factory: Box<dyn RequestFactory>) -> Self {
        self.register(factory);
        self
    }

    /// Ask each factory in turn and return the first request produced.
    ///
    /// Later factories are not consulted once one matches. `Ok(None)` means
    /// no factory handles the file.
    pub fn try_get(
        &self,
        path: &Path,
        options: &AnalysisOptions,
    ) -> Result<Option<AnalysisRequest>, BridgeError> {
        if path.as_os_str().is_empty() {
            return Err(BridgeError::InvalidArgument("file path must not be empty"));
        }
        let request = self
            .factories
            .iter()
            .find_map(|factory| factory.try_get(path, options));
        if request.is_none() {
            debug!(file = %path.display(), "no request factory handles file");
        }
        Ok(request)
    }
}

/// Claims C and C++ sources and headers by extension.
pub struct CFamilyRequestFactory {
    rules: Arc<dyn RulesConfigProvider>,
    environment: Arc<EnvironmentVariables>,
}

impl CFamilyRequestFactory {
    pub fn new(rules: Arc<dyn RulesConfigProvider>, environment: Arc<EnvironmentVariables>) -> Self {
        Self { rules, environment }
    }
}

impl RequestFactory for CFamilyRequestFactory {
    fn try_get(&self, path: &Path, options: &AnalysisOptions) -> Option<AnalysisRequest> {
        let language = Language::from_path(path)?;
        let Some(rules) = self.rules.rules_configuration(language) else {
            debug!(file = %path.display(), %language, "no rules configured for language");
            return None;
        };
        debug!(
            file = %path.display(),
            %language,
            active_rules = rules.active_rules.len(),
            "request created"
        );
        Some(AnalysisRequest::new(
            path,
            language,
            rules,
            Arc::clone(&self.environment),
            *options,
        ))
    }
}
