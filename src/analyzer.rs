//! Runs one analysis request against the native analyzer and decodes the result.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::error::{BridgeError, ProtocolFault};
use crate::process::{CancellationToken, ProcessInvocation, ProcessRunner};
use crate::protocol::{read_response, Measure, Message, ResponseSummary, Symbol};
use crate::reproducer::ReproducerWriter;
use crate::request::AnalysisRequest;

/// What an invocation produced besides the streamed messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisOutcome {
    pub issue_count: usize,
    pub measures: Vec<Measure>,
    pub symbols: Vec<Symbol>,
}

impl From<ResponseSummary> for AnalysisOutcome {
    fn from(summary: ResponseSummary) -> Self {
        Self {
            issue_count: summary.issue_count,
            measures: summary.measures,
            symbols: summary.symbols,
        }
    }
}

/// Drives the analyzer subprocess and streams decoded issues to a sink.
///
/// Holds no state between invocations, so one `Analyzer` can serve
/// concurrent callers analyzing different files.
pub struct Analyzer<P> {
    executable: PathBuf,
    runner: P,
    working_directory: Option<PathBuf>,
    reproducer: ReproducerWriter,
}

impl<P: ProcessRunner> Analyzer<P> {
    pub fn new(executable: impl Into<PathBuf>, runner: P) -> Self {
        Self {
            executable: executable.into(),
            runner,
            working_directory: None,
            reproducer: ReproducerWriter::default_location(),
        }
    }

    /// Set the directory the analyzer process runs in.
    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Set where reproducer captures are written.
    pub fn reproducer_writer(mut self, writer: ReproducerWriter) -> Self {
        self.reproducer = writer;
        self
    }

    /// Build the process arguments for a request.
    pub fn invocation(&self, request: &AnalysisRequest) -> ProcessInvocation {
        ProcessInvocation {
            executable: self.executable.clone(),
            arguments: request.command_line_arguments(),
            environment: request.environment_variables().clone(),
            working_directory: self.working_directory.clone(),
        }
    }

    /// Analyze one file, calling `sink` for every issue in stream order.
    ///
    /// A protocol fault is fatal in normal mode. In reproducer mode the
    /// analyzer stops early on purpose, so the fault is dropped and the
    /// outcome is empty. Reproducer files that cannot be written are
    /// logged and skipped.
    pub fn analyze<F>(
        &self,
        request: &AnalysisRequest,
        cancel: &CancellationToken,
        mut sink: F,
    ) -> Result<AnalysisOutcome, BridgeError>
    where
        F: FnMut(Message),
    {
        if cancel.is_cancelled() {
            return Err(BridgeError::Cancelled);
        }

        let invocation = self.invocation(request);
        let create_reproducer = request.options().create_reproducer;
        if create_reproducer {
            match self.reproducer.write(request, &invocation) {
                Ok(artifacts) => debug!(
                    request = %artifacts.request_file.display(),
                    reproducer = %artifacts.reproducer_file.display(),
                    "reproducer capture requested"
                ),
                Err(err) => warn!(
                    work_dir = %self.reproducer.work_dir().display(),
                    %err,
                    "could not write reproducer files, analyzing anyway"
                ),
            }
        }

        info!(file = %request.file_path().display(), language = %request.language(), "analyzing");

        let mut decoded: Option<Result<ResponseSummary, ProtocolFault>> = None;
        self.runner.execute(&invocation, &mut |stdout| {
            decoded = Some(read_response(stdout, &mut sink));
        })?;
        // A runner that never handed over stdout produced an empty stream.
        let decoded = decoded.unwrap_or(Err(ProtocolFault::Truncated { field: "OUT" }));

        match decoded {
            Ok(summary) => {
                debug!(
                    file = %request.file_path().display(),
                    issues = summary.issue_count,
                    "analysis complete"
                );
                Ok(summary.into())
            }
            Err(fault) if create_reproducer => {
                debug!(%fault, "analyzer stopped early during reproducer capture");
                Ok(AnalysisOutcome::default())
            }
            Err(fault) => Err(BridgeError::Communication(fault)),
        }
    }

    /// Analyze one file and collect the issues.
    pub fn analyze_to_vec(
        &self,
        request: &AnalysisRequest,
        cancel: &CancellationToken,
    ) -> Result<(Vec<Message>, AnalysisOutcome), BridgeError> {
        let mut messages = Vec::new();
        let outcome = self.analyze(request, cancel, |m| messages.push(m))?;
        Ok((messages, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode_response, WireWriter};
    use crate::request::{AnalysisOptions, EnvironmentVariables, Language, RulesConfiguration};
    use std::io::{Cursor, Read};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Feeds canned bytes as stdout and records the invocation.
    struct CannedRunner {
        output: Vec<u8>,
        seen: Mutex<Vec<ProcessInvocation>>,
    }

    impl CannedRunner {
        fn new(output: Vec<u8>) -> Self {
            Self {
                output,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl ProcessRunner for CannedRunner {
        fn execute(
            &self,
            invocation: &ProcessInvocation,
            on_stdout: &mut dyn FnMut(&mut dyn Read),
        ) -> Result<(), BridgeError> {
            self.seen.lock().unwrap().push(invocation.clone());
            on_stdout(&mut Cursor::new(self.output.clone()));
            Ok(())
        }
    }

    fn request(create_reproducer: bool) -> AnalysisRequest {
        AnalysisRequest::new(
            "file.cpp",
            Language::Cpp,
            Arc::new(RulesConfiguration::default()),
            Arc::new(EnvironmentVariables::new()),
            AnalysisOptions { create_reproducer },
        )
    }

    fn out_foo() -> Vec<u8> {
        let mut w = WireWriter::new(Vec::new());
        w.write_utf("OUT").unwrap();
        w.write_utf("FOO").unwrap();
        w.into_inner()
    }

    #[test]
    fn test_cancelled_before_launch() {
        let analyzer = Analyzer::new("analyzer", CannedRunner::new(Vec::new()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = analyzer.analyze(&request(false), &cancel, |_| {}).unwrap_err();
        assert!(matches!(err, BridgeError::Cancelled));
        assert!(analyzer.runner.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_fault_is_fatal_in_normal_mode() {
        let analyzer = Analyzer::new("analyzer", CannedRunner::new(out_foo()));
        let err = analyzer
            .analyze(&request(false), &CancellationToken::new(), |_| {})
            .unwrap_err();
        assert_eq!(err.to_string(), "Communication issue with the C/C++ analyzer");
    }

    #[test]
    fn test_fault_is_tolerated_in_reproducer_mode() {
        let temp = TempDir::new().unwrap();
        let analyzer = Analyzer::new("analyzer", CannedRunner::new(out_foo()))
            .reproducer_writer(ReproducerWriter::new(temp.path()));
        let (messages, outcome) = analyzer
            .analyze_to_vec(&request(true), &CancellationToken::new())
            .unwrap();
        assert!(messages.is_empty());
        assert_eq!(outcome, AnalysisOutcome::default());
        assert!(temp.path().join(crate::reproducer::REQUEST_FILE_NAME).exists());
    }

    #[test]
    fn test_runner_without_stdout_is_a_fault() {
        struct Silent;
        impl ProcessRunner for Silent {
            fn execute(
                &self,
                _: &ProcessInvocation,
                _: &mut dyn FnMut(&mut dyn Read),
            ) -> Result<(), BridgeError> {
                Ok(())
            }
        }
        let analyzer = Analyzer::new("analyzer", Silent);
        let err = analyzer
            .analyze(&request(false), &CancellationToken::new(), |_| {})
            .unwrap_err();
        assert!(matches!(err, BridgeError::Communication(_)));
    }

    #[test]
    fn test_invocation_uses_request() {
        let runner = CannedRunner::new(encode_response(&[], &[], &[]).unwrap());
        let analyzer = Analyzer::new("/opt/subprocess", runner).working_directory("/tmp/work");
        let req = request(false);
        analyzer.analyze(&req, &CancellationToken::new(), |_| {}).unwrap();

        let seen = analyzer.runner.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].executable, PathBuf::from("/opt/subprocess"));
        assert_eq!(seen[0].arguments, req.command_line_arguments());
        assert_eq!(seen[0].working_directory, Some(PathBuf::from("/tmp/work")));
        assert!(Arc::ptr_eq(&seen[0].environment, req.environment_variables()));
    }
}
