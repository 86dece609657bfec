//! cfbridge - bridge to an out-of-process C/C++ static analyzer.
//!
//! The native analyzer runs as a subprocess. It receives the file to analyze
//! as its only argument and answers on stdout with a length-prefixed binary
//! stream of issues, measures and symbols.
//!
//! # Architecture
//!
//! - `request`: analysis requests and the ordered factory registry that
//!   picks one per file
//! - `process`: subprocess execution behind the `ProcessRunner` trait
//! - `protocol`: wire codec and the response section state machine
//! - `analyzer`: runs a request and streams decoded issues to a sink
//! - `reproducer`: troubleshooting captures written in reproducer mode
//! - `config`: YAML configuration for the CLI
//! - `report`: output formatting (text, JSON)

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod process;
pub mod protocol;
pub mod report;
pub mod reproducer;
pub mod request;

pub use analyzer::{AnalysisOutcome, Analyzer};
pub use error::{BridgeError, ProtocolFault, COMMUNICATION_ERROR_MESSAGE};
pub use process::{CancellationToken, ProcessInvocation, ProcessRunner, SubprocessRunner};
pub use protocol::{Flow, Location, Measure, Message, Symbol, TextRange};
pub use request::{
    AnalysisOptions, AnalysisRequest, CFamilyRequestFactory, EnvironmentVariables, Language,
    RequestFactory, RequestFactoryRegistry, RulesConfigProvider, RulesConfiguration,
};
