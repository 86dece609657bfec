//! Reproducer captures for offline troubleshooting.
//!
//! When a request runs in reproducer mode, two files are written to a fixed
//! work directory before the analyzer starts:
//!
//! - `sonar-cfamily.request.reproducer`: the request's self-description
//! - `sonar-cfamily.reproducer`: the invocation (executable, arguments,
//!   environment, working directory) so the run can be replayed by hand
//!
//! Names are fixed per directory; concurrent captures into the same
//! directory overwrite each other.

use directories::ProjectDirs;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::BridgeError;
use crate::process::ProcessInvocation;
use crate::request::AnalysisRequest;

pub const REQUEST_FILE_NAME: &str = "sonar-cfamily.request.reproducer";
pub const REPRODUCER_FILE_NAME: &str = "sonar-cfamily.reproducer";

/// Paths of the files written for one capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReproducerArtifacts {
    pub request_file: PathBuf,
    pub reproducer_file: PathBuf,
}

#[derive(Serialize)]
struct ReplayDescription<'a> {
    executable: &'a Path,
    arguments: Vec<String>,
    working_directory: Option<&'a Path>,
    environment: &'a BTreeMap<String, String>,
}

/// Writes reproducer diagnostics into a work directory.
#[derive(Debug, Clone)]
pub struct ReproducerWriter {
    work_dir: PathBuf,
}

impl ReproducerWriter {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    /// Writer for the platform cache directory, or the temp dir if there is none.
    pub fn default_location() -> Self {
        Self::new(default_work_dir())
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn artifacts(&self) -> ReproducerArtifacts {
        ReproducerArtifacts {
            request_file: self.work_dir.join(REQUEST_FILE_NAME),
            reproducer_file: self.work_dir.join(REPRODUCER_FILE_NAME),
        }
    }

    /// Write both files. Never touches the analyzer's output.
    pub fn write(
        &self,
        request: &AnalysisRequest,
        invocation: &ProcessInvocation,
    ) -> Result<ReproducerArtifacts, BridgeError> {
        fs::create_dir_all(&self.work_dir).map_err(|source| BridgeError::Reproducer {
            path: self.work_dir.clone(),
            source,
        })?;

        let artifacts = self.artifacts();

        write_file(&artifacts.request_file, |w| request.write_request_diagnostics(w))?;
        debug!(path = %artifacts.request_file.display(), "wrote reproducer request description");

        let replay = ReplayDescription {
            executable: &invocation.executable,
            arguments: invocation
                .arguments
                .iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect(),
            working_directory: invocation.working_directory.as_deref(),
            environment: &invocation.environment,
        };
        write_file(&artifacts.reproducer_file, |w| {
            serde_json::to_writer_pretty(&mut *w, &replay)?;
            writeln!(w)
        })?;
        debug!(path = %artifacts.reproducer_file.display(), "wrote reproducer bundle");

        Ok(artifacts)
    }
}

fn default_work_dir() -> PathBuf {
    ProjectDirs::from("", "", "cfbridge")
        .map(|dirs| dirs.cache_dir().join("reproducer"))
        .unwrap_or_else(|| std::env::temp_dir().join("cfbridge").join("reproducer"))
}

fn write_file<F>(path: &Path, body: F) -> Result<(), BridgeError>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let to_err = |source| BridgeError::Reproducer {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(to_err)?;
    let mut writer = BufWriter::new(file);
    body(&mut writer).map_err(to_err)?;
    writer.flush().map_err(to_err)
}
