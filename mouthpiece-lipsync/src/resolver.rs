//! Aligner executable resolution
//!
//! Candidates are tried in priority order, first existing path wins:
//! 1. Path named by the override environment variable
//! 2. `./bin/<tool>` under the working directory
//! 3. OS command lookup (`which`, or `where` on Windows) on the system PATH
//!
//! Environment and working directory are captured in [`ResolverConfig`] up
//! front so resolution itself reads no ambient process state.

use crate::error::{LipSyncError, LipSyncResult};
use crate::process::{CommandRunner, Invocation, PathProbe};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where the aligner can be downloaded from
pub const ALIGNER_DOWNLOAD_URL: &str =
    "https://github.com/DanielSWolf/rhubarb-lip-sync/releases";

/// Absolute path to a located aligner binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToolPath(PathBuf);

impl ResolvedToolPath {
    /// Test-support constructor: wraps `path` without checking it exists
    ///
    /// Production code obtains paths from [`ExecutableResolver::resolve`].
    #[doc(hidden)]
    pub fn new_unchecked(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl fmt::Display for ResolvedToolPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Resolution inputs, captured from the process environment or set by tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Executable name (`rhubarb`)
    pub tool_name: String,
    /// Name of the override environment variable (`RHUBARB_PATH`)
    pub override_var: String,
    /// Value of the override variable, if set
    pub override_value: Option<String>,
    /// Directory that relative candidates are resolved against
    pub working_dir: PathBuf,
    /// Program used for the PATH lookup
    pub lookup_program: String,
}

impl ResolverConfig {
    pub fn new(
        tool_name: impl Into<String>,
        override_var: impl Into<String>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            override_var: override_var.into(),
            override_value: None,
            working_dir: working_dir.into(),
            lookup_program: default_lookup_program().to_string(),
        }
    }

    pub fn with_override(mut self, value: Option<String>) -> Self {
        self.override_value = value;
        self
    }

    pub fn with_lookup_program(mut self, program: impl Into<String>) -> Self {
        self.lookup_program = program.into();
        self
    }

    /// Snapshot the override variable and current directory
    pub fn from_environment(
        tool_name: impl Into<String>,
        override_var: impl Into<String>,
    ) -> LipSyncResult<Self> {
        let override_var = override_var.into();
        let override_value = std::env::var(&override_var).ok();
        let working_dir = std::env::current_dir()?;
        Ok(Self::new(tool_name, override_var, working_dir).with_override(override_value))
    }

    /// `./bin/<tool>` under the working directory
    pub fn local_candidate(&self) -> PathBuf {
        self.working_dir.join("bin").join(&self.tool_name)
    }

    fn absolutize(&self, path: &str) -> PathBuf {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            path
        } else {
            self.working_dir.join(path)
        }
    }
}

fn default_lookup_program() -> &'static str {
    if cfg!(windows) {
        "where"
    } else {
        "which"
    }
}

/// Which candidate an attempt refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSource {
    /// Override environment variable (carries the variable name)
    Override(String),
    /// `./bin/<tool>` under the working directory
    LocalBin,
    /// OS command lookup for the tool name
    SystemPath(String),
}

/// Outcome of checking one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome {
    /// Override variable not set, so no path to check
    NotSet,
    /// Candidate path was configured or computed but does not exist
    Missing(PathBuf),
    /// Lookup did not yield a path
    NotOnPath,
    /// Candidate exists and was accepted
    Found(PathBuf),
}

/// One step of the resolution search, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionAttempt {
    pub source: CandidateSource,
    pub outcome: CandidateOutcome,
}

impl ResolutionAttempt {
    /// Path checked by this attempt, if there was one
    pub fn path(&self) -> Option<&Path> {
        match &self.outcome {
            CandidateOutcome::Missing(p) | CandidateOutcome::Found(p) => Some(p),
            CandidateOutcome::NotSet | CandidateOutcome::NotOnPath => None,
        }
    }
}

impl fmt::Display for ResolutionAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source, &self.outcome) {
            (CandidateSource::Override(var), CandidateOutcome::NotSet) => {
                write!(f, "{} not set", var)
            }
            (CandidateSource::Override(var), CandidateOutcome::Missing(p)) => {
                write!(f, "{}={} (configured but missing)", var, p.display())
            }
            (CandidateSource::SystemPath(tool), CandidateOutcome::NotOnPath) => {
                write!(f, "'{}' on system PATH (not found)", tool)
            }
            (CandidateSource::SystemPath(tool), CandidateOutcome::Missing(p)) => {
                write!(f, "{} from PATH lookup of '{}' (missing)", p.display(), tool)
            }
            (_, CandidateOutcome::Missing(p)) => write!(f, "{} (missing)", p.display()),
            (_, CandidateOutcome::Found(p)) => write!(f, "{} (found)", p.display()),
            (_, _) => write!(f, "(not checked)"),
        }
    }
}

/// Locates the aligner binary
#[derive(Debug, Clone)]
pub struct ExecutableResolver {
    config: ResolverConfig,
}

impl ExecutableResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Search all candidates, returning the first one that exists
    ///
    /// Resolution has no side effects, so calling it twice is harmless.
    pub async fn resolve(
        &self,
        runner: &dyn CommandRunner,
        probe: &dyn PathProbe,
    ) -> LipSyncResult<ResolvedToolPath> {
        let mut attempts = Vec::with_capacity(3);

        // Candidate 1: override variable
        let override_source = CandidateSource::Override(self.config.override_var.clone());
        match self
            .config
            .override_value
            .as_deref()
            .filter(|v| !v.trim().is_empty())
        {
            Some(value) => {
                let path = self.config.absolutize(value.trim());
                if let Some(found) = self.accept(path, override_source, probe, &mut attempts) {
                    return Ok(found);
                }
            }
            None => attempts.push(ResolutionAttempt {
                source: override_source,
                outcome: CandidateOutcome::NotSet,
            }),
        }

        // Candidate 2: ./bin/<tool>
        let local = self.config.local_candidate();
        if let Some(found) = self.accept(local, CandidateSource::LocalBin, probe, &mut attempts) {
            return Ok(found);
        }

        // Candidate 3: PATH lookup
        let path_source = CandidateSource::SystemPath(self.config.tool_name.clone());
        match self.lookup_on_path(runner).await {
            Some(path) => {
                if let Some(found) = self.accept(path, path_source, probe, &mut attempts) {
                    return Ok(found);
                }
            }
            None => attempts.push(ResolutionAttempt {
                source: path_source,
                outcome: CandidateOutcome::NotOnPath,
            }),
        }

        Err(LipSyncError::ToolNotFound {
            tool: self.config.tool_name.clone(),
            attempts,
            guidance: self.guidance(),
        })
    }

    fn accept(
        &self,
        path: PathBuf,
        source: CandidateSource,
        probe: &dyn PathProbe,
        attempts: &mut Vec<ResolutionAttempt>,
    ) -> Option<ResolvedToolPath> {
        if probe.exists(&path) {
            debug!(candidate = %path.display(), source = ?source, "Aligner binary resolved");
            attempts.push(ResolutionAttempt {
                source,
                outcome: CandidateOutcome::Found(path.clone()),
            });
            Some(ResolvedToolPath(path))
        } else {
            debug!(candidate = %path.display(), source = ?source, "Aligner candidate missing");
            attempts.push(ResolutionAttempt {
                source,
                outcome: CandidateOutcome::Missing(path),
            });
            None
        }
    }

    async fn lookup_on_path(&self, runner: &dyn CommandRunner) -> Option<PathBuf> {
        let invocation = Invocation::new(&self.config.lookup_program).arg(&self.config.tool_name);
        match runner.run(&invocation).await {
            Ok(output) if output.success() => output
                .stdout
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(|line| self.config.absolutize(line)),
            Ok(output) => {
                debug!(code = ?output.code, command = %invocation, "PATH lookup found nothing");
                None
            }
            Err(e) => {
                debug!(error = %e, command = %invocation, "PATH lookup could not run");
                None
            }
        }
    }

    fn guidance(&self) -> String {
        format!(
            "Download Rhubarb Lip-Sync from {} and place the executable at {}, \
             or install it system-wide and ensure '{}' is on PATH. \
             You can also set {} to the executable location.",
            ALIGNER_DOWNLOAD_URL,
            self.config.local_candidate().display(),
            self.config.tool_name,
            self.config.override_var
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_candidate_under_working_dir() {
        let config = ResolverConfig::new("rhubarb", "RHUBARB_PATH", "/srv/app");
        assert_eq!(config.local_candidate(), PathBuf::from("/srv/app/bin/rhubarb"));
    }

    #[test]
    fn test_relative_override_is_absolutized() {
        let config = ResolverConfig::new("rhubarb", "RHUBARB_PATH", "/srv/app");
        assert_eq!(
            config.absolutize("tools/rhubarb"),
            PathBuf::from("/srv/app/tools/rhubarb")
        );
        assert_eq!(config.absolutize("/opt/rhubarb"), PathBuf::from("/opt/rhubarb"));
    }

    #[test]
    fn test_attempt_display_distinguishes_unset_from_missing() {
        let unset = ResolutionAttempt {
            source: CandidateSource::Override("RHUBARB_PATH".to_string()),
            outcome: CandidateOutcome::NotSet,
        };
        let missing = ResolutionAttempt {
            source: CandidateSource::Override("RHUBARB_PATH".to_string()),
            outcome: CandidateOutcome::Missing(PathBuf::from("/nope/rhubarb")),
        };
        assert_eq!(unset.to_string(), "RHUBARB_PATH not set");
        assert_eq!(
            missing.to_string(),
            "RHUBARB_PATH=/nope/rhubarb (configured but missing)"
        );
        assert_eq!(unset.path(), None);
        assert_eq!(missing.path(), Some(Path::new("/nope/rhubarb")));
    }
}
