//! External process and filesystem seams
//!
//! Orchestration code never spawns processes or stats paths directly. It goes
//! through [`CommandRunner`] and [`PathProbe`] so tests can substitute fakes.

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// A program plus its arguments, passed to the OS without a shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// True if any argument equals `flag`
    pub fn has_arg(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    /// Value following `flag`, if present
    pub fn arg_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for Invocation {
    /// Shell-like rendering for logs; arguments with spaces or quotes are quoted
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote_if_needed(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote_if_needed(arg))?;
        }
        Ok(())
    }
}

/// Wrap `value` in double quotes, escaping embedded quotes
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

fn quote_if_needed(value: &str) -> String {
    if value.is_empty() || value.contains(|c: char| c.is_whitespace() || c == '"') {
        quote(value)
    } else {
        value.to_string()
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stderr and stdout joined, used for failure classification
    pub fn diagnostic(&self) -> String {
        match (self.stderr.trim(), self.stdout.trim()) {
            ("", "") => format!("exit code {:?} with no output", self.code),
            (err, "") => err.to_string(),
            ("", out) => out.to_string(),
            (err, out) => format!("{}\n{}", err, out),
        }
    }
}

/// Runs an external program to completion and captures its output
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Spawn errors (e.g. program not found) are returned as `Err`;
    /// a non-zero exit is a successful run with `code != Some(0)`.
    async fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutput>;
}

/// [`CommandRunner`] backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutput> {
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Answers "does this path exist right now"
pub trait PathProbe: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
}

/// [`PathProbe`] backed by the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl PathProbe for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_quotes_only_when_needed() {
        let inv = Invocation::new("/opt/rhubarb")
            .args(["-f", "json"])
            .arg("my file.wav")
            .arg("say \"hi\"");
        assert_eq!(
            inv.to_string(),
            "/opt/rhubarb -f json \"my file.wav\" \"say \\\"hi\\\"\""
        );
    }

    #[test]
    fn test_arg_value_lookup() {
        let inv = Invocation::new("rhubarb").args(["-o", "out.json", "-r", "phonetic"]);
        assert_eq!(inv.arg_value("-o"), Some("out.json"));
        assert_eq!(inv.arg_value("-r"), Some("phonetic"));
        assert_eq!(inv.arg_value("-t"), None);
        assert!(inv.has_arg("-r"));
    }

    #[test]
    fn test_diagnostic_prefers_stderr() {
        let output = CommandOutput {
            code: Some(1),
            stdout: "progress".to_string(),
            stderr: "Error: PocketSphinx model missing".to_string(),
        };
        assert_eq!(
            output.diagnostic(),
            "Error: PocketSphinx model missing\nprogress"
        );
        assert!(!output.success());
    }

    #[test]
    fn test_diagnostic_without_output() {
        let output = CommandOutput {
            code: Some(3),
            ..Default::default()
        };
        assert_eq!(output.diagnostic(), "exit code Some(3) with no output");
    }

    #[tokio::test]
    async fn test_system_runner_missing_program_is_spawn_error() {
        let inv = Invocation::new("mouthpiece-definitely-not-a-real-program");
        let result = SystemRunner.run(&inv).await;
        assert!(result.is_err());
    }
}
