//! Test doubles for process execution and path checks
//!
//! `ScriptedRunner` replays queued results per program and records every
//! invocation. Unscripted programs succeed with empty output. When linked to
//! a `FakeProbe`, a successful run that names an `-o` output registers that
//! path as existing, mimicking the aligner writing its file.

#![allow(dead_code)]

use async_trait::async_trait;
use mouthpiece_lipsync::process::{CommandOutput, CommandRunner, Invocation, PathProbe};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Set-backed path existence
#[derive(Default)]
pub struct FakeProbe {
    paths: Mutex<HashSet<PathBuf>>,
}

impl FakeProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_paths<I, P>(paths: I) -> Arc<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let probe = Self::default();
        for p in paths {
            probe.add(p);
        }
        Arc::new(probe)
    }

    pub fn add(&self, path: impl Into<PathBuf>) {
        self.paths.lock().unwrap().insert(path.into());
    }
}

impl PathProbe for FakeProbe {
    fn exists(&self, path: &Path) -> bool {
        self.paths.lock().unwrap().contains(path)
    }
}

/// Result queued for one invocation
#[derive(Debug, Clone)]
pub enum Scripted {
    Output(CommandOutput),
    SpawnError(io::ErrorKind),
}

impl Scripted {
    pub fn ok(stdout: &str) -> Self {
        Scripted::Output(CommandOutput {
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        })
    }

    pub fn fail(code: i32, stderr: &str) -> Self {
        Scripted::Output(CommandOutput {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        })
    }
}

#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<Invocation>>,
    probe: Option<Arc<FakeProbe>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn linked_to(probe: Arc<FakeProbe>) -> Self {
        Self {
            probe: Some(probe),
            ..Self::default()
        }
    }

    /// Queue a result for the next call to `program`
    pub fn push(&self, program: impl Into<String>, result: Scripted) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .entry(program.into())
            .or_default()
            .push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, program: &str) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == program)
            .collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        self.calls.lock().unwrap().push(invocation.clone());

        let scripted = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&invocation.program)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Scripted::ok(""));

        match scripted {
            Scripted::SpawnError(kind) => Err(io::Error::new(kind, "scripted spawn failure")),
            Scripted::Output(output) => {
                if output.success() {
                    if let (Some(probe), Some(out)) = (&self.probe, invocation.arg_value("-o")) {
                        probe.add(out);
                    }
                }
                Ok(output)
            }
        }
    }
}
