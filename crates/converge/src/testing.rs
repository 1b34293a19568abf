//! Scripted fakes shared by the engine's unit tests

use crate::context::{CommandOutput, CommandRunner, FileSnapshot, FileStore};
use crate::error::{Error, Result};
use crate::probe::Prober;
use crate::types::{ExecMode, Observed, ResourceKind};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Prober over canned observations, recording every call
///
/// Identities without a canned observation come back `Absent`; identities
/// registered through `failing` surface a probe error instead.
pub struct SpyProber {
    states: HashMap<(ResourceKind, String), Observed>,
    failures: HashSet<(ResourceKind, String)>,
    calls: Mutex<Vec<(ResourceKind, String)>>,
}

impl SpyProber {
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            failures: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, kind: ResourceKind, id: &str, observed: Observed) -> Self {
        self.states.insert((kind, id.to_string()), observed);
        self
    }

    pub fn failing(mut self, kind: ResourceKind, id: &str) -> Self {
        self.failures.insert((kind, id.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<(ResourceKind, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Prober for SpyProber {
    fn probe(&self, kind: ResourceKind, id: &str) -> Result<Observed> {
        self.calls.lock().unwrap().push((kind, id.to_string()));
        let key = (kind, id.to_string());
        if self.failures.contains(&key) {
            return Err(Error::probe(kind, id, "scripted probe failure"));
        }
        Ok(self.states.get(&key).cloned().unwrap_or(Observed::Absent))
    }
}

/// Command runner with a scripted success/failure sequence
///
/// The script is consumed call by call; once exhausted, every call
/// succeeds. Each invocation's full shell text is recorded.
pub struct ScriptedRunner {
    calls: Mutex<Vec<String>>,
    script: Mutex<VecDeque<bool>>,
    successes: Mutex<usize>,
    default_success: bool,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            successes: Mutex::new(0),
            default_success: true,
        }
    }

    /// First `n` calls fail, the rest succeed
    pub fn failing_times(n: usize) -> Self {
        let runner = Self::new();
        runner.script((0..n).map(|_| false).collect());
        runner
    }

    pub fn always_failing() -> Self {
        let mut runner = Self::new();
        runner.default_success = false;
        runner
    }

    pub fn script(&self, outcomes: Vec<bool>) {
        *self.script.lock().unwrap() = outcomes.into();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn successes(&self) -> usize {
        *self.successes.lock().unwrap()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, script: &str, _mode: &ExecMode) -> io::Result<CommandOutput> {
        self.calls.lock().unwrap().push(script.to_string());
        let success = {
            let mut queue = self.script.lock().unwrap();
            queue.pop_front().unwrap_or(self.default_success)
        };
        if success {
            *self.successes.lock().unwrap() += 1;
        }
        Ok(CommandOutput {
            stdout: Vec::new(),
            stderr: if success {
                Vec::new()
            } else {
                b"scripted failure".to_vec()
            },
            success,
        })
    }
}

/// In-memory file store recording every write
pub struct MemFs {
    files: Mutex<HashMap<PathBuf, FileSnapshot>>,
    writes: Mutex<Vec<PathBuf>>,
}

impl MemFs {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn seed(&self, path: &str, content: &str, mode: u32) {
        self.files.lock().unwrap().insert(
            PathBuf::from(path),
            FileSnapshot {
                content: content.to_string(),
                mode,
            },
        );
    }

    pub fn content(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(Path::new(path))
            .map(|s| s.content.clone())
    }

    pub fn writes(&self) -> Vec<PathBuf> {
        self.writes.lock().unwrap().clone()
    }
}

impl FileStore for MemFs {
    fn read(&self, path: &Path) -> io::Result<Option<FileSnapshot>> {
        Ok(self.files.lock().unwrap().get(path).cloned())
    }

    fn write_atomic(&self, path: &Path, content: &str, mode: Option<u32>) -> io::Result<()> {
        let mut files = self.files.lock().unwrap();
        let mode = mode
            .or_else(|| files.get(path).map(|s| s.mode))
            .unwrap_or(0o644);
        files.insert(
            path.to_path_buf(),
            FileSnapshot {
                content: content.to_string(),
                mode,
            },
        );
        self.writes.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }
}
