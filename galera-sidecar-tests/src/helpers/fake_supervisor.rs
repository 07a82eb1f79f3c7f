//! Scriptable in-memory supervisor

use galera_sidecar::supervisor::{ProcessState, Supervisor, SupervisorError};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Status replies are consumed in order; once the script runs out the
/// fallback (initially `Running`) is returned forever.
#[derive(Clone)]
pub struct FakeSupervisor {
    inner: Arc<Inner>,
}

struct Inner {
    script: Mutex<VecDeque<Result<ProcessState, String>>>,
    fallback: Mutex<Result<ProcessState, String>>,
    start_error: Mutex<Option<String>>,
    stop_error: Mutex<Option<String>>,
    watched_marker: Mutex<Option<PathBuf>>,
    marker_at_start: Mutex<Vec<Option<String>>>,
    calls: Mutex<Vec<String>>,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl Default for FakeSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSupervisor {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                script: Mutex::new(VecDeque::new()),
                fallback: Mutex::new(Ok(ProcessState::Running)),
                start_error: Mutex::new(None),
                stop_error: Mutex::new(None),
                watched_marker: Mutex::new(None),
                marker_at_start: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
                start_calls: AtomicUsize::new(0),
                stop_calls: AtomicUsize::new(0),
                status_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Queue status replies
    pub fn with_statuses(self, states: impl IntoIterator<Item = ProcessState>) -> Self {
        self.inner
            .script
            .lock()
            .unwrap()
            .extend(states.into_iter().map(Ok));
        self
    }

    /// Queue a failing status query
    pub fn with_status_error(self, message: &str) -> Self {
        self.inner
            .script
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    /// Reply used after the script is exhausted
    pub fn with_fallback(self, state: ProcessState) -> Self {
        *self.inner.fallback.lock().unwrap() = Ok(state);
        self
    }

    pub fn failing_start(self, message: &str) -> Self {
        *self.inner.start_error.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn failing_stop(self, message: &str) -> Self {
        *self.inner.stop_error.lock().unwrap() = Some(message.to_string());
        self
    }

    /// Snapshot the content of `path` every time `start` is called
    pub fn watching_marker(self, path: &Path) -> Self {
        *self.inner.watched_marker.lock().unwrap() = Some(path.to_path_buf());
        self
    }

    pub fn start_calls(&self) -> usize {
        self.inner.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.inner.stop_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.inner.status_calls.load(Ordering::SeqCst)
    }

    /// Marker content observed at each `start` call (`None` if absent)
    pub fn marker_at_start(&self) -> Vec<Option<String>> {
        self.inner.marker_at_start.lock().unwrap().clone()
    }

    /// Every call in order, as `"<op>:<service>"`
    pub fn calls(&self) -> Vec<String> {
        self.inner.calls.lock().unwrap().clone()
    }

    fn record(&self, op: &str, service: &str) {
        self.inner
            .calls
            .lock()
            .unwrap()
            .push(format!("{}:{}", op, service));
    }
}

impl Supervisor for FakeSupervisor {
    async fn start(&self, service: &str) -> Result<(), SupervisorError> {
        self.record("start", service);
        self.inner.start_calls.fetch_add(1, Ordering::SeqCst);

        let watched = self.inner.watched_marker.lock().unwrap().clone();
        if let Some(path) = watched {
            let content = std::fs::read_to_string(&path).ok();
            self.inner.marker_at_start.lock().unwrap().push(content);
        }

        match self.inner.start_error.lock().unwrap().clone() {
            Some(message) => Err(SupervisorError::Unavailable(message)),
            None => Ok(()),
        }
    }

    async fn stop(&self, service: &str) -> Result<(), SupervisorError> {
        self.record("stop", service);
        self.inner.stop_calls.fetch_add(1, Ordering::SeqCst);

        match self.inner.stop_error.lock().unwrap().clone() {
            Some(message) => Err(SupervisorError::Unavailable(message)),
            None => Ok(()),
        }
    }

    async fn status(&self, service: &str) -> Result<ProcessState, SupervisorError> {
        self.record("status", service);
        self.inner.status_calls.fetch_add(1, Ordering::SeqCst);

        let next = self.inner.script.lock().unwrap().pop_front();
        let reply = match next {
            Some(reply) => reply,
            None => self.inner.fallback.lock().unwrap().clone(),
        };
        reply.map_err(SupervisorError::Unavailable)
    }
}
