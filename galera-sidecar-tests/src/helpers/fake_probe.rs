//! Scriptable readiness probe

use galera_sidecar::readiness::{ProbeOutcome, ReadinessProbe};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const FAKE_PROBE_ADDRESS: &str = "127.0.0.1:8114";

#[derive(Debug, Clone)]
enum Step {
    Answer(ProbeOutcome),
    Hang,
}

/// Outcomes are consumed in order; afterwards the fallback (initially
/// unreachable) repeats.
#[derive(Clone)]
pub struct FakeProbe {
    inner: Arc<Inner>,
}

struct Inner {
    script: Mutex<VecDeque<Step>>,
    fallback: Mutex<Step>,
    calls: AtomicUsize,
}

impl Default for FakeProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeProbe {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                script: Mutex::new(VecDeque::new()),
                fallback: Mutex::new(Step::Answer(Self::refused())),
                calls: AtomicUsize::new(0),
            }),
        }
    }

    pub fn refused() -> ProbeOutcome {
        ProbeOutcome::Unreachable("connection refused".to_string())
    }

    pub fn timed_out() -> ProbeOutcome {
        ProbeOutcome::Unreachable("operation timed out".to_string())
    }

    pub fn rejected(status: u16) -> ProbeOutcome {
        ProbeOutcome::Rejected {
            status,
            reason: format!("{} Service Unavailable", status),
        }
    }

    pub fn with_outcomes(self, outcomes: impl IntoIterator<Item = ProbeOutcome>) -> Self {
        self.inner
            .script
            .lock()
            .unwrap()
            .extend(outcomes.into_iter().map(Step::Answer));
        self
    }

    /// Queue a probe that never completes
    pub fn with_hang(self) -> Self {
        self.inner.script.lock().unwrap().push_back(Step::Hang);
        self
    }

    pub fn with_fallback(self, outcome: ProbeOutcome) -> Self {
        *self.inner.fallback.lock().unwrap() = Step::Answer(outcome);
        self
    }

    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }
}

impl ReadinessProbe for FakeProbe {
    fn address(&self) -> &str {
        FAKE_PROBE_ADDRESS
    }

    async fn probe(&self) -> ProbeOutcome {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);

        let next = self.inner.script.lock().unwrap().pop_front();
        let step = match next {
            Some(step) => step,
            None => self.inner.fallback.lock().unwrap().clone(),
        };

        match step {
            Step::Answer(outcome) => outcome,
            Step::Hang => std::future::pending().await,
        }
    }
}
