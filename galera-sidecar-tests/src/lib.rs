//! Test utilities for the galera-sidecar workspace
//!
//! Test doubles for the supervisor and readiness probe, a scripted HTTP
//! server for exercising the real adapters, and helpers for inspecting the
//! declared state marker.

pub mod helpers;

pub use helpers::fake_probe::FakeProbe;
pub use helpers::fake_supervisor::FakeSupervisor;
pub use helpers::http_stub::{HttpStub, RecordedRequest, StubReply};
pub use helpers::state_dir::StateDir;
