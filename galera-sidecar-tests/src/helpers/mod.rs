pub mod fake_probe;
pub mod fake_supervisor;
pub mod http_stub;
pub mod state_dir;
