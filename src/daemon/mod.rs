mod service;

pub use service::{run, run_cycle, wait_for_shutdown};
