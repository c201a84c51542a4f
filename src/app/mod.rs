//! Application layer: run context, logging setup and the per-directory flow.

mod context;
pub mod logging;
mod runtime;

pub use context::RunContext;
pub use logging::{directory_dispatch, init_tracing, puts, stderr_level};
pub use runtime::{RunOptions, load_config, run_directory};
