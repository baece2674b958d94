// Library interface for leia-testenv
// The CLI binary and integration tests both go through these modules

pub mod cli;
pub mod clock;
pub mod compose;
pub mod config;
pub mod docker;
pub mod environment;
pub mod errors;

pub use environment::bootstrap;
pub use environment::{EnvironmentBuilder, EnvironmentDescriptor, RunningEnvironment};
pub use errors::{EnvError, Result};
