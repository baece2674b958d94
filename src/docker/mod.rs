pub mod compose;
pub mod ports;
pub mod runner;

pub use compose::{ComposeCommand, ComposeMode, ComposeOrchestrator, ComposeVariant};
pub use runner::{CommandOutput, CommandRunner, Invocation, SystemRunner};
